//! Maps `Box<dyn Error>` from trait boundaries to typed `WinderError`.
//!
//! The traits in `winder_traits` use `Box<dyn Error + Send + Sync>` so any
//! driver can plug in; this module converts those to our typed error enum,
//! with an optional feature-gated path for `winder_hardware::HwError`.

use crate::error::WinderError;

/// Map a trait-boundary error to a typed `WinderError`.
///
/// Known hardware errors become `HardwareFault`; anything else is carried
/// as a plain `Hardware` message.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> WinderError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<winder_hardware::error::HwError>() {
            return WinderError::HardwareFault(hw.to_string());
        }
    }

    WinderError::Hardware(e.to_string())
}

/// Convenience wrapper for the boxed errors returned by `Axis` and `HomeSensor`.
pub(crate) fn map_hw_error_dyn(e: &(dyn std::error::Error + Send + Sync + 'static)) -> WinderError {
    map_hw_error(e)
}
