//! Collaborator contracts for the winding controller.
//!
//! The core never talks to GPIO or step generators directly. Everything it
//! needs from the machine goes through the traits below, so the same
//! controller runs against simulated axes, recording mocks, or real drivers.

pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// One stepper-driven axis (mandrel or carriage).
///
/// Positions are absolute microstep counts. Nothing moves unless the owner
/// polls `run_speed()` or `run()`; both must be cheap and non-blocking since
/// they are called once per control tick.
pub trait Axis {
    /// Upper bound for both constant-speed and positioning moves (steps/s).
    fn set_max_speed(
        &mut self,
        steps_per_sec: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Acceleration used by `run()` (steps/s²).
    fn set_acceleration(
        &mut self,
        steps_per_sec2: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Signed speed used by `run_speed()`. Zero means "do not step".
    fn set_speed(
        &mut self,
        steps_per_sec: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Take one step at the constant speed if one is due. Returns true if a step was taken.
    fn run_speed(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;

    /// Shift the commanded target by `steps`, relative to the previous target.
    fn move_relative(&mut self, steps: i64) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Take one acceleration-profiled step toward the target if one is due.
    fn run(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;

    /// Absolute position in steps.
    fn current_position(&self) -> i64;

    /// Redefine the current position; the target is re-anchored to it.
    fn set_current_position(
        &mut self,
        position: i64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Halt: the target collapses onto the current position.
    fn stop(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Binary home/limit switch on the carriage.
///
/// `true` means asserted (carriage at home). Electrical polarity is the
/// implementation's business.
pub trait HomeSensor {
    fn is_home(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;
}

impl<A: Axis + ?Sized> Axis for Box<A> {
    fn set_max_speed(
        &mut self,
        steps_per_sec: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).set_max_speed(steps_per_sec)
    }
    fn set_acceleration(
        &mut self,
        steps_per_sec2: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).set_acceleration(steps_per_sec2)
    }
    fn set_speed(
        &mut self,
        steps_per_sec: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).set_speed(steps_per_sec)
    }
    fn run_speed(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        (**self).run_speed()
    }
    fn move_relative(&mut self, steps: i64) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).move_relative(steps)
    }
    fn run(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        (**self).run()
    }
    fn current_position(&self) -> i64 {
        (**self).current_position()
    }
    fn set_current_position(
        &mut self,
        position: i64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).set_current_position(position)
    }
    fn stop(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).stop()
    }
}

impl<H: HomeSensor + ?Sized> HomeSensor for Box<H> {
    fn is_home(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        (**self).is_home()
    }
}
