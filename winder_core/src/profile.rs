//! Ordered, fixed-capacity set of layers sharing one mandrel.

use crate::config::DriveTrain;
use crate::error::WinderError;
use crate::layer::Layer;

/// Most layers one profile can hold.
pub const MAX_LAYERS: usize = winder_config::MAX_PROFILE_LAYERS;

/// A winding job definition.
///
/// A layer takes the profile's diameter at the moment it is appended. Changing
/// the diameter later does not reach layers that are already in the profile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindProfile {
    mandrel_diameter: f64,
    layers: heapless::Vec<Layer, MAX_LAYERS>,
}

/// Derived values for one layer, as shown by `winder plan`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerPlan {
    pub index: usize,
    pub total_passes: u32,
    pub step_ratio: f64,
    pub stepover_degrees: f64,
    pub dwell_steps: i64,
}

impl WindProfile {
    pub fn new(mandrel_diameter: f64) -> Self {
        Self {
            mandrel_diameter,
            layers: heapless::Vec::new(),
        }
    }

    pub fn mandrel_diameter(&self) -> f64 {
        self.mandrel_diameter
    }

    /// Only affects layers appended afterwards.
    pub fn set_mandrel_diameter(&mut self, diameter: f64) {
        self.mandrel_diameter = diameter;
    }

    /// Append a layer built with the current mandrel diameter. A full profile
    /// is left untouched and reports `WinderError::Capacity`.
    pub fn add_layer(
        &mut self,
        length: f64,
        angle: f64,
        offset: f64,
        stepover: f64,
        dwell: f64,
    ) -> Result<(), WinderError> {
        let layer = Layer::new(length, angle, offset, stepover, dwell, self.mandrel_diameter);
        self.layers
            .push(layer)
            .map_err(|_| WinderError::Capacity(MAX_LAYERS))
    }

    /// Drop every layer and forget the diameter.
    pub fn clear(&mut self) {
        self.layers.clear();
        self.mandrel_diameter = 0.0;
    }

    pub fn is_valid(&self) -> bool {
        !self.layers.is_empty() && self.mandrel_diameter > 0.0
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub fn layer_mut(&mut self, index: usize) -> Option<&mut Layer> {
        self.layers.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub(crate) fn reset_progress(&mut self) {
        for layer in self.layers.iter_mut() {
            layer.reset_progress();
        }
    }

    /// Passes counted so far across all layers.
    pub fn passes_completed(&self) -> u32 {
        self.layers
            .iter()
            .fold(0u32, |n, l| n.saturating_add(l.passes_completed()))
    }

    pub fn plan(&self, drive: &DriveTrain) -> Vec<LayerPlan> {
        self.layers
            .iter()
            .enumerate()
            .map(|(index, l)| LayerPlan {
                index,
                total_passes: l.total_passes(),
                step_ratio: l.step_ratio(drive),
                stepover_degrees: l.stepover_degrees(),
                dwell_steps: l.dwell_steps(drive),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_resets_diameter_and_layers() {
        let mut p = WindProfile::new(50.0);
        p.add_layer(100.0, 45.0, 0.0, 4.0, 0.0).unwrap();
        p.clear();
        assert!(p.is_empty());
        assert_eq!(p.mandrel_diameter(), 0.0);
        assert!(!p.is_valid());
    }
}
