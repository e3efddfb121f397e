//! Runtime machine configuration for the winding controller.
//!
//! These are separate from the TOML-deserialized config in `winder_config`;
//! see `conversions` for the mapping.

/// One stepper motor and its driver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorSpec {
    pub steps_per_rev: u32,
    pub microsteps: u32,
}

impl MotorSpec {
    pub fn microsteps_per_rev(&self) -> f64 {
        f64::from(self.steps_per_rev) * f64::from(self.microsteps)
    }
}

/// Belt and pulley train of both axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pulleys {
    pub belt_pitch_mm: f64,
    /// Pulley on the mandrel motor shaft.
    pub motor_teeth: u32,
    /// Pulley on the mandrel.
    pub mandrel_teeth: u32,
    /// Pulley on the carriage motor, driving the carriage belt.
    pub carriage_teeth: u32,
}

impl Default for Pulleys {
    fn default() -> Self {
        // GT2 belt, 20T motor pulleys, 48T on the mandrel
        Self {
            belt_pitch_mm: 2.0,
            motor_teeth: 20,
            mandrel_teeth: 48,
            carriage_teeth: 20,
        }
    }
}

/// The two constants the controller needs from the mechanics. Computed once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveTrain {
    pub carriage_steps_per_mm: f64,
    pub mandrel_steps_per_rev: f64,
}

impl DriveTrain {
    pub fn from_parts(mandrel: &MotorSpec, carriage: &MotorSpec, pulleys: &Pulleys) -> Self {
        let mm_per_carriage_rev = f64::from(pulleys.carriage_teeth) * pulleys.belt_pitch_mm;
        let mandrel_reduction = f64::from(pulleys.mandrel_teeth) / f64::from(pulleys.motor_teeth);
        Self {
            carriage_steps_per_mm: carriage.microsteps_per_rev() / mm_per_carriage_rev,
            mandrel_steps_per_rev: mandrel.microsteps_per_rev() * mandrel_reduction,
        }
    }

    pub(crate) fn is_usable(&self) -> bool {
        self.carriage_steps_per_mm.is_finite()
            && self.carriage_steps_per_mm > 0.0
            && self.mandrel_steps_per_rev.is_finite()
            && self.mandrel_steps_per_rev > 0.0
    }
}

impl Default for DriveTrain {
    fn default() -> Self {
        Self::from_parts(
            &MotorSpec {
                steps_per_rev: 200,
                microsteps: 8,
            },
            &MotorSpec {
                steps_per_rev: 200,
                microsteps: 4,
            },
            &Pulleys::default(),
        )
    }
}

/// Speeds (steps/s) and carriage acceleration (steps/s²) applied at `start()`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionCfg {
    pub mandrel_speed: f64,
    pub mandrel_max_speed: f64,
    pub carriage_max_speed: f64,
    pub carriage_accel: f64,
    /// Magnitude; homing always runs toward negative positions.
    pub homing_speed: f64,
}

impl Default for MotionCfg {
    fn default() -> Self {
        Self {
            mandrel_speed: 600.0,
            mandrel_max_speed: 1000.0,
            carriage_max_speed: 3000.0,
            carriage_accel: 5000.0,
            homing_speed: 400.0,
        }
    }
}
