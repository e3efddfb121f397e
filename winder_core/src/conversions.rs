//! `From` implementations bridging `winder_config` types to `winder_core` types.

use crate::config::{DriveTrain, MotionCfg, MotorSpec, Pulleys};
use crate::error::WinderError;
use crate::profile::WindProfile;

// ── MotorSpec ────────────────────────────────────────────────────────────────

impl From<&winder_config::MotorCfg> for MotorSpec {
    fn from(c: &winder_config::MotorCfg) -> Self {
        Self {
            steps_per_rev: c.steps_per_rev,
            microsteps: c.microsteps,
        }
    }
}

// ── Pulleys ──────────────────────────────────────────────────────────────────

impl From<&winder_config::DrivetrainCfg> for Pulleys {
    fn from(c: &winder_config::DrivetrainCfg) -> Self {
        Self {
            belt_pitch_mm: c.belt_pitch_mm,
            motor_teeth: c.motor_teeth,
            mandrel_teeth: c.mandrel_teeth,
            carriage_teeth: c.carriage_teeth,
        }
    }
}

// ── DriveTrain ───────────────────────────────────────────────────────────────

impl From<&winder_config::Config> for DriveTrain {
    fn from(c: &winder_config::Config) -> Self {
        DriveTrain::from_parts(
            &MotorSpec::from(&c.mandrel_motor),
            &MotorSpec::from(&c.carriage_motor),
            &Pulleys::from(&c.drivetrain),
        )
    }
}

// ── MotionCfg ────────────────────────────────────────────────────────────────

impl From<&winder_config::MotionCfg> for MotionCfg {
    fn from(c: &winder_config::MotionCfg) -> Self {
        Self {
            mandrel_speed: c.mandrel_speed,
            mandrel_max_speed: c.mandrel_max_speed,
            carriage_max_speed: c.carriage_max_speed,
            carriage_accel: c.carriage_accel,
            homing_speed: c.homing_speed,
        }
    }
}

// ── WindProfile ──────────────────────────────────────────────────────────────

impl TryFrom<&winder_config::ProfileCfg> for WindProfile {
    type Error = WinderError;

    fn try_from(c: &winder_config::ProfileCfg) -> Result<Self, Self::Error> {
        WindProfile::from_rows(c.mandrel_diameter, &c.layers)
    }
}

impl WindProfile {
    /// Build a profile from a layer table, e.g. one loaded from CSV.
    pub fn from_rows(
        mandrel_diameter: f64,
        rows: &[winder_config::LayerRow],
    ) -> Result<Self, WinderError> {
        let mut p = WindProfile::new(mandrel_diameter);
        for r in rows {
            p.add_layer(r.length, r.angle, r.offset, r.stepover, r.dwell)?;
        }
        Ok(p)
    }
}
