//! Builder for `WindingController`.
//!
//! Axes and the home sensor are required; the drive train and motion
//! parameters default to the reference machine and the profile starts empty.

use crossbeam_channel::Sender;
use winder_traits::{Axis, HomeSensor};

use crate::config::{DriveTrain, MotionCfg};
use crate::controller::WindingController;
use crate::error::{BuildError, Result};
use crate::profile::WindProfile;
use crate::status::{WindingEvent, WindingState};

pub struct ControllerBuilder<M, C, H> {
    mandrel: Option<M>,
    carriage: Option<C>,
    home: Option<H>,
    drive: Option<DriveTrain>,
    motion: Option<MotionCfg>,
    profile: Option<WindProfile>,
    events: Option<Sender<WindingEvent>>,
}

impl<M, C, H> Default for ControllerBuilder<M, C, H> {
    fn default() -> Self {
        Self {
            mandrel: None,
            carriage: None,
            home: None,
            drive: None,
            motion: None,
            profile: None,
            events: None,
        }
    }
}

impl<M: Axis, C: Axis, H: HomeSensor> WindingController<M, C, H> {
    /// Start building a controller.
    pub fn builder() -> ControllerBuilder<M, C, H> {
        ControllerBuilder::default()
    }
}

impl<M: Axis, C: Axis, H: HomeSensor> ControllerBuilder<M, C, H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mandrel(mut self, axis: M) -> Self {
        self.mandrel = Some(axis);
        self
    }
    pub fn with_carriage(mut self, axis: C) -> Self {
        self.carriage = Some(axis);
        self
    }
    pub fn with_home(mut self, sensor: H) -> Self {
        self.home = Some(sensor);
        self
    }
    pub fn with_drive_train(mut self, drive: DriveTrain) -> Self {
        self.drive = Some(drive);
        self
    }
    pub fn with_motion(mut self, motion: MotionCfg) -> Self {
        self.motion = Some(motion);
        self
    }
    pub fn with_profile(mut self, profile: WindProfile) -> Self {
        self.profile = Some(profile);
        self
    }
    /// Bounded channels are recommended; a full channel drops events.
    pub fn with_events(mut self, tx: Sender<WindingEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Validate and build. Missing collaborators and unusable drive-train or
    /// motion values come back as `BuildError`.
    pub fn try_build(self) -> Result<WindingController<M, C, H>> {
        let mandrel = self
            .mandrel
            .ok_or_else(|| eyre::Report::new(BuildError::MissingMandrel))?;
        let carriage = self
            .carriage
            .ok_or_else(|| eyre::Report::new(BuildError::MissingCarriage))?;
        let home = self
            .home
            .ok_or_else(|| eyre::Report::new(BuildError::MissingHome))?;

        // ── Validation ───────────────────────────────────────────────────────
        let drive = self.drive.unwrap_or_default();
        if !drive.is_usable() {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "drive train step constants must be finite and > 0",
            )));
        }
        let motion = self.motion.unwrap_or_default();
        let speeds = [
            motion.mandrel_speed,
            motion.mandrel_max_speed,
            motion.carriage_max_speed,
            motion.carriage_accel,
            motion.homing_speed,
        ];
        if speeds.iter().any(|v| !(v.is_finite() && *v > 0.0)) {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "motion speeds and acceleration must be finite and > 0",
            )));
        }
        if motion.mandrel_speed > motion.mandrel_max_speed {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "mandrel speed exceeds mandrel max speed",
            )));
        }

        Ok(WindingController {
            mandrel,
            carriage,
            home,
            profile: self.profile.unwrap_or_default(),
            drive,
            motion,
            events: self.events,
            state: WindingState::Idle,
            resume_state: None,
            layer_index: 0,
            accumulator: 0.0,
            last_mandrel_pos: 0,
            dwell_target: 0,
        })
    }
}
