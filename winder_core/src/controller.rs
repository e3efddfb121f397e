//! The winding state machine (`WindingController`).
//!
//! Each `update()` call is one control tick: it polls the axes that the
//! current state needs and decides transitions. Nothing in here blocks; the
//! axes only step when polled, so the caller must tick at a rate well above
//! the fastest step rate it asks for.
//!
//! Electronic gearing: in WINDING the mandrel runs at constant speed and
//! every observed mandrel step adds `ratio · sign` carriage steps to a
//! fractional accumulator. Whole steps are moved out of the accumulator
//! (truncated toward zero) and handed to the carriage as relative moves, so
//! the remainder always stays inside (-1, 1) and no step is ever lost.

use crossbeam_channel::{Sender, TrySendError};
use eyre::WrapErr;
use tracing::{debug, info, trace, warn};
use winder_traits::{Axis, HomeSensor};

use crate::config::{DriveTrain, MotionCfg};
use crate::error::{Result, WinderError};
use crate::hw_error::map_hw_error_dyn;
use crate::profile::WindProfile;
use crate::status::{Snapshot, WindingEvent, WindingState};

type BoxedResult<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Lift a trait-boundary result into a typed, contextualized report.
#[inline]
fn hw<T>(r: BoxedResult<T>, what: &'static str) -> Result<T> {
    r.map_err(|e| eyre::Report::new(map_hw_error_dyn(&*e)))
        .wrap_err(what)
}

/// Two-axis winding controller, generic over its collaborators.
pub struct WindingController<M: Axis, C: Axis, H: HomeSensor> {
    pub(crate) mandrel: M,
    pub(crate) carriage: C,
    pub(crate) home: H,
    pub(crate) profile: WindProfile,
    pub(crate) drive: DriveTrain,
    pub(crate) motion: MotionCfg,
    pub(crate) events: Option<Sender<WindingEvent>>,

    pub(crate) state: WindingState,
    pub(crate) resume_state: Option<WindingState>,
    pub(crate) layer_index: usize,
    pub(crate) accumulator: f64,
    pub(crate) last_mandrel_pos: i64,
    pub(crate) dwell_target: i64,
}

impl<M: Axis, C: Axis, H: HomeSensor> core::fmt::Debug for WindingController<M, C, H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WindingController")
            .field("state", &self.state)
            .field("layer_index", &self.layer_index)
            .field("accumulator", &self.accumulator)
            .field("layers", &self.profile.len())
            .finish()
    }
}

impl<M: Axis, C: Axis, H: HomeSensor> WindingController<M, C, H> {
    // ── Read-only status ─────────────────────────────────────────────────────

    pub fn state(&self) -> WindingState {
        self.state
    }

    pub fn active_layer_index(&self) -> usize {
        self.layer_index
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state,
            resume_state: self.resume_state,
            layer_index: self.layer_index,
            accumulator: self.accumulator,
            last_mandrel_pos: self.last_mandrel_pos,
            dwell_target: self.dwell_target,
        }
    }

    pub fn profile(&self) -> &WindProfile {
        &self.profile
    }

    /// Editable profile, only while no job is running or paused.
    pub fn profile_mut(&mut self) -> Option<&mut WindProfile> {
        if self.state.is_active() {
            None
        } else {
            Some(&mut self.profile)
        }
    }

    pub fn drive_train(&self) -> &DriveTrain {
        &self.drive
    }

    pub fn mandrel(&self) -> &M {
        &self.mandrel
    }

    pub fn carriage(&self) -> &C {
        &self.carriage
    }

    pub fn home_sensor(&self) -> &H {
        &self.home
    }

    // ── Commands ─────────────────────────────────────────────────────────────

    /// Begin a job: reset all progress, apply motion parameters, and home.
    ///
    /// Refused without any state change while a job is active or paused
    /// (`WinderError::State`), or when the profile is invalid or holds a
    /// layer that could never finish (`WinderError::Config`).
    pub fn start(&mut self) -> Result<()> {
        if self.state.is_active() {
            let reason = format!("job already {}", self.state.name());
            return Err(self.refuse(reason, WinderError::State));
        }
        if !self.profile.is_valid() {
            let reason = if self.profile.is_empty() {
                "profile has no layers".to_string()
            } else {
                format!(
                    "mandrel diameter must be > 0 (got {})",
                    self.profile.mandrel_diameter()
                )
            };
            return Err(self.refuse(reason, WinderError::Config));
        }
        if let Some(reason) = self.degenerate_layer() {
            return Err(self.refuse(reason, WinderError::Config));
        }

        hw(
            self.mandrel.set_max_speed(self.motion.mandrel_max_speed),
            "mandrel set_max_speed",
        )?;
        hw(
            self.mandrel.set_speed(self.motion.mandrel_speed),
            "mandrel set_speed",
        )?;
        hw(
            self.carriage.set_max_speed(self.motion.carriage_max_speed),
            "carriage set_max_speed",
        )?;
        hw(
            self.carriage.set_acceleration(self.motion.carriage_accel),
            "carriage set_acceleration",
        )?;

        self.profile.reset_progress();
        self.layer_index = 0;
        self.accumulator = 0.0;
        self.dwell_target = 0;
        self.resume_state = None;
        info!(
            layers = self.profile.len(),
            mandrel_diameter = self.profile.mandrel_diameter(),
            "winding job start"
        );
        self.transition(WindingState::Zeroing);
        Ok(())
    }

    /// Freeze the job. Returns false (and does nothing) outside ZEROING,
    /// WINDING, or DWELLING.
    pub fn pause(&mut self) -> bool {
        if !self.state.is_pausable() {
            debug!(state = self.state.name(), "pause ignored");
            return false;
        }
        self.resume_state = Some(self.state);
        self.transition(WindingState::Paused);
        true
    }

    /// Continue exactly where `pause()` left off: no re-homing, no
    /// accumulator reset. Returns false outside PAUSED.
    pub fn resume(&mut self) -> bool {
        match (self.state, self.resume_state) {
            (WindingState::Paused, Some(to)) => {
                self.resume_state = None;
                self.transition(to);
                true
            }
            _ => {
                debug!(state = self.state.name(), "resume ignored");
                false
            }
        }
    }

    /// Give up on an unfinished job: stop both axes and return to IDLE.
    /// A no-op when no job is active.
    pub fn abort(&mut self) -> Result<()> {
        if !self.state.is_active() {
            debug!(state = self.state.name(), "abort ignored");
            return Ok(());
        }
        warn!(
            state = self.state.name(),
            layer = self.layer_index,
            "winding job aborted"
        );
        self.resume_state = None;
        self.transition(WindingState::Idle);
        self.halt_axes()
    }

    // ── Control tick ─────────────────────────────────────────────────────────

    /// Run one control tick and return the state after it.
    pub fn update(&mut self) -> Result<WindingState> {
        match self.state {
            WindingState::Idle | WindingState::Paused | WindingState::Complete => {}
            WindingState::Zeroing => self.tick_zeroing()?,
            WindingState::Winding => self.tick_winding()?,
            WindingState::Dwelling => self.tick_dwelling()?,
        }
        Ok(self.state)
    }

    fn tick_zeroing(&mut self) -> Result<()> {
        hw(
            self.carriage.set_speed(-self.motion.homing_speed),
            "carriage set_speed",
        )?;
        hw(self.carriage.run_speed(), "carriage run_speed")?;

        if hw(self.home.is_home(), "home sensor")? {
            hw(self.carriage.stop(), "carriage stop")?;
            hw(self.carriage.set_current_position(0), "carriage zero")?;
            self.last_mandrel_pos = self.mandrel.current_position();
            self.accumulator = 0.0;
            info!("zeroing complete");
            self.transition(WindingState::Winding);
            self.emit(WindingEvent::LayerStarted {
                index: self.layer_index,
            });
        }
        Ok(())
    }

    fn tick_winding(&mut self) -> Result<()> {
        let Some(layer) = self.profile.layer(self.layer_index) else {
            return Err(eyre::Report::new(WinderError::State(format!(
                "active layer {} missing from profile",
                self.layer_index
            ))));
        };
        let ratio = layer.step_ratio(&self.drive);
        let sign = layer.direction().sign();
        let forward = sign > 0.0;
        let target_mm = layer.target_endpoint();

        hw(self.mandrel.run_speed(), "mandrel run_speed")?;

        let now = self.mandrel.current_position();
        if now != self.last_mandrel_pos {
            let delta = now - self.last_mandrel_pos;
            self.last_mandrel_pos = now;
            self.accumulator += delta as f64 * ratio * sign;
            if self.accumulator.abs() >= 1.0 {
                let steps = self.accumulator.trunc();
                hw(self.carriage.move_relative(steps as i64), "carriage move")?;
                self.accumulator -= steps;
            }
        }

        hw(self.carriage.run(), "carriage run")?;

        let pos_mm = self.carriage.current_position() as f64 / self.drive.carriage_steps_per_mm;
        let reached = if forward {
            pos_mm >= target_mm
        } else {
            pos_mm <= target_mm
        };
        if reached {
            let dwell = self
                .profile
                .layer(self.layer_index)
                .map_or(0, |l| l.dwell_steps(&self.drive));
            self.dwell_target = self.mandrel.current_position() + dwell;
            // Anything still queued on the carriage lies past the endpoint.
            hw(self.carriage.stop(), "carriage stop")?;
            trace!(pos_mm, target_mm, dwell_steps = dwell, "pass endpoint reached");
            self.transition(WindingState::Dwelling);
        }
        Ok(())
    }

    fn tick_dwelling(&mut self) -> Result<()> {
        hw(self.mandrel.run_speed(), "mandrel run_speed")?;
        if self.mandrel.current_position() < self.dwell_target {
            return Ok(());
        }

        let idx = self.layer_index;
        let Some(layer) = self.profile.layer_mut(idx) else {
            return Err(eyre::Report::new(WinderError::State(format!(
                "active layer {idx} missing from profile"
            ))));
        };
        layer.count_pass();
        let (completed, total, done) =
            (layer.passes_completed(), layer.total_passes(), layer.is_done());
        self.emit(WindingEvent::PassCompleted {
            layer: idx,
            completed,
            total,
        });

        if !done {
            self.last_mandrel_pos = self.mandrel.current_position();
            self.transition(WindingState::Winding);
        } else if idx + 1 < self.profile.len() {
            self.layer_index += 1;
            self.accumulator = 0.0;
            self.last_mandrel_pos = self.mandrel.current_position();
            self.transition(WindingState::Winding);
            self.emit(WindingEvent::LayerStarted {
                index: self.layer_index,
            });
        } else {
            hw(self.mandrel.set_speed(0.0), "mandrel set_speed")?;
            hw(self.carriage.set_speed(0.0), "carriage set_speed")?;
            self.transition(WindingState::Complete);
            self.emit(WindingEvent::Complete);
        }
        Ok(())
    }

    // ── Helpers ──────────────────────────────────────────────────────────────

    fn halt_axes(&mut self) -> Result<()> {
        hw(self.mandrel.set_speed(0.0), "mandrel set_speed")?;
        hw(self.mandrel.stop(), "mandrel stop")?;
        hw(self.carriage.set_speed(0.0), "carriage set_speed")?;
        hw(self.carriage.stop(), "carriage stop")
    }

    /// First layer that could never finish: no captured diameter (appended
    /// before the mandrel diameter was set) or no passes at all.
    fn degenerate_layer(&self) -> Option<String> {
        self.profile
            .layers()
            .iter()
            .enumerate()
            .find_map(|(i, l)| {
                if !(l.diameter() > 0.0) {
                    Some(format!(
                        "layer {} has no mandrel diameter (added before the diameter was set)",
                        i + 1
                    ))
                } else if l.total_passes() == 0 {
                    Some(format!(
                        "layer {} has zero passes (stepover {} mm)",
                        i + 1,
                        l.stepover()
                    ))
                } else {
                    None
                }
            })
    }

    fn refuse(&self, reason: String, kind: fn(String) -> WinderError) -> eyre::Report {
        warn!(state = self.state.name(), %reason, "start refused");
        self.emit(WindingEvent::StartRefused {
            reason: reason.clone(),
        });
        eyre::Report::new(kind(reason))
    }

    fn transition(&mut self, to: WindingState) {
        let from = self.state;
        self.state = to;
        info!(from = from.name(), to = to.name(), layer = self.layer_index, "state change");
        self.emit(WindingEvent::StateChanged { from, to });
    }

    fn emit(&self, event: WindingEvent) {
        match &event {
            WindingEvent::LayerStarted { index } => {
                if let Some(l) = self.profile.layer(*index) {
                    info!(
                        layer = index,
                        angle = l.angle(),
                        passes = l.total_passes(),
                        "layer started"
                    );
                }
            }
            WindingEvent::PassCompleted {
                layer,
                completed,
                total,
            } => debug!(layer, completed, total, "pass completed"),
            WindingEvent::Complete => info!("all layers complete"),
            WindingEvent::StateChanged { .. } | WindingEvent::StartRefused { .. } => {}
        }
        if let Some(tx) = &self.events {
            match tx.try_send(event) {
                Ok(()) => {}
                Err(TrySendError::Full(ev)) => trace!(kind = ev.kind(), "event dropped: sink full"),
                Err(TrySendError::Disconnected(_)) => {}
            }
        }
    }
}
