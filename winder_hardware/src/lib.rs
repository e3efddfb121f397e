pub mod error;
#[cfg(feature = "hardware")]
pub mod gpio;
pub mod motion;

use crate::error::HwError;
use crate::motion::StepPlanner;
use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;
use winder_traits::{Axis, Clock, HomeSensor};

/// Simulated stepper axis.
///
/// Steps happen when the injected clock says they are due, so a
/// `ManualClock` gives a fully deterministic machine. The position is
/// mirrored into a shared cell for observers such as `SimulatedHome`.
pub struct SimulatedAxis {
    planner: StepPlanner,
    clock: Arc<dyn Clock + Send + Sync>,
    epoch: Instant,
    position: Rc<Cell<i64>>,
    steps_taken: u64,
}

impl SimulatedAxis {
    pub fn new(clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self::with_position(clock, 0)
    }

    /// Start somewhere other than zero, e.g. a carriage left away from home.
    pub fn with_position(clock: Arc<dyn Clock + Send + Sync>, position: i64) -> Self {
        let mut planner = StepPlanner::new();
        planner.set_current_position(position);
        let epoch = clock.now();
        SimulatedAxis {
            planner,
            clock,
            epoch,
            position: Rc::new(Cell::new(position)),
            steps_taken: 0,
        }
    }

    /// Shared view of the axis position.
    pub fn position_handle(&self) -> Rc<Cell<i64>> {
        self.position.clone()
    }

    /// Total physical steps taken in either direction.
    pub fn steps_taken(&self) -> u64 {
        self.steps_taken
    }

    pub fn target(&self) -> i64 {
        self.planner.target()
    }

    fn now_s(&self) -> f64 {
        self.clock
            .now()
            .saturating_duration_since(self.epoch)
            .as_secs_f64()
    }

    fn record(&mut self, stepped: Option<i64>) -> bool {
        match stepped {
            Some(_) => {
                self.steps_taken += 1;
                self.position.set(self.planner.position());
                true
            }
            None => false,
        }
    }
}

fn finite(v: f64, what: &'static str) -> Result<f64, HwError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(HwError::InvalidParameter(what))
    }
}

impl Axis for SimulatedAxis {
    fn set_max_speed(
        &mut self,
        steps_per_sec: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.planner
            .set_max_speed(finite(steps_per_sec, "max speed must be finite")?);
        Ok(())
    }

    fn set_acceleration(
        &mut self,
        steps_per_sec2: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.planner
            .set_acceleration(finite(steps_per_sec2, "acceleration must be finite")?);
        Ok(())
    }

    fn set_speed(
        &mut self,
        steps_per_sec: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.planner
            .set_speed(finite(steps_per_sec, "speed must be finite")?);
        Ok(())
    }

    fn run_speed(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let now = self.now_s();
        let stepped = self.planner.poll_speed(now);
        Ok(self.record(stepped))
    }

    fn move_relative(&mut self, steps: i64) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.planner.move_relative(steps);
        Ok(())
    }

    fn run(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let now = self.now_s();
        let stepped = self.planner.poll_position(now);
        Ok(self.record(stepped))
    }

    fn current_position(&self) -> i64 {
        self.planner.position()
    }

    fn set_current_position(
        &mut self,
        position: i64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.planner.set_current_position(position);
        self.position.set(position);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.planner.stop();
        Ok(())
    }
}

/// Simulated limit switch that closes once the watched axis reaches `home_at`
/// or anything below it.
///
/// The watched cell follows `set_current_position`, so after the carriage is
/// zeroed on the switch the threshold is compared against the re-zeroed
/// position. With `home_at = 0` the switch stays closed at the new origin.
pub struct SimulatedHome {
    position: Rc<Cell<i64>>,
    home_at: i64,
    reads: u64,
}

impl SimulatedHome {
    pub fn tracking(position: Rc<Cell<i64>>, home_at: i64) -> Self {
        SimulatedHome {
            position,
            home_at,
            reads: 0,
        }
    }

    pub fn reads(&self) -> u64 {
        self.reads
    }
}

impl HomeSensor for SimulatedHome {
    fn is_home(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        self.reads += 1;
        let hit = self.position.get() <= self.home_at;
        if hit {
            tracing::trace!(position = self.position.get(), "simulated home switch closed");
        }
        Ok(hit)
    }
}
