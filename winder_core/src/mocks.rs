//! Deterministic collaborators for tests and benches.
//!
//! `StepAxis` takes exactly one step per poll whenever one is owed, so a test
//! controls motion purely by counting `update()` calls.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use winder_traits::{Axis, HomeSensor};

/// Recording axis: one step per `run_speed()` while the speed is non-zero,
/// one step per `run()` toward the target.
#[derive(Debug, Default, Clone)]
pub struct StepAxis {
    pub position: i64,
    pub target: i64,
    pub speed: f64,
    pub max_speed: f64,
    pub acceleration: f64,
    /// Every `set_speed` argument, in order.
    pub speed_log: Vec<f64>,
    /// Every `move_relative` argument, in order.
    pub moves: Vec<i64>,
    pub stops: u32,
    /// Fail every `run_speed()` call once set.
    pub fail_run_speed: bool,
}

impl StepAxis {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(position: i64) -> Self {
        Self {
            position,
            target: position,
            ..Self::default()
        }
    }

    /// How many times a zero speed was commanded.
    pub fn zero_speed_commands(&self) -> usize {
        self.speed_log.iter().filter(|s| **s == 0.0).count()
    }

    /// Sum of all relative moves issued.
    pub fn commanded_steps(&self) -> i64 {
        self.moves.iter().sum()
    }
}

impl Axis for StepAxis {
    fn set_max_speed(
        &mut self,
        steps_per_sec: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.max_speed = steps_per_sec;
        Ok(())
    }

    fn set_acceleration(
        &mut self,
        steps_per_sec2: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.acceleration = steps_per_sec2;
        Ok(())
    }

    fn set_speed(
        &mut self,
        steps_per_sec: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.speed = steps_per_sec;
        self.speed_log.push(steps_per_sec);
        Ok(())
    }

    fn run_speed(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        if self.fail_run_speed {
            return Err(Box::new(std::io::Error::other("step driver not responding")));
        }
        if self.speed > 0.0 {
            self.position += 1;
            Ok(true)
        } else if self.speed < 0.0 {
            self.position -= 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn move_relative(&mut self, steps: i64) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.target += steps;
        self.moves.push(steps);
        Ok(())
    }

    fn run(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let d = (self.target - self.position).signum();
        self.position += d;
        Ok(d != 0)
    }

    fn current_position(&self) -> i64 {
        self.position
    }

    fn set_current_position(
        &mut self,
        position: i64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.position = position;
        self.target = position;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.target = self.position;
        self.stops += 1;
        Ok(())
    }
}

/// Home switch driven by a shared flag, optionally closing by itself after a
/// number of reads.
#[derive(Debug, Clone, Default)]
pub struct FlagHome {
    flag: Arc<AtomicBool>,
    close_after: Option<u32>,
    reads: u32,
}

impl FlagHome {
    /// Switch already closed: homing finishes on the first tick.
    pub fn asserted() -> Self {
        let h = Self::default();
        h.flag.store(true, Ordering::Relaxed);
        h
    }

    /// Open until `n` reads have happened, closed from read `n + 1` on.
    pub fn after_reads(n: u32) -> Self {
        Self {
            close_after: Some(n),
            ..Self::default()
        }
    }

    /// Handle for flipping the switch from the test.
    pub fn handle(&self) -> Arc<AtomicBool> {
        self.flag.clone()
    }

    pub fn reads(&self) -> u32 {
        self.reads
    }
}

impl HomeSensor for FlagHome {
    fn is_home(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        self.reads += 1;
        if let Some(n) = self.close_after
            && self.reads > n
        {
            self.flag.store(true, Ordering::Relaxed);
        }
        Ok(self.flag.load(Ordering::Relaxed))
    }
}
