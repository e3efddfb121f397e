//! Step timing shared by every axis backend.
//!
//! `StepPlanner` decides *when* a step is due and in which direction; the
//! backend decides what a step physically is (bump a counter, pulse a pin).
//! Time is passed in as seconds since the backend's epoch so the planner
//! stays free of clocks and can be driven deterministically.

/// Direction of a single step: `1` or `-1`.
pub type StepDir = i64;

#[derive(Debug, Clone)]
pub struct StepPlanner {
    position: i64,
    target: i64,
    /// Signed constant speed for `poll_speed` (steps/s).
    speed: f64,
    max_speed: f64,
    acceleration: f64,
    /// Magnitude of the positioning speed reached so far (steps/s).
    velocity: f64,
    moving_dir: StepDir,
    last_speed_step_s: Option<f64>,
    last_move_step_s: Option<f64>,
}

impl Default for StepPlanner {
    fn default() -> Self {
        Self::new()
    }
}

impl StepPlanner {
    pub fn new() -> Self {
        Self {
            position: 0,
            target: 0,
            speed: 0.0,
            max_speed: 1000.0,
            acceleration: 0.0,
            velocity: 0.0,
            moving_dir: 0,
            last_speed_step_s: None,
            last_move_step_s: None,
        }
    }

    #[inline]
    pub fn position(&self) -> i64 {
        self.position
    }

    #[inline]
    pub fn target(&self) -> i64 {
        self.target
    }

    #[inline]
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Steps still owed to the positioning target.
    #[inline]
    pub fn distance_to_go(&self) -> i64 {
        self.target - self.position
    }

    pub fn set_max_speed(&mut self, steps_per_sec: f64) {
        self.max_speed = steps_per_sec.abs();
        self.speed = self.speed.clamp(-self.max_speed, self.max_speed);
        self.velocity = self.velocity.min(self.max_speed);
    }

    pub fn set_acceleration(&mut self, steps_per_sec2: f64) {
        self.acceleration = steps_per_sec2.abs();
    }

    /// Constant speed is capped by the max speed, like any other move.
    pub fn set_speed(&mut self, steps_per_sec: f64) {
        self.speed = steps_per_sec.clamp(-self.max_speed, self.max_speed);
        if self.speed == 0.0 {
            self.last_speed_step_s = None;
        }
    }

    pub fn move_relative(&mut self, steps: i64) {
        self.target = self.target.saturating_add(steps);
    }

    pub fn set_current_position(&mut self, position: i64) {
        self.position = position;
        self.target = position;
        self.halt();
    }

    pub fn stop(&mut self) {
        self.target = self.position;
        self.halt();
    }

    fn halt(&mut self) {
        self.velocity = 0.0;
        self.moving_dir = 0;
        self.last_move_step_s = None;
    }

    /// Constant-speed stepping. Returns the direction of the step taken, if any.
    pub fn poll_speed(&mut self, now_s: f64) -> Option<StepDir> {
        if self.speed == 0.0 {
            return None;
        }
        let interval = 1.0 / self.speed.abs();
        let next = match self.last_speed_step_s {
            None => now_s,
            Some(last) if now_s - last < interval => return None,
            // Keep the cadence unless we fell far behind, then resync.
            Some(last) if now_s - last < 2.0 * interval => last + interval,
            Some(_) => now_s,
        };
        self.last_speed_step_s = Some(next);
        let dir = if self.speed > 0.0 { 1 } else { -1 };
        self.position += dir;
        Some(dir)
    }

    /// Acceleration-profiled stepping toward the target.
    pub fn poll_position(&mut self, now_s: f64) -> Option<StepDir> {
        let distance = self.distance_to_go();
        if distance == 0 {
            self.halt();
            return None;
        }
        if self.max_speed <= 0.0 {
            return None;
        }
        let dir = distance.signum();
        if self.velocity <= 0.0 || self.moving_dir != dir {
            // Simplified reversal: restart from the initial speed without braking.
            self.velocity = self.start_speed();
            self.moving_dir = dir;
            self.last_move_step_s = None;
        }
        let interval = 1.0 / self.velocity;
        if let Some(last) = self.last_move_step_s
            && now_s - last < interval
        {
            return None;
        }
        self.position += dir;
        self.last_move_step_s = Some(now_s);

        if self.acceleration > 0.0 {
            let remaining = self.distance_to_go().unsigned_abs() as f64;
            let stopping = self.velocity * self.velocity / (2.0 * self.acceleration);
            let dv = self.acceleration * interval;
            self.velocity = if remaining <= stopping {
                (self.velocity - dv).max(self.start_speed())
            } else {
                (self.velocity + dv).min(self.max_speed)
            };
        }
        Some(dir)
    }

    fn start_speed(&self) -> f64 {
        if self.acceleration > 0.0 {
            (2.0 * self.acceleration).sqrt().min(self.max_speed)
        } else {
            self.max_speed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_speed_steps_at_cadence() {
        let mut p = StepPlanner::new();
        p.set_speed(100.0); // 10 ms per step
        let mut steps: i64 = 0;
        for i in 0..=100 {
            let t = f64::from(i) * 0.001;
            if p.poll_speed(t).is_some() {
                steps += 1;
            }
        }
        // First step at t=0, then one every 10 ms; the last one may land on the edge.
        assert!((10..=11).contains(&steps), "steps = {steps}");
        assert_eq!(p.position(), steps);
    }

    #[test]
    fn negative_speed_steps_backward() {
        let mut p = StepPlanner::new();
        p.set_speed(-50.0);
        assert_eq!(p.poll_speed(0.0), Some(-1));
        assert_eq!(p.position(), -1);
    }

    #[test]
    fn speed_is_capped_by_max_speed() {
        let mut p = StepPlanner::new();
        p.set_max_speed(200.0);
        p.set_speed(-5000.0);
        assert_eq!(p.speed(), -200.0);
    }

    #[test]
    fn zero_speed_never_steps() {
        let mut p = StepPlanner::new();
        p.set_speed(0.0);
        assert_eq!(p.poll_speed(10.0), None);
    }

    #[test]
    fn positioning_reaches_target_and_stops() {
        let mut p = StepPlanner::new();
        p.set_max_speed(1000.0);
        p.set_acceleration(5000.0);
        p.move_relative(40);
        let mut t = 0.0;
        while p.distance_to_go() != 0 && t < 5.0 {
            p.poll_position(t);
            t += 0.0001;
        }
        assert_eq!(p.position(), 40);
        assert_eq!(p.poll_position(t), None);
    }

    #[test]
    fn move_relative_accumulates_on_target() {
        let mut p = StepPlanner::new();
        p.move_relative(3);
        p.move_relative(-1);
        p.move_relative(5);
        assert_eq!(p.target(), 7);
        assert_eq!(p.position(), 0);
    }

    #[test]
    fn stop_collapses_target() {
        let mut p = StepPlanner::new();
        p.move_relative(100);
        p.poll_position(0.0);
        p.stop();
        assert_eq!(p.distance_to_go(), 0);
        assert_eq!(p.target(), p.position());
    }

    #[test]
    fn set_current_position_reanchors() {
        let mut p = StepPlanner::new();
        p.move_relative(10);
        p.set_current_position(0);
        assert_eq!(p.target(), 0);
        assert_eq!(p.position(), 0);
    }
}
