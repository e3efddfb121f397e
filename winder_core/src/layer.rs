//! One helical winding zone plus its pass progress.

use crate::config::DriveTrain;
use crate::geometry;

/// Carriage travel direction for the current pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Away from home, toward `offset + length`.
    #[default]
    Forward,
    /// Back toward `offset`.
    Return,
}

impl Direction {
    #[inline]
    pub fn flipped(self) -> Self {
        match self {
            Direction::Forward => Direction::Return,
            Direction::Return => Direction::Forward,
        }
    }

    /// +1.0 forward, -1.0 on the return pass.
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            Direction::Forward => 1.0,
            Direction::Return => -1.0,
        }
    }
}

/// A winding layer. `total_passes` is kept in step with the geometry: every
/// setter that affects it recomputes it immediately.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    length: f64,
    angle: f64,
    offset: f64,
    stepover: f64,
    dwell: f64,
    diameter: f64,
    total_passes: u32,
    passes_completed: u32,
    direction: Direction,
}

impl Layer {
    /// Lengths in mm, angles in degrees.
    pub fn new(
        length: f64,
        angle: f64,
        offset: f64,
        stepover: f64,
        dwell: f64,
        diameter: f64,
    ) -> Self {
        let mut layer = Self {
            length,
            angle,
            offset,
            stepover,
            dwell,
            diameter,
            total_passes: 0,
            passes_completed: 0,
            direction: Direction::Forward,
        };
        layer.recalc_passes();
        layer
    }

    fn recalc_passes(&mut self) {
        self.total_passes = geometry::total_passes(self.angle, self.diameter, self.stepover);
    }

    pub fn length(&self) -> f64 {
        self.length
    }
    pub fn angle(&self) -> f64 {
        self.angle
    }
    pub fn offset(&self) -> f64 {
        self.offset
    }
    pub fn stepover(&self) -> f64 {
        self.stepover
    }
    pub fn dwell(&self) -> f64 {
        self.dwell
    }
    pub fn diameter(&self) -> f64 {
        self.diameter
    }
    pub fn total_passes(&self) -> u32 {
        self.total_passes
    }
    pub fn passes_completed(&self) -> u32 {
        self.passes_completed
    }
    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn set_length(&mut self, length: f64) {
        self.length = length;
        self.recalc_passes();
    }
    pub fn set_angle(&mut self, angle: f64) {
        self.angle = angle;
        self.recalc_passes();
    }
    pub fn set_offset(&mut self, offset: f64) {
        self.offset = offset;
    }
    pub fn set_stepover(&mut self, stepover: f64) {
        self.stepover = stepover;
        self.recalc_passes();
    }
    pub fn set_dwell(&mut self, dwell: f64) {
        self.dwell = dwell;
    }
    pub fn set_diameter(&mut self, diameter: f64) {
        self.diameter = diameter;
        self.recalc_passes();
    }

    /// Gearing ratio for this layer on the given drive train.
    pub fn step_ratio(&self, drive: &DriveTrain) -> f64 {
        geometry::step_ratio(
            self.angle,
            self.diameter,
            drive.carriage_steps_per_mm,
            drive.mandrel_steps_per_rev,
        )
    }

    pub fn stepover_degrees(&self) -> f64 {
        geometry::stepover_degrees(self.angle, self.diameter, self.stepover)
    }

    /// Mandrel steps to rotate at each turnaround.
    pub fn dwell_steps(&self, drive: &DriveTrain) -> i64 {
        geometry::dwell_steps(
            self.dwell,
            self.stepover_degrees(),
            drive.mandrel_steps_per_rev,
        )
    }

    /// Carriage position (mm from home) that ends the current pass.
    pub fn target_endpoint(&self) -> f64 {
        match self.direction {
            Direction::Forward => self.offset + self.length,
            Direction::Return => self.offset,
        }
    }

    /// Record a finished pass and reverse. Completion is the caller's check.
    pub fn count_pass(&mut self) {
        self.passes_completed = self.passes_completed.saturating_add(1);
        self.direction = self.direction.flipped();
    }

    pub fn reset_progress(&mut self) {
        self.passes_completed = 0;
        self.direction = Direction::Forward;
    }

    pub fn is_done(&self) -> bool {
        self.passes_completed >= self.total_passes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_follows_direction() {
        let mut l = Layer::new(200.0, 45.0, 10.0, 4.0, 0.0, 50.0);
        assert_eq!(l.target_endpoint(), 210.0);
        l.count_pass();
        assert_eq!(l.direction(), Direction::Return);
        assert_eq!(l.target_endpoint(), 10.0);
    }

    #[test]
    fn setters_keep_passes_current() {
        let mut l = Layer::new(200.0, 45.0, 0.0, 4.0, 0.0, 50.0);
        assert_eq!(l.total_passes(), 28);
        l.set_stepover(0.0);
        assert_eq!(l.total_passes(), 0);
        l.set_stepover(4.0);
        l.set_diameter(0.0);
        assert_eq!(l.total_passes(), 0);
        l.set_diameter(50.0);
        l.set_angle(89.9);
        assert!(l.total_passes() < 28);
    }

    #[test]
    fn offset_and_dwell_do_not_touch_passes() {
        let mut l = Layer::new(200.0, 45.0, 0.0, 4.0, 0.0, 50.0);
        l.set_offset(30.0);
        l.set_dwell(90.0);
        assert_eq!(l.total_passes(), 28);
    }
}
