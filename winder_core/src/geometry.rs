//! Winding geometry: pure functions over a layer's parameters.
//!
//! Angles are fibre angles against the mandrel axis, in degrees. Near 0° the
//! carriage would have to travel infinitely far per revolution and near 90°
//! the pass count explodes, so every function clamps the angle into
//! [`MIN_ANGLE_DEG`, `MAX_ANGLE_DEG`] first. Degenerate inputs (no diameter,
//! no stepover) produce 0 rather than an error; callers treat 0 as "do not
//! move" and sanity-check implausible results before starting a job.

use std::f64::consts::PI;

pub const MIN_ANGLE_DEG: f64 = 1.0;
pub const MAX_ANGLE_DEG: f64 = 89.9;

/// Clamp a fibre angle into the numerically safe range. NaN maps to the lower bound.
#[inline]
pub fn clamp_angle(angle_deg: f64) -> f64 {
    if angle_deg.is_nan() {
        MIN_ANGLE_DEG
    } else {
        angle_deg.clamp(MIN_ANGLE_DEG, MAX_ANGLE_DEG)
    }
}

/// Carriage microsteps per mandrel microstep that hold `angle_deg`.
///
/// `ratio = (π·d / tan(angle)) · carriage_steps_per_mm / mandrel_steps_per_rev`
///
/// Returns 0 when `diameter_mm <= 0` or `mandrel_steps_per_rev <= 0`.
pub fn step_ratio(
    angle_deg: f64,
    diameter_mm: f64,
    carriage_steps_per_mm: f64,
    mandrel_steps_per_rev: f64,
) -> f64 {
    if !(diameter_mm > 0.0) || !(mandrel_steps_per_rev > 0.0) {
        return 0.0;
    }
    let a = clamp_angle(angle_deg).to_radians();
    let mm_per_mandrel_rev = PI * diameter_mm / a.tan();
    mm_per_mandrel_rev * carriage_steps_per_mm / mandrel_steps_per_rev
}

/// Mandrel rotation (degrees) that shifts the fibre by one stepover width.
///
/// Returns 0 when `diameter_mm <= 0`.
pub fn stepover_degrees(angle_deg: f64, diameter_mm: f64, stepover_mm: f64) -> f64 {
    if !(diameter_mm > 0.0) {
        return 0.0;
    }
    let a = clamp_angle(angle_deg).to_radians();
    (stepover_mm * 360.0) / (PI * diameter_mm * a.cos())
}

/// Passes needed to cover the circumference, rounded up to an even count so
/// the layer finishes on the side it started.
///
/// Returns 0 when `diameter_mm <= 0` or `stepover_mm <= 0`.
pub fn total_passes(angle_deg: f64, diameter_mm: f64, stepover_mm: f64) -> u32 {
    if !(diameter_mm > 0.0) || !(stepover_mm > 0.0) {
        return 0;
    }
    let a = clamp_angle(angle_deg).to_radians();
    let raw = (PI * diameter_mm * a.cos()) / stepover_mm;
    // ceil(raw / 2) · 2 is ceil(raw) rounded up to even. Absurd inputs stop
    // at the largest even u32 instead of saturating to an odd u32::MAX.
    let even = (raw / 2.0).ceil() * 2.0;
    even.min(f64::from(u32::MAX - 1)) as u32
}

/// Whole mandrel steps for a turnaround: `dwell + stepover rotation`,
/// truncated toward zero.
#[inline]
pub fn dwell_steps(dwell_deg: f64, stepover_deg: f64, mandrel_steps_per_rev: f64) -> i64 {
    (((dwell_deg + stepover_deg) / 360.0) * mandrel_steps_per_rev) as i64
}
