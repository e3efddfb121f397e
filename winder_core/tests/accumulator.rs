//! Gearing accumulator properties under arbitrary mandrel motion.

use std::collections::VecDeque;

use proptest::prelude::*;
use winder_core::mocks::{FlagHome, StepAxis};
use winder_core::{WindProfile, WindingController, WindingState};
use winder_traits::Axis;

type BoxErr = Box<dyn std::error::Error + Send + Sync>;

/// Mandrel that jumps by the next scripted delta on every `run_speed()`.
#[derive(Default)]
struct ScriptedMandrel {
    position: i64,
    script: VecDeque<i64>,
}

impl Axis for ScriptedMandrel {
    fn set_max_speed(&mut self, _: f64) -> Result<(), BoxErr> {
        Ok(())
    }
    fn set_acceleration(&mut self, _: f64) -> Result<(), BoxErr> {
        Ok(())
    }
    fn set_speed(&mut self, _: f64) -> Result<(), BoxErr> {
        Ok(())
    }
    fn run_speed(&mut self) -> Result<bool, BoxErr> {
        let d = self.script.pop_front().unwrap_or(0);
        self.position += d;
        Ok(d != 0)
    }
    fn move_relative(&mut self, _: i64) -> Result<(), BoxErr> {
        Ok(())
    }
    fn run(&mut self) -> Result<bool, BoxErr> {
        Ok(false)
    }
    fn current_position(&self) -> i64 {
        self.position
    }
    fn set_current_position(&mut self, position: i64) -> Result<(), BoxErr> {
        self.position = position;
        Ok(())
    }
    fn stop(&mut self) -> Result<(), BoxErr> {
        Ok(())
    }
}

proptest! {
    #[test]
    fn no_step_is_lost_or_invented(
        deltas in prop::collection::vec(-40i64..=40, 1..400),
        angle in 5.0f64..85.0,
        diameter in 5.0f64..200.0,
    ) {
        let mut profile = WindProfile::new(diameter);
        // Long enough that no endpoint is reached.
        profile.add_layer(1.0e6, angle, 0.0, 4.0, 0.0).unwrap();
        let mut ctrl = WindingController::builder()
            .with_mandrel(ScriptedMandrel {
                position: 0,
                script: deltas.iter().copied().collect(),
            })
            .with_carriage(StepAxis::new())
            .with_home(FlagHome::asserted())
            .with_profile(profile)
            .try_build()
            .unwrap();
        ctrl.start().unwrap();
        prop_assert_eq!(ctrl.update().unwrap(), WindingState::Winding);

        for _ in 0..deltas.len() {
            let s = ctrl.update().unwrap();
            prop_assert_eq!(s, WindingState::Winding);
            prop_assert!(ctrl.snapshot().accumulator.abs() < 1.0);
        }

        let ratio = ctrl.profile().layers()[0].step_ratio(ctrl.drive_train());
        let expected: f64 = deltas.iter().map(|d| *d as f64 * ratio).sum();
        let moved = ctrl.carriage().commanded_steps() as f64;
        let acc = ctrl.snapshot().accumulator;
        let scale: f64 = deltas.iter().map(|d| (*d as f64 * ratio).abs()).sum::<f64>().max(1.0);
        prop_assert!(
            (moved + acc - expected).abs() < 1e-9 * scale,
            "moved {} + acc {} != expected {}", moved, acc, expected
        );
        // Every relative move is a whole, non-zero step count.
        prop_assert!(ctrl.carriage().moves.iter().all(|m| *m != 0));
    }
}
