use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use crossbeam_channel::unbounded;
use rstest::{fixture, rstest};
use winder_core::runner::{Command, RunParams, run};
use winder_core::{AbortReason, WinderError, WindProfile, WindingController, WindingState};
use winder_hardware::{SimulatedAxis, SimulatedHome};
use winder_traits::{Axis, ManualClock};

type SimController = WindingController<SimulatedAxis, SimulatedAxis, SimulatedHome>;

struct Rig {
    clock: ManualClock,
    ctrl: SimController,
}

impl Rig {
    fn params(&self, max_ticks: Option<u64>) -> RunParams {
        RunParams {
            tick: Duration::from_micros(100),
            max_ticks,
            clock: Arc::new(self.clock.clone()),
        }
    }
}

/// 2 mm zone starting 0.5 mm from home on a 10 mm mandrel: 6 passes.
fn profile() -> WindProfile {
    let mut p = WindProfile::new(10.0);
    p.add_layer(2.0, 45.0, 0.5, 5.0, 0.0).unwrap();
    p
}

#[fixture]
fn rig() -> Rig {
    let clock = ManualClock::new();
    let shared: Arc<dyn winder_traits::Clock + Send + Sync> = Arc::new(clock.clone());
    let mandrel = SimulatedAxis::new(shared.clone());
    // Carriage parked 1 mm away from the switch.
    let carriage = SimulatedAxis::with_position(shared, 20);
    let home = SimulatedHome::tracking(carriage.position_handle(), 0);
    let ctrl = WindingController::builder()
        .with_mandrel(mandrel)
        .with_carriage(carriage)
        .with_home(home)
        .with_profile(profile())
        .try_build()
        .unwrap();
    Rig { clock, ctrl }
}

fn abort_reason(err: &eyre::Report) -> Option<AbortReason> {
    match err.downcast_ref::<WinderError>() {
        Some(WinderError::Abort(r)) => Some(*r),
        _ => None,
    }
}

#[rstest]
fn simulated_job_runs_to_completion(mut rig: Rig) {
    let (_tx, rx) = unbounded();
    let stop = AtomicBool::new(false);
    let params = rig.params(Some(1_000_000));

    let summary = run(&mut rig.ctrl, &params, &rx, &stop).unwrap();

    assert_eq!(rig.ctrl.state(), WindingState::Complete);
    assert_eq!(summary.layers, 1);
    assert_eq!(summary.passes, 6);
    // Even pass count: the carriage ends on the home side of the zone.
    assert_eq!(rig.ctrl.carriage().current_position(), 10);
    assert!(rig.ctrl.mandrel().steps_taken() > 0);
    assert!(rig.clock.elapsed() >= Duration::from_secs(5));
}

#[rstest]
fn tick_budget_aborts_and_halts(mut rig: Rig) {
    let (_tx, rx) = unbounded();
    let stop = AtomicBool::new(false);
    let params = rig.params(Some(2_000));

    let err = run(&mut rig.ctrl, &params, &rx, &stop).unwrap_err();
    assert_eq!(abort_reason(&err), Some(AbortReason::TickLimit));
    assert_eq!(rig.ctrl.state(), WindingState::Idle);
    let carriage = rig.ctrl.carriage();
    assert_eq!(carriage.target(), carriage.current_position());
}

#[rstest]
fn shutdown_flag_aborts_before_the_first_tick(mut rig: Rig) {
    let (_tx, rx) = unbounded();
    let stop = AtomicBool::new(true);
    let params = rig.params(None);

    let err = run(&mut rig.ctrl, &params, &rx, &stop).unwrap_err();
    assert_eq!(abort_reason(&err), Some(AbortReason::Shutdown));
    assert_eq!(rig.ctrl.state(), WindingState::Idle);
    assert_eq!(rig.ctrl.carriage().steps_taken(), 0);
}

#[rstest]
fn paused_job_holds_still_until_the_budget_runs_out(mut rig: Rig) {
    let (tx, rx) = unbounded();
    tx.send(Command::Pause).unwrap();
    let stop = AtomicBool::new(false);
    let params = rig.params(Some(500));

    let err = run(&mut rig.ctrl, &params, &rx, &stop).unwrap_err();
    assert_eq!(abort_reason(&err), Some(AbortReason::TickLimit));
    assert_eq!(rig.ctrl.mandrel().steps_taken(), 0);
    assert_eq!(rig.ctrl.carriage().steps_taken(), 0);
    assert_eq!(rig.ctrl.carriage().current_position(), 20);
}

#[rstest]
fn pause_then_resume_still_completes(mut rig: Rig) {
    let (tx, rx) = unbounded();
    tx.send(Command::Pause).unwrap();
    tx.send(Command::Resume).unwrap();
    let stop = AtomicBool::new(false);
    let params = rig.params(Some(1_000_000));

    let summary = run(&mut rig.ctrl, &params, &rx, &stop).unwrap();
    assert_eq!(summary.passes, 6);
}

#[rstest]
fn operator_abort_is_reported(mut rig: Rig) {
    let (tx, rx) = unbounded();
    tx.send(Command::Abort).unwrap();
    let stop = AtomicBool::new(false);
    let params = rig.params(None);

    let err = run(&mut rig.ctrl, &params, &rx, &stop).unwrap_err();
    assert_eq!(abort_reason(&err), Some(AbortReason::Operator));
    assert_eq!(rig.ctrl.state(), WindingState::Idle);
}

#[rstest]
fn invalid_profile_never_starts(mut rig: Rig) {
    rig.ctrl.profile_mut().unwrap().clear();
    let (_tx, rx) = unbounded();
    let stop = AtomicBool::new(false);
    let params = rig.params(Some(10));

    let err = run(&mut rig.ctrl, &params, &rx, &stop).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<WinderError>(),
        Some(WinderError::Config(_))
    ));
    assert_eq!(rig.ctrl.state(), WindingState::Idle);
}
