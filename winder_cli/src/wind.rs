//! Winding job: config mapping, hardware assembly, and job execution.

use std::io::BufRead;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crossbeam_channel::{Receiver, Sender};
use eyre::WrapErr;
use serde_json::json;
use winder_core::error::{Result as CoreResult, WinderError};
use winder_core::runner::{Command, RunParams, RunSummary};
use winder_core::{DriveTrain, DynController, MotionCfg, WindProfile, WindingController, WindingEvent};
use winder_traits::{Axis, Clock, HomeSensor};

use crate::cli::{LAST_LIMITS, RunLimits};
use crate::error_fmt::abort_reason_name;
use crate::rt::{RtOpts, setup_rt_once};

/// Events buffered between the control loop and the printer thread.
const EVENT_BUFFER: usize = 1024;

pub struct WindOpts {
    pub max_ticks: Option<u64>,
    pub interactive: bool,
    pub rt: Option<RtOpts>,
}

/// Profile from the config, with table errors surfacing as configuration errors.
pub fn profile_from_config(cfg: &winder_config::Config) -> CoreResult<WindProfile> {
    WindProfile::try_from(&cfg.profile).map_err(|e| match e {
        WinderError::Capacity(n) => eyre::Report::new(WinderError::Config(format!(
            "profile holds more than {n} layers"
        ))),
        other => eyre::Report::new(other),
    })
}

/// Axes, home sensor, and the clock driving them.
struct Machine {
    mandrel: Box<dyn Axis>,
    carriage: Box<dyn Axis>,
    home: Box<dyn HomeSensor>,
    clock: Arc<dyn Clock + Send + Sync>,
    /// Pause between control ticks.
    tick: Duration,
}

#[cfg(not(feature = "hardware"))]
fn assemble(cfg: &winder_config::Config, drive: &DriveTrain) -> CoreResult<Machine> {
    use winder_hardware::{SimulatedAxis, SimulatedHome};

    // Virtual time: the runner's inter-tick sleep advances the simulation.
    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(winder_traits::ManualClock::new());
    let start_steps = (cfg.sim.carriage_start_mm * drive.carriage_steps_per_mm).round() as i64;
    let mandrel = SimulatedAxis::new(clock.clone());
    let carriage = SimulatedAxis::with_position(clock.clone(), start_steps);
    let home = SimulatedHome::tracking(carriage.position_handle(), 0);
    tracing::info!(start_steps, tick_us = cfg.sim.tick_us, "simulated machine ready");
    Ok(Machine {
        mandrel: Box::new(mandrel),
        carriage: Box::new(carriage),
        home: Box::new(home),
        clock,
        tick: Duration::from_micros(cfg.sim.tick_us),
    })
}

#[cfg(feature = "hardware")]
fn assemble(cfg: &winder_config::Config, _drive: &DriveTrain) -> CoreResult<Machine> {
    use winder_core::hw_error::map_hw_error;
    use winder_hardware::gpio::{GpioAxis, GpioHomeSwitch};

    let p = &cfg.pins;
    let hw = |e: winder_hardware::error::HwError| eyre::Report::new(map_hw_error(&e));
    let mandrel = GpioAxis::new(p.mandrel_step, p.mandrel_dir, p.mandrel_en)
        .map_err(hw)
        .wrap_err("open mandrel pins")?;
    let carriage = GpioAxis::new(p.carriage_step, p.carriage_dir, p.carriage_en)
        .map_err(hw)
        .wrap_err("open carriage pins")?;
    let home = GpioHomeSwitch::new(p.home_switch, cfg.home.active_low)
        .map_err(hw)
        .wrap_err("open home switch")?;
    Ok(Machine {
        mandrel: Box::new(mandrel),
        carriage: Box::new(carriage),
        home: Box::new(home),
        clock: Arc::new(winder_traits::MonotonicClock::new()),
        // Free-running: the step planners decide when a step is due.
        tick: Duration::ZERO,
    })
}

/// Parse one operator line from stdin.
pub fn parse_command(line: &str) -> Option<Command> {
    match line.trim().to_ascii_lowercase().as_str() {
        "p" | "pause" => Some(Command::Pause),
        "r" | "resume" => Some(Command::Resume),
        "a" | "abort" | "q" | "quit" => Some(Command::Abort),
        _ => None,
    }
}

fn spawn_stdin_commands(tx: Sender<Command>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            match parse_command(&line) {
                Some(cmd) => {
                    if tx.send(cmd).is_err() {
                        break;
                    }
                }
                None => eprintln!("unknown command {line:?} (pause | resume | abort)"),
            }
        }
    });
}

/// One line per event, text or JSON.
pub fn render_event(ev: &WindingEvent, json_mode: bool) -> String {
    if json_mode {
        let v = match ev {
            WindingEvent::StateChanged { from, to } => {
                json!({ "event": ev.kind(), "from": from.name(), "to": to.name() })
            }
            WindingEvent::LayerStarted { index } => json!({ "event": ev.kind(), "layer": index + 1 }),
            WindingEvent::PassCompleted {
                layer,
                completed,
                total,
            } => json!({
                "event": ev.kind(),
                "layer": layer + 1,
                "completed": completed,
                "total": total,
            }),
            WindingEvent::StartRefused { reason } => {
                json!({ "event": ev.kind(), "reason": reason })
            }
            WindingEvent::Complete => json!({ "event": ev.kind() }),
        };
        return v.to_string();
    }
    match ev {
        WindingEvent::StateChanged { from, to } => format!("state: {from} -> {to}"),
        WindingEvent::LayerStarted { index } => format!("layer {} started", index + 1),
        WindingEvent::PassCompleted {
            layer,
            completed,
            total,
        } => format!("layer {}: pass {completed}/{total}", layer + 1),
        WindingEvent::StartRefused { reason } => format!("start refused: {reason}"),
        WindingEvent::Complete => "all layers complete".to_string(),
    }
}

fn spawn_printer(rx: Receiver<WindingEvent>, json_mode: bool) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        for ev in rx.iter() {
            println!("{}", render_event(&ev, json_mode));
        }
    })
}

fn unix_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Final JSON line for a job, successful or not.
fn summary_json(
    result: &CoreResult<RunSummary>,
    layers: usize,
    passes: u32,
    elapsed: Duration,
) -> serde_json::Value {
    let (status, ticks, abort) = match result {
        Ok(s) => ("complete", Some(s.ticks), None),
        Err(e) => match e.downcast_ref::<WinderError>() {
            Some(WinderError::Abort(r)) => ("aborted", None, Some(abort_reason_name(r))),
            _ => ("failed", None, Some("Error")),
        },
    };
    json!({
        "timestamp": unix_ms(),
        "status": status,
        "layers": layers,
        "passes": passes,
        "ticks": ticks,
        "duration_ms": elapsed.as_millis() as u64,
        "abort_reason": abort,
    })
}

pub fn run_wind(
    cfg: &winder_config::Config,
    opts: &WindOpts,
    json_mode: bool,
    shutdown: &AtomicBool,
) -> CoreResult<RunSummary> {
    if let Some(rt) = opts.rt {
        setup_rt_once(rt);
    }

    let drive = DriveTrain::from(cfg);
    let motion = MotionCfg::from(&cfg.motion);
    let profile = profile_from_config(cfg)?;
    let machine = assemble(cfg, &drive)?;

    let max_ticks = opts.max_ticks.or(cfg.runner.max_ticks);
    let _ = LAST_LIMITS.set(RunLimits {
        max_ticks,
        tick_us: machine.tick.as_micros() as u64,
    });
    let params = RunParams {
        tick: machine.tick,
        max_ticks,
        clock: machine.clock,
    };

    let (ev_tx, ev_rx) = crossbeam_channel::bounded(EVENT_BUFFER);
    let printer = spawn_printer(ev_rx, json_mode);
    let (cmd_tx, cmd_rx) = crossbeam_channel::unbounded();
    if opts.interactive {
        spawn_stdin_commands(cmd_tx);
    } else {
        drop(cmd_tx);
    }

    let mut ctrl: DynController = WindingController::builder()
        .with_mandrel(machine.mandrel)
        .with_carriage(machine.carriage)
        .with_home(machine.home)
        .with_drive_train(drive)
        .with_motion(motion)
        .with_profile(profile)
        .with_events(ev_tx)
        .try_build()?;

    tracing::info!(
        layers = ctrl.profile().len(),
        carriage_steps_per_mm = drive.carriage_steps_per_mm,
        mandrel_steps_per_rev = drive.mandrel_steps_per_rev,
        ?max_ticks,
        "wind start"
    );
    let started = Instant::now();
    let result = winder_core::runner::run(&mut ctrl, &params, &cmd_rx, shutdown);
    let (layers, passes) = (ctrl.profile().len(), ctrl.profile().passes_completed());

    // Dropping the controller closes the event channel and ends the printer.
    drop(ctrl);
    if printer.join().is_err() {
        tracing::warn!("event printer panicked");
    }

    let elapsed = started.elapsed();
    if json_mode {
        println!("{}", summary_json(&result, layers, passes, elapsed));
    } else if let Ok(s) = &result {
        println!(
            "Winding complete: {} layer(s), {} passes, {} ticks in {:.1}s",
            s.layers,
            s.passes,
            s.ticks,
            elapsed.as_secs_f64()
        );
    }
    result.wrap_err("winding job")
}
