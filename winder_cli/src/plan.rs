//! `plan` and `self-check`: inspect a profile and the machine constants
//! without moving anything.

use serde_json::json;
use winder_core::error::Result as CoreResult;
use winder_core::{DriveTrain, LayerPlan};

use crate::wind::profile_from_config;

/// Above this a layer is almost certainly mistyped (stepover in µm, diameter in µm, ...).
const MAX_PLAUSIBLE_PASSES: u32 = 10_000;

pub fn plan_warnings(p: &LayerPlan) -> Vec<String> {
    let mut w = Vec::new();
    if p.total_passes == 0 {
        w.push("zero passes: the layer finishes without winding".to_string());
    } else if p.total_passes > MAX_PLAUSIBLE_PASSES {
        w.push(format!(
            "{} passes is implausible; check stepover and mandrel diameter",
            p.total_passes
        ));
    }
    if p.step_ratio == 0.0 {
        w.push("gearing ratio is zero: the carriage will not move".to_string());
    }
    w
}

pub fn run_plan(cfg: &winder_config::Config, json_mode: bool) -> CoreResult<()> {
    let drive = DriveTrain::from(cfg);
    let profile = profile_from_config(cfg)?;
    let plan = profile.plan(&drive);

    if plan.is_empty() {
        tracing::warn!("profile has no layers");
    }
    if json_mode {
        for p in &plan {
            println!(
                "{}",
                json!({
                    "layer": p.index + 1,
                    "total_passes": p.total_passes,
                    "step_ratio": p.step_ratio,
                    "stepover_degrees": p.stepover_degrees,
                    "dwell_steps": p.dwell_steps,
                    "warnings": plan_warnings(p),
                })
            );
        }
        return Ok(());
    }

    println!(
        "Mandrel diameter {:.2} mm, {} layer(s)",
        profile.mandrel_diameter(),
        plan.len()
    );
    println!(
        "{:>5} {:>7} {:>12} {:>12} {:>11}",
        "layer", "passes", "ratio", "stepover°", "dwell_steps"
    );
    for p in &plan {
        println!(
            "{:>5} {:>7} {:>12.6} {:>12.3} {:>11}",
            p.index + 1,
            p.total_passes,
            p.step_ratio,
            p.stepover_degrees,
            p.dwell_steps
        );
        for w in plan_warnings(p) {
            println!("      warning: {w}");
        }
    }
    Ok(())
}

pub fn run_self_check(cfg: &winder_config::Config, json_mode: bool) -> CoreResult<()> {
    let drive = DriveTrain::from(cfg);
    let profile = profile_from_config(cfg)?;
    let home = probe_home(cfg)?;
    let backend = if cfg!(feature = "hardware") {
        "gpio"
    } else {
        "simulation"
    };

    if json_mode {
        println!(
            "{}",
            json!({
                "status": "ok",
                "backend": backend,
                "carriage_steps_per_mm": drive.carriage_steps_per_mm,
                "mandrel_steps_per_rev": drive.mandrel_steps_per_rev,
                "layers": profile.len(),
                "mandrel_diameter": profile.mandrel_diameter(),
                "home_asserted": home,
            })
        );
    } else {
        println!("Config OK ({backend})");
        println!("  carriage: {:.3} steps/mm", drive.carriage_steps_per_mm);
        println!("  mandrel:  {:.1} steps/rev", drive.mandrel_steps_per_rev);
        println!(
            "  profile:  {} layer(s) on a {:.2} mm mandrel",
            profile.len(),
            profile.mandrel_diameter()
        );
        if let Some(h) = home {
            println!("  home switch: {}", if h { "closed" } else { "open" });
        }
    }
    Ok(())
}

/// Read the home switch once on real hardware; `None` in simulation.
#[cfg(feature = "hardware")]
fn probe_home(cfg: &winder_config::Config) -> CoreResult<Option<bool>> {
    use eyre::WrapErr;
    use winder_core::hw_error::map_hw_error;
    use winder_traits::HomeSensor;

    let mut sw = winder_hardware::gpio::GpioHomeSwitch::new(cfg.pins.home_switch, cfg.home.active_low)
        .map_err(|e| eyre::Report::new(map_hw_error(&e)))
        .wrap_err("open home switch")?;
    let closed = sw
        .is_home()
        .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
        .wrap_err("read home switch")?;
    Ok(Some(closed))
}

#[cfg(not(feature = "hardware"))]
fn probe_home(_cfg: &winder_config::Config) -> CoreResult<Option<bool>> {
    Ok(None)
}
