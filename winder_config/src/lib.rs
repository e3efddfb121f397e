#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and layer-table parsing for the winder.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Every section has defaults matching the reference machine, so a config
//!   file only needs to say what differs (usually just `[profile]`).
//! - The layer table can come from `[[profile.layers]]` or from a CSV file
//!   with strict headers.
use serde::Deserialize;

/// Most layers a single profile may carry.
pub const MAX_PROFILE_LAYERS: usize = 10;

/// One row of a layer table, in TOML or CSV.
///
/// CSV headers (exact, in order):
/// length,angle,offset,stepover,dwell
///
/// Example:
/// length,angle,offset,stepover,dwell
/// 200,45,10,4,30
/// 200,60,10,4,30
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct LayerRow {
    /// Zone length along the mandrel (mm)
    pub length: f64,
    /// Fibre angle against the mandrel axis (degrees)
    pub angle: f64,
    /// Zone start measured from home (mm)
    pub offset: f64,
    /// Circumferential shift per pass (mm)
    pub stepover: f64,
    /// Extra mandrel rotation at each turnaround (degrees)
    #[serde(default)]
    pub dwell: f64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Pins {
    pub mandrel_step: u8,
    pub mandrel_dir: u8,
    pub mandrel_en: Option<u8>,
    pub carriage_step: u8,
    pub carriage_dir: u8,
    pub carriage_en: Option<u8>,
    pub home_switch: u8,
}

impl Default for Pins {
    fn default() -> Self {
        Self {
            mandrel_step: 25,
            mandrel_dir: 26,
            mandrel_en: Some(27),
            carriage_step: 14,
            carriage_dir: 17,
            carriage_en: Some(13),
            home_switch: 16,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct MotorCfg {
    /// Full steps per motor revolution (200 for a 1.8° motor)
    pub steps_per_rev: u32,
    /// Driver microstep setting
    pub microsteps: u32,
}

fn default_mandrel_motor() -> MotorCfg {
    MotorCfg {
        steps_per_rev: 200,
        microsteps: 8,
    }
}

fn default_carriage_motor() -> MotorCfg {
    MotorCfg {
        steps_per_rev: 200,
        microsteps: 4,
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct DrivetrainCfg {
    pub belt_pitch_mm: f64,
    pub motor_teeth: u32,
    pub mandrel_teeth: u32,
    pub carriage_teeth: u32,
}

impl Default for DrivetrainCfg {
    fn default() -> Self {
        Self {
            belt_pitch_mm: 2.0,
            motor_teeth: 20,
            mandrel_teeth: 48,
            carriage_teeth: 20,
        }
    }
}

/// Speeds are microsteps per second.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct MotionCfg {
    pub mandrel_speed: f64,
    pub mandrel_max_speed: f64,
    pub carriage_max_speed: f64,
    /// Carriage acceleration (steps/s²)
    pub carriage_accel: f64,
    /// Carriage speed toward the home switch; the sign is applied by the controller
    pub homing_speed: f64,
}

impl Default for MotionCfg {
    fn default() -> Self {
        Self {
            mandrel_speed: 600.0,
            mandrel_max_speed: 1000.0,
            carriage_max_speed: 3000.0,
            carriage_accel: 5000.0,
            homing_speed: 400.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HomeCfg {
    /// Treat low level as asserted when true (switch to ground, internal pull-up)
    pub active_low: bool,
}

impl Default for HomeCfg {
    fn default() -> Self {
        Self { active_low: true }
    }
}

/// Simulated machine used when the binary is built without `hardware`.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimCfg {
    /// Where the carriage sits before homing, in mm from the switch
    pub carriage_start_mm: f64,
    /// Virtual time per control tick (µs)
    pub tick_us: u64,
}

impl Default for SimCfg {
    fn default() -> Self {
        Self {
            carriage_start_mm: 5.0,
            tick_us: 100,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct RunnerCfg {
    /// Abort the job after this many control ticks (absent = unlimited)
    pub max_ticks: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ProfileCfg {
    /// Mandrel outer diameter shared by every layer (mm)
    pub mandrel_diameter: f64,
    pub layers: Vec<LayerRow>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pins: Pins,
    #[serde(default = "default_mandrel_motor")]
    pub mandrel_motor: MotorCfg,
    #[serde(default = "default_carriage_motor")]
    pub carriage_motor: MotorCfg,
    #[serde(default)]
    pub drivetrain: DrivetrainCfg,
    #[serde(default)]
    pub motion: MotionCfg,
    #[serde(default)]
    pub home: HomeCfg,
    #[serde(default)]
    pub sim: SimCfg,
    #[serde(default)]
    pub runner: RunnerCfg,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub profile: ProfileCfg,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pins: Pins::default(),
            mandrel_motor: default_mandrel_motor(),
            carriage_motor: default_carriage_motor(),
            drivetrain: DrivetrainCfg::default(),
            motion: MotionCfg::default(),
            home: HomeCfg::default(),
            sim: SimCfg::default(),
            runner: RunnerCfg::default(),
            logging: Logging::default(),
            profile: ProfileCfg::default(),
        }
    }
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Load a layer table from CSV. Rows are checked with [`validate_layers`].
pub fn load_layers_csv(path: &std::path::Path) -> eyre::Result<Vec<LayerRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open layer CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["length", "angle", "offset", "stepover", "dwell"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "layer CSV must have headers 'length,angle,offset,stepover,dwell', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<LayerRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }
    if rows.is_empty() {
        eyre::bail!("layer CSV {:?} contains no layers", path);
    }
    validate_layers(&rows)?;
    Ok(rows)
}

/// Range checks for a layer table, shared by the TOML and CSV paths.
pub fn validate_layers(rows: &[LayerRow]) -> eyre::Result<()> {
    if rows.len() > MAX_PROFILE_LAYERS {
        eyre::bail!(
            "profile.layers holds {} layers, at most {} are supported",
            rows.len(),
            MAX_PROFILE_LAYERS
        );
    }
    for (i, row) in rows.iter().enumerate() {
        let n = i + 1;
        if !(row.angle > 0.0 && row.angle < 90.0) {
            eyre::bail!("profile.layers[{n}].angle must be in (0, 90) degrees");
        }
        if !(row.stepover.is_finite() && row.stepover > 0.0) {
            eyre::bail!("profile.layers[{n}].stepover must be > 0");
        }
        if !(row.length.is_finite() && row.length >= 0.0) {
            eyre::bail!("profile.layers[{n}].length must be >= 0");
        }
        if !(row.offset.is_finite() && row.offset >= 0.0) {
            eyre::bail!("profile.layers[{n}].offset must be >= 0");
        }
        if !(row.dwell.is_finite() && row.dwell >= 0.0) {
            eyre::bail!("profile.layers[{n}].dwell must be >= 0");
        }
    }
    Ok(())
}

fn positive(v: f64, key: &str) -> eyre::Result<()> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        eyre::bail!("{key} must be > 0")
    }
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Motors
        for (name, m) in [
            ("mandrel_motor", &self.mandrel_motor),
            ("carriage_motor", &self.carriage_motor),
        ] {
            if m.steps_per_rev == 0 {
                eyre::bail!("{name}.steps_per_rev must be >= 1");
            }
            if m.microsteps == 0 {
                eyre::bail!("{name}.microsteps must be >= 1");
            }
        }

        // Drive train
        positive(self.drivetrain.belt_pitch_mm, "drivetrain.belt_pitch_mm")?;
        if self.drivetrain.motor_teeth == 0 {
            eyre::bail!("drivetrain.motor_teeth must be >= 1");
        }
        if self.drivetrain.mandrel_teeth == 0 {
            eyre::bail!("drivetrain.mandrel_teeth must be >= 1");
        }
        if self.drivetrain.carriage_teeth == 0 {
            eyre::bail!("drivetrain.carriage_teeth must be >= 1");
        }

        // Motion
        positive(self.motion.mandrel_speed, "motion.mandrel_speed")?;
        positive(self.motion.mandrel_max_speed, "motion.mandrel_max_speed")?;
        positive(self.motion.carriage_max_speed, "motion.carriage_max_speed")?;
        positive(self.motion.carriage_accel, "motion.carriage_accel")?;
        positive(self.motion.homing_speed, "motion.homing_speed")?;
        if self.motion.mandrel_speed > self.motion.mandrel_max_speed {
            eyre::bail!("motion.mandrel_speed must be <= motion.mandrel_max_speed");
        }
        if self.motion.homing_speed > self.motion.carriage_max_speed {
            eyre::bail!("motion.homing_speed must be <= motion.carriage_max_speed");
        }

        // Simulation
        if !(self.sim.carriage_start_mm.is_finite() && self.sim.carriage_start_mm >= 0.0) {
            eyre::bail!("sim.carriage_start_mm must be >= 0");
        }
        if self.sim.tick_us == 0 {
            eyre::bail!("sim.tick_us must be >= 1");
        }
        if self.sim.tick_us > 1_000_000 {
            eyre::bail!("sim.tick_us is unreasonably large (>1s)");
        }

        // Runner
        if self.runner.max_ticks == Some(0) {
            eyre::bail!("runner.max_ticks must be >= 1 when set");
        }

        // Profile
        if !(self.profile.mandrel_diameter.is_finite() && self.profile.mandrel_diameter >= 0.0) {
            eyre::bail!("profile.mandrel_diameter must be >= 0");
        }
        validate_layers(&self.profile.layers)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_reference_machine() {
        let cfg = load_toml("").expect("empty TOML parses");
        assert_eq!(cfg.mandrel_motor.microsteps, 8);
        assert_eq!(cfg.carriage_motor.microsteps, 4);
        assert_eq!(cfg.drivetrain.mandrel_teeth, 48);
        assert!(cfg.home.active_low);
        assert!(cfg.profile.layers.is_empty());
        cfg.validate().expect("defaults are valid");
    }

    #[test]
    fn dwell_defaults_to_zero() {
        let cfg = load_toml(
            r#"
[profile]
mandrel_diameter = 50.0
[[profile.layers]]
length = 100.0
angle = 45.0
offset = 0.0
stepover = 4.0
"#,
        )
        .unwrap();
        assert_eq!(cfg.profile.layers[0].dwell, 0.0);
    }
}
