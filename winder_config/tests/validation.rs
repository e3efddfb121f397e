use rstest::rstest;
use winder_config::{MAX_PROFILE_LAYERS, load_toml};

const PROFILE: &str = r#"
[profile]
mandrel_diameter = 50.0

[[profile.layers]]
length = 200.0
angle = 45.0
offset = 10.0
stepover = 4.0
dwell = 30.0
"#;

#[test]
fn accepts_minimal_profile() {
    let cfg = load_toml(PROFILE).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.profile.layers.len(), 1);
    assert_eq!(cfg.profile.layers[0].dwell, 30.0);
}

#[rstest]
#[case("[motion]\nmandrel_speed = 0.0", "motion.mandrel_speed must be > 0")]
#[case("[motion]\ncarriage_accel = -1.0", "motion.carriage_accel must be > 0")]
#[case(
    "[motion]\nmandrel_speed = 1500.0",
    "motion.mandrel_speed must be <= motion.mandrel_max_speed"
)]
#[case("[mandrel_motor]\nsteps_per_rev = 200\nmicrosteps = 0", "mandrel_motor.microsteps")]
#[case("[carriage_motor]\nsteps_per_rev = 0\nmicrosteps = 4", "carriage_motor.steps_per_rev")]
#[case("[drivetrain]\ncarriage_teeth = 0", "drivetrain.carriage_teeth")]
#[case("[drivetrain]\nbelt_pitch_mm = 0.0", "drivetrain.belt_pitch_mm must be > 0")]
#[case("[runner]\nmax_ticks = 0", "runner.max_ticks")]
#[case("[sim]\ntick_us = 0", "sim.tick_us must be >= 1")]
#[case("[profile]\nmandrel_diameter = -3.0", "profile.mandrel_diameter must be >= 0")]
fn rejects_bad_machine_values(#[case] toml: &str, #[case] needle: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    assert!(format!("{err}").contains(needle), "got: {err}");
}

#[rstest]
#[case("length = 100.0\nangle = 90.0\noffset = 0.0\nstepover = 4.0", "angle must be in (0, 90)")]
#[case("length = 100.0\nangle = 0.0\noffset = 0.0\nstepover = 4.0", "angle must be in (0, 90)")]
#[case("length = 100.0\nangle = 45.0\noffset = 0.0\nstepover = 0.0", "stepover must be > 0")]
#[case("length = -1.0\nangle = 45.0\noffset = 0.0\nstepover = 4.0", "length must be >= 0")]
#[case("length = 100.0\nangle = 45.0\noffset = -5.0\nstepover = 4.0", "offset must be >= 0")]
#[case(
    "length = 100.0\nangle = 45.0\noffset = 0.0\nstepover = 4.0\ndwell = -10.0",
    "dwell must be >= 0"
)]
fn rejects_bad_layer_rows(#[case] layer: &str, #[case] needle: &str) {
    let toml = format!("[profile]\nmandrel_diameter = 50.0\n[[profile.layers]]\n{layer}\n");
    let cfg = load_toml(&toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    let msg = format!("{err}");
    assert!(msg.contains("profile.layers[1]"), "got: {msg}");
    assert!(msg.contains(needle), "got: {msg}");
}

#[test]
fn rejects_more_layers_than_capacity() {
    let mut toml = String::from("[profile]\nmandrel_diameter = 50.0\n");
    for _ in 0..=MAX_PROFILE_LAYERS {
        toml.push_str(
            "[[profile.layers]]\nlength = 10.0\nangle = 45.0\noffset = 0.0\nstepover = 4.0\n",
        );
    }
    let cfg = load_toml(&toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    assert!(format!("{err}").contains("at most 10"));
}

#[test]
fn unknown_layer_field_type_is_a_parse_error() {
    let toml = "[profile]\nmandrel_diameter = 50.0\n[[profile.layers]]\nlength = \"long\"\n";
    assert!(load_toml(toml).is_err());
}

#[test]
fn shipped_sample_config_is_valid() {
    let cfg = load_toml(include_str!("../../etc/winder.toml")).expect("parse sample");
    cfg.validate().expect("sample config validates");
    assert_eq!(cfg.profile.layers.len(), 2);
    assert_eq!(cfg.pins.home_switch, 16);
}
