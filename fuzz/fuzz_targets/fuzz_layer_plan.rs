#![no_main]
use libfuzzer_sys::arbitrary::{self, Arbitrary};
use libfuzzer_sys::fuzz_target;
use winder_core::{DriveTrain, WindProfile};

#[derive(Debug, Arbitrary)]
struct Row {
    length: f64,
    angle: f64,
    offset: f64,
    stepover: f64,
    dwell: f64,
}

#[derive(Debug, Arbitrary)]
struct Input {
    diameter: f64,
    rows: Vec<Row>,
}

fuzz_target!(|input: Input| {
    // Any layer table the config layer accepts must plan without NaN or odd pass counts.
    let rows: Vec<winder_config::LayerRow> = input
        .rows
        .iter()
        .map(|r| winder_config::LayerRow {
            length: r.length,
            angle: r.angle,
            offset: r.offset,
            stepover: r.stepover,
            dwell: r.dwell,
        })
        .collect();
    if winder_config::validate_layers(&rows).is_err()
        || !(input.diameter.is_finite() && input.diameter >= 0.0 && input.diameter < 1.0e6)
    {
        return;
    }
    let Ok(profile) = WindProfile::from_rows(input.diameter, &rows) else {
        return;
    };
    for p in profile.plan(&DriveTrain::default()) {
        assert!(p.step_ratio.is_finite() && p.step_ratio >= 0.0, "{p:?}");
        // Huge stepovers may overflow to infinity, never to NaN.
        assert!(!p.stepover_degrees.is_nan() && p.stepover_degrees >= 0.0, "{p:?}");
        assert_eq!(p.total_passes % 2, 0);
    }
});
