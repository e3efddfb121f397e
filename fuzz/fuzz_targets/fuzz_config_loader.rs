#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validation errors are fine; panics are not. A config that
    // validates must also map onto a profile without tripping capacity.
    let Ok(cfg) = winder_config::load_toml(data) else {
        return;
    };
    if cfg.validate().is_ok() {
        let profile = winder_core::WindProfile::try_from(&cfg.profile);
        assert!(profile.is_ok(), "validated config rejected: {profile:?}");
    }
});
