//! Human-readable error descriptions and structured JSON error formatting.

use winder_core::error::{AbortReason, BuildError, WinderError};

use crate::cli::LAST_LIMITS;

pub fn abort_reason_name(r: &AbortReason) -> &'static str {
    match r {
        AbortReason::Shutdown => "Shutdown",
        AbortReason::TickLimit => "TickLimit",
        AbortReason::Operator => "Operator",
    }
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingMandrel | BuildError::MissingCarriage => format!(
                "What happened: {be}.\nLikely causes: Axis driver failed to initialize or was not wired into the builder.\nHow to fix: Ensure both axes are created successfully and passed via with_mandrel(...) / with_carriage(...)."
            ),
            BuildError::MissingHome => "What happened: No home sensor was provided.\nLikely causes: Limit switch failed to initialize or was not wired into the builder.\nHow to fix: Ensure the home switch is created and passed via with_home(...).".to_string(),
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Zero or negative values in [motion], [drivetrain], or the motor sections.\nHow to fix: Edit the config file, then rerun. See etc/winder.toml for a sample."
            ),
        };
    }

    if let Some(we) = err.downcast_ref::<WinderError>() {
        return match we {
            WinderError::Abort(AbortReason::Shutdown) => "What happened: The job was stopped by a shutdown request (Ctrl-C).\nLikely causes: Operator interrupt or service stop.\nHow to fix: Both axes were halted. Check the part, then start a new run; the carriage re-homes on start.".to_string(),
            WinderError::Abort(AbortReason::Operator) => "What happened: The job was aborted by the operator.\nLikely causes: An 'abort' command was entered.\nHow to fix: Both axes were halted. Start a new run when ready; the carriage re-homes on start.".to_string(),
            WinderError::Abort(AbortReason::TickLimit) => {
                let limit = LAST_LIMITS
                    .get()
                    .and_then(|l| l.max_ticks)
                    .map(|n| format!(" ({n} ticks)"))
                    .unwrap_or_default();
                format!(
                    "What happened: The tick budget{limit} ran out before the job completed.\nLikely causes: Large profile, long dwells, or a home switch that never closed.\nHow to fix: Raise runner.max_ticks or --max-ticks, and run `winder plan` to check pass counts."
                )
            }
            WinderError::Config(msg) if msg.contains("must have headers") => {
                "Invalid headers in layer CSV. Expected 'length,angle,offset,stepover,dwell'.".to_string()
            }
            WinderError::Config(msg) => format!(
                "What happened: Configuration problem: {msg}.\nLikely causes: Missing or out-of-range values in the TOML or layer CSV, or an empty profile.\nHow to fix: Edit the config and rerun; `winder self-check` validates without moving anything."
            ),
            WinderError::Capacity(n) => format!(
                "What happened: The profile is full ({n} layers).\nLikely causes: Too many layers in the config or CSV.\nHow to fix: Split the job into several runs."
            ),
            WinderError::Hardware(msg) | WinderError::HardwareFault(msg) => format!(
                "What happened: Axis or sensor failure: {msg}.\nLikely causes: Wrong pin numbers in [pins], missing GPIO permissions, or driver power off.\nHow to fix: Check wiring and [pins], ensure the process may access GPIO, then rerun."
            ),
            WinderError::State(msg) => format!(
                "What happened: Command not valid now ({msg}).\nLikely causes: A job is already running or paused.\nHow to fix: Wait for completion or abort the current job first."
            ),
        };
    }

    // Generic fallback
    let msg = err.to_string();
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 2 configuration, 3 shutdown or operator abort,
/// 4 tick budget, 5 hardware, 1 anything else.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return 2;
    }
    match err.downcast_ref::<WinderError>() {
        Some(WinderError::Config(_) | WinderError::Capacity(_)) => 2,
        Some(WinderError::Abort(AbortReason::Shutdown | AbortReason::Operator)) => 3,
        Some(WinderError::Abort(AbortReason::TickLimit)) => 4,
        Some(WinderError::Hardware(_) | WinderError::HardwareFault(_)) => 5,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    if let Some(WinderError::Abort(reason)) = err.downcast_ref::<WinderError>() {
        let msg = humanize(err);
        let reason_name = abort_reason_name(reason);
        let details = match reason {
            AbortReason::TickLimit => LAST_LIMITS
                .get()
                .map(|l| json!({ "max_ticks": l.max_ticks, "tick_us": l.tick_us })),
            AbortReason::Shutdown | AbortReason::Operator => None,
        };
        let obj = if let Some(d) = details {
            json!({ "reason": reason_name, "details": d, "message": msg })
        } else {
            json!({ "reason": reason_name, "message": msg })
        };
        return obj.to_string();
    }

    let reason = match err.downcast_ref::<WinderError>() {
        Some(WinderError::Config(_) | WinderError::Capacity(_)) => "Config",
        Some(WinderError::Hardware(_) | WinderError::HardwareFault(_)) => "Hardware",
        _ if err.downcast_ref::<BuildError>().is_some() => "Config",
        _ => "Error",
    };
    json!({ "reason": reason, "message": humanize(err) }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_kind() {
        let cases = [
            (WinderError::Config("x".into()), 2),
            (WinderError::Capacity(10), 2),
            (WinderError::Abort(AbortReason::Shutdown), 3),
            (WinderError::Abort(AbortReason::Operator), 3),
            (WinderError::Abort(AbortReason::TickLimit), 4),
            (WinderError::Hardware("gpio".into()), 5),
            (WinderError::HardwareFault("gpio".into()), 5),
            (WinderError::State("busy".into()), 1),
        ];
        for (e, code) in cases {
            let r = eyre::Report::new(e.clone());
            assert_eq!(exit_code_for_error(&r), code, "{e:?}");
        }
        assert_eq!(exit_code_for_error(&eyre::eyre!("boom")), 1);
        assert_eq!(
            exit_code_for_error(&eyre::Report::new(BuildError::MissingHome)),
            2
        );
    }

    #[test]
    fn wrapped_errors_keep_their_exit_code() {
        use eyre::WrapErr;
        let r: eyre::Result<()> = Err(eyre::Report::new(WinderError::Abort(
            AbortReason::TickLimit,
        )));
        let r = r.wrap_err("winding job").unwrap_err();
        assert_eq!(exit_code_for_error(&r), 4);
    }

    #[test]
    fn csv_header_errors_get_a_short_hint() {
        let r = eyre::Report::new(WinderError::Config(
            "layer CSV must have headers 'length,angle,offset,stepover,dwell', got: a,b".into(),
        ));
        assert!(humanize(&r).starts_with("Invalid headers in layer CSV"));
    }

    #[test]
    fn json_errors_name_the_reason() {
        let r = eyre::Report::new(WinderError::Abort(AbortReason::Operator));
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&r)).unwrap();
        assert_eq!(v["reason"], "Operator");
        assert!(v["message"].as_str().unwrap().contains("operator"));

        let r = eyre::Report::new(WinderError::Config("bad".into()));
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&r)).unwrap();
        assert_eq!(v["reason"], "Config");
    }
}
