mod cli;
mod error_fmt;
mod plan;
mod rt;
mod wind;

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::{Result, WrapErr};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};
use winder_core::error::WinderError;

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE, RtLock};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::rt::RtOpts;
use crate::wind::WindOpts;

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if let Err(e) = color_eyre::install() {
        eprintln!("Warning: error report hook not installed: {e}");
    }

    if let Err(err) = run(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
            tracing::debug!(error = ?err, "full error report");
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

/// Anything that goes wrong while loading configuration is a configuration error.
fn config_error(e: eyre::Report) -> eyre::Report {
    eyre::Report::new(WinderError::Config(format!("{e:#}")))
}

fn load_config(path: &Path, layers: Option<&Path>) -> Result<winder_config::Config> {
    let text = fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))
        .map_err(config_error)?;
    let mut cfg = winder_config::load_toml(&text)
        .wrap_err_with(|| format!("parse config {}", path.display()))
        .map_err(config_error)?;
    if let Some(csv) = layers {
        cfg.profile.layers = winder_config::load_layers_csv(csv).map_err(config_error)?;
    }
    cfg.validate().map_err(config_error)?;
    Ok(cfg)
}

fn init_tracing(cli: &Cli, logging: &winder_config::Logging) -> Result<()> {
    let level = cli
        .log_level
        .as_deref()
        .or(logging.level.as_deref())
        .unwrap_or("info");
    // RUST_LOG wins over flags and config.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .wrap_err_with(|| format!("invalid log level {level:?}"))?;

    let console = if cli.json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer().with_writer(std::io::stderr).boxed()
    };

    let file = match &logging.file {
        Some(path) => {
            let path = Path::new(path);
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "winder.log".to_string());
            let appender = match logging.rotation.as_deref().unwrap_or("never") {
                "daily" => tracing_appender::rolling::daily(dir, name),
                "hourly" => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(fmt::layer().json().with_ansi(false).with_writer(writer))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .with(filter)
        .try_init()
        .wrap_err("install tracing subscriber")
}

fn run(cli: Cli) -> Result<()> {
    let cfg = load_config(&cli.config, cli.layers.as_deref())?;
    init_tracing(&cli, &cfg.logging)?;
    tracing::debug!(config = %cli.config.display(), "config loaded");

    match cli.cmd {
        Commands::Wind {
            max_ticks,
            interactive,
            rt,
            rt_prio,
            rt_lock,
            rt_cpu,
        } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            {
                let flag = shutdown.clone();
                ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
                    .wrap_err("install Ctrl-C handler")?;
            }
            let opts = WindOpts {
                max_ticks,
                interactive,
                rt: rt.then(|| RtOpts {
                    prio: rt_prio,
                    lock: rt_lock.unwrap_or_else(RtLock::os_default),
                    cpu: rt_cpu,
                }),
            };
            wind::run_wind(&cfg, &opts, cli.json, &shutdown)?;
            Ok(())
        }
        Commands::Plan => plan::run_plan(&cfg, cli.json),
        Commands::SelfCheck => plan::run_self_check(&cfg, cli.json),
    }
}
