//! Control loop driving a `WindingController` from start to COMPLETE.
//!
//! Operator commands arrive over a channel and are applied between ticks,
//! so they are always serialized against `update()`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::Receiver;
use winder_traits::{Axis, Clock, HomeSensor};

use crate::controller::WindingController;
use crate::error::{AbortReason, Result, WinderError};
use crate::status::WindingState;

/// Operator input accepted while a job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Pause,
    Resume,
    Abort,
}

#[derive(Clone)]
pub struct RunParams {
    /// Pause between ticks. Zero free-runs.
    pub tick: Duration,
    /// Abort after this many ticks.
    pub max_ticks: Option<u64>,
    pub clock: Arc<dyn Clock + Send + Sync>,
}

impl core::fmt::Debug for RunParams {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RunParams")
            .field("tick", &self.tick)
            .field("max_ticks", &self.max_ticks)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub layers: usize,
    pub passes: u32,
}

/// Start the job and tick it to completion.
///
/// Returns `WinderError::Abort` when the shutdown flag is raised, the tick
/// budget runs out, or an `Abort` command arrives; in every case both axes
/// have been stopped first.
pub fn run<M, C, H>(
    ctrl: &mut WindingController<M, C, H>,
    params: &RunParams,
    commands: &Receiver<Command>,
    shutdown: &AtomicBool,
) -> Result<RunSummary>
where
    M: Axis,
    C: Axis,
    H: HomeSensor,
{
    ctrl.start()?;
    let mut ticks: u64 = 0;

    loop {
        while let Ok(cmd) = commands.try_recv() {
            tracing::info!(?cmd, state = ctrl.state().name(), "operator command");
            match cmd {
                Command::Pause => {
                    ctrl.pause();
                }
                Command::Resume => {
                    ctrl.resume();
                }
                Command::Abort => return abort(ctrl, AbortReason::Operator, ticks),
            }
        }

        if shutdown.load(Ordering::Relaxed) {
            return abort(ctrl, AbortReason::Shutdown, ticks);
        }
        if let Some(max) = params.max_ticks
            && ticks >= max
        {
            return abort(ctrl, AbortReason::TickLimit, ticks);
        }

        let state = ctrl.update()?;
        ticks += 1;
        if state == WindingState::Complete {
            let summary = RunSummary {
                ticks,
                layers: ctrl.profile().len(),
                passes: ctrl.profile().passes_completed(),
            };
            tracing::info!(
                ticks = summary.ticks,
                layers = summary.layers,
                passes = summary.passes,
                "winding complete"
            );
            return Ok(summary);
        }
        params.clock.sleep(params.tick);
    }
}

fn abort<M, C, H>(
    ctrl: &mut WindingController<M, C, H>,
    reason: AbortReason,
    ticks: u64,
) -> Result<RunSummary>
where
    M: Axis,
    C: Axis,
    H: HomeSensor,
{
    tracing::error!(%reason, ticks, layer = ctrl.active_layer_index(), "winding aborted");
    if let Err(e) = ctrl.abort() {
        tracing::warn!(error = %e, "axis stop failed during abort");
    }
    Err(crate::error::Report::new(WinderError::Abort(reason)))
}
