//! Controller states, diagnostics events, and the runtime snapshot.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindingState {
    /// No job; nothing moves.
    #[default]
    Idle,
    /// Carriage seeking the home switch.
    Zeroing,
    /// Mandrel spinning, carriage geared to it.
    Winding,
    /// Turnaround: mandrel only, carriage holding.
    Dwelling,
    /// Job frozen; resumes into the state it was paused from.
    Paused,
    /// Every layer finished.
    Complete,
}

impl WindingState {
    /// Stable lowercase name for logs and JSON output.
    pub fn name(self) -> &'static str {
        match self {
            WindingState::Idle => "idle",
            WindingState::Zeroing => "zeroing",
            WindingState::Winding => "winding",
            WindingState::Dwelling => "dwelling",
            WindingState::Paused => "paused",
            WindingState::Complete => "complete",
        }
    }

    /// States that `pause()` accepts.
    pub fn is_pausable(self) -> bool {
        matches!(
            self,
            WindingState::Zeroing | WindingState::Winding | WindingState::Dwelling
        )
    }

    /// A job is in progress (running or paused).
    pub fn is_active(self) -> bool {
        self.is_pausable() || self == WindingState::Paused
    }
}

impl fmt::Display for WindingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Best-effort diagnostics; see `ControllerBuilder::with_events`.
#[derive(Debug, Clone, PartialEq)]
pub enum WindingEvent {
    StateChanged {
        from: WindingState,
        to: WindingState,
    },
    LayerStarted {
        index: usize,
    },
    PassCompleted {
        layer: usize,
        completed: u32,
        total: u32,
    },
    StartRefused {
        reason: String,
    },
    Complete,
}

impl WindingEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            WindingEvent::StateChanged { .. } => "state_changed",
            WindingEvent::LayerStarted { .. } => "layer_started",
            WindingEvent::PassCompleted { .. } => "pass_completed",
            WindingEvent::StartRefused { .. } => "start_refused",
            WindingEvent::Complete => "complete",
        }
    }
}

/// Every runtime scalar of the controller, for exact comparisons.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    pub state: WindingState,
    pub resume_state: Option<WindingState>,
    pub layer_index: usize,
    pub accumulator: f64,
    pub last_mandrel_pos: i64,
    pub dwell_target: i64,
}
