use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum WinderError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("profile is full ({0} layers)")]
    Capacity(usize),
    #[error("invalid state: {0}")]
    State(String),
    #[error("aborted: {0}")]
    Abort(AbortReason),
}

/// Why a running job was cut short by the runner.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    #[error("shutdown requested")]
    Shutdown,
    #[error("tick budget exhausted")]
    TickLimit,
    #[error("operator abort")]
    Operator,
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing mandrel axis")]
    MissingMandrel,
    #[error("missing carriage axis")]
    MissingCarriage,
    #[error("missing home sensor")]
    MissingHome,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
