use thiserror::Error;

/// Errors surfaced by the host/CLI layer (config loading, IO).
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// The ways a unit of work can end without producing a result.
///
/// `Cancelled` is the cooperative-cancellation signal: work functions
/// return it when they observe cancellation at a checkpoint, and the job
/// transitions to the `Cancelled` state rather than `Error`.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("job was cancelled")]
    Cancelled,

    #[error("{0}")]
    Failed(String),

    #[error("job panicked: {0}")]
    Panicked(String),
}

impl JobError {
    /// Build a `Failed` error from anything displayable.
    pub fn failed(msg: impl std::fmt::Display) -> Self {
        JobError::Failed(msg.to_string())
    }
}

impl From<anyhow::Error> for JobError {
    fn from(err: anyhow::Error) -> Self {
        JobError::Failed(format!("{err:#}"))
    }
}
