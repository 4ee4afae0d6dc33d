use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("No home directory")]
    NoHomeDir,

    #[error("Agent binary not found: {0}")]
    AgentNotFound(String),

    #[error("Agent exited with status {status}: {stderr}")]
    AgentFailed { status: i32, stderr: String },

    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("maximum attempts reached for {task} after {attempts} attempts")]
    MaxAttemptsReached { task: String, attempts: usize },

    #[error("Unknown phase: {0}")]
    UnknownPhase(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, Error>;
