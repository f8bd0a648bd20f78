//! Worker error types.

use thiserror::Error;

use reel_clients::ClientError;
use reel_media::MediaError;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Assembly failed: {0}")]
    Media(#[from] MediaError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Process exit code for this failure.
    ///
    /// 2 for configuration problems, 3 for unusable inputs, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            WorkerError::ConfigError(_)
            | WorkerError::Client(ClientError::Config(_))
            | WorkerError::Client(ClientError::Auth(_)) => 2,
            WorkerError::Media(e) if e.is_input_error() => 3,
            WorkerError::Media(MediaError::ArtifactMissing(_)) => 3,
            WorkerError::Client(ClientError::InvalidInput(_)) => 3,
            _ => 1,
        }
    }
}
