use crate::domain::engine::EngineError;
use crate::domain::segmenter::SegmentError;

/// Main application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{failed} of {total} jobs failed, {remaining} never ran")]
    Incomplete {
        failed: usize,
        remaining: usize,
        total: usize,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<SegmentError> for AppError {
    fn from(err: SegmentError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl AppError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 78,
            Self::Engine(err) if err.is_configuration() => 78,
            Self::Io(_) => 74,
            Self::Incomplete { .. } => 1,
            Self::Engine(_) | Self::Serialization(_) | Self::Other(_) => 70,
        }
    }
}

/// Custom result type for the application
pub type AppResult<T> = Result<T, AppError>;
