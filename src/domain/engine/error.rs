use crate::domain::credentials::TaskCategory;
use crate::domain::jobs::JobError;
use crate::domain::segmenter::SegmentError;
use crate::infrastructure::repositories::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no usable credential configured for {0} tasks")]
    NoUsableCredential(TaskCategory),
    #[error("engine is busy with a synthesis run")]
    Busy,
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
    #[error(transparent)]
    Segment(#[from] SegmentError),
    #[error(transparent)]
    Job(#[from] JobError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    /// Errors caused by configuration rather than by queue state
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            EngineError::NoUsableCredential(_)
                | EngineError::InvalidSettings(_)
                | EngineError::Segment(_)
        )
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
