use super::model::{JobId, JobStatus};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobError {
    #[error("job {0} not found")]
    NotFound(JobId),
    #[error("job {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: JobId,
        from: JobStatus,
        to: JobStatus,
    },
    #[error("job {id} is {status}, only pending jobs can be removed")]
    NotRemovable { id: JobId, status: JobStatus },
}
