pub mod error;
pub mod model;
pub mod queue;

pub use error::JobError;
pub use model::{AudioRef, Job, JobId, JobStatus, QueueCounts, TimedText};
pub use queue::JobQueue;
