use super::error::JobError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier of a job within a queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle to audio bytes held by an audio store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioRef(Uuid);

impl AudioRef {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AudioRef {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AudioRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Finished,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Finished => "finished",
            JobStatus::Error => "error",
        }
    }

    /// Finished or Error: nothing moves the job on without an explicit retry
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Finished | JobStatus::Error)
    }

    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Finished)
                | (JobStatus::Processing, JobStatus::Error)
                | (JobStatus::Processing, JobStatus::Pending)
                | (JobStatus::Error, JobStatus::Pending)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Pre-timed text coming from an imported subtitle file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedText {
    pub text: String,
    pub timestamp: String,
}

impl TimedText {
    pub fn new(text: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            timestamp: timestamp.into(),
        }
    }
}

/// One chunk of text tracked through its synthesis lifecycle.
///
/// `audio_ref` is set only while Finished and `error_message` only while
/// Error; status changes go through [`Job::transition`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_timestamp: Option<String>,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_ref: Option<AudioRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(text: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            text: text.into(),
            source_timestamp: None,
            status: JobStatus::Pending,
            audio_ref: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn timed(timed: TimedText) -> Self {
        let mut job = Self::new(timed.text);
        job.source_timestamp = Some(timed.timestamp);
        job
    }

    pub fn is_finished(&self) -> bool {
        self.status == JobStatus::Finished
    }

    /// Move to `next`, keeping `audio_ref` and `error_message` consistent with it
    pub(crate) fn transition(&mut self, next: JobStatus) -> Result<(), JobError> {
        if !self.status.can_transition_to(next) {
            return Err(JobError::InvalidTransition {
                id: self.id,
                from: self.status,
                to: next,
            });
        }

        self.status = next;
        if next != JobStatus::Finished {
            self.audio_ref = None;
        }
        if next != JobStatus::Error {
            self.error_message = None;
        }
        self.updated_at = Utc::now();

        Ok(())
    }
}

/// Status counters over a queue snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueCounts {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub finished: usize,
    pub failed: usize,
}

impl QueueCounts {
    pub fn from_jobs(jobs: &[Job]) -> Self {
        jobs.iter().fold(
            QueueCounts {
                total: jobs.len(),
                ..Default::default()
            },
            |mut counts, job| {
                match job.status {
                    JobStatus::Pending => counts.pending += 1,
                    JobStatus::Processing => counts.processing += 1,
                    JobStatus::Finished => counts.finished += 1,
                    JobStatus::Error => counts.failed += 1,
                }
                counts
            },
        )
    }

    /// Jobs that still have work ahead of them
    pub fn remaining(&self) -> usize {
        self.pending + self.processing
    }
}
