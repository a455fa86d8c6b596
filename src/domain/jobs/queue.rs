use super::error::JobError;
use super::model::{AudioRef, Job, JobId, JobStatus, QueueCounts, TimedText};
use parking_lot::RwLock;

/// Ordered, lock-guarded collection of jobs.
///
/// Insertion order is the output order for merging and subtitles. Every
/// mutation is a named transition that checks the job's current status.
#[derive(Debug, Default)]
pub struct JobQueue {
    jobs: RwLock<Vec<Job>>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one Pending job per text, in order
    pub fn push_texts<I>(&self, texts: I) -> Vec<JobId>
    where
        I: IntoIterator<Item = String>,
    {
        self.push_jobs(texts.into_iter().map(Job::new))
    }

    /// Append one Pending job per pre-timed entry, in order
    pub fn push_timed<I>(&self, entries: I) -> Vec<JobId>
    where
        I: IntoIterator<Item = TimedText>,
    {
        self.push_jobs(entries.into_iter().map(Job::timed))
    }

    fn push_jobs(&self, new_jobs: impl Iterator<Item = Job>) -> Vec<JobId> {
        let mut jobs = self.jobs.write();
        let start = jobs.len();
        jobs.extend(new_jobs);
        jobs[start..].iter().map(|job| job.id).collect()
    }

    pub fn snapshot(&self) -> Vec<Job> {
        self.jobs.read().clone()
    }

    pub fn get(&self, id: JobId) -> Option<Job> {
        self.jobs.read().iter().find(|job| job.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }

    pub fn counts(&self) -> QueueCounts {
        QueueCounts::from_jobs(&self.jobs.read())
    }

    /// Ids of every Pending job, in queue order
    pub fn pending_ids(&self) -> Vec<JobId> {
        self.jobs
            .read()
            .iter()
            .filter(|job| job.status == JobStatus::Pending)
            .map(|job| job.id)
            .collect()
    }

    /// Pending -> Processing. Returns a copy of the claimed job.
    pub fn begin(&self, id: JobId) -> Result<Job, JobError> {
        self.update(id, |job| {
            job.transition(JobStatus::Processing)?;
            Ok(job.clone())
        })
    }

    /// Processing -> Finished
    pub fn finish(&self, id: JobId, audio_ref: AudioRef) -> Result<(), JobError> {
        self.update(id, |job| {
            job.transition(JobStatus::Finished)?;
            job.audio_ref = Some(audio_ref);
            Ok(())
        })
    }

    /// Processing -> Error
    pub fn fail(&self, id: JobId, message: impl Into<String>) -> Result<(), JobError> {
        let message = message.into();
        self.update(id, |job| {
            job.transition(JobStatus::Error)?;
            job.error_message = Some(message);
            Ok(())
        })
    }

    /// Error -> Pending for a single job
    pub fn reset_failed(&self, id: JobId) -> Result<(), JobError> {
        self.update(id, |job| {
            // Processing -> Pending belongs to cancellation only
            if job.status != JobStatus::Error {
                return Err(JobError::InvalidTransition {
                    id,
                    from: job.status,
                    to: JobStatus::Pending,
                });
            }
            job.transition(JobStatus::Pending)
        })
    }

    /// Error -> Pending for every failed job. Returns how many were reset.
    pub fn reset_all_failed(&self) -> usize {
        self.transition_all(JobStatus::Error, JobStatus::Pending)
    }

    /// Processing -> Pending for every in-flight job. Returns how many were reverted.
    pub fn revert_processing(&self) -> usize {
        self.transition_all(JobStatus::Processing, JobStatus::Pending)
    }

    /// Remove a Pending job, keeping the order of the others
    pub fn remove(&self, id: JobId) -> Result<Job, JobError> {
        let mut jobs = self.jobs.write();
        let index = jobs
            .iter()
            .position(|job| job.id == id)
            .ok_or(JobError::NotFound(id))?;

        let status = jobs[index].status;
        if status != JobStatus::Pending {
            return Err(JobError::NotRemovable { id, status });
        }

        Ok(jobs.remove(index))
    }

    /// Drop every job and hand them back to the caller
    pub fn clear(&self) -> Vec<Job> {
        std::mem::take(&mut *self.jobs.write())
    }

    fn update<T>(
        &self,
        id: JobId,
        apply: impl FnOnce(&mut Job) -> Result<T, JobError>,
    ) -> Result<T, JobError> {
        let mut jobs = self.jobs.write();
        let job = jobs
            .iter_mut()
            .find(|job| job.id == id)
            .ok_or(JobError::NotFound(id))?;
        apply(job)
    }

    fn transition_all(&self, from: JobStatus, to: JobStatus) -> usize {
        let mut jobs = self.jobs.write();
        let mut moved = 0;
        for job in jobs.iter_mut().filter(|job| job.status == from) {
            if job.transition(to).is_ok() {
                moved += 1;
            }
        }
        moved
    }
}
