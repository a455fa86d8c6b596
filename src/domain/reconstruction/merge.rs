use crate::domain::engine::RunState;
use crate::domain::jobs::{AudioRef, Job, JobStatus};
use crate::infrastructure::repositories::{AudioStore, StoreError};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

/// The single merged audio resource built from a settled queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MergedArtifact {
    pub audio_ref: AudioRef,
    pub byte_len: usize,
    pub segment_count: usize,
}

/// True when the queue has settled with at least one success and no failure
pub fn is_ready_to_merge(run_state: RunState, jobs: &[Job]) -> bool {
    run_state == RunState::Idle
        && !jobs.is_empty()
        && jobs.iter().all(|job| job.status.is_terminal())
        && jobs.iter().any(|job| job.status == JobStatus::Finished)
        && !jobs.iter().any(|job| job.status == JobStatus::Error)
}

/// Publishes the merged artifact for a queue and withdraws stale ones
pub struct Reconstructor {
    store: Arc<dyn AudioStore>,
    current: Mutex<Option<MergedArtifact>>,
}

impl Reconstructor {
    pub fn new(store: Arc<dyn AudioStore>) -> Self {
        Self {
            store,
            current: Mutex::new(None),
        }
    }

    pub async fn current(&self) -> Option<MergedArtifact> {
        *self.current.lock().await
    }

    /// Rebuild the merged artifact, or withdraw it when the queue is not ready.
    ///
    /// `snapshot` is read only once the artifact lock is held, so refreshes
    /// publish in the order they observed the queue.
    pub async fn refresh<F>(&self, snapshot: F) -> Option<MergedArtifact>
    where
        F: FnOnce() -> (RunState, Vec<Job>),
    {
        let mut current = self.current.lock().await;
        let (run_state, jobs) = snapshot();

        if !is_ready_to_merge(run_state, &jobs) {
            if let Some(stale) = current.take() {
                self.store.release(&stale.audio_ref).await;
                tracing::debug!(audio_ref = %stale.audio_ref, "Merged audio withdrawn");
            }
            return None;
        }

        let merged = match self.concatenate(&jobs).await {
            Ok(merged) => merged,
            Err(e) => {
                tracing::error!(error = %e, "Failed to merge audio segments");
                if let Some(stale) = current.take() {
                    self.store.release(&stale.audio_ref).await;
                }
                return None;
            }
        };

        let (bytes, segment_count) = merged;
        let byte_len = bytes.len();

        let audio_ref = match self.store.put(bytes).await {
            Ok(audio_ref) => audio_ref,
            Err(e) => {
                tracing::error!(error = %e, "Failed to store merged audio");
                if let Some(stale) = current.take() {
                    self.store.release(&stale.audio_ref).await;
                }
                return None;
            }
        };

        if let Some(previous) = current.take() {
            self.store.release(&previous.audio_ref).await;
        }

        let artifact = MergedArtifact {
            audio_ref,
            byte_len,
            segment_count,
        };
        *current = Some(artifact);

        tracing::info!(
            audio_ref = %audio_ref,
            segment_count,
            audio_size_bytes = byte_len,
            "Merged audio published"
        );

        Some(artifact)
    }

    /// Withdraw and release the published artifact, if any
    pub async fn invalidate(&self) {
        if let Some(stale) = self.current.lock().await.take() {
            self.store.release(&stale.audio_ref).await;
        }
    }

    /// Concatenate finished audio in queue order
    async fn concatenate(&self, jobs: &[Job]) -> Result<(Vec<u8>, usize), StoreError> {
        let mut merged_audio = Vec::new();
        let mut segment_count = 0;

        for job in jobs.iter().filter(|job| job.is_finished()) {
            let Some(audio_ref) = job.audio_ref else {
                continue;
            };

            let audio_data = self.store.fetch(&audio_ref).await?;
            merged_audio.extend(audio_data);
            segment_count += 1;
        }

        Ok((merged_audio, segment_count))
    }
}
