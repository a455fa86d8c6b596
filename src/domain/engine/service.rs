use super::error::{EngineError, EngineResult};
use super::settings::EngineSettings;
use crate::domain::credentials::CredentialPool;
use crate::domain::jobs::{Job, JobError, JobId, JobQueue, QueueCounts, TimedText};
use crate::domain::reconstruction::{generate_subtitles, MergedArtifact, Reconstructor};
use crate::domain::segmenter::TextSegmenter;
use crate::infrastructure::repositories::{
    AudioStore, RemoteFailure, SynthesisRequest, Synthesizer,
};
use moka::future::Cache;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Processing,
}

/// Run bookkeeping. Job commits and cancellation both happen under this lock,
/// so a cancelled run can never land a late Finished/Error.
#[derive(Debug)]
struct RunControl {
    state: RunState,
    generation: u64,
    cancel: Option<CancellationToken>,
}

type WorkList = Arc<Mutex<VecDeque<JobId>>>;

/// Handle to a spawned synthesis run
#[derive(Debug)]
pub struct RunHandle {
    generation: u64,
    handle: JoinHandle<()>,
}

impl RunHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Resolve once every worker of the run has exited
    pub async fn wait(self) {
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, generation = self.generation, "Synthesis run task failed");
        }
    }
}

/// Drains the job queue through a bounded pool of synthesis workers
pub struct SynthesisEngine {
    queue: Arc<JobQueue>,
    credentials: Arc<CredentialPool>,
    synthesizer: Arc<dyn Synthesizer>,
    store: Arc<dyn AudioStore>,
    reconstructor: Reconstructor,
    settings: RwLock<EngineSettings>,
    run: Mutex<RunControl>,
    cache: Option<Cache<String, Vec<u8>>>,
}

impl SynthesisEngine {
    pub fn new(
        queue: Arc<JobQueue>,
        credentials: Arc<CredentialPool>,
        synthesizer: Arc<dyn Synthesizer>,
        store: Arc<dyn AudioStore>,
        settings: EngineSettings,
        cache_enabled: bool,
    ) -> EngineResult<Self> {
        settings.validate()?;

        // Initialize cache if enabled
        let cache = if cache_enabled {
            Some(
                Cache::builder()
                    .max_capacity(100)
                    .time_to_idle(Duration::from_secs(30 * 60)) // 30 minutes, refreshes on access
                    .build(),
            )
        } else {
            None
        };

        Ok(Self {
            queue,
            credentials,
            synthesizer,
            reconstructor: Reconstructor::new(store.clone()),
            store,
            settings: RwLock::new(settings),
            run: Mutex::new(RunControl {
                state: RunState::Idle,
                generation: 0,
                cancel: None,
            }),
            cache,
        })
    }

    pub fn queue(&self) -> &Arc<JobQueue> {
        &self.queue
    }

    pub fn credentials(&self) -> &Arc<CredentialPool> {
        &self.credentials
    }

    pub fn settings(&self) -> EngineSettings {
        self.settings.read().clone()
    }

    /// Replace the settings; only allowed between runs
    pub fn update_settings(&self, settings: EngineSettings) -> EngineResult<()> {
        settings.validate()?;

        let run = self.run.lock();
        if run.state == RunState::Processing {
            return Err(EngineError::Busy);
        }
        *self.settings.write() = settings;

        Ok(())
    }

    pub fn run_state(&self) -> RunState {
        self.run.lock().state
    }

    pub fn jobs(&self) -> Vec<Job> {
        self.queue.snapshot()
    }

    pub fn counts(&self) -> QueueCounts {
        self.queue.counts()
    }

    /// Segment `text` and queue one Pending job per chunk
    pub async fn add_text(&self, text: &str) -> EngineResult<Vec<JobId>> {
        let settings = self.settings();
        let segmenter = TextSegmenter::new(settings.max_chars, settings.min_chars_to_merge)?;
        let chunks = segmenter.segment(text);

        let ids = self.queue.push_texts(chunks);
        tracing::info!(
            text_length = text.len(),
            chunk_count = ids.len(),
            max_chars = settings.max_chars,
            "Text segmented into jobs"
        );

        self.refresh_artifact().await;
        Ok(ids)
    }

    /// Queue pre-timed entries, keeping their timestamps for the subtitle track
    pub async fn add_timed(&self, entries: Vec<TimedText>) -> Vec<JobId> {
        let ids = self.queue.push_timed(entries);
        tracing::info!(entry_count = ids.len(), "Timed entries queued");

        self.refresh_artifact().await;
        ids
    }

    /// Launch a run over every Pending job.
    ///
    /// Returns `Ok(None)` when a run is already active or nothing is pending.
    pub fn start(self: &Arc<Self>) -> EngineResult<Option<RunHandle>> {
        let settings = self.settings();

        let (generation, token, pending) = {
            let mut run = self.run.lock();
            if run.state == RunState::Processing {
                tracing::debug!("Synthesis run already in progress");
                return Ok(None);
            }

            if !self.credentials.has_usable(settings.task_category) {
                tracing::warn!(
                    category = %settings.task_category,
                    "Cannot start synthesis run without a credential"
                );
                return Err(EngineError::NoUsableCredential(settings.task_category));
            }

            let pending = self.queue.pending_ids();
            if pending.is_empty() {
                tracing::debug!("No pending jobs to synthesize");
                return Ok(None);
            }

            let token = CancellationToken::new();
            run.generation += 1;
            run.state = RunState::Processing;
            run.cancel = Some(token.clone());

            (run.generation, token, pending)
        };

        tracing::info!(
            generation,
            job_count = pending.len(),
            worker_count = settings.worker_count(),
            request_delay_ms = settings.request_delay.as_millis(),
            "Starting synthesis run"
        );

        let engine = Arc::clone(self);
        let handle = tokio::spawn(engine.run(generation, token, pending, settings));

        Ok(Some(RunHandle { generation, handle }))
    }

    /// Stop the active run and put its in-flight jobs back to Pending
    pub async fn cancel(&self) {
        let reverted = {
            let mut run = self.run.lock();
            if run.state == RunState::Idle {
                return;
            }

            if let Some(token) = run.cancel.take() {
                token.cancel();
            }
            run.state = RunState::Idle;

            self.queue.revert_processing()
        };

        tracing::info!(reverted_jobs = reverted, "Synthesis run cancelled");
        self.refresh_artifact().await;
    }

    /// Send a failed job back to Pending and start a run if none is active
    pub fn retry(self: &Arc<Self>, id: JobId) -> EngineResult<Option<RunHandle>> {
        self.queue.reset_failed(id)?;
        tracing::info!(job_id = %id, "Job queued for retry");

        self.start()
    }

    /// Send every failed job back to Pending and start a run if none is active
    pub fn retry_all_failed(self: &Arc<Self>) -> EngineResult<Option<RunHandle>> {
        let reset = self.queue.reset_all_failed();
        if reset == 0 {
            return Ok(None);
        }
        tracing::info!(job_count = reset, "Failed jobs queued for retry");

        self.start()
    }

    /// Remove a Pending job
    pub async fn remove(&self, id: JobId) -> EngineResult<()> {
        self.queue.remove(id)?;
        tracing::debug!(job_id = %id, "Job removed");

        self.refresh_artifact().await;
        Ok(())
    }

    /// Empty the queue and release all of its audio; only allowed between runs
    pub async fn clear(&self) -> EngineResult<()> {
        let cleared = {
            let run = self.run.lock();
            if run.state == RunState::Processing {
                return Err(EngineError::Busy);
            }
            self.queue.clear()
        };

        for audio_ref in cleared.iter().filter_map(|job| job.audio_ref) {
            self.store.release(&audio_ref).await;
        }
        self.reconstructor.invalidate().await;

        tracing::info!(job_count = cleared.len(), "Queue cleared");
        Ok(())
    }

    pub async fn merged_artifact(&self) -> Option<MergedArtifact> {
        self.reconstructor.current().await
    }

    /// Bytes of the published merged artifact
    pub async fn merged_audio(&self) -> EngineResult<Option<Vec<u8>>> {
        match self.reconstructor.current().await {
            Some(artifact) => Ok(Some(self.store.fetch(&artifact.audio_ref).await?)),
            None => Ok(None),
        }
    }

    /// Subtitle document for the finished jobs
    pub fn subtitles(&self) -> String {
        generate_subtitles(&self.queue.snapshot(), self.settings.read().speed)
    }

    /// Re-evaluate the merged artifact against the current queue
    pub async fn refresh_artifact(&self) -> Option<MergedArtifact> {
        self.reconstructor
            .refresh(|| (self.run_state(), self.queue.snapshot()))
            .await
    }

    async fn run(
        self: Arc<Self>,
        generation: u64,
        token: CancellationToken,
        pending: Vec<JobId>,
        settings: EngineSettings,
    ) {
        let start_time = Instant::now();
        let work: WorkList = Arc::new(Mutex::new(VecDeque::from(pending)));
        let settings = Arc::new(settings);

        let mut workers = JoinSet::new();
        for worker_id in 0..settings.worker_count() {
            workers.spawn(Arc::clone(&self).worker(
                worker_id,
                token.clone(),
                Arc::clone(&work),
                Arc::clone(&settings),
            ));
        }

        while let Some(result) = workers.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, generation, "Synthesis worker failed");
            }
        }

        let settled = {
            let mut run = self.run.lock();
            if run.generation == generation && !token.is_cancelled() {
                run.state = RunState::Idle;
                run.cancel = None;
                true
            } else {
                false
            }
        };

        let counts = self.queue.counts();
        tracing::info!(
            generation,
            cancelled = token.is_cancelled(),
            latency_ms = start_time.elapsed().as_millis(),
            finished = counts.finished,
            failed = counts.failed,
            pending = counts.pending,
            "Synthesis run completed"
        );

        if settled {
            self.refresh_artifact().await;
        }
    }

    async fn worker(
        self: Arc<Self>,
        worker_id: usize,
        token: CancellationToken,
        work: WorkList,
        settings: Arc<EngineSettings>,
    ) {
        loop {
            if token.is_cancelled() {
                break;
            }

            let next = work.lock().pop_front();
            let Some(job_id) = next else {
                break;
            };

            let Some(job) = self.claim(&token, job_id) else {
                continue;
            };

            self.process(worker_id, &token, job, &settings).await;

            if !settings.request_delay.is_zero() && !token.is_cancelled() {
                tokio::select! {
                    _ = tokio::time::sleep(settings.request_delay) => {}
                    _ = token.cancelled() => {}
                }
            }
        }

        tracing::debug!(worker_id, "Synthesis worker exited");
    }

    /// Move a job to Processing unless the run was cancelled or the job moved on
    fn claim(&self, token: &CancellationToken, job_id: JobId) -> Option<Job> {
        let _run = self.run.lock();
        if token.is_cancelled() {
            return None;
        }

        match self.queue.begin(job_id) {
            Ok(job) => Some(job),
            Err(e) => {
                tracing::debug!(job_id = %job_id, error = %e, "Skipping job that is no longer pending");
                None
            }
        }
    }

    async fn process(
        &self,
        worker_id: usize,
        token: &CancellationToken,
        job: Job,
        settings: &EngineSettings,
    ) {
        let credential = self.credentials.get(settings.task_category);
        let request = SynthesisRequest {
            text: job.text.clone(),
            voice: settings.voice.clone(),
            credential,
            speed: settings.speed,
        };

        tracing::debug!(
            worker_id,
            job_id = %job.id,
            text_length = job.text.len(),
            "Synthesizing job"
        );

        let outcome = tokio::select! {
            _ = token.cancelled() => None,
            result = self.synthesize(&request) => Some(result),
        };

        let Some(result) = outcome else {
            tracing::debug!(worker_id, job_id = %job.id, "Discarding synthesis for cancelled run");
            return;
        };

        match result {
            Ok(audio_data) => {
                let audio_size = audio_data.len();
                match self.store.put(audio_data).await {
                    Ok(audio_ref) => {
                        if self.commit(token, job.id, |queue| queue.finish(job.id, audio_ref)) {
                            tracing::info!(
                                worker_id,
                                job_id = %job.id,
                                audio_size_bytes = audio_size,
                                "Job finished"
                            );
                        } else {
                            self.store.release(&audio_ref).await;
                        }
                    }
                    Err(e) => {
                        tracing::error!(job_id = %job.id, error = %e, "Failed to store synthesized audio");
                        self.commit(token, job.id, |queue| queue.fail(job.id, e.to_string()));
                    }
                }
            }
            Err(failure) => {
                if failure.is_auth_or_rate_limit() {
                    self.credentials.mark_bad(&request.credential);
                }

                tracing::warn!(
                    worker_id,
                    job_id = %job.id,
                    auth_or_rate_limit = failure.is_auth_or_rate_limit(),
                    error = %failure,
                    "Job failed"
                );
                self.commit(token, job.id, |queue| queue.fail(job.id, failure.message()));
            }
        }
    }

    /// Apply a terminal transition unless the run was cancelled meanwhile
    fn commit(
        &self,
        token: &CancellationToken,
        job_id: JobId,
        apply: impl FnOnce(&JobQueue) -> Result<(), JobError>,
    ) -> bool {
        let _run = self.run.lock();
        if token.is_cancelled() {
            tracing::debug!(job_id = %job_id, "Discarding result for cancelled run");
            return false;
        }

        match apply(&self.queue) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(job_id = %job_id, error = %e, "Could not record job result");
                false
            }
        }
    }

    /// Call the synthesizer, going through the cache when enabled
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>, RemoteFailure> {
        let key = request.cache_key();

        if let Some(cache) = &self.cache {
            if let Some(cached_audio) = cache.get(&key).await {
                tracing::info!(
                    cached_audio_size = cached_audio.len(),
                    "TTS cache hit - returning cached audio"
                );
                return Ok(cached_audio);
            }
        }

        let start_time = Instant::now();
        let audio_data = self.synthesizer.synthesize(request).await?;

        tracing::debug!(
            latency_ms = start_time.elapsed().as_millis(),
            characters_count = request.text.chars().count(),
            audio_size_bytes = audio_data.len(),
            "Remote synthesis completed"
        );

        if let Some(cache) = &self.cache {
            cache.insert(key, audio_data.clone()).await;
        }

        Ok(audio_data)
    }
}
