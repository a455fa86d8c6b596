use anyhow::Context;
use serde::Serialize;
use std::process::ExitCode;
use std::sync::Arc;
use tape_batch::domain::credentials::CredentialPool;
use tape_batch::domain::engine::SynthesisEngine;
use tape_batch::domain::jobs::{Job, JobQueue, QueueCounts};
use tape_batch::error::{AppError, AppResult};
use tape_batch::infrastructure::config::{Config, LogFormat};
use tape_batch::infrastructure::repositories::{
    AudioStore, InMemoryAudioStore, OpenAiSynthesizer, Synthesizer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Summary written next to the audio output
#[derive(Serialize)]
struct RunReport {
    counts: QueueCounts,
    jobs: Vec<Job>,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "tape-batch failed");
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> AppResult<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    init_logging(&config);

    tracing::info!(
        input = %config.input_path.display(),
        output_dir = %config.output_dir.display(),
        "Starting tape-batch"
    );

    let text = tokio::fs::read_to_string(&config.input_path)
        .await
        .with_context(|| format!("cannot read input {}", config.input_path.display()))?;

    // === DEPENDENCY INJECTION SETUP ===
    let credentials = Arc::new(CredentialPool::from_blob(&config.credentials));
    let store: Arc<dyn AudioStore> = Arc::new(InMemoryAudioStore::new());
    let synthesizer: Arc<dyn Synthesizer> = Arc::new(OpenAiSynthesizer::new(config.model.clone()));

    let engine = Arc::new(SynthesisEngine::new(
        Arc::new(JobQueue::new()),
        credentials,
        synthesizer,
        store,
        config.engine_settings(),
        config.tts_cache_enabled,
    )?);

    engine.add_text(&text).await?;

    if let Some(run) = engine.start()? {
        let wait = run.wait();
        tokio::pin!(wait);

        tokio::select! {
            _ = &mut wait => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("Interrupted, cancelling synthesis run");
                engine.cancel().await;
                wait.await;
            }
        }
    }

    write_outputs(&config, &engine).await?;

    let counts = engine.counts();
    if counts.failed > 0 || counts.remaining() > 0 {
        return Err(AppError::Incomplete {
            failed: counts.failed,
            remaining: counts.remaining(),
            total: counts.total,
        });
    }

    Ok(())
}

async fn write_outputs(config: &Config, engine: &SynthesisEngine) -> AppResult<()> {
    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .with_context(|| format!("cannot create {}", config.output_dir.display()))?;

    match engine.merged_audio().await? {
        Some(audio) => {
            let path = config.output_dir.join("merged.mp3");
            tokio::fs::write(&path, &audio).await?;
            tracing::info!(path = %path.display(), audio_size_bytes = audio.len(), "Merged audio written");
        }
        None => tracing::warn!("No merged audio available, resolve failed jobs and run again"),
    }

    let subtitles = engine.subtitles();
    if !subtitles.is_empty() {
        let path = config.output_dir.join("subtitles.srt");
        tokio::fs::write(&path, subtitles).await?;
        tracing::info!(path = %path.display(), "Subtitles written");
    }

    let report = RunReport {
        counts: engine.counts(),
        jobs: engine.jobs(),
    };
    let path = config.output_dir.join("jobs.json");
    tokio::fs::write(&path, serde_json::to_vec_pretty(&report)?).await?;

    Ok(())
}

fn init_logging(config: &Config) {
    if config.log_format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| config.default_log_filter().into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| config.default_log_filter().into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}
