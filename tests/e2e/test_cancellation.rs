use crate::e2e::helpers;

use helpers::fixtures::numbered_sentences;
use helpers::{test_settings, wait_until, TestContext};
use pretty_assertions::assert_eq;
use std::time::Duration;
use tape_batch::domain::engine::{EngineSettings, RunState};
use tape_batch::domain::jobs::JobStatus;
use test_context::test_context;

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_revert_in_flight_jobs_on_cancel(ctx: &TestContext) {
    let engine = ctx.engine_with(
        EngineSettings {
            concurrent_threads: 2,
            ..test_settings()
        },
        false,
    );
    ctx.synthesizer.set_hang(true);
    engine.add_text(&numbered_sentences(4)).await.unwrap();

    let run = engine.start().unwrap().expect("run should start");
    assert!(wait_until(Duration::from_secs(1), || engine.counts().processing == 2).await);

    engine.cancel().await;

    let counts = engine.counts();
    assert_eq!(counts.processing, 0);
    assert_eq!(counts.pending, 4);
    assert_eq!(engine.run_state(), RunState::Idle);
    assert!(engine
        .jobs()
        .iter()
        .all(|job| job.audio_ref.is_none() && job.error_message.is_none()));

    let joined = tokio::time::timeout(Duration::from_secs(1), run.wait()).await;
    assert!(joined.is_ok(), "workers should exit after cancel");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_ignore_cancel_while_idle(ctx: &TestContext) {
    ctx.engine.add_text(&numbered_sentences(2)).await.unwrap();

    ctx.engine.cancel().await;

    assert_eq!(ctx.engine.run_state(), RunState::Idle);
    assert_eq!(ctx.engine.counts().pending, 2);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_resume_after_cancel(ctx: &TestContext) {
    ctx.synthesizer.set_hang(true);
    ctx.engine.add_text(&numbered_sentences(4)).await.unwrap();

    let first = ctx.engine.start().unwrap().unwrap();
    assert!(wait_until(Duration::from_secs(1), || ctx.engine.counts().processing > 0).await);
    ctx.engine.cancel().await;
    first.wait().await;

    ctx.synthesizer.set_hang(false);
    let second = ctx.engine.start().unwrap().expect("a new run should start");
    assert!(second.generation() > 1);
    second.wait().await;

    let counts = ctx.engine.counts();
    assert_eq!(counts.finished, 4);
    assert!(ctx.engine.merged_artifact().await.is_some());
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_discard_results_arriving_after_cancel(ctx: &TestContext) {
    ctx.synthesizer.set_latency(Duration::from_millis(100));
    let ids = ctx.engine.add_text(&numbered_sentences(3)).await.unwrap();

    let run = ctx.engine.start().unwrap().unwrap();
    assert!(wait_until(Duration::from_secs(1), || ctx.engine.counts().processing == 3).await);

    ctx.engine.cancel().await;
    run.wait().await;
    tokio::time::sleep(Duration::from_millis(150)).await;

    for id in ids {
        assert_eq!(ctx.status_of(id), JobStatus::Pending);
    }
    assert_eq!(ctx.engine.counts().finished, 0);
    assert!(ctx.store.is_empty().await);
    assert!(ctx.engine.merged_artifact().await.is_none());
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_keep_finished_jobs_when_cancelled_mid_run(ctx: &TestContext) {
    let engine = ctx.engine_with(
        EngineSettings {
            concurrent_threads: 1,
            ..test_settings()
        },
        false,
    );
    let ids = engine.add_text(&numbered_sentences(3)).await.unwrap();
    let texts = helpers::fixtures::expected_chunks(3);
    ctx.synthesizer.set_latency_for(&texts[1], Duration::from_secs(30));
    ctx.synthesizer.set_latency_for(&texts[2], Duration::from_secs(30));

    let run = engine.start().unwrap().unwrap();
    assert!(wait_until(Duration::from_secs(1), || engine.counts().finished == 1).await);
    assert!(wait_until(Duration::from_secs(1), || engine.counts().processing == 1).await);

    engine.cancel().await;
    run.wait().await;

    let statuses: Vec<JobStatus> = ids
        .iter()
        .map(|id| engine.queue().get(*id).unwrap().status)
        .collect();
    assert_eq!(
        statuses,
        vec![JobStatus::Finished, JobStatus::Pending, JobStatus::Pending]
    );
    assert!(engine.merged_artifact().await.is_none());
}
