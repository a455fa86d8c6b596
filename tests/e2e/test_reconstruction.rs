use crate::e2e::helpers;

use helpers::fixtures::{expected_chunks, numbered_sentences};
use helpers::{wait_until, TestContext};
use pretty_assertions::assert_eq;
use std::time::Duration;
use tape_batch::infrastructure::repositories::RemoteFailure;
use test_context::test_context;

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_merge_audio_in_queue_order(ctx: &TestContext) {
    let chunks = expected_chunks(3);
    // Complete in reverse order
    ctx.synthesizer
        .set_latency_for(&chunks[0], Duration::from_millis(60));
    ctx.synthesizer
        .set_latency_for(&chunks[1], Duration::from_millis(30));
    ctx.engine.add_text(&numbered_sentences(3)).await.unwrap();

    ctx.engine.start().unwrap().unwrap().wait().await;

    let artifact = ctx
        .engine
        .merged_artifact()
        .await
        .expect("merged audio should be published");
    let expected = chunks.concat();
    assert_eq!(artifact.segment_count, 3);
    assert_eq!(artifact.byte_len, expected.len());

    let audio = ctx.engine.merged_audio().await.unwrap().unwrap();
    assert_eq!(String::from_utf8(audio).unwrap(), expected);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_not_publish_while_processing(ctx: &TestContext) {
    ctx.synthesizer.set_hang(true);
    ctx.engine.add_text(&numbered_sentences(2)).await.unwrap();

    let run = ctx.engine.start().unwrap().unwrap();
    assert!(wait_until(Duration::from_secs(1), || ctx.engine.counts().processing > 0).await);

    assert!(ctx.engine.merged_artifact().await.is_none());
    assert!(ctx.engine.merged_audio().await.unwrap().is_none());

    ctx.engine.cancel().await;
    run.wait().await;
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_withhold_merge_until_failures_are_resolved(ctx: &TestContext) {
    let chunks = expected_chunks(3);
    ctx.synthesizer
        .fail_text(&chunks[2], RemoteFailure::Other("boom".to_string()));
    let ids = ctx.engine.add_text(&numbered_sentences(3)).await.unwrap();

    ctx.engine.start().unwrap().unwrap().wait().await;
    assert!(ctx.engine.merged_artifact().await.is_none());

    ctx.synthesizer.clear_failures();
    ctx.engine.retry(ids[2]).unwrap().unwrap().wait().await;

    let artifact = ctx.engine.merged_artifact().await.unwrap();
    assert_eq!(artifact.segment_count, 3);
    assert_eq!(artifact.byte_len, chunks.concat().len());
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_withdraw_merge_when_new_text_arrives(ctx: &TestContext) {
    ctx.engine.add_text(&numbered_sentences(2)).await.unwrap();
    ctx.engine.start().unwrap().unwrap().wait().await;
    assert!(ctx.engine.merged_artifact().await.is_some());

    ctx.engine.add_text("One more sentence.").await.unwrap();
    assert!(ctx.engine.merged_artifact().await.is_none());
    // Only per-job audio is left in the store
    assert_eq!(ctx.store.len().await, 2);

    ctx.engine.start().unwrap().unwrap().wait().await;
    let artifact = ctx.engine.merged_artifact().await.unwrap();
    assert_eq!(artifact.segment_count, 3);
    assert_eq!(ctx.store.len().await, 3 + 1);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_generate_subtitles_for_finished_jobs(ctx: &TestContext) {
    let chunks = expected_chunks(2);
    ctx.engine.add_text(&numbered_sentences(2)).await.unwrap();

    assert_eq!(ctx.engine.subtitles(), "");

    ctx.engine.start().unwrap().unwrap().wait().await;

    // 24 chars at 18 chars/s is 1.333s, plus a 0.3s pause before the next cue;
    // milliseconds are truncated
    let expected = format!(
        "1\n00:00:00,000 --> 00:00:01,333\n{}\n\n2\n00:00:01,633 --> 00:00:02,966\n{}\n",
        chunks[0], chunks[1]
    );
    assert_eq!(ctx.engine.subtitles(), expected);
}
