use crate::e2e::helpers;

use helpers::fixtures::numbered_sentences;
use helpers::{test_settings, TestContext};
use pretty_assertions::assert_eq;
use tape_batch::domain::credentials::TaskCategory;
use tape_batch::domain::engine::EngineSettings;
use test_context::test_context;

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_sign_requests_with_the_category_primary(ctx: &TestContext) {
    let engine = ctx.engine_with(
        EngineSettings {
            task_category: TaskCategory::Media,
            ..test_settings()
        },
        false,
    );
    engine.add_text(&numbered_sentences(2)).await.unwrap();

    engine.start().unwrap().unwrap().wait().await;

    let credentials: Vec<String> = ctx
        .synthesizer
        .calls()
        .into_iter()
        .map(|request| request.credential)
        .collect();
    assert_eq!(credentials, vec!["media-primary", "media-primary"]);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_recover_after_reconfiguring_credentials(ctx: &TestContext) {
    let engine = ctx.engine_with(
        EngineSettings {
            concurrent_threads: 1,
            ..test_settings()
        },
        false,
    );
    for credential in ["speech-primary", "fallback-a", "fallback-b"] {
        ctx.synthesizer.reject_credential(credential);
    }
    engine.add_text(&numbered_sentences(4)).await.unwrap();

    engine.start().unwrap().unwrap().wait().await;

    assert_eq!(engine.counts().failed, 4);
    assert!(ctx.credentials.is_bad("speech-primary"));
    assert!(ctx.credentials.is_bad("fallback-a"));
    assert!(ctx.credentials.is_bad("fallback-b"));

    ctx.credentials.configure("fresh-speech\nfresh-media\nfresh-fallback");
    assert!(!ctx.credentials.is_bad("speech-primary"));

    engine.retry_all_failed().unwrap().unwrap().wait().await;

    assert_eq!(engine.counts().finished, 4);
    assert!(ctx
        .synthesizer
        .calls()
        .iter()
        .skip(4)
        .all(|request| request.credential == "fresh-speech"));
}
