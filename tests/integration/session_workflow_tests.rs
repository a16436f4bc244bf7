/*!
 * End-to-end tests for the stage state machine and session manager
 */

use anyhow::Result;
use std::sync::Arc;

use subfix::credentials::{CredentialStore, MemoryCredentialStore};
use subfix::errors::{GenerationError, ProviderError, SessionError};
use subfix::providers::mock::{MockBehavior, MockProvider};
use subfix::session::ReviewGate;
use subfix::translation::Gender;
use subfix::{subtitle_processor, Stage, View};
use crate::common;

/// Test the full normalize, translate, review and fix flow through export
#[tokio::test]
async fn test_fullWorkflow_shouldPreserveIdsAndTimes() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_file(temp_dir.path(), "episode.srt", common::SAMPLE_SRT)?;
    let provider = MockProvider::with_responder(common::scripted_reply);
    let manager = common::create_manager(provider.clone(), common::key_store(), 2);

    assert_eq!(manager.load_path(&source)?, 5);

    let normalized = manager.normalize(|_, _| {}).await?;
    assert_eq!(normalized[0].text, "A GREETS {P}");
    assert_eq!(manager.state().view(), View::Normalized);

    let translated = manager.translate(|_, _| {}).await?;
    assert_eq!(translated[2].text, "VI:WHERE IS {P}?\nGOING HOME");
    assert_eq!(manager.state().view(), View::Translated);

    let roster = manager.analyze_characters().await?;
    assert_eq!(roster.len(), 1);
    assert_eq!(roster.characters()[0].gender, Gender::Unknown);
    assert!(matches!(manager.state().gate(), ReviewGate::AwaitingConfirmation(_)));

    manager.set_character_gender("A", Gender::Male)?;
    let fixed = manager.confirm_roster(|_, _| {}).await?;
    assert_eq!(fixed[0].text, "VI:A GREETS HE");
    assert_eq!(fixed[1].text, "VI:HE SMILES");
    assert_eq!(manager.state().view(), View::Fixed);
    assert_eq!(manager.state().gate(), &ReviewGate::Closed);

    let exported = manager.export(None)?;
    assert_eq!(exported, temp_dir.path().join("episode.fixed.vi.srt"));

    let original = subtitle_processor::parse(common::SAMPLE_SRT);
    let written = subtitle_processor::parse(&std::fs::read_to_string(&exported)?);
    assert_eq!(written.len(), original.len());
    for (before, after) in original.iter().zip(&written) {
        assert_eq!(before.id, after.id);
        assert_eq!(before.time, after.time);
        assert!(after.text.starts_with("VI:"));
    }
    assert_eq!(written[4].text, "VI:BYE");

    // 3 batches each for normalize, translate and fix, plus one analysis call
    assert_eq!(provider.request_count(), 10);
    Ok(())
}

/// Test that the fix stage cannot run without a confirmed roster
#[tokio::test]
async fn test_confirmRoster_withoutAnalysis_shouldBeRejected() -> Result<()> {
    let provider = MockProvider::with_responder(common::scripted_reply);
    let manager = common::create_manager(provider.clone(), common::key_store(), 30);
    manager.load_file("a.srt", common::SAMPLE_SRT);
    manager.normalize(|_, _| {}).await?;
    manager.translate(|_, _| {}).await?;
    let calls_before = provider.request_count();

    let error = manager.confirm_roster(|_, _| {}).await.unwrap_err();

    assert_eq!(error, SessionError::NotAwaitingConfirmation);
    assert_eq!(provider.request_count(), calls_before);
    assert!(manager.stage_set(Stage::Fixed).is_none());
    Ok(())
}

/// Test that a fix that cannot start keeps the edited roster open for review
#[tokio::test]
async fn test_confirmRoster_withoutCredential_shouldReopenReview() -> Result<()> {
    let store = common::key_store();
    let provider = MockProvider::with_responder(common::scripted_reply);
    let manager = common::create_manager(provider.clone(), store.clone(), 30);
    manager.load_file("a.srt", common::SAMPLE_SRT);
    manager.normalize(|_, _| {}).await?;
    manager.translate(|_, _| {}).await?;
    manager.analyze_characters().await?;
    manager.set_character_gender("A", Gender::Male)?;
    store.set("")?;
    let calls_before = provider.request_count();

    let error = manager.confirm_roster(|_, _| {}).await.unwrap_err();

    assert_eq!(error.generation_error(), Some(&GenerationError::MissingCredential));
    assert_eq!(provider.request_count(), calls_before);
    assert!(manager.stage_set(Stage::Fixed).is_none());
    let roster = manager.pending_roster().expect("review should be open again");
    assert_eq!(roster.get("A").map(|c| c.gender), Some(Gender::Male));

    store.set("test-key-0001")?;
    let fixed = manager.confirm_roster(|_, _| {}).await?;
    assert_eq!(fixed[0].text, "VI:A GREETS HE");
    assert_eq!(manager.state().gate(), &ReviewGate::Closed);
    Ok(())
}

/// Test that a key saved while normalizing does not reach the remaining batches
#[tokio::test]
async fn test_normalize_withKeyChangedMidRun_shouldUseKeyFromStart() -> Result<()> {
    let store = common::key_store();
    let store_in_responder = store.clone();
    let provider = MockProvider::with_responder(move |request| {
        store_in_responder.set("key-after").map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        common::scripted_reply(request)
    });
    let manager = common::create_manager(provider.clone(), store.clone(), 1);
    manager.load_file("a.srt", common::SAMPLE_SRT);

    manager.normalize(|_, _| {}).await?;

    assert_eq!(store.get(), Some("key-after".to_string()));
    let requests = provider.requests();
    assert_eq!(requests.len(), 5);
    assert!(requests.iter().all(|r| r.credential == "test-key-0001"));
    Ok(())
}

/// Test that a key saved while fixing does not reach the remaining batches
#[tokio::test]
async fn test_confirmRoster_withKeyChangedMidRun_shouldUseKeyFromStart() -> Result<()> {
    let store = common::key_store();
    let store_in_responder = store.clone();
    let provider = MockProvider::with_responder(move |request| {
        store_in_responder.set("key-after").map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        common::scripted_reply(request)
    });
    let manager = common::create_manager(provider.clone(), store.clone(), 1);
    manager.load_file("a.srt", common::SAMPLE_SRT);
    manager.normalize(|_, _| {}).await?;
    manager.translate(|_, _| {}).await?;
    manager.analyze_characters().await?;
    store.set("test-key-0001")?;
    let calls_before = provider.request_count();

    manager.confirm_roster(|_, _| {}).await?;

    assert_eq!(store.get(), Some("key-after".to_string()));
    let fix_requests = &provider.requests()[calls_before..];
    assert_eq!(fix_requests.len(), 5);
    assert!(fix_requests.iter().all(|r| r.credential == "test-key-0001"));
    Ok(())
}

/// Test that a cancelled review closes the gate without fixing
#[tokio::test]
async fn test_cancelReview_shouldCloseGateWithoutFixing() -> Result<()> {
    let provider = MockProvider::with_responder(common::scripted_reply);
    let manager = common::create_manager(provider, common::key_store(), 30);
    manager.load_file("a.srt", common::SAMPLE_SRT);
    manager.normalize(|_, _| {}).await?;
    manager.translate(|_, _| {}).await?;
    manager.analyze_characters().await?;

    manager.cancel_review()?;

    assert_eq!(manager.state().gate(), &ReviewGate::Closed);
    assert_eq!(manager.confirm_roster(|_, _| {}).await.unwrap_err(), SessionError::NotAwaitingConfirmation);
    assert_eq!(manager.set_character_gender("A", Gender::Male).unwrap_err(), SessionError::NotAwaitingConfirmation);
    Ok(())
}

/// Test stage ordering preconditions
#[tokio::test]
async fn test_stages_withoutPredecessor_shouldBeNotReady() {
    let manager = common::create_manager(MockProvider::echo(), common::key_store(), 30);

    assert_eq!(manager.normalize(|_, _| {}).await.unwrap_err(), SessionError::NoFileLoaded);

    manager.load_file("a.srt", common::SAMPLE_SRT);
    assert_eq!(
        manager.translate(|_, _| {}).await.unwrap_err(),
        SessionError::StageNotReady { stage: Stage::Translated, requires: Stage::Normalized }
    );
    assert_eq!(
        manager.analyze_characters().await.unwrap_err(),
        SessionError::StageNotReady { stage: Stage::Fixed, requires: Stage::Translated }
    );
    assert_eq!(manager.export_text().unwrap_err(), SessionError::NothingToExport);
}

/// Test that a failing batch leaves the stage data and view unchanged
#[tokio::test]
async fn test_failedTranslation_shouldLeaveStateUnchanged() -> Result<()> {
    // Normalize takes calls 1-3; translation fails on its second batch
    let provider = MockProvider::with_responder(common::scripted_reply).behavior(MockBehavior::FailOnCall {
        call: 5,
        error: ProviderError::ApiError { status_code: 500, message: "internal".into() },
    });
    let manager = common::create_manager(provider, common::key_store(), 2);
    manager.load_file("a.srt", common::SAMPLE_SRT);
    manager.normalize(|_, _| {}).await?;
    let before = manager.state();

    let error = manager.translate(|_, _| {}).await.unwrap_err();

    match &error {
        SessionError::Batch(batch) => assert_eq!(batch.batch, Some(1)),
        other => panic!("expected a batch error, got {:?}", other),
    }
    assert!(matches!(error.generation_error(), Some(GenerationError::Other(_))));
    let after = manager.state();
    assert!(after.set(Stage::Translated).is_none());
    assert_eq!(after.view(), before.view());
    assert!(manager.status().starts_with("Error:"));
    assert!(!manager.is_busy());
    Ok(())
}

/// Test that running without a key fails before any request
#[tokio::test]
async fn test_normalize_withoutCredential_shouldFailWithMissingCredential() {
    let provider = MockProvider::echo();
    let manager = common::create_manager(provider.clone(), Arc::new(MemoryCredentialStore::new()), 30);
    manager.load_file("a.srt", common::SAMPLE_SRT);

    let error = manager.normalize(|_, _| {}).await.unwrap_err();

    assert_eq!(error.generation_error(), Some(&GenerationError::MissingCredential));
    assert_eq!(provider.request_count(), 0);
    assert!(manager.activity()[0].message.contains("Normalize source text"));
}

/// Test that a second run on the same stage is rejected while the first is in flight
#[tokio::test]
async fn test_normalize_whileRunning_shouldBeBusy() -> Result<()> {
    let provider = MockProvider::echo().with_delay_ms(50);
    let manager = common::create_manager(provider.clone(), common::key_store(), 30);
    manager.load_file("a.srt", common::SAMPLE_SRT);

    let (first, second) = tokio::join!(manager.normalize(|_, _| {}), manager.normalize(|_, _| {}));

    assert!(first.is_ok());
    assert_eq!(second.unwrap_err(), SessionError::StageBusy(Stage::Normalized));
    assert_eq!(provider.request_count(), 1);
    assert!(!manager.is_busy());

    manager.normalize(|_, _| {}).await?;
    Ok(())
}

/// Test that a result for a replaced file is discarded
#[tokio::test]
async fn test_reloadDuringRun_shouldDiscardStaleResult() {
    let provider = MockProvider::echo().with_delay_ms(50);
    let manager = common::create_manager(provider, common::key_store(), 30);
    manager.load_file("first.srt", common::SAMPLE_SRT);

    let (result, _) = tokio::join!(manager.normalize(|_, _| {}), async {
        manager.load_file("second.srt", "1\n00:00:01,000 --> 00:00:02,000\nnew");
    });

    assert_eq!(result.unwrap_err(), SessionError::FileChanged(Stage::Normalized));
    let state = manager.state();
    assert_eq!(state.file_name(), Some("second.srt"));
    assert!(state.set(Stage::Normalized).is_none());
    assert_eq!(state.set(Stage::Original).map(|s| s.len()), Some(1));
}

/// Test that re-running an earlier stage leaves later stages alone
#[tokio::test]
async fn test_rerunNormalize_shouldKeepTranslation() -> Result<()> {
    let provider = MockProvider::with_responder(common::scripted_reply);
    let manager = common::create_manager(provider, common::key_store(), 30);
    manager.load_file("a.srt", common::SAMPLE_SRT);
    manager.normalize(|_, _| {}).await?;
    let translated = manager.translate(|_, _| {}).await?;

    manager.normalize(|_, _| {}).await?;

    let kept = manager.stage_set(Stage::Translated).unwrap();
    assert!(Arc::ptr_eq(&kept, &translated));
    assert_eq!(manager.state().view(), View::Normalized);
    Ok(())
}

/// Test that loading a new file resets every downstream stage
#[tokio::test]
async fn test_loadFile_shouldResetDownstreamStages() -> Result<()> {
    let provider = MockProvider::with_responder(common::scripted_reply);
    let manager = common::create_manager(provider, common::key_store(), 30);
    manager.load_file("a.srt", common::SAMPLE_SRT);
    manager.normalize(|_, _| {}).await?;

    manager.load_file("b.srt", common::SAMPLE_SRT);

    let state = manager.state();
    assert!(state.set(Stage::Normalized).is_none());
    assert_eq!(state.view(), View::Original);
    assert_eq!(manager.export_file_name()?, "b.fixed.vi.srt");
    Ok(())
}

/// Test progress callbacks during a stage run
#[tokio::test]
async fn test_translate_shouldReportProgress() -> Result<()> {
    let provider = MockProvider::with_responder(common::scripted_reply);
    let manager = common::create_manager(provider, common::key_store(), 2);
    manager.load_file("a.srt", common::SAMPLE_SRT);
    manager.normalize(|_, _| {}).await?;

    let mut progress = Vec::new();
    manager.translate(|completed, total| progress.push((completed, total))).await?;

    assert_eq!(progress, vec![(1, 3), (2, 3), (3, 3)]);
    assert_eq!(manager.status(), "Translate completed.");
    Ok(())
}

/// Test API key save and check through the session
#[tokio::test]
async fn test_credential_saveAndCheck() -> Result<()> {
    let provider = MockProvider::echo();
    let store = Arc::new(MemoryCredentialStore::new());
    let manager = common::create_manager(provider.clone(), store, 30);

    assert!(!manager.check_credential(None).await.valid);
    assert_eq!(provider.request_count(), 0);

    manager.save_credential("  new-key-123456  ")?;
    assert!(manager.has_credential());

    let check = manager.check_credential(None).await;
    assert!(check.valid);
    assert_eq!(provider.requests()[0].credential, "new-key-123456");
    Ok(())
}
