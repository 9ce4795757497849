/*!
 * Tests for running a single translation job
 */

use std::sync::Arc;
use std::time::Duration;

use subrelay::artifacts::{ArtifactStore, SENTINEL_MESSAGE};
use subrelay::database::{ArtifactKey, ArtifactState};
use subrelay::errors::TranslationError;
use subrelay::language_utils::LanguageCode;
use subrelay::media::{MediaRef, SubtitleCandidate};
use subrelay::providers::MockProvider;
use subrelay::translation::{
    ChunkLimits, DefaultProviderFactory, JobRunner, MemorySink, RecordingDelay, RetryPolicy, TranslationJob,
};

use crate::common::{self, FakeFetcher};

fn key() -> ArtifactKey {
    ArtifactKey::new(
        MediaRef::parse("tt0111161:1:1"),
        LanguageCode::new("fr"),
        "openai",
    )
}

fn job(limits: ChunkLimits) -> TranslationJob {
    TranslationJob::new(
        key(),
        SubtitleCandidate::new("https://os/en.srt", "eng", "catalog"),
        common::test_settings(),
        limits,
    )
}

async fn claimed_store(dir: &std::path::Path) -> ArtifactStore {
    let store = common::test_store(dir);
    assert!(store.claim_pending(&key()).await.unwrap());
    store
}

#[tokio::test]
async fn test_process_withWorkingProvider_shouldReplaceSentinelWithTranslation() {
    let dir = common::create_temp_dir().unwrap();
    let store = claimed_store(dir.path()).await;
    let parts = common::test_runner(store.clone(), MockProvider::working(), FakeFetcher::new(common::SAMPLE_SRT));

    let record = parts.runner.process(&job(ChunkLimits::default())).await.unwrap();

    assert_eq!(record.state, ArtifactState::Ready);
    let content = std::fs::read_to_string(store.final_path(&key())).unwrap();
    assert!(content.contains("00:00:05,000 --> 00:00:09,000\n[fra] How are you?"));
    assert!(!content.contains(SENTINEL_MESSAGE));
    assert!(store.lookup(&key()).await.unwrap().is_some());
    assert!(parts.delay.waits().is_empty());
}

#[tokio::test]
async fn test_process_withPersistentMismatch_shouldFailAfterThreeAttempts() {
    let dir = common::create_temp_dir().unwrap();
    let store = claimed_store(dir.path()).await;
    let parts = common::test_runner(store.clone(), MockProvider::dropping_last(), FakeFetcher::new(common::SAMPLE_SRT));

    let err = parts.runner.process(&job(ChunkLimits::default())).await.unwrap_err();

    assert!(matches!(err, TranslationError::CountMismatch { expected: 3, actual: 2 }));
    assert_eq!(parts.provider.request_count(), 3);
    assert_eq!(parts.delay.waits(), vec![Duration::from_secs(1), Duration::from_secs(2)]);

    let dumps = parts.dumps.dumps();
    let attempts: Vec<u32> = dumps.iter().map(|d| d.attempt).collect();
    assert_eq!(attempts, vec![1, 2, 3]);
    assert_eq!(dumps[0].source_units.len(), 3);
    assert_eq!(dumps[0].translated_units.len(), 2);

    // The sentinel stays for the next request to clean up
    let content = std::fs::read_to_string(store.final_path(&key())).unwrap();
    assert_eq!(content, SENTINEL_MESSAGE);
    let record = store.record(&key()).await.unwrap().unwrap();
    assert_eq!(record.state, ArtifactState::Failed);
}

#[tokio::test]
async fn test_process_withMergedFirstUnits_shouldReconcileWithoutRetry() {
    let body = "1\n00:00:01,000 --> 00:00:02,000\nYes\n\n2\n00:00:03,000 --> 00:00:04,000\nNo\n\n3\n00:00:05,000 --> 00:00:06,000\nMaybe\n";
    let dir = common::create_temp_dir().unwrap();
    let store = claimed_store(dir.path()).await;
    let parts = common::test_runner(store.clone(), MockProvider::merging_first_two(), FakeFetcher::new(body));

    parts.runner.process(&job(ChunkLimits::default())).await.unwrap();

    assert_eq!(parts.provider.request_count(), 1);
    assert!(parts.dumps.dumps().is_empty());
    let content = std::fs::read_to_string(store.final_path(&key())).unwrap();
    assert!(content.contains("00:00:01,000 --> 00:00:02,000\nYes\n"));
    assert!(content.contains("00:00:03,000 --> 00:00:04,000\nNo\n"));
    assert!(content.contains("[fra] Maybe"));
}

#[tokio::test]
async fn test_process_withIntermittentProvider_shouldRecoverOnRetry() {
    let dir = common::create_temp_dir().unwrap();
    let store = claimed_store(dir.path()).await;
    let parts = common::test_runner(store.clone(), MockProvider::intermittent(1000).with_translator(|t, _| t.to_uppercase()), FakeFetcher::new(common::SAMPLE_SRT));

    let record = parts.runner.process(&job(ChunkLimits::default())).await.unwrap();
    assert_eq!(record.state, ArtifactState::Ready);

    let failing = common::test_runner(store.clone(), MockProvider::intermittent(1), FakeFetcher::new(common::SAMPLE_SRT));
    let err = failing.runner.process(&job(ChunkLimits::default())).await.unwrap_err();
    assert!(matches!(err, TranslationError::Provider(_)));
    assert_eq!(failing.delay.waits().len(), 2);
}

#[tokio::test]
async fn test_process_withSmallChunks_shouldCallProviderPerChunk() {
    let dir = common::create_temp_dir().unwrap();
    let store = claimed_store(dir.path()).await;
    let parts = common::test_runner(store.clone(), MockProvider::working(), FakeFetcher::new(common::SAMPLE_SRT));

    parts
        .runner
        .process(&job(ChunkLimits { max_units: 2, max_chars: 4000 }))
        .await
        .unwrap();

    assert_eq!(parts.provider.request_count(), 2);
    let content = std::fs::read_to_string(store.final_path(&key())).unwrap();
    assert!(content.contains("[fra] Goodbye."));
}

#[tokio::test]
async fn test_process_withBlankBody_shouldFailWithoutCallingProvider() {
    let dir = common::create_temp_dir().unwrap();
    let store = claimed_store(dir.path()).await;
    let parts = common::test_runner(store.clone(), MockProvider::working(), FakeFetcher::new("  \n\n"));

    let err = parts.runner.process(&job(ChunkLimits::default())).await.unwrap_err();

    assert!(matches!(err, TranslationError::Download(_)));
    assert_eq!(parts.fetcher.calls(), 1);
    assert_eq!(parts.provider.request_count(), 0);
    assert!(parts.delay.waits().is_empty());
    assert_eq!(store.record(&key()).await.unwrap().unwrap().state, ArtifactState::Failed);
}

#[tokio::test]
async fn test_process_withHtmlBody_shouldFailAsDownloadError() {
    let dir = common::create_temp_dir().unwrap();
    let store = claimed_store(dir.path()).await;
    let parts = common::test_runner(store, MockProvider::working(), FakeFetcher::new("<html>Not found</html>"));

    let err = parts.runner.process(&job(ChunkLimits::default())).await.unwrap_err();
    assert!(matches!(err, TranslationError::Download(_)));
}

#[tokio::test]
async fn test_process_withMissingApiKey_shouldFailBeforeAnyCall() {
    let dir = common::create_temp_dir().unwrap();
    let store = claimed_store(dir.path()).await;
    let fetcher = Arc::new(FakeFetcher::new(common::SAMPLE_SRT));
    let delay = Arc::new(RecordingDelay::new());
    let dumps = Arc::new(MemorySink::new());
    let runner = JobRunner::new(store.clone(), fetcher.clone(), Arc::new(DefaultProviderFactory))
        .with_diagnostics(dumps.clone())
        .with_delay(delay.clone())
        .with_retry(RetryPolicy::default());

    let mut settings = common::test_settings();
    settings.api_key = None;
    let job = TranslationJob::new(
        key(),
        SubtitleCandidate::new("https://os/en.srt", "eng", "catalog"),
        settings,
        ChunkLimits::default(),
    );

    let err = runner.process(&job).await.unwrap_err();

    assert!(matches!(err, TranslationError::Configuration(_)));
    assert_eq!(fetcher.calls(), 0);
    assert!(delay.waits().is_empty());
    assert!(dumps.dumps().is_empty());
    assert_eq!(
        std::fs::read_to_string(store.final_path(&key())).unwrap(),
        SENTINEL_MESSAGE
    );
    assert_eq!(store.record(&key()).await.unwrap().unwrap().state, ArtifactState::Failed);
}

#[tokio::test]
async fn test_process_withRejectedCredential_shouldNotRetry() {
    let dir = common::create_temp_dir().unwrap();
    let store = claimed_store(dir.path()).await;
    let parts = common::test_runner(store.clone(), MockProvider::unauthorized(), FakeFetcher::new(common::SAMPLE_SRT));

    let err = parts.runner.process(&job(ChunkLimits::default())).await.unwrap_err();

    assert!(!err.is_retryable());
    assert_eq!(parts.provider.request_count(), 1);
    assert!(parts.delay.waits().is_empty());
    assert_eq!(store.record(&key()).await.unwrap().unwrap().state, ArtifactState::Failed);
}
