/*!
 * Integration tests for the translation queue and its workers
 */

use subrelay::database::{ArtifactKey, ArtifactState};
use subrelay::language_utils::LanguageCode;
use subrelay::media::{MediaRef, SubtitleCandidate};
use subrelay::providers::MockProvider;
use subrelay::translation::{ChunkLimits, TranslationJob, TranslationPipeline};

use crate::common::{self, FakeFetcher};

fn job_for(key: &ArtifactKey) -> TranslationJob {
    TranslationJob::new(
        key.clone(),
        SubtitleCandidate::new("https://os/en.srt", "en", "catalog"),
        common::test_settings(),
        ChunkLimits::default(),
    )
}

#[tokio::test]
async fn test_pipeline_withSeveralJobs_shouldSettleEveryOne() {
    let dir = common::create_temp_dir().unwrap();
    let store = common::test_store(dir.path());
    let parts = common::test_runner(store.clone(), MockProvider::working(), FakeFetcher::new(common::SAMPLE_SRT));
    let provider = parts.provider.clone();
    let pipeline = TranslationPipeline::start(parts.runner, 2);

    let keys: Vec<ArtifactKey> = ["fr", "de", "es", "it"]
        .iter()
        .map(|lang| ArtifactKey::new(MediaRef::movie("tt0111161"), LanguageCode::new(lang), "openai"))
        .collect();

    for key in &keys {
        assert!(store.claim_pending(key).await.unwrap());
        let guard = pipeline.in_flight().try_claim(key).unwrap();
        pipeline.enqueue(job_for(key), guard).unwrap();
    }

    pipeline.drain().await;

    assert!(pipeline.in_flight().is_empty());
    assert_eq!(provider.request_count(), keys.len());
    for key in &keys {
        let record = store.record(key).await.unwrap().unwrap();
        assert_eq!(record.state, ArtifactState::Ready, "{}", key);
    }

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.ready, 4);
    assert_eq!(stats.pending, 0);
    assert_eq!(store.scan_files().subtitles, 4);
}

#[tokio::test]
async fn test_pipeline_withFailingJobs_shouldKeepWorkerAlive() {
    let dir = common::create_temp_dir().unwrap();
    let store = common::test_store(dir.path());
    let parts = common::test_runner(store.clone(), MockProvider::dropping_last(), FakeFetcher::new(common::SAMPLE_SRT));
    let fetcher = parts.fetcher.clone();
    let pipeline = TranslationPipeline::start(parts.runner, 1);

    let keys: Vec<ArtifactKey> = ["pt-BR", "it"]
        .iter()
        .map(|lang| ArtifactKey::new(MediaRef::movie("tt0068646"), LanguageCode::new(lang), "openai"))
        .collect();

    for key in &keys {
        store.claim_pending(key).await.unwrap();
        let guard = pipeline.in_flight().try_claim(key).unwrap();
        pipeline.enqueue(job_for(key), guard).unwrap();
    }

    pipeline.drain().await;

    // One worker took both jobs, the second after the first failed
    assert_eq!(fetcher.calls(), 2);
    for key in &keys {
        assert_eq!(store.record(key).await.unwrap().unwrap().state, ArtifactState::Failed);
    }
    assert_eq!(store.scan_files().placeholders, 2);
    assert!(pipeline.enqueue(job_for(&keys[0]), pipeline.in_flight().try_claim(&keys[0]).unwrap()).is_err());
}
