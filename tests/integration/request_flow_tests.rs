/*!
 * Integration tests for request handling
 *
 * Requests go through the controller with scripted sources, a fake
 * downloader and a mock provider, against a real SQLite store and real
 * files in a temporary directory.
 */

use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;

use subrelay::app_config::Config;
use subrelay::app_controller::{Controller, SubtitleOutcome, SubtitleRequest};
use subrelay::artifacts::{ArtifactStore, NOT_FOUND_MESSAGE, SENTINEL_MESSAGE};
use subrelay::database::{ArtifactKey, ArtifactState};
use subrelay::language_utils::LanguageCode;
use subrelay::media::MediaRef;
use subrelay::providers::MockProvider;

use crate::common::{self, FakeCatalog, FakeFetcher, FakeSource, RunnerParts};

const EPISODE_URL: &str =
    "http://localhost:3000/subtitles/openai/fra/tt0111161/season1/tt0111161-translated-1-1.srt";

struct Harness {
    controller: Controller,
    store: ArtifactStore,
    catalog: Arc<FakeCatalog>,
    parts_provider: MockProvider,
}

fn harness(dir: &Path, config: Config, catalog: FakeCatalog, provider: MockProvider, fetcher: FakeFetcher) -> Harness {
    let store = common::test_store(dir);
    let episodic = Arc::new(FakeSource::empty("episodic"));
    let catalog = Arc::new(catalog);
    let best_effort = Arc::new(FakeSource::empty("best-effort"));
    let cascade = common::test_cascade(&episodic, &catalog, &best_effort);

    let RunnerParts { runner, provider, .. } = common::test_runner(store.clone(), provider, fetcher);
    let controller = Controller::from_parts(config, store.clone(), cascade, runner);

    Harness {
        controller,
        store,
        catalog,
        parts_provider: provider,
    }
}

fn english_only() -> FakeCatalog {
    FakeCatalog::new(&[("https://os/en.srt", "eng")])
}

fn episode_key() -> ArtifactKey {
    ArtifactKey::new(MediaRef::parse("tt0111161:1:1"), LanguageCode::new("fra"), "openai")
}

fn pending(url: &str) -> SubtitleOutcome {
    SubtitleOutcome::Pending {
        url: url.to_string(),
        lang: "fra-translated".to_string(),
    }
}

#[tokio::test]
async fn test_handleRequest_withOnlyEnglishSource_shouldTranslateInBackground() {
    let dir = common::create_temp_dir().unwrap();
    let (fetcher, gate): (FakeFetcher, Arc<Semaphore>) = FakeFetcher::gated(common::SAMPLE_SRT);
    let h = harness(dir.path(), common::test_config(dir.path()), english_only(), MockProvider::working(), fetcher);
    let request = SubtitleRequest::new("tt0111161:1:1", "fr");

    let first = h.controller.handle_request(&request).await;
    assert_eq!(first, pending(EPISODE_URL));

    let path = h.store.final_path(&episode_key());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), SENTINEL_MESSAGE);
    assert_eq!(
        h.store.record(&episode_key()).await.unwrap().unwrap().state,
        ArtifactState::Pending
    );

    // Still running: same placeholder, no second lookup, no second job
    let second = h.controller.handle_request(&request).await;
    assert_eq!(second, pending(EPISODE_URL));
    assert_eq!(h.catalog.calls(), 1);

    gate.add_permits(1);
    h.controller.drain().await;

    assert_eq!(h.parts_provider.request_count(), 1);
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("[fra] Hello there."));
    assert_eq!(
        h.store.record(&episode_key()).await.unwrap().unwrap().state,
        ArtifactState::Ready
    );

    let third = h.controller.handle_request(&request).await;
    assert_eq!(
        third,
        SubtitleOutcome::Ready {
            url: EPISODE_URL.to_string(),
            lang: "fra-translated".to_string(),
        }
    );
    assert_eq!(h.catalog.calls(), 1);
}

#[tokio::test]
async fn test_handleRequest_withDirectMatch_shouldServeUpstreamUrlAndRemember() {
    let dir = common::create_temp_dir().unwrap();
    let catalog = FakeCatalog::new(&[("https://os/en.srt", "eng"), ("https://os/fr.srt", "fre")]);
    let h = harness(dir.path(), common::test_config(dir.path()), catalog, MockProvider::working(), FakeFetcher::new(common::SAMPLE_SRT));
    let request = SubtitleRequest::new("tt0111161", "fr");

    let first = h.controller.handle_request(&request).await;
    assert_eq!(
        first,
        SubtitleOutcome::Ready {
            url: "https://os/fr.srt".to_string(),
            lang: "fre".to_string(),
        }
    );

    let second = h.controller.handle_request(&request).await;
    assert_eq!(
        second,
        SubtitleOutcome::Ready {
            url: "https://os/fr.srt".to_string(),
            lang: "fra".to_string(),
        }
    );
    assert_eq!(h.catalog.calls(), 1);
    assert_eq!(h.parts_provider.request_count(), 0);
    assert!(h.controller.pipeline().in_flight().is_empty());
}

#[tokio::test]
async fn test_handleRequest_withNothingAnywhere_shouldWriteNoticeAndKeepNoRecord() {
    let dir = common::create_temp_dir().unwrap();
    let h = harness(dir.path(), common::test_config(dir.path()), FakeCatalog::empty(), MockProvider::working(), FakeFetcher::new(common::SAMPLE_SRT));

    let outcome = h.controller.handle_request(&SubtitleRequest::new("tt0111161:1:1", "fr")).await;

    assert_eq!(
        outcome,
        SubtitleOutcome::NotFound {
            url: Some(EPISODE_URL.to_string()),
            lang: "fra-translated".to_string(),
        }
    );
    let content = std::fs::read_to_string(h.store.final_path(&episode_key())).unwrap();
    assert!(content.contains(NOT_FOUND_MESSAGE));
    assert!(h.store.record(&episode_key()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_handleRequest_withNoticeDisabled_shouldWriteNothing() {
    let dir = common::create_temp_dir().unwrap();
    let mut config = common::test_config(dir.path());
    config.write_not_found_notice = false;
    let h = harness(dir.path(), config, FakeCatalog::empty(), MockProvider::working(), FakeFetcher::new(common::SAMPLE_SRT));

    let outcome = h.controller.handle_request(&SubtitleRequest::new("tt0111161:1:1", "fr")).await;

    assert_eq!(
        outcome,
        SubtitleOutcome::NotFound {
            url: None,
            lang: "fra-translated".to_string(),
        }
    );
    assert!(!h.store.final_path(&episode_key()).exists());
}

#[tokio::test]
async fn test_handleRequest_withBadInput_shouldReject() {
    let dir = common::create_temp_dir().unwrap();
    let h = harness(dir.path(), common::test_config(dir.path()), english_only(), MockProvider::working(), FakeFetcher::new(common::SAMPLE_SRT));

    let bad_id = h.controller.handle_request(&SubtitleRequest::new("kitsu:42", "fr")).await;
    assert!(matches!(bad_id, SubtitleOutcome::Rejected { .. }));

    let no_lang = h.controller.handle_request(&SubtitleRequest::new("tt0111161", " ")).await;
    assert!(matches!(no_lang, SubtitleOutcome::Rejected { .. }));

    let path_lang = h.controller.handle_request(&SubtitleRequest::new("tt0111161", "../")).await;
    assert!(matches!(path_lang, SubtitleOutcome::Rejected { .. }));

    let bad_provider = SubtitleRequest {
        provider: Some("babelfish".to_string()),
        ..SubtitleRequest::new("tt0111161", "fr")
    };
    assert!(matches!(
        h.controller.handle_request(&bad_provider).await,
        SubtitleOutcome::Rejected { .. }
    ));
    assert_eq!(h.catalog.calls(), 0);
}

#[tokio::test]
async fn test_handleRequest_withMissingApiKey_shouldRejectBeforeWritingSentinel() {
    let dir = common::create_temp_dir().unwrap();
    let mut config = common::test_config(dir.path());
    config.translation.api_key = String::new();
    let h = harness(dir.path(), config, english_only(), MockProvider::working(), FakeFetcher::new(common::SAMPLE_SRT));

    let outcome = h.controller.handle_request(&SubtitleRequest::new("tt0111161:1:1", "fr")).await;

    assert!(matches!(outcome, SubtitleOutcome::Rejected { .. }));
    assert!(!h.store.final_path(&episode_key()).exists());
    assert!(h.store.record(&episode_key()).await.unwrap().is_none());
    assert!(h.controller.pipeline().in_flight().is_empty());
}

#[tokio::test]
async fn test_handleRequest_withRequestProvider_shouldUseItsNamespace() {
    let dir = common::create_temp_dir().unwrap();
    let (fetcher, gate) = FakeFetcher::gated(common::SAMPLE_SRT);
    let h = harness(dir.path(), common::test_config(dir.path()), english_only(), MockProvider::working(), fetcher);

    let request = SubtitleRequest {
        provider: Some("Google Translate".to_string()),
        ..SubtitleRequest::new("tt0111161", "de")
    };
    let outcome = h.controller.handle_request(&request).await;

    assert_eq!(
        outcome,
        SubtitleOutcome::Pending {
            url: "http://localhost:3000/subtitles/google-translate/deu/tt0111161/tt0111161-translated-1.srt".to_string(),
            lang: "deu-translated".to_string(),
        }
    );

    gate.add_permits(1);
    h.controller.drain().await;
}

#[tokio::test]
async fn test_handleRequest_withStaleSentinel_shouldResolveAgain() {
    let dir = common::create_temp_dir().unwrap();
    let h = harness(dir.path(), common::test_config(dir.path()), english_only(), MockProvider::working(), FakeFetcher::new(common::SAMPLE_SRT));

    // Left over by a process that died mid-job
    assert!(h.store.claim_pending(&episode_key()).await.unwrap());

    let outcome = h.controller.handle_request(&SubtitleRequest::new("tt0111161:1:1", "fr")).await;
    assert_eq!(outcome, pending(EPISODE_URL));
    assert_eq!(h.catalog.calls(), 1);

    h.controller.drain().await;
    assert_eq!(
        h.store.record(&episode_key()).await.unwrap().unwrap().state,
        ArtifactState::Ready
    );
}

#[tokio::test]
async fn test_handleRequest_withOrphanedPendingRecord_shouldQueueAJob() {
    let dir = common::create_temp_dir().unwrap();
    let h = harness(dir.path(), common::test_config(dir.path()), english_only(), MockProvider::working(), FakeFetcher::new(common::SAMPLE_SRT));

    // A Pending row whose placeholder never made it to disk
    assert!(h.store.claim_pending(&episode_key()).await.unwrap());
    std::fs::remove_file(h.store.final_path(&episode_key())).unwrap();

    let request = SubtitleRequest::new("tt0111161:1:1", "fr");
    assert_eq!(h.controller.handle_request(&request).await, pending(EPISODE_URL));

    h.controller.drain().await;

    assert_eq!(h.parts_provider.request_count(), 1);
    assert_eq!(
        h.store.record(&episode_key()).await.unwrap().unwrap().state,
        ArtifactState::Ready
    );
    assert_eq!(
        h.controller.handle_request(&request).await,
        SubtitleOutcome::Ready {
            url: EPISODE_URL.to_string(),
            lang: "fra-translated".to_string(),
        }
    );
}

#[tokio::test]
async fn test_handleRequest_afterFailedJob_shouldQueueAFreshJob() {
    let dir = common::create_temp_dir().unwrap();
    let failing = harness(dir.path(), common::test_config(dir.path()), english_only(), MockProvider::dropping_last(), FakeFetcher::new(common::SAMPLE_SRT));
    let request = SubtitleRequest::new("tt0111161:1:1", "fr");

    failing.controller.handle_request(&request).await;
    failing.controller.drain().await;
    assert_eq!(
        failing.store.record(&episode_key()).await.unwrap().unwrap().state,
        ArtifactState::Failed
    );

    // Same directory and a working provider: the leftover sentinel is stale
    let store = failing.store.clone();
    let episodic = Arc::new(FakeSource::empty("episodic"));
    let catalog = Arc::new(english_only());
    let best_effort = Arc::new(FakeSource::empty("best-effort"));
    let cascade = common::test_cascade(&episodic, &catalog, &best_effort);
    let parts = common::test_runner(store.clone(), MockProvider::working(), FakeFetcher::new(common::SAMPLE_SRT));
    let controller = Controller::from_parts(common::test_config(dir.path()), store.clone(), cascade, parts.runner);

    assert_eq!(controller.handle_request(&request).await, pending(EPISODE_URL));
    controller.drain().await;

    assert_eq!(
        store.record(&episode_key()).await.unwrap().unwrap().state,
        ArtifactState::Ready
    );
    assert_eq!(parts.provider.request_count(), 1);
}

#[tokio::test]
async fn test_outcome_shouldSerializeWithStatusTag() {
    let json = serde_json::to_value(pending(EPISODE_URL)).unwrap();
    assert_eq!(json["status"], "pending");
    assert_eq!(json["lang"], "fra-translated");
}
