/*!
 * Tests for the resolution cascade
 */

use std::sync::Arc;

use subrelay::language_utils::LanguageCode;
use subrelay::media::MediaRef;
use subrelay::resolver::{Adapter, LanguageFilter};
use subrelay::sources::SourceCredentials;

use crate::common::{self, FakeCatalog, FakeSource};

fn episode() -> MediaRef {
    MediaRef::parse("tt0111161:1:1")
}

fn lang(code: &str) -> Option<LanguageCode> {
    Some(LanguageCode::new(code))
}

#[tokio::test]
async fn test_resolve_withOnlyPivotInCatalog_shouldHitAtStepFiveAndFetchCatalogOnce() {
    let episodic = Arc::new(FakeSource::empty("episodic"));
    let catalog = Arc::new(FakeCatalog::new(&[("https://os/en.srt", "eng")]));
    let best_effort = Arc::new(FakeSource::empty("best-effort"));
    let cascade = common::test_cascade(&episodic, &catalog, &best_effort);

    let resolution = cascade
        .resolve(&episode(), &LanguageCode::new("fr"), &SourceCredentials::default())
        .await
        .unwrap();

    assert_eq!(resolution.step, 5);
    assert_eq!(resolution.probe.adapter, Adapter::Catalog);
    assert_eq!(resolution.probe.filter, LanguageFilter::Pivot);
    assert_eq!(resolution.candidate.source_url, "https://os/en.srt");
    assert_eq!(resolution.candidate.lang.as_str(), "eng");

    assert_eq!(catalog.calls(), 1);
    assert_eq!(episodic.calls(), vec![lang("fr"), lang("en")]);
    assert_eq!(best_effort.calls(), vec![lang("fr")]);
}

#[tokio::test]
async fn test_resolve_withTargetFromEpisodicSource_shouldStopAtStepOne() {
    let episodic = Arc::new(FakeSource::empty("episodic").with_answer(Some("fr"), "https://gd/fr.srt", "French"));
    let catalog = Arc::new(FakeCatalog::new(&[("https://os/fr.srt", "fre")]));
    let best_effort = Arc::new(FakeSource::empty("best-effort"));
    let cascade = common::test_cascade(&episodic, &catalog, &best_effort);

    let resolution = cascade
        .resolve(&episode(), &LanguageCode::new("fra"), &SourceCredentials::default())
        .await
        .unwrap();

    assert_eq!(resolution.step, 1);
    assert_eq!(resolution.candidate.source_url, "https://gd/fr.srt");
    assert_eq!(catalog.calls(), 0);
    assert!(best_effort.calls().is_empty());
}

#[tokio::test]
async fn test_resolve_withMovie_shouldSkipEpisodicSource() {
    let episodic = Arc::new(FakeSource::empty("episodic"));
    let catalog = Arc::new(FakeCatalog::new(&[("https://os/de.srt", "ger")]));
    let best_effort = Arc::new(FakeSource::empty("best-effort"));
    let cascade = common::test_cascade(&episodic, &catalog, &best_effort);

    let resolution = cascade
        .resolve(&MediaRef::parse("tt0111161"), &LanguageCode::new("de"), &SourceCredentials::default())
        .await
        .unwrap();

    assert_eq!(resolution.step, 2);
    assert_eq!(resolution.candidate.raw_lang, "ger");
    assert!(episodic.calls().is_empty());
}

#[tokio::test]
async fn test_resolve_withEverythingMissing_shouldReturnNoneAfterEveryProbe() {
    let episodic = Arc::new(FakeSource::empty("episodic"));
    let catalog = Arc::new(FakeCatalog::empty());
    let best_effort = Arc::new(FakeSource::empty("best-effort"));
    let cascade = common::test_cascade(&episodic, &catalog, &best_effort);

    let resolution = cascade
        .resolve(&episode(), &LanguageCode::new("fr"), &SourceCredentials::default())
        .await;

    assert!(resolution.is_none());
    assert_eq!(catalog.calls(), 1);
    assert_eq!(episodic.calls().len(), 2);
    assert_eq!(best_effort.calls(), vec![lang("fr"), lang("en"), None]);
}

#[tokio::test]
async fn test_resolve_withFailingSources_shouldTreatFailuresAsMisses() {
    let episodic = Arc::new(FakeSource::failing("episodic"));
    let catalog = Arc::new(FakeCatalog::failing());
    let best_effort = Arc::new(FakeSource::empty("best-effort").with_answer(None, "https://wy/es.srt", "es"));
    let cascade = common::test_cascade(&episodic, &catalog, &best_effort);

    let resolution = cascade
        .resolve(&episode(), &LanguageCode::new("fr"), &SourceCredentials::default())
        .await
        .unwrap();

    assert_eq!(resolution.step, 8);
    assert_eq!(resolution.candidate.lang.as_str(), "spa");
    assert_eq!(catalog.calls(), 1);
}

#[tokio::test]
async fn test_resolve_withTargetEqualToPivot_shouldSkipPivotProbes() {
    let episodic = Arc::new(FakeSource::empty("episodic"));
    let catalog = Arc::new(FakeCatalog::empty());
    let best_effort = Arc::new(FakeSource::empty("best-effort").with_answer(None, "https://wy/it.srt", "it"));
    let cascade = common::test_cascade(&episodic, &catalog, &best_effort);

    let resolution = cascade
        .resolve(&episode(), &LanguageCode::new("en"), &SourceCredentials::default())
        .await
        .unwrap();

    assert_eq!(resolution.step, 8);
    assert_eq!(episodic.calls(), vec![lang("en")]);
    assert_eq!(best_effort.calls(), vec![lang("en"), None]);
}

#[test]
fn test_resolve_withCatalogAnyLanguage_shouldTakeFirstEntry() {
    let episodic = Arc::new(FakeSource::empty("episodic"));
    let catalog = Arc::new(FakeCatalog::new(&[("https://os/ko.srt", "kor"), ("https://os/ja.srt", "jpn")]));
    let best_effort = Arc::new(FakeSource::empty("best-effort"));
    let cascade = common::test_cascade(&episodic, &catalog, &best_effort);

    let resolution = tokio_test::block_on(async {
        cascade
            .resolve(&MediaRef::parse("tt0111161"), &LanguageCode::new("fr"), &SourceCredentials::default())
            .await
    })
    .unwrap();

    assert_eq!(resolution.step, 7);
    assert_eq!(resolution.candidate.source_url, "https://os/ko.srt");
    assert_eq!(best_effort.calls(), vec![lang("fr"), lang("en")]);
}
