/*!
 * Common test utilities for the subrelay test suite
 */

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

use subrelay::app_config::{Config, TranslationProvider};
use subrelay::artifacts::ArtifactStore;
use subrelay::database::Repository;
use subrelay::language_utils::LanguageCode;
use subrelay::providers::{MockProvider, ProviderSettings};
use subrelay::resolver::Cascade;
use subrelay::translation::{JobRunner, MemorySink, RecordingDelay, RetryPolicy};


pub use fakes::{FakeCatalog, FakeFetcher, FakeSource, FixedProviderFactory};

/// Three-cue English subtitle used as the download body
pub const SAMPLE_SRT: &str = "1
00:00:01,000 --> 00:00:04,000
Hello there.

2
00:00:05,000 --> 00:00:09,000
How are you?

3
00:00:10,000 --> 00:00:14,000
Goodbye.
";

/// Route library logs to the test output; safe to call more than once
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Store over an in-memory database, rooted in `dir`
pub fn test_store(dir: &Path) -> ArtifactStore {
    init_logging();
    ArtifactStore::new(
        Repository::new_in_memory().expect("in-memory database"),
        dir.join("subtitles"),
        "http://localhost:3000",
    )
}

/// Config rooted in `dir`, using OpenAI with a key so jobs validate
pub fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.subtitles_dir = dir.join("subtitles");
    config.base_url = "http://localhost:3000".to_string();
    config.translation.provider = TranslationProvider::OpenAI;
    config.translation.api_key = "test-key".to_string();
    config.translation.debug_dir = dir.join("debug");
    config.translation.retry_backoff_ms = 1000;
    config
}

/// Provider settings that pass validation
pub fn test_settings() -> ProviderSettings {
    ProviderSettings::from_config(&test_config(Path::new(".")).translation)
}

/// Cascade over fakes, pivoting through English
pub fn test_cascade(
    episodic: &Arc<FakeSource>,
    catalog: &Arc<FakeCatalog>,
    best_effort: &Arc<FakeSource>,
) -> Cascade {
    Cascade::new(
        episodic.clone(),
        catalog.clone(),
        best_effort.clone(),
        LanguageCode::new("en"),
    )
}

/// Everything a runner test wants to look at afterwards
pub struct RunnerParts {
    pub runner: JobRunner,
    pub provider: MockProvider,
    pub delay: Arc<RecordingDelay>,
    pub dumps: Arc<MemorySink>,
    pub fetcher: Arc<FakeFetcher>,
}

/// Runner with a scripted provider, recorded delays and in-memory dumps
pub fn test_runner(store: ArtifactStore, provider: MockProvider, fetcher: FakeFetcher) -> RunnerParts {
    let delay = Arc::new(RecordingDelay::new());
    let dumps = Arc::new(MemorySink::new());
    let fetcher = Arc::new(fetcher);

    let runner = JobRunner::new(
        store,
        fetcher.clone(),
        Arc::new(FixedProviderFactory::new(provider.clone())),
    )
    .with_diagnostics(dumps.clone())
    .with_delay(delay.clone())
    .with_retry(RetryPolicy::default());

    RunnerParts {
        runner,
        provider,
        delay,
        dumps,
        fetcher,
    }
}
