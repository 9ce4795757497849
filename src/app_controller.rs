use anyhow::{anyhow, Result};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::{Config, TranslationProvider};
use crate::artifacts::{ArtifactStore, Inspection};
use crate::database::{ArtifactKey, ArtifactRecord, DatabaseConnection, Repository, StoreStats};
use crate::language_utils::{self, LanguageCode, UNDETERMINED};
use crate::media::MediaRef;
use crate::providers::ProviderSettings;
use crate::resolver::Cascade;
use crate::sources::{Gestdown, OpenSubtitles, SourceCredentials, TmdbClient, Wyzie};
use crate::translation::{
    ChunkLimits, DefaultProviderFactory, FileDiagnosticSink, HttpFetcher, JobRunner, RetryPolicy,
    TranslationJob, TranslationPipeline,
};

// @module: Request entry point

/// One subtitle request, as the addon receives it
#[derive(Debug, Clone, Default)]
pub struct SubtitleRequest {
    /// Addon-style id: `tt123` or `tt123:S:E`
    pub media_id: String,
    pub target_language: String,
    /// Provider name; the configured provider when absent
    pub provider: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub tmdb_api_key: Option<String>,
}

impl SubtitleRequest {
    pub fn new(media_id: impl Into<String>, target_language: impl Into<String>) -> Self {
        Self {
            media_id: media_id.into(),
            target_language: target_language.into(),
            ..Default::default()
        }
    }
}

/// What the caller gets back; never an error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubtitleOutcome {
    /// A usable subtitle
    Ready { url: String, lang: String },
    /// A translation is queued; the URL serves the sentinel until it finishes
    Pending { url: String, lang: String },
    /// Nothing anywhere; the URL points at the notice file when one was written
    NotFound { url: Option<String>, lang: String },
    /// The request itself is unusable
    Rejected { reason: String },
    /// Storage or queue failure while serving the request
    Failed { reason: String },
}

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
    store: ArtifactStore,
    cascade: Cascade,
    pipeline: TranslationPipeline,
}

impl Controller {
    /// Build a controller with real sources and providers
    ///
    /// Spawns the pipeline workers, so it must run inside a tokio runtime.
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;

        let db = match &config.database_path {
            Some(path) => DatabaseConnection::new(path)?,
            None => DatabaseConnection::new_default()?,
        };
        let store = ArtifactStore::new(Repository::new(db), &config.subtitles_dir, &config.base_url);

        let timeout = Duration::from_secs(config.sources.timeout_secs);
        let sources = &config.sources;
        let cascade = Cascade::new(
            Arc::new(Gestdown::new(
                &sources.gestdown_url,
                TmdbClient::new(&sources.tmdb_url, timeout)?,
                timeout,
            )?),
            Arc::new(OpenSubtitles::new(&sources.opensubtitles_url, timeout)?),
            Arc::new(Wyzie::new(&sources.wyzie_url, timeout)?),
            config.pivot_language(),
        );

        let runner = JobRunner::new(
            store.clone(),
            Arc::new(HttpFetcher::new(Duration::from_secs(config.translation.timeout_secs))?),
            Arc::new(DefaultProviderFactory),
        )
        .with_diagnostics(Arc::new(FileDiagnosticSink::new(&config.translation.debug_dir)))
        .with_retry(Self::retry_policy(&config));

        Ok(Self::from_parts(config, store, cascade, runner))
    }

    /// Assemble a controller from prepared parts
    pub fn from_parts(config: Config, store: ArtifactStore, cascade: Cascade, runner: JobRunner) -> Self {
        let pipeline = TranslationPipeline::start(runner, config.translation.workers);
        Self {
            config,
            store,
            cascade,
            pipeline,
        }
    }

    /// Retry policy described by the config
    pub fn retry_policy(config: &Config) -> RetryPolicy {
        RetryPolicy {
            max_attempts: config.translation.retry_count.max(1),
            backoff_unit: Duration::from_millis(config.translation.retry_backoff_ms),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn pipeline(&self) -> &TranslationPipeline {
        &self.pipeline
    }

    /// Serve a subtitle request
    ///
    /// Store first, then the cascade. A direct language match is returned as
    /// is; anything else is queued for translation and answered with the
    /// placeholder URL.
    pub async fn handle_request(&self, request: &SubtitleRequest) -> SubtitleOutcome {
        let media = MediaRef::parse(&request.media_id);
        if !media.is_known() {
            return SubtitleOutcome::Rejected {
                reason: format!("Invalid media id: {}", request.media_id),
            };
        }

        let target = language_utils::normalize(&request.target_language);
        if target.as_str() == UNDETERMINED {
            return SubtitleOutcome::Rejected {
                reason: format!("Missing or invalid target language: {:?}", request.target_language),
            };
        }

        let settings = match self.provider_settings(request) {
            Ok(settings) => settings,
            Err(e) => return SubtitleOutcome::Rejected { reason: e.to_string() },
        };

        let key = ArtifactKey::new(media.clone(), target.clone(), settings.namespace());
        let translated_lang = format!("{}-translated", target);

        if self.pipeline.in_flight().contains(&key) {
            debug!("Translation already in flight for {}", key);
            return self.pending(&key, &translated_lang);
        }

        let inspection = match self.store.inspect(&key).await {
            Ok(inspection) => inspection,
            Err(e) => {
                error!("Could not clear stale placeholder for {}: {:#}", key, e);
                return SubtitleOutcome::Failed { reason: format!("{:#}", e) };
            }
        };

        if inspection == Inspection::Clear {
            match self.store.lookup(&key).await {
                Ok(Some(record)) => return self.serve_record(&record, &target, &translated_lang),
                Ok(None) => {}
                Err(e) => {
                    error!("Artifact lookup failed for {}: {}", key, e);
                    return SubtitleOutcome::Failed { reason: e.to_string() };
                }
            }
        }

        let credentials = self.credentials(request);
        let Some(resolution) = self.cascade.resolve(&media, &target, &credentials).await else {
            return self.not_found(&key, translated_lang);
        };
        let candidate = resolution.candidate;

        if candidate.lang == target {
            info!("Direct {} match for {} at step {}", target, media, resolution.step);
            if let Err(e) = self.store.record_remote(&key, &candidate.source_url).await {
                warn!("Could not record direct match for {}: {}", key, e);
            }
            return SubtitleOutcome::Ready {
                url: candidate.source_url,
                lang: candidate.raw_lang,
            };
        }

        if let Err(e) = settings.validate() {
            return SubtitleOutcome::Rejected { reason: e.to_string() };
        }

        let Some(guard) = self.pipeline.in_flight().try_claim(&key) else {
            return self.pending(&key, &translated_lang);
        };

        match self.store.claim_pending(&key).await {
            Ok(true) => {}
            Ok(false) => {
                debug!("Another request already owns {}", key);
                return self.pending(&key, &translated_lang);
            }
            Err(e) => {
                error!("Could not mark {} as pending: {}", key, e);
                return SubtitleOutcome::Failed { reason: e.to_string() };
            }
        }

        info!(
            "Queueing {} translation of {} ({} track from {})",
            target, media, candidate.lang, candidate.source_name
        );
        let job = TranslationJob::new(key.clone(), candidate, settings, self.chunk_limits());
        if let Err(e) = self.pipeline.enqueue(job, guard) {
            error!("Could not queue translation for {}: {}", key, e);
            return SubtitleOutcome::Failed { reason: e.to_string() };
        }

        self.pending(&key, &translated_lang)
    }

    fn serve_record(&self, record: &ArtifactRecord, target: &LanguageCode, translated_lang: &str) -> SubtitleOutcome {
        let lang = if record.is_remote() {
            target.to_string()
        } else {
            translated_lang.to_string()
        };
        SubtitleOutcome::Ready {
            url: self.store.url_for_location(&record.location),
            lang,
        }
    }

    fn pending(&self, key: &ArtifactKey, translated_lang: &str) -> SubtitleOutcome {
        SubtitleOutcome::Pending {
            url: self.store.public_url(key),
            lang: translated_lang.to_string(),
        }
    }

    fn not_found(&self, key: &ArtifactKey, lang: String) -> SubtitleOutcome {
        if !self.config.write_not_found_notice {
            return SubtitleOutcome::NotFound { url: None, lang };
        }

        match self.store.write_not_found_notice(key) {
            Ok(()) => SubtitleOutcome::NotFound {
                url: Some(self.store.public_url(key)),
                lang,
            },
            Err(e) => {
                warn!("Could not write not-found notice for {}: {}", key, e);
                SubtitleOutcome::NotFound { url: None, lang }
            }
        }
    }

    /// Provider settings for a request, layered over the config
    ///
    /// Credentials from the config only carry over when the request uses the
    /// configured provider.
    pub fn provider_settings(&self, request: &SubtitleRequest) -> Result<ProviderSettings> {
        let mut settings = ProviderSettings::from_config(&self.config.translation);

        if let Some(name) = request.provider.as_deref().filter(|n| !n.trim().is_empty()) {
            let kind = TranslationProvider::from_str(name)?;
            if kind != settings.kind {
                settings.kind = kind;
                settings.api_key = None;
                settings.endpoint = None;
            }
        }

        if let Some(key) = non_blank(&request.api_key) {
            settings.api_key = Some(key);
        }
        if let Some(url) = non_blank(&request.base_url) {
            url::Url::parse(&url).map_err(|e| anyhow!("Invalid base URL '{}': {}", url, e))?;
            settings.endpoint = Some(url);
        }
        if let Some(model) = non_blank(&request.model) {
            settings.model = model;
        }

        Ok(settings)
    }

    fn credentials(&self, request: &SubtitleRequest) -> SourceCredentials {
        let key = non_blank(&request.tmdb_api_key).unwrap_or_else(|| self.config.sources.tmdb_api_key.clone());
        SourceCredentials::with_tmdb_key(key)
    }

    fn chunk_limits(&self) -> ChunkLimits {
        ChunkLimits {
            max_units: self.config.translation.max_units_per_chunk,
            max_chars: self.config.translation.max_chars_per_chunk,
        }
    }

    /// Stored record for a request's key, without cleanup
    pub async fn status(&self, request: &SubtitleRequest) -> Result<Option<ArtifactRecord>> {
        let media = MediaRef::parse(&request.media_id);
        if !media.is_known() {
            return Err(anyhow!("Invalid media id: {}", request.media_id));
        }
        let settings = self.provider_settings(request)?;
        let key = ArtifactKey::new(media, language_utils::normalize(&request.target_language), settings.namespace());
        self.store.record(&key).await
    }

    pub async fn stats(&self) -> Result<StoreStats> {
        self.store.stats().await
    }

    /// Stop accepting jobs and wait for queued ones to finish
    pub async fn drain(&self) {
        self.pipeline.drain().await;
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
