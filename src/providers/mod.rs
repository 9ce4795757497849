/*!
 * Translation provider clients.
 *
 * - `google`: Google Translate web endpoint, bulk text with a separator
 * - `openai`: any OpenAI-compatible chat completions API (OpenAI, Gemini,
 *   OpenRouter, Groq, Together AI, custom servers)
 * - `anthropic`: Anthropic Messages API
 * - `mock`: scripted provider for tests
 *
 * Providers return what the service returned, split into units. Checking the
 * unit count is the pipeline's job.
 */

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::{ProviderCategory, TranslationConfig, TranslationProvider};
use crate::errors::{ProviderError, TranslationError};
use crate::language_utils::LanguageCode;

pub mod anthropic;
pub mod google;
pub mod mock;
pub mod openai;
pub mod structured;

pub use anthropic::Anthropic;
pub use google::GoogleTranslate;
pub use mock::MockProvider;
pub use openai::OpenAICompatible;

/// Common trait for all translation providers
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Translate ordered units into `target`
    ///
    /// The result may hold a different number of units than `units` when
    /// the service merged or split lines.
    async fn translate_units(&self, units: &[String], target: &LanguageCode) -> Result<Vec<String>, ProviderError>;
}

/// Everything needed to build a provider client for one job
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub kind: TranslationProvider,
    pub api_key: Option<String>,
    /// Base URL override; the provider default when absent
    pub endpoint: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl ProviderSettings {
    /// Settings from the config file, for requests that bring nothing of their own
    pub fn from_config(config: &TranslationConfig) -> Self {
        Self {
            kind: config.provider,
            api_key: non_empty(&config.api_key),
            endpoint: non_empty(&config.get_endpoint()),
            model: config.model.clone(),
            temperature: config.temperature,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Artifact namespace for this provider
    pub fn namespace(&self) -> String {
        self.kind.to_lowercase_string()
    }

    /// Base URL for requests
    pub fn resolved_endpoint(&self) -> Option<String> {
        self.endpoint
            .clone()
            .or_else(|| self.kind.default_endpoint().map(str::to_string))
    }

    /// Check the settings can produce a working client
    pub fn validate(&self) -> Result<(), TranslationError> {
        if self.kind.requires_api_key() && self.api_key.is_none() {
            return Err(TranslationError::Configuration(format!(
                "{} needs an API key",
                self.kind.display_name()
            )));
        }
        if self.resolved_endpoint().is_none() {
            return Err(TranslationError::Configuration(format!(
                "{} needs a base URL",
                self.kind.display_name()
            )));
        }
        if self.kind != TranslationProvider::GoogleTranslate && self.model.trim().is_empty() {
            return Err(TranslationError::Configuration(format!(
                "{} needs a model name",
                self.kind.display_name()
            )));
        }
        Ok(())
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Build a provider client from settings
pub fn build_provider(settings: &ProviderSettings) -> Result<Arc<dyn Provider>, TranslationError> {
    settings.validate()?;

    let endpoint = settings.resolved_endpoint().unwrap_or_default();
    let api_key = settings.api_key.clone().unwrap_or_default();

    let provider: Arc<dyn Provider> = match (settings.kind.category(), settings.kind) {
        (ProviderCategory::BulkText, _) => Arc::new(GoogleTranslate::new(&endpoint, settings.timeout)?),
        (ProviderCategory::Structured, TranslationProvider::Anthropic) => Arc::new(Anthropic::new(
            api_key,
            endpoint,
            settings.model.clone(),
            settings.temperature,
            settings.timeout,
        )?),
        (ProviderCategory::Structured, kind) => Arc::new(OpenAICompatible::new(
            kind.display_name(),
            api_key,
            endpoint,
            settings.model.clone(),
            settings.temperature,
            settings.timeout,
        )?),
    };

    Ok(provider)
}
