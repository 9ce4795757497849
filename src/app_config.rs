use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::{Path, PathBuf};

use crate::language_utils::{self, LanguageCode};

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Public base URL under which `subtitles/` is served
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Root directory for translated artifacts and sentinels
    #[serde(default = "default_subtitles_dir")]
    pub subtitles_dir: PathBuf,

    /// SQLite database file; the platform data directory when absent
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Language used as translation source when no direct match exists
    #[serde(default = "default_pivot_language")]
    pub pivot_language: String,

    /// Write a visible notice file when no subtitle exists anywhere
    #[serde(default = "default_true")]
    pub write_not_found_notice: bool,

    /// Upstream subtitle sources
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Translation config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: Google Translate web endpoint (bulk text)
    #[default]
    #[serde(rename = "google-translate")]
    GoogleTranslate,
    // @provider: OpenAI
    OpenAI,
    // @provider: Google Gemini through its OpenAI-compatible endpoint
    Gemini,
    // @provider: OpenRouter
    OpenRouter,
    // @provider: Groq
    Groq,
    // @provider: Together AI
    Together,
    // @provider: Anthropic
    Anthropic,
    // @provider: Any OpenAI-compatible server, base URL required
    Custom,
}

/// How a provider expects its translation units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderCategory {
    /// Units joined into one string with a separator token
    BulkText,
    /// Units sent and received as an indexed JSON list
    Structured,
}

impl TranslationProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::GoogleTranslate => "Google Translate",
            Self::OpenAI => "OpenAI",
            Self::Gemini => "Google Gemini",
            Self::OpenRouter => "OpenRouter",
            Self::Groq => "Groq",
            Self::Together => "Together AI",
            Self::Anthropic => "Anthropic",
            Self::Custom => "Custom",
        }
    }

    // @returns: Lowercase provider identifier, also the artifact namespace
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::GoogleTranslate => "google-translate".to_string(),
            Self::OpenAI => "openai".to_string(),
            Self::Gemini => "gemini".to_string(),
            Self::OpenRouter => "openrouter".to_string(),
            Self::Groq => "groq".to_string(),
            Self::Together => "together".to_string(),
            Self::Anthropic => "anthropic".to_string(),
            Self::Custom => "custom".to_string(),
        }
    }

    pub fn category(&self) -> ProviderCategory {
        match self {
            Self::GoogleTranslate => ProviderCategory::BulkText,
            _ => ProviderCategory::Structured,
        }
    }

    /// Whether requests fail without an API key
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Self::GoogleTranslate | Self::Custom)
    }

    /// Default endpoint, if the provider has a well-known one
    pub fn default_endpoint(&self) -> Option<&'static str> {
        match self {
            Self::GoogleTranslate => Some("https://translate.googleapis.com"),
            Self::OpenAI => Some("https://api.openai.com/v1"),
            Self::Gemini => Some("https://generativelanguage.googleapis.com/v1beta/openai"),
            Self::OpenRouter => Some("https://openrouter.ai/api/v1"),
            Self::Groq => Some("https://api.groq.com/openai/v1"),
            Self::Together => Some("https://api.together.xyz/v1"),
            Self::Anthropic => Some("https://api.anthropic.com"),
            Self::Custom => None,
        }
    }
}

// Implement Display trait for TranslationProvider
impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

// Accepts both identifiers and the display names the addon UI uses
impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let key: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match key.as_str() {
            "googletranslate" | "google" => Ok(Self::GoogleTranslate),
            "openai" | "chatgptapi" | "chatgpt" => Ok(Self::OpenAI),
            "gemini" | "googlegemini" => Ok(Self::Gemini),
            "openrouter" => Ok(Self::OpenRouter),
            "groq" => Ok(Self::Groq),
            "together" | "togetherai" => Ok(Self::Together),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "custom" => Ok(Self::Custom),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Upstream subtitle source configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SourcesConfig {
    /// OpenSubtitles v3 addon base URL (catalog source)
    #[serde(default = "default_opensubtitles_url")]
    pub opensubtitles_url: String,

    /// Gestdown API base URL (episodic source)
    #[serde(default = "default_gestdown_url")]
    pub gestdown_url: String,

    /// TMDB API base URL, used to translate IMDB ids for Gestdown
    #[serde(default = "default_tmdb_url")]
    pub tmdb_url: String,

    /// Wyzie subs API base URL (best-effort source)
    #[serde(default = "default_wyzie_url")]
    pub wyzie_url: String,

    /// Default TMDB API key when a request carries none
    #[serde(default = "String::new")]
    pub tmdb_api_key: String,

    /// Per-request timeout for every source, in seconds
    #[serde(default = "default_source_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            opensubtitles_url: default_opensubtitles_url(),
            gestdown_url: default_gestdown_url(),
            tmdb_url: default_tmdb_url(),
            wyzie_url: default_wyzie_url(),
            tmdb_api_key: String::new(),
            timeout_secs: default_source_timeout_secs(),
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Translation provider to use when a request names none
    #[serde(default)]
    pub provider: TranslationProvider,

    /// API key for the provider
    #[serde(default = "String::new")]
    pub api_key: String,

    /// Service URL, empty for the provider default
    #[serde(default = "String::new")]
    pub endpoint: String,

    /// Model name for chat-based providers
    #[serde(default = "default_model")]
    pub model: String,

    /// Temperature parameter for text generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Provider request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Attempts per chunk before the job fails
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Backoff unit in milliseconds; attempt `n` waits `n` units
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Maximum subtitle cues per provider call
    #[serde(default = "default_max_units_per_chunk")]
    pub max_units_per_chunk: usize,

    /// Maximum subtitle characters per provider call
    #[serde(default = "default_max_chars_per_chunk")]
    pub max_chars_per_chunk: usize,

    /// Number of pipeline workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Directory for count-mismatch diagnostic dumps
    #[serde(default = "default_debug_dir")]
    pub debug_dir: PathBuf,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            api_key: String::new(),
            endpoint: String::new(),
            model: default_model(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            max_units_per_chunk: default_max_units_per_chunk(),
            max_chars_per_chunk: default_max_chars_per_chunk(),
            workers: default_workers(),
            debug_dir: default_debug_dir(),
        }
    }
}

impl TranslationConfig {
    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        if !self.endpoint.is_empty() {
            return self.endpoint.clone();
        }
        self.provider
            .default_endpoint()
            .map(str::to_string)
            .unwrap_or_default()
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_subtitles_dir() -> PathBuf {
    PathBuf::from("subtitles")
}

fn default_pivot_language() -> String {
    "eng".to_string()
}

fn default_true() -> bool {
    true
}

fn default_opensubtitles_url() -> String {
    "https://opensubtitles-v3.strem.io".to_string()
}

fn default_gestdown_url() -> String {
    "https://api.gestdown.info".to_string()
}

fn default_tmdb_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_wyzie_url() -> String {
    "https://sub.wyzie.ru".to_string()
}

fn default_source_timeout_secs() -> u64 {
    8
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000 // attempt n waits n seconds
}

fn default_max_units_per_chunk() -> usize {
    60
}

fn default_max_chars_per_chunk() -> usize {
    4000
}

fn default_workers() -> usize {
    1
}

fn default_debug_dir() -> PathBuf {
    PathBuf::from("debug")
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        let pivot = self.pivot_language();
        if pivot.as_str().chars().count() != 3 {
            return Err(anyhow!(
                "Pivot language '{}' does not normalize to a three-letter code",
                self.pivot_language
            ));
        }

        url::Url::parse(&self.base_url)
            .with_context(|| format!("base_url '{}' is not a valid URL", self.base_url))?;

        if self.translation.retry_count == 0 {
            return Err(anyhow!("translation.retry_count must be at least 1"));
        }

        if self.translation.workers == 0 {
            return Err(anyhow!("translation.workers must be at least 1"));
        }

        if self.translation.max_units_per_chunk == 0 {
            return Err(anyhow!("translation.max_units_per_chunk must be at least 1"));
        }

        if self.translation.provider == TranslationProvider::Custom
            && self.translation.endpoint.is_empty()
        {
            return Err(anyhow!("The custom provider needs translation.endpoint"));
        }

        Ok(())
    }

    /// Normalized pivot language
    pub fn pivot_language(&self) -> LanguageCode {
        language_utils::normalize(&self.pivot_language)
    }

    /// Load a JSON config file, creating a default one when it is missing
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<(Self, bool)> {
        let path = path.as_ref();
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            Ok((config, false))
        } else {
            let config = Config::default();
            let config_json = serde_json::to_string_pretty(&config)
                .context("Failed to serialize default config to JSON")?;
            std::fs::write(path, config_json).with_context(|| {
                format!("Failed to write default config to file: {}", path.display())
            })?;
            Ok((config, true))
        }
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: default_base_url(),
            subtitles_dir: default_subtitles_dir(),
            database_path: None,
            pivot_language: default_pivot_language(),
            write_not_found_notice: true,
            sources: SourcesConfig::default(),
            translation: TranslationConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
