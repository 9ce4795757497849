/*!
 * Upstream subtitle sources.
 *
 * Each adapter answers one question: is there a subtitle for this media in
 * this language? Adapters report failures as [`SourceError`]; deciding what a
 * failure means is left to the resolution cascade.
 *
 * - `gestdown`: episodic source, needs a TMDB key to translate ids
 * - `opensubtitles`: catalog source returning every track for a media item
 * - `wyzie`: best-effort search
 */

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::errors::SourceError;
use crate::language_utils::LanguageCode;
use crate::media::{MediaRef, SubtitleCandidate};

pub mod gestdown;
pub mod opensubtitles;
pub mod tmdb;
pub mod wyzie;

pub use gestdown::Gestdown;
pub use opensubtitles::OpenSubtitles;
pub use tmdb::TmdbClient;
pub use wyzie::Wyzie;

/// Credentials some sources need, supplied per request
#[derive(Debug, Clone, Default)]
pub struct SourceCredentials {
    /// TMDB API key for IMDB to TVDB id translation
    pub tmdb_api_key: Option<String>,
}

impl SourceCredentials {
    pub fn with_tmdb_key(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            tmdb_api_key: if key.trim().is_empty() { None } else { Some(key) },
        }
    }

    /// The TMDB key, if present and non-empty
    pub fn tmdb_key(&self) -> Option<&str> {
        self.tmdb_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

/// A source queried with an optional language filter
#[async_trait]
pub trait SubtitleSource: Send + Sync {
    /// Adapter name, for logs and candidates
    fn name(&self) -> &'static str;

    /// Find at most one candidate; `None` filter means any language
    async fn find(
        &self,
        media: &MediaRef,
        language: Option<&LanguageCode>,
        credentials: &SourceCredentials,
    ) -> Result<Option<SubtitleCandidate>, SourceError>;
}

/// A source that returns its whole result set in one call
#[async_trait]
pub trait CatalogSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Every candidate the source knows for the media, in source order
    async fn list(&self, media: &MediaRef) -> Result<Vec<SubtitleCandidate>, SourceError>;
}

/// HTTP client with the adapter's request timeout
pub(crate) fn build_client(timeout: Duration) -> anyhow::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("subrelay/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build source HTTP client: {}", e))
}

/// GET a URL and decode its JSON body, mapping failures to `SourceError`
pub(crate) async fn get_json<T: serde::de::DeserializeOwned>(
    client: &Client,
    source_name: &'static str,
    url: &str,
    query: &[(&str, &str)],
) -> Result<T, SourceError> {
    let response = client
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(|e| SourceError::from_reqwest(source_name, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Unavailable {
            source_name,
            message: format!("HTTP {} from {}", status, url),
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| SourceError::from_reqwest(source_name, e))
}
