use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{SourceCredentials, SubtitleSource};
use crate::errors::SourceError;
use crate::language_utils::LanguageCode;
use crate::media::{MediaRef, SubtitleCandidate};

const SOURCE_NAME: &str = "wyzie";

/// Wyzie subs search, queried as a last resort
pub struct Wyzie {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct WyzieSubtitle {
    url: String,
    #[serde(alias = "lang")]
    language: String,
}

impl Wyzie {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: super::build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Query parameters for a search; the language goes out in two-letter form
    fn search_query(media: &MediaRef, language: Option<&LanguageCode>) -> Vec<(&'static str, String)> {
        let mut query = vec![("id", media.external_id().to_string())];
        if let Some((season, episode)) = media.season_episode() {
            query.push(("season", season.to_string()));
            query.push(("episode", episode.to_string()));
        }
        if let Some(language) = language {
            let code = language.to_two_letter().unwrap_or(language.as_str());
            query.push(("language", code.to_string()));
        }
        query
    }
}

#[async_trait]
impl SubtitleSource for Wyzie {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn find(
        &self,
        media: &MediaRef,
        language: Option<&LanguageCode>,
        _credentials: &SourceCredentials,
    ) -> Result<Option<SubtitleCandidate>, SourceError> {
        if !media.is_known() {
            return Ok(None);
        }

        let query = Self::search_query(media, language);
        let query: Vec<(&str, &str)> = query.iter().map(|(k, v)| (*k, v.as_str())).collect();
        let url = format!("{}/search", self.base_url);
        let results: Vec<WyzieSubtitle> = super::get_json(&self.client, SOURCE_NAME, &url, &query).await?;

        // The search may ignore the filter; only a matching track counts
        let candidate = results
            .into_iter()
            .map(|result| SubtitleCandidate::new(result.url, &result.language, SOURCE_NAME))
            .find(|candidate| language.is_none_or(|wanted| &candidate.lang == wanted));

        Ok(candidate)
    }
}
