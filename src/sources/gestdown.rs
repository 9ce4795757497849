use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{SourceCredentials, SubtitleSource, TmdbClient};
use crate::errors::SourceError;
use crate::language_utils::LanguageCode;
use crate::media::{MediaRef, SubtitleCandidate};

const SOURCE_NAME: &str = "gestdown";

/// Episodic subtitle source keyed by TVDB show id
///
/// Only series episodes with a language filter are answered; everything
/// else is a silent miss.
pub struct Gestdown {
    client: Client,
    base_url: String,
    tmdb: TmdbClient,
}

#[derive(Debug, Deserialize)]
struct ShowsResponse {
    #[serde(default)]
    shows: Vec<Show>,
}

#[derive(Debug, Deserialize)]
struct Show {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubtitleSearchResponse {
    #[serde(default)]
    matching_subtitles: Vec<GestdownSubtitle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GestdownSubtitle {
    download_uri: String,
}

impl Gestdown {
    pub fn new(base_url: &str, tmdb: TmdbClient, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: super::build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            tmdb,
        })
    }

    fn absolute_uri(&self, uri: &str) -> String {
        if uri.starts_with("http://") || uri.starts_with("https://") {
            uri.to_string()
        } else {
            format!("{}/{}", self.base_url, uri.trim_start_matches('/'))
        }
    }
}

#[async_trait]
impl SubtitleSource for Gestdown {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn find(
        &self,
        media: &MediaRef,
        language: Option<&LanguageCode>,
        credentials: &SourceCredentials,
    ) -> Result<Option<SubtitleCandidate>, SourceError> {
        let (Some((season, episode)), Some(language)) = (media.season_episode(), language) else {
            return Ok(None);
        };
        let Some(api_key) = credentials.tmdb_key() else {
            debug!("Skipping {} without a TMDB key", SOURCE_NAME);
            return Ok(None);
        };
        // Gestdown takes English language names, not codes
        let Some(language_name) = language.display_name() else {
            return Ok(None);
        };

        let Some(tvdb_id) = self.tmdb.tvdb_id_for_series(media.external_id(), api_key).await? else {
            return Ok(None);
        };

        let shows_url = format!("{}/shows/external/tvdb/{}", self.base_url, tvdb_id);
        let shows: ShowsResponse = super::get_json(&self.client, SOURCE_NAME, &shows_url, &[]).await?;
        let Some(show) = shows.shows.first() else {
            return Ok(None);
        };

        let search_url = format!(
            "{}/subtitles/get/{}/{}/{}/{}",
            self.base_url, show.id, season, episode, language_name
        );
        let found: SubtitleSearchResponse =
            super::get_json(&self.client, SOURCE_NAME, &search_url, &[]).await?;

        Ok(found.matching_subtitles.first().map(|subtitle| {
            SubtitleCandidate::new(
                self.absolute_uri(&subtitle.download_uri),
                language.as_str(),
                SOURCE_NAME,
            )
        }))
    }
}
