use log::{debug, info};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::errors::SourceError;

const SOURCE_NAME: &str = "tmdb";

/// TMDB client used only to translate IMDB ids into TVDB ids
#[derive(Clone)]
pub struct TmdbClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct FindResponse {
    #[serde(default)]
    tv_results: Vec<TmdbResult>,
}

#[derive(Debug, Deserialize)]
struct TmdbResult {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct ExternalIds {
    tvdb_id: Option<u64>,
}

impl TmdbClient {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: super::build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// IMDB id of a series to its TVDB id
    ///
    /// Two calls: `/find/{imdb}` for the TMDB show id, then
    /// `/tv/{id}/external_ids`. `Ok(None)` when either step finds nothing.
    pub async fn tvdb_id_for_series(&self, imdb_id: &str, api_key: &str) -> Result<Option<u64>, SourceError> {
        let find_url = format!("{}/find/{}", self.base_url, imdb_id);
        let found: FindResponse = super::get_json(
            &self.client,
            SOURCE_NAME,
            &find_url,
            &[("api_key", api_key), ("external_source", "imdb_id")],
        )
        .await?;

        let tmdb_id = match found.tv_results.first() {
            Some(result) => result.id,
            None => {
                debug!("TMDB has no series for {}", imdb_id);
                return Ok(None);
            }
        };

        let ids_url = format!("{}/tv/{}/external_ids", self.base_url, tmdb_id);
        let ids: ExternalIds =
            super::get_json(&self.client, SOURCE_NAME, &ids_url, &[("api_key", api_key)]).await?;

        if let Some(tvdb_id) = ids.tvdb_id {
            info!("Translated {} to TVDB id {} (TMDB id {})", imdb_id, tvdb_id, tmdb_id);
        }
        Ok(ids.tvdb_id)
    }
}
