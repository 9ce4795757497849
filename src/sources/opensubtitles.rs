use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::CatalogSource;
use crate::errors::SourceError;
use crate::media::{MediaKind, MediaRef, SubtitleCandidate};

const SOURCE_NAME: &str = "opensubtitles";

/// OpenSubtitles v3 addon catalog
///
/// `GET {base}/subtitles/{type}/{id}.json` returns every track for the item;
/// episodes use `{id}:{season}:{episode}` as the id.
pub struct OpenSubtitles {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct CatalogResponse {
    #[serde(default)]
    subtitles: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    url: String,
    lang: String,
}

impl OpenSubtitles {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: super::build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Catalog URL for a media item, `None` for unknown media
    pub fn catalog_url(&self, media: &MediaRef) -> Option<String> {
        match media.kind() {
            MediaKind::Unknown => None,
            kind => Some(format!("{}/subtitles/{}/{}.json", self.base_url, kind, media)),
        }
    }
}

#[async_trait]
impl CatalogSource for OpenSubtitles {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn list(&self, media: &MediaRef) -> Result<Vec<SubtitleCandidate>, SourceError> {
        let Some(url) = self.catalog_url(media) else {
            return Ok(Vec::new());
        };

        let catalog: CatalogResponse = super::get_json(&self.client, SOURCE_NAME, &url, &[]).await?;
        debug!("{} listed {} tracks for {}", SOURCE_NAME, catalog.subtitles.len(), media);

        Ok(catalog
            .subtitles
            .into_iter()
            .filter(|entry| !entry.url.is_empty())
            .map(|entry| SubtitleCandidate::new(entry.url, &entry.lang, SOURCE_NAME))
            .collect())
    }
}
