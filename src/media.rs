/*!
 * Media references and subtitle candidates.
 *
 * A `MediaRef` names a movie or one episode of a series by its external
 * (IMDB-style) id. Ids arrive in the addon form `tt0111161` for movies and
 * `tt0111161:1:2` for an episode.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::language_utils::LanguageCode;

static EPISODE_ID_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(tt\d+):(\d+):(\d+)$").expect("valid episode id regex"));

static MOVIE_ID_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^tt\d+$").expect("valid movie id regex"));

/// Kind of media a reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Series,
    Unknown,
}

impl MediaKind {
    /// Lowercase identifier, as used in upstream catalog URLs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Series => "series",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MediaKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "movie" => Ok(Self::Movie),
            "series" => Ok(Self::Series),
            "unknown" => Ok(Self::Unknown),
            _ => Err(anyhow::anyhow!("Invalid media kind: {}", s)),
        }
    }
}

/// Identifier for a movie or a specific series episode
///
/// Season and episode are present exactly when the kind is `Series`; the
/// constructors are the only way to build one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaRef {
    kind: MediaKind,
    external_id: String,
    season: Option<u32>,
    episode: Option<u32>,
}

impl MediaRef {
    /// A movie reference
    pub fn movie(external_id: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Movie,
            external_id: external_id.into(),
            season: None,
            episode: None,
        }
    }

    /// A series episode reference; season and episode must be positive
    pub fn episode(external_id: impl Into<String>, season: u32, episode: u32) -> Option<Self> {
        if season == 0 || episode == 0 {
            return None;
        }
        Some(Self {
            kind: MediaKind::Series,
            external_id: external_id.into(),
            season: Some(season),
            episode: Some(episode),
        })
    }

    /// Parse an addon-style id
    ///
    /// Anything that is neither `ttNNN` nor `ttNNN:S:E` (with positive season
    /// and episode) becomes an `Unknown` reference carrying the raw id.
    pub fn parse(id: &str) -> Self {
        let id = id.trim();

        if let Some(caps) = EPISODE_ID_REGEX.captures(id) {
            let season = caps[2].parse::<u32>().ok();
            let episode = caps[3].parse::<u32>().ok();
            if let (Some(season), Some(episode)) = (season, episode) {
                if let Some(media) = Self::episode(&caps[1], season, episode) {
                    return media;
                }
            }
        } else if MOVIE_ID_REGEX.is_match(id) {
            return Self::movie(id);
        }

        Self {
            kind: MediaKind::Unknown,
            external_id: id.to_string(),
            season: None,
            episode: None,
        }
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    pub fn season(&self) -> Option<u32> {
        self.season
    }

    pub fn episode_number(&self) -> Option<u32> {
        self.episode
    }

    /// Season and episode together, for series references
    pub fn season_episode(&self) -> Option<(u32, u32)> {
        self.season.zip(self.episode)
    }

    pub fn is_series(&self) -> bool {
        self.kind == MediaKind::Series
    }

    pub fn is_known(&self) -> bool {
        self.kind != MediaKind::Unknown
    }
}

impl fmt::Display for MediaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.season_episode() {
            Some((season, episode)) => write!(f, "{}:{}:{}", self.external_id, season, episode),
            None => f.write_str(&self.external_id),
        }
    }
}

/// A subtitle track offered by an upstream source, not yet downloaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleCandidate {
    /// Where the subtitle body can be fetched
    pub source_url: String,
    /// Normalized language of the track
    pub lang: LanguageCode,
    /// Language tag exactly as the source reported it
    pub raw_lang: String,
    /// Name of the source adapter that produced the candidate
    pub source_name: String,
}

impl SubtitleCandidate {
    /// Build a candidate, normalizing the source's language tag
    pub fn new(source_url: impl Into<String>, raw_lang: &str, source_name: &str) -> Self {
        Self {
            source_url: source_url.into(),
            lang: LanguageCode::new(raw_lang),
            raw_lang: raw_lang.to_string(),
            source_name: source_name.to_string(),
        }
    }
}
