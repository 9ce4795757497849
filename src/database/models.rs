/*!
 * Artifact record models.
 *
 * These structures map directly to the `artifacts` table.
 */

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::language_utils::LanguageCode;
use crate::media::{MediaKind, MediaRef};

/// Lifecycle state of an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactState {
    /// Translation queued, the sentinel sits at the final path
    Pending,
    /// Location holds a usable subtitle (remote URL or local file)
    Ready,
    /// Translation job ended without output
    Failed,
}

impl fmt::Display for ArtifactState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactState::Pending => write!(f, "pending"),
            ArtifactState::Ready => write!(f, "ready"),
            ArtifactState::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for ArtifactState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ArtifactState::Pending),
            "ready" => Ok(ArtifactState::Ready),
            "failed" => Ok(ArtifactState::Failed),
            _ => Err(anyhow::anyhow!("Invalid artifact state: {}", s)),
        }
    }
}

/// Identity of one artifact: media, target language and provider namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactKey {
    pub media: MediaRef,
    pub language: LanguageCode,
    pub provider: String,
}

impl ArtifactKey {
    pub fn new(media: MediaRef, language: LanguageCode, provider: impl Into<String>) -> Self {
        Self {
            media,
            language,
            provider: provider.into(),
        }
    }

    /// Season column value, 0 for movies
    pub fn season_column(&self) -> i64 {
        self.media.season().map(i64::from).unwrap_or(0)
    }

    /// Episode column value, 0 for movies
    pub fn episode_column(&self) -> i64 {
        self.media.episode_number().map(i64::from).unwrap_or(0)
    }

    /// Rebuild a key from its stored columns
    pub(crate) fn from_columns(
        media_id: &str,
        media_kind: &str,
        season: i64,
        episode: i64,
        language: &str,
        provider: String,
    ) -> Self {
        let kind = media_kind.parse().unwrap_or(MediaKind::Unknown);
        let media = match kind {
            MediaKind::Series => MediaRef::episode(media_id, season as u32, episode as u32)
                .unwrap_or_else(|| MediaRef::parse(media_id)),
            _ => MediaRef::movie(media_id),
        };

        Self {
            media,
            language: LanguageCode::new(language),
            provider,
        }
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.provider, self.language, self.media)
    }
}

/// One row of the `artifacts` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub key: ArtifactKey,
    pub state: ArtifactState,
    /// Remote URL, or a path relative to the subtitles root
    pub location: String,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
    /// Last update timestamp (RFC 3339)
    pub updated_at: String,
}

impl ArtifactRecord {
    /// A fresh record stamped with the current time
    pub fn new(key: ArtifactKey, state: ArtifactState, location: impl Into<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            key,
            state,
            location: location.into(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Whether the location points at another server rather than a local file
    pub fn is_remote(&self) -> bool {
        self.location.starts_with("http://") || self.location.starts_with("https://")
    }
}

/// Record counts by state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub pending: i64,
    pub ready: i64,
    pub failed: i64,
}

impl StoreStats {
    pub fn total(&self) -> i64 {
        self.pending + self.ready + self.failed
    }
}

impl fmt::Display for StoreStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Artifacts: {} (ready: {}, pending: {}, failed: {})",
            self.total(),
            self.ready,
            self.pending,
            self.failed
        )
    }
}
