/*!
 * Artifact store: record store plus files under the subtitles root.
 *
 * The record in the database is authoritative. The file at an artifact's
 * final path is a signal channel: while a translation is queued it holds
 * exactly [`SENTINEL_MESSAGE`], and a sentinel found there when nothing is
 * in flight means the job died. Staleness is judged by content, never by
 * modification time.
 */

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::database::{ArtifactKey, ArtifactRecord, ArtifactState, Repository, StoreStats};
use crate::file_utils::FileManager;
use crate::subtitle_processor::{SubtitleCollection, SubtitleEntry};

/// Content of the placeholder written while a translation is queued
pub const SENTINEL_MESSAGE: &str = "Translating subtitles. Please wait 1 minute and try again.";

/// Text of the notice shown when no source has any subtitle
pub const NOT_FOUND_MESSAGE: &str = "No subtitles found";

/// Result of inspecting an artifact's final path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inspection {
    /// No sentinel at the path; the record can be trusted
    Clear,
    /// A sentinel was found and removed along with the record
    Stale,
}

#[derive(Clone)]
pub struct ArtifactStore {
    repository: Repository,
    root: PathBuf,
    base_url: String,
}

impl ArtifactStore {
    pub fn new(repository: Repository, root: impl Into<PathBuf>, base_url: &str) -> Self {
        Self {
            repository,
            root: root.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the artifact relative to the subtitles root, `/`-separated
    ///
    /// Episodes: `{provider}/{lang}/{id}/season{S}/{id}-translated-{E}-1.srt`.
    /// Movies: `{provider}/{lang}/{id}/{id}-translated-1.srt`.
    pub fn relative_path(key: &ArtifactKey) -> String {
        let id = key.media.external_id();
        match key.media.season_episode() {
            Some((season, episode)) => format!(
                "{}/{}/{}/season{}/{}-translated-{}-1.srt",
                key.provider, key.language, id, season, id, episode
            ),
            None => format!(
                "{}/{}/{}/{}-translated-1.srt",
                key.provider, key.language, id, id
            ),
        }
    }

    /// Absolute path of the artifact's final file
    pub fn final_path(&self, key: &ArtifactKey) -> PathBuf {
        self.resolve_location(&Self::relative_path(key))
    }

    fn resolve_location(&self, relative: &str) -> PathBuf {
        relative
            .split('/')
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }

    /// Public URL of the artifact's final path
    pub fn public_url(&self, key: &ArtifactKey) -> String {
        self.url_for_location(&Self::relative_path(key))
    }

    /// Public URL for a stored location; remote URLs pass through
    pub fn url_for_location(&self, location: &str) -> String {
        if location.starts_with("http://") || location.starts_with("https://") {
            location.to_string()
        } else {
            format!("{}/subtitles/{}", self.base_url, location.trim_start_matches('/'))
        }
    }

    /// Detect and clear a stale sentinel at the key's final path
    ///
    /// A file that cannot be deleted is logged and reported as `Stale`
    /// anyway. A record that cannot be deleted is an error: it would block
    /// every later claim on the key.
    pub async fn inspect(&self, key: &ArtifactKey) -> Result<Inspection> {
        let path = self.final_path(key);

        let content = match FileManager::read_if_exists(&path) {
            Ok(Some(content)) => content,
            Ok(None) => return Ok(Inspection::Clear),
            Err(e) => {
                // Not valid UTF-8 or unreadable: certainly not our sentinel
                debug!("Could not read {:?} during inspection: {}", path, e);
                return Ok(Inspection::Clear);
            }
        };

        if content.trim() != SENTINEL_MESSAGE {
            return Ok(Inspection::Clear);
        }

        info!("Stale translation placeholder found for {}, clearing it", key);

        if let Err(e) = FileManager::remove_if_exists(&path) {
            warn!("Failed to delete stale placeholder {:?}: {}", path, e);
        }
        self.repository
            .delete(key)
            .await
            .with_context(|| format!("Failed to delete stale record for {}", key))?;

        Ok(Inspection::Stale)
    }

    /// Usable record for a key, if any
    ///
    /// Only `Ready` records are served. A `Ready` record whose local file is
    /// gone, and any `Pending` or `Failed` record reaching this point, is
    /// deleted and reported as a miss.
    pub async fn lookup(&self, key: &ArtifactKey) -> Result<Option<ArtifactRecord>> {
        let record = match self.repository.lookup(key).await? {
            Some(record) => record,
            None => return Ok(None),
        };

        let usable = match record.state {
            ArtifactState::Ready if record.is_remote() => true,
            ArtifactState::Ready => FileManager::file_exists(self.resolve_location(&record.location)),
            ArtifactState::Pending | ArtifactState::Failed => false,
        };

        if usable {
            return Ok(Some(record));
        }

        debug!("Discarding unusable {} record for {}", record.state, key);
        self.repository.delete(key).await?;
        Ok(None)
    }

    /// Record a direct match served from another server
    pub async fn record_remote(&self, key: &ArtifactKey, url: &str) -> Result<ArtifactRecord> {
        let record = ArtifactRecord::new(key.clone(), ArtifactState::Ready, url);
        self.repository.upsert(&record).await?;
        Ok(record)
    }

    /// Write the in-progress sentinel at the key's final path
    pub fn write_sentinel(&self, key: &ArtifactKey) -> Result<()> {
        FileManager::replace_file(self.final_path(key), SENTINEL_MESSAGE)
    }

    /// Create the Pending record, then write the sentinel
    ///
    /// Returns false when a record already existed, in which case another
    /// request owns the translation: nothing is written and nothing should
    /// be enqueued. If the sentinel cannot be written the new record is
    /// removed again.
    pub async fn claim_pending(&self, key: &ArtifactKey) -> Result<bool> {
        let inserted = self
            .repository
            .insert_pending_if_absent(key, &Self::relative_path(key))
            .await?;
        if !inserted {
            return Ok(false);
        }

        if let Err(e) = self.write_sentinel(key) {
            if let Err(delete_err) = self.repository.delete(key).await {
                warn!("Failed to roll back pending record for {}: {}", key, delete_err);
            }
            return Err(e.context(format!("Failed to write placeholder for {}", key)));
        }

        Ok(true)
    }

    /// Write a one-cue notice at the final path; never recorded
    pub fn write_not_found_notice(&self, key: &ArtifactKey) -> Result<()> {
        let notice = SubtitleCollection::new(vec![SubtitleEntry::new(
            1,
            0,
            600_000,
            NOT_FOUND_MESSAGE.to_string(),
        )]);
        notice.write_to_srt(self.final_path(key))
    }

    /// Replace the sentinel with the finished subtitle and mark the record Ready
    pub async fn complete(&self, key: &ArtifactKey, subtitles: &SubtitleCollection) -> Result<ArtifactRecord> {
        subtitles.write_to_srt(self.final_path(key))?;

        let record = ArtifactRecord::new(key.clone(), ArtifactState::Ready, Self::relative_path(key));
        self.repository.upsert(&record).await?;
        info!("Translation stored for {}", key);
        Ok(record)
    }

    /// Mark a key's job as failed, leaving the sentinel where it is
    pub async fn mark_failed(&self, key: &ArtifactKey) -> Result<()> {
        let record = ArtifactRecord::new(key.clone(), ArtifactState::Failed, Self::relative_path(key));
        self.repository.upsert(&record).await
    }

    /// The raw record for a key, without any cleanup
    pub async fn record(&self, key: &ArtifactKey) -> Result<Option<ArtifactRecord>> {
        self.repository.lookup(key).await
    }

    pub async fn stats(&self) -> Result<StoreStats> {
        self.repository.stats().await
    }

    /// Count subtitle files under the root, telling placeholders apart
    pub fn scan_files(&self) -> DiskStats {
        let mut stats = DiskStats::default();
        if !self.root.is_dir() {
            return stats;
        }

        for entry in WalkDir::new(&self.root).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "srt") {
                continue;
            }
            match FileManager::read_if_exists(path) {
                Ok(Some(content)) if content.trim() == SENTINEL_MESSAGE => stats.placeholders += 1,
                Ok(Some(_)) => stats.subtitles += 1,
                Ok(None) => {}
                Err(e) => debug!("Skipping unreadable file {:?}: {}", path, e),
            }
        }

        stats
    }
}

/// Files found on disk by [`ArtifactStore::scan_files`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiskStats {
    /// Finished subtitles and not-found notices
    pub subtitles: usize,
    /// Translation placeholders, live or stale
    pub placeholders: usize,
}

impl std::fmt::Display for DiskStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} subtitle files, {} placeholders", self.subtitles, self.placeholders)
    }
}
