/*!
 * Repository layer for artifact records.
 */

use anyhow::Result;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};

use super::connection::DatabaseConnection;
use super::models::{ArtifactKey, ArtifactRecord, ArtifactState, StoreStats};

/// Repository for artifact records
#[derive(Clone)]
pub struct Repository {
    db: DatabaseConnection,
}

impl Repository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a repository with the default database location
    pub fn new_default() -> Result<Self> {
        let db = DatabaseConnection::new_default()?;
        Ok(Self::new(db))
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    /// Fetch the record for a key
    pub async fn lookup(&self, key: &ArtifactKey) -> Result<Option<ArtifactRecord>> {
        let key = key.clone();

        self.db
            .execute_async(move |conn| Self::lookup_sync(conn, &key))
            .await
    }

    fn lookup_sync(conn: &Connection, key: &ArtifactKey) -> Result<Option<ArtifactRecord>> {
        let result = conn
            .query_row(
                r#"
                SELECT media_id, media_kind, season, episode, language, provider,
                       state, location, created_at, updated_at
                FROM artifacts
                WHERE media_id = ?1 AND season = ?2 AND episode = ?3
                  AND language = ?4 AND provider = ?5
                "#,
                params![
                    key.media.external_id(),
                    key.season_column(),
                    key.episode_column(),
                    key.language.as_str(),
                    key.provider,
                ],
                Self::map_row,
            )
            .optional()?;

        Ok(result)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ArtifactRecord> {
        let media_id: String = row.get(0)?;
        let media_kind: String = row.get(1)?;
        let language: String = row.get(4)?;

        Ok(ArtifactRecord {
            key: ArtifactKey::from_columns(
                &media_id,
                &media_kind,
                row.get(2)?,
                row.get(3)?,
                &language,
                row.get(5)?,
            ),
            state: row
                .get::<_, String>(6)?
                .parse()
                .unwrap_or(ArtifactState::Failed),
            location: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    /// Insert or replace the record for its key, keeping the creation time
    pub async fn upsert(&self, record: &ArtifactRecord) -> Result<()> {
        let record = record.clone();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO artifacts (
                        media_id, media_kind, season, episode, language, provider,
                        state, location, created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                    ON CONFLICT(media_id, season, episode, language, provider) DO UPDATE SET
                        media_kind = excluded.media_kind,
                        state = excluded.state,
                        location = excluded.location,
                        updated_at = excluded.updated_at
                    "#,
                    params![
                        record.key.media.external_id(),
                        record.key.media.kind().as_str(),
                        record.key.season_column(),
                        record.key.episode_column(),
                        record.key.language.as_str(),
                        record.key.provider,
                        record.state.to_string(),
                        record.location,
                        record.created_at,
                        record.updated_at,
                    ],
                )?;
                debug!("Upserted artifact {} as {}", record.key, record.state);
                Ok(())
            })
            .await
    }

    /// Create a Pending record unless one already exists for the key
    ///
    /// Returns true when this call created the record.
    pub async fn insert_pending_if_absent(&self, key: &ArtifactKey, location: &str) -> Result<bool> {
        let record = ArtifactRecord::new(key.clone(), ArtifactState::Pending, location);

        self.db
            .execute_async(move |conn| {
                let inserted = conn.execute(
                    r#"
                    INSERT INTO artifacts (
                        media_id, media_kind, season, episode, language, provider,
                        state, location, created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                    ON CONFLICT(media_id, season, episode, language, provider) DO NOTHING
                    "#,
                    params![
                        record.key.media.external_id(),
                        record.key.media.kind().as_str(),
                        record.key.season_column(),
                        record.key.episode_column(),
                        record.key.language.as_str(),
                        record.key.provider,
                        record.state.to_string(),
                        record.location,
                        record.created_at,
                        record.updated_at,
                    ],
                )?;
                Ok(inserted == 1)
            })
            .await
    }

    /// Delete the record for a key; returns whether one existed
    pub async fn delete(&self, key: &ArtifactKey) -> Result<bool> {
        let key = key.clone();

        self.db
            .execute_async(move |conn| {
                let deleted = conn.execute(
                    r#"
                    DELETE FROM artifacts
                    WHERE media_id = ?1 AND season = ?2 AND episode = ?3
                      AND language = ?4 AND provider = ?5
                    "#,
                    params![
                        key.media.external_id(),
                        key.season_column(),
                        key.episode_column(),
                        key.language.as_str(),
                        key.provider,
                    ],
                )?;
                Ok(deleted > 0)
            })
            .await
    }

    /// Record counts by state
    pub async fn stats(&self) -> Result<StoreStats> {
        self.db
            .execute_async(|conn| {
                let mut stmt =
                    conn.prepare("SELECT state, COUNT(*) FROM artifacts GROUP BY state")?;
                let rows = stmt.query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })?;

                let mut stats = StoreStats::default();
                for row in rows {
                    let (state, count) = row?;
                    match state.parse::<ArtifactState>() {
                        Ok(ArtifactState::Pending) => stats.pending += count,
                        Ok(ArtifactState::Ready) => stats.ready += count,
                        Ok(ArtifactState::Failed) | Err(_) => stats.failed += count,
                    }
                }

                Ok(stats)
            })
            .await
    }
}
