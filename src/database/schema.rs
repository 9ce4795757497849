/*!
 * Database schema definitions and migrations.
 */

use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Create the schema on a fresh database, or check an existing one
///
/// There is a single schema version so far; a database stamped with any
/// other version is refused rather than guessed at.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    match get_schema_version(conn)? {
        0 => {
            info!("Initializing database schema v{}", SCHEMA_VERSION);
            create_all_tables(conn)?;
            set_schema_version(conn, SCHEMA_VERSION)?;
        }
        SCHEMA_VERSION => debug!("Database schema is up to date (v{})", SCHEMA_VERSION),
        other => {
            return Err(anyhow!(
                "Database schema v{} is not supported (expected v{})",
                other,
                SCHEMA_VERSION
            ));
        }
    }

    Ok(())
}

fn get_schema_version(conn: &Connection) -> Result<i32> {
    let table_exists: bool = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_version'",
            [],
            |row| row.get(0),
        )
        .context("Failed to check schema_version table existence")?;

    if !table_exists {
        return Ok(0);
    }

    let version: i32 = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .unwrap_or(0);

    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version, updated_at) VALUES (1, ?1, datetime('now'))",
        [version],
    )?;
    Ok(())
}

fn create_all_tables(conn: &Connection) -> Result<()> {
    // WAL survives a crash mid-write; in-memory databases ignore it
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )?;

    // Movies store season and episode as 0
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS artifacts (
            media_id TEXT NOT NULL,
            media_kind TEXT NOT NULL,
            season INTEGER NOT NULL DEFAULT 0,
            episode INTEGER NOT NULL DEFAULT 0,
            language TEXT NOT NULL,
            provider TEXT NOT NULL,
            state TEXT NOT NULL DEFAULT 'pending',
            location TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (media_id, season, episode, language, provider)
        );

        CREATE INDEX IF NOT EXISTS idx_artifacts_state ON artifacts(state);
        "#,
    )?;

    info!("Database schema created successfully");
    Ok(())
}
