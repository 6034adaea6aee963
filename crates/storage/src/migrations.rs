//! Database migrations

use rusqlite::Connection;

pub const SCHEMA_VERSION: i32 = 1;

pub fn run_migrations(conn: &Connection) -> Result<(), rusqlite::Error> {
    let current_version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    tracing::info!(
        "Database schema version: {} (target: {})",
        current_version,
        SCHEMA_VERSION
    );

    if current_version < 1 {
        tracing::info!("Running migration v1: initial schema");
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                data TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS version_entries (
                id TEXT PRIMARY KEY,
                artifact_id TEXT NOT NULL,
                content TEXT NOT NULL,
                label TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_version_entries_artifact
                ON version_entries(artifact_id, created_at);

            CREATE TABLE IF NOT EXISTS draft (
                slot INTEGER PRIMARY KEY CHECK (slot = 0),
                data TEXT NOT NULL,
                saved_at TEXT NOT NULL
            );
            "#,
        )?;
        conn.pragma_update(None, "user_version", 1)?;
    }

    Ok(())
}
