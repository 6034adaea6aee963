//! SQLite storage implementation

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use pageforge_core::{Draft, Session, VersionEntry, MAX_STORED_SESSIONS, MAX_VERSION_ENTRIES};
use rusqlite::{params, Connection, OptionalExtension};

use crate::migrations;
use crate::traits::StateStore;
use crate::StorageError;

/// SQLite-backed [`StateStore`].
///
/// Synchronous rusqlite calls behind one connection mutex; the async trait
/// surface delegates through `spawn_blocking`.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

fn lock_conn<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
    mutex.lock().map_err(|e: PoisonError<_>| StorageError::Poisoned(e.to_string()))
}

fn log_row_error<T>(result: Result<T, serde_json::Error>) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!("Row decode error: {}", e);
            None
        },
    }
}

impl SqliteStore {
    pub fn new(db_path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(db_path)?;
        Self::with_connection(conn)
    }

    /// In-memory database, used by tests and `--ephemeral` runs.
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        migrations::run_migrations(&conn)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    fn save_session_blocking(&self, session: &Session) -> Result<(), StorageError> {
        let data = serde_json::to_string(session)?;
        let conn = lock_conn(&self.conn)?;
        conn.execute(
            "INSERT OR REPLACE INTO sessions (id, created_at, data) VALUES (?1, ?2, ?3)",
            params![session.id, session.created_at.to_rfc3339(), data],
        )?;
        conn.execute(
            "DELETE FROM sessions WHERE id NOT IN
               (SELECT id FROM sessions ORDER BY created_at DESC, id DESC LIMIT ?1)",
            params![MAX_STORED_SESSIONS as i64],
        )?;
        Ok(())
    }

    fn load_sessions_blocking(&self) -> Result<Vec<Session>, StorageError> {
        let conn = lock_conn(&self.conn)?;
        let mut stmt =
            conn.prepare("SELECT data FROM sessions ORDER BY created_at DESC, id DESC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut sessions = Vec::new();
        for data in rows.flatten() {
            if let Some(session) = log_row_error(serde_json::from_str(&data)) {
                sessions.push(session);
            }
        }
        Ok(sessions)
    }

    fn append_version_entry_blocking(&self, entry: &VersionEntry) -> Result<(), StorageError> {
        let conn = lock_conn(&self.conn)?;
        conn.execute(
            "INSERT OR REPLACE INTO version_entries (id, artifact_id, content, label, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.id,
                entry.artifact_id,
                entry.content,
                entry.label,
                entry.created_at.to_rfc3339()
            ],
        )?;
        conn.execute(
            "DELETE FROM version_entries WHERE id NOT IN
               (SELECT id FROM version_entries ORDER BY created_at DESC, rowid DESC LIMIT ?1)",
            params![MAX_VERSION_ENTRIES as i64],
        )?;
        Ok(())
    }

    fn version_entries_blocking(
        &self,
        artifact_id: &str,
    ) -> Result<Vec<VersionEntry>, StorageError> {
        let conn = lock_conn(&self.conn)?;
        let mut stmt = conn.prepare(
            "SELECT id, artifact_id, content, label, created_at FROM version_entries
               WHERE artifact_id = ?1 ORDER BY created_at ASC, rowid ASC",
        )?;
        let rows = stmt.query_map(params![artifact_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;
        let mut entries = Vec::new();
        for (id, artifact_id, content, label, created_at) in rows.flatten() {
            match created_at.parse() {
                Ok(created_at) => {
                    entries.push(VersionEntry { id, artifact_id, content, label, created_at });
                },
                Err(e) => tracing::warn!("Row decode error: {}", e),
            }
        }
        Ok(entries)
    }

    fn save_draft_blocking(&self, draft: &Draft) -> Result<(), StorageError> {
        let data = serde_json::to_string(draft)?;
        let conn = lock_conn(&self.conn)?;
        conn.execute(
            "INSERT OR REPLACE INTO draft (slot, data, saved_at) VALUES (0, ?1, ?2)",
            params![data, draft.saved_at.to_rfc3339()],
        )?;
        Ok(())
    }

    fn load_draft_blocking(&self) -> Result<Option<Draft>, StorageError> {
        let conn = lock_conn(&self.conn)?;
        let data: Option<String> = conn
            .query_row("SELECT data FROM draft WHERE slot = 0", [], |row| row.get(0))
            .optional()?;
        Ok(data.and_then(|d| log_row_error(serde_json::from_str(&d))))
    }

    fn clear_draft_blocking(&self) -> Result<(), StorageError> {
        let conn = lock_conn(&self.conn)?;
        conn.execute("DELETE FROM draft", [])?;
        Ok(())
    }
}

/// Helper: run a blocking closure on the tokio blocking pool.
async fn blocking<F, T>(f: F) -> Result<T, StorageError>
where
    F: FnOnce() -> Result<T, StorageError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| StorageError::Join(e.to_string()))?
}

#[async_trait]
impl StateStore for SqliteStore {
    async fn save_session(&self, session: &Session) -> Result<(), StorageError> {
        let s = self.clone();
        let session = session.clone();
        blocking(move || s.save_session_blocking(&session)).await
    }

    async fn load_sessions(&self) -> Result<Vec<Session>, StorageError> {
        let s = self.clone();
        blocking(move || s.load_sessions_blocking()).await
    }

    async fn append_version_entry(&self, entry: &VersionEntry) -> Result<(), StorageError> {
        let s = self.clone();
        let entry = entry.clone();
        blocking(move || s.append_version_entry_blocking(&entry)).await
    }

    async fn version_entries(&self, artifact_id: &str) -> Result<Vec<VersionEntry>, StorageError> {
        let s = self.clone();
        let artifact_id = artifact_id.to_owned();
        blocking(move || s.version_entries_blocking(&artifact_id)).await
    }

    async fn save_draft(&self, draft: &Draft) -> Result<(), StorageError> {
        let s = self.clone();
        let draft = draft.clone();
        blocking(move || s.save_draft_blocking(&draft)).await
    }

    async fn load_draft(&self) -> Result<Option<Draft>, StorageError> {
        let s = self.clone();
        blocking(move || s.load_draft_blocking()).await
    }

    async fn clear_draft(&self) -> Result<(), StorageError> {
        let s = self.clone();
        blocking(move || s.clear_draft_blocking()).await
    }
}
