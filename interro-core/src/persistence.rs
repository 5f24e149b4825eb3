//! SQLite persistence for witness statements.
//!
//! Every stored statement becomes one row; the embedding is kept next to
//! the text so the in-memory indexes can be rebuilt on startup without
//! re-embedding anything:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS memory_records (
//!     id          TEXT PRIMARY KEY,
//!     session_id  TEXT NOT NULL,
//!     content     TEXT NOT NULL,
//!     embedding   BLOB NOT NULL,
//!     model       TEXT NOT NULL,
//!     created_at  TEXT NOT NULL
//! );
//! ```
//!
//! Embeddings are `bincode`-encoded `Vec<f32>`. Rows are never updated
//! or deleted.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags, params};
use tracing::{debug, info, warn};

use crate::error::{InterroError, Result};
use crate::types::{Embedding, RecordId};

/// File name of the database inside the store directory.
pub const DATABASE_FILE: &str = "memory.db";

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS memory_records (
    id          TEXT PRIMARY KEY,
    session_id  TEXT NOT NULL,
    content     TEXT NOT NULL,
    embedding   BLOB NOT NULL,
    model       TEXT NOT NULL,
    created_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_memory_records_session
    ON memory_records (session_id, created_at);";

/// One persisted witness statement.
#[derive(Debug, Clone)]
pub struct StoredRecord {
    /// Record identity.
    pub id: RecordId,
    /// Session the statement belongs to.
    pub session_id: String,
    /// The statement text, verbatim.
    pub content: String,
    /// Its embedding.
    pub embedding: Embedding,
    /// Name of the model that produced the embedding.
    pub model: String,
    /// When the statement was stored.
    pub created_at: DateTime<Utc>,
}

/// Handle to the SQLite database holding [`StoredRecord`]s.
pub struct RecordStore {
    conn: Connection,
    db_path: PathBuf,
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("db_path", &self.db_path)
            .finish_non_exhaustive()
    }
}

impl RecordStore {
    /// Open (or create) the store inside `directory`.
    ///
    /// The directory is created if missing; the schema is created if the
    /// database is new.
    ///
    /// # Errors
    ///
    /// Returns [`InterroError::Io`] if the directory cannot be created or
    /// [`InterroError::Database`] on SQLite failures.
    pub fn open_dir<P: AsRef<Path>>(directory: P) -> Result<Self> {
        std::fs::create_dir_all(directory.as_ref())?;
        let db_path = directory.as_ref().join(DATABASE_FILE);
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = Connection::open_with_flags(&db_path, flags)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;

        info!(path = %db_path.display(), "Witness memory database opened");

        Ok(Self { conn, db_path })
    }

    /// Open an in-memory database (useful for tests).
    ///
    /// # Errors
    ///
    /// Returns [`InterroError::Database`] on SQLite failures.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            db_path: PathBuf::from(":memory:"),
        })
    }

    /// Insert a record.
    ///
    /// # Errors
    ///
    /// Returns [`InterroError::Serialization`] if the embedding cannot be
    /// encoded, or [`InterroError::Database`] on SQLite failures.
    pub fn insert(&self, record: &StoredRecord) -> Result<()> {
        let blob = bincode::serialize(&record.embedding.0)
            .map_err(|e| InterroError::Serialization(e.to_string()))?;

        self.conn.execute(
            "INSERT INTO memory_records (id, session_id, content, embedding, model, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.id.0.to_string(),
                record.session_id,
                record.content,
                blob,
                record.model,
                record.created_at.to_rfc3339(),
            ],
        )?;

        debug!(
            session = %record.session_id,
            record = %record.id,
            bytes = blob.len(),
            "Stored witness statement"
        );
        Ok(())
    }

    /// Load every record produced by `model`, oldest first.
    ///
    /// Rows from other models, or rows that fail to decode, are skipped
    /// with a warning: their vectors are not comparable with fresh ones.
    ///
    /// # Errors
    ///
    /// Returns [`InterroError::Database`] on SQLite failures.
    pub fn load_all(&self, model: &str) -> Result<Vec<StoredRecord>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, session_id, content, embedding, model, created_at
             FROM memory_records ORDER BY created_at ASC, rowid ASC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Vec<u8>>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut records = Vec::new();
        let mut skipped = 0usize;
        for row in rows {
            let (id, session_id, content, blob, row_model, created_at) = row?;
            if row_model != model {
                skipped += 1;
                continue;
            }
            let Ok(uuid) = uuid::Uuid::parse_str(&id) else {
                warn!(id = %id, "Skipping row with invalid UUID");
                continue;
            };
            let vector: Vec<f32> = match bincode::deserialize(&blob) {
                Ok(v) => v,
                Err(e) => {
                    warn!(id = %id, error = %e, "Skipping row with undecodable embedding");
                    continue;
                }
            };
            let created_at = DateTime::parse_from_rfc3339(&created_at)
                .map_or_else(|_| Utc::now(), |t| t.with_timezone(&Utc));

            records.push(StoredRecord {
                id: RecordId(uuid),
                session_id,
                content,
                embedding: Embedding(vector),
                model: row_model,
                created_at,
            });
        }

        if skipped > 0 {
            warn!(
                skipped,
                model,
                "Ignoring witness statements embedded with a different model"
            );
        }
        Ok(records)
    }

    /// Number of records stored for `session_id`.
    ///
    /// # Errors
    ///
    /// Returns [`InterroError::Database`] on SQLite failures.
    pub fn count_session(&self, session_id: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM memory_records WHERE session_id = ?1",
            params![session_id],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Path of the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.db_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(session: &str, content: &str, model: &str) -> StoredRecord {
        StoredRecord {
            id: RecordId::new(),
            session_id: session.to_string(),
            content: content.to_string(),
            embedding: Embedding(vec![0.25, -0.5, 1.0]),
            model: model.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn insert_and_reload() {
        let store = RecordStore::open_in_memory().expect("open");
        store.insert(&record("s1", "I was home", "m")).expect("insert");
        store.insert(&record("s2", "I was out", "m")).expect("insert");

        let all = store.load_all("m").expect("load");
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].content, "I was home");
        assert_eq!(all[0].embedding, Embedding(vec![0.25, -0.5, 1.0]));
        assert_eq!(store.count_session("s1").expect("count"), 1);
        assert_eq!(store.count_session("nobody").expect("count"), 0);
    }

    #[test]
    fn other_models_are_skipped() {
        let store = RecordStore::open_in_memory().expect("open");
        store.insert(&record("s", "old", "model-a")).expect("insert");
        store.insert(&record("s", "new", "model-b")).expect("insert");

        let loaded = store.load_all("model-b").expect("load");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].content, "new");
    }

    #[test]
    fn duplicates_are_both_kept() {
        let store = RecordStore::open_in_memory().expect("open");
        store.insert(&record("s", "same words", "m")).expect("insert");
        store.insert(&record("s", "same words", "m")).expect("insert");
        assert_eq!(store.count_session("s").expect("count"), 2);
    }

    #[test]
    fn directory_store_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("witness");
        {
            let store = RecordStore::open_dir(&nested).expect("open");
            store.insert(&record("s", "persisted", "m")).expect("insert");
        }
        let store = RecordStore::open_dir(&nested).expect("reopen");
        assert!(store.path().ends_with(DATABASE_FILE));
        let loaded = store.load_all("m").expect("load");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].content, "persisted");
    }
}
