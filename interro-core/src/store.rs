//! Witness memory store: "store text, retrieve the k most similar".
//!
//! The dialogue layer only sees the [`MemoryStore`] trait. Its contract is
//! deliberately forgiving: a store that cannot embed, search or persist
//! logs a warning and behaves as empty, so the interrogation continues.
//!
//! [`VectorMemoryStore`] keeps one [`HnswIndex`] per session in memory and
//! writes every statement through to SQLite ([`RecordStore`]) so witness
//! statements survive restarts.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::MemoryConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::hnsw::HnswIndex;
use crate::persistence::{RecordStore, StoredRecord};
use crate::types::RecordId;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Similarity-search memory of past witness statements, partitioned by
/// session.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Up to `k` previously stored statements of `session` most similar to
    /// `text`, most similar first. Empty when nothing is stored or the
    /// store is unavailable.
    async fn query(&self, session: &str, text: &str) -> Vec<String>;

    /// Append `text` to `session`'s memory. Duplicates are kept.
    async fn store(&self, session: &str, text: &str);

    /// Number of statements held for `session`.
    fn statement_count(&self, session: &str) -> usize;
}

// ---------------------------------------------------------------------------
// Null store
// ---------------------------------------------------------------------------

/// The unavailable store: remembers nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMemoryStore;

#[async_trait]
impl MemoryStore for NullMemoryStore {
    async fn query(&self, _session: &str, _text: &str) -> Vec<String> {
        Vec::new()
    }

    async fn store(&self, _session: &str, _text: &str) {}

    fn statement_count(&self, _session: &str) -> usize {
        0
    }
}

// ---------------------------------------------------------------------------
// Vector store
// ---------------------------------------------------------------------------

struct SessionIndex {
    index: HnswIndex,
    contents: HashMap<RecordId, String>,
}

impl SessionIndex {
    fn new(config: &MemoryConfig) -> Self {
        Self {
            index: HnswIndex::with_params(config.ef_construction, config.ef_search),
            contents: HashMap::new(),
        }
    }
}

/// Embedding + HNSW memory store with optional SQLite write-through.
pub struct VectorMemoryStore {
    embedder: Arc<dyn EmbeddingProvider>,
    config: MemoryConfig,
    sessions: Mutex<HashMap<String, SessionIndex>>,
    records: Option<Mutex<RecordStore>>,
}

impl std::fmt::Debug for VectorMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorMemoryStore")
            .field("model", &self.embedder.model_name())
            .field("top_k", &self.config.top_k)
            .field("persistent", &self.records.is_some())
            .finish_non_exhaustive()
    }
}

impl VectorMemoryStore {
    /// A purely in-memory store (nothing survives the process).
    #[must_use]
    pub fn in_memory(embedder: Arc<dyn EmbeddingProvider>, config: MemoryConfig) -> Self {
        Self {
            embedder,
            config,
            sessions: Mutex::new(HashMap::new()),
            records: None,
        }
    }

    /// Open the persistent store in `directory`, reloading every statement
    /// embedded by the current model.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or database cannot be opened.
    pub fn open<P: AsRef<Path>>(
        directory: P,
        embedder: Arc<dyn EmbeddingProvider>,
        config: MemoryConfig,
    ) -> Result<Self> {
        let records = RecordStore::open_dir(directory)?;
        let loaded = records.load_all(embedder.model_name())?;

        let mut sessions: HashMap<String, SessionIndex> = HashMap::new();
        let count = loaded.len();
        for record in loaded {
            let entry = sessions
                .entry(record.session_id)
                .or_insert_with(|| SessionIndex::new(&config));
            entry.index.insert(record.id, record.embedding);
            entry.contents.insert(record.id, record.content);
        }
        for entry in sessions.values_mut() {
            if entry.index.len() >= config.brute_force_threshold {
                entry.index.build();
            }
        }

        info!(
            records = count,
            sessions = sessions.len(),
            model = embedder.model_name(),
            "Witness memory restored"
        );

        Ok(Self {
            embedder,
            config,
            sessions: Mutex::new(sessions),
            records: Some(Mutex::new(records)),
        })
    }

    /// Sessions with at least one stored statement.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }
}

#[async_trait]
impl MemoryStore for VectorMemoryStore {
    async fn query(&self, session: &str, text: &str) -> Vec<String> {
        if self.statement_count(session) == 0 {
            return Vec::new();
        }

        let embedding = match self.embedder.embed(text).await {
            Ok(e) => e,
            Err(e) => {
                warn!(session, error = %e, "Memory query skipped: embedding failed");
                return Vec::new();
            }
        };

        let mut sessions = self.sessions.lock();
        let Some(entry) = sessions.get_mut(session) else {
            return Vec::new();
        };

        let k = self.config.top_k;
        let results = if entry.index.len() < self.config.brute_force_threshold {
            entry.index.brute_force(&embedding, k)
        } else {
            if entry.index.needs_rebuild() {
                entry.index.build();
            }
            entry.index.search(&embedding, k)
        };

        let matches: Vec<String> = results
            .iter()
            .filter_map(|r| entry.contents.get(&r.record_id).cloned())
            .collect();
        debug!(session, matches = matches.len(), "Memory query");
        matches
    }

    async fn store(&self, session: &str, text: &str) {
        let embedding = match self.embedder.embed(text).await {
            Ok(e) => e,
            Err(e) => {
                warn!(session, error = %e, "Memory store skipped: embedding failed");
                return;
            }
        };

        let record = StoredRecord {
            id: RecordId::new(),
            session_id: session.to_string(),
            content: text.to_string(),
            embedding,
            model: self.embedder.model_name().to_string(),
            created_at: Utc::now(),
        };

        if let Some(records) = &self.records {
            if let Err(e) = records.lock().insert(&record) {
                warn!(session, error = %e, "Witness statement not persisted");
            }
        }

        let mut sessions = self.sessions.lock();
        let entry = sessions
            .entry(record.session_id)
            .or_insert_with(|| SessionIndex::new(&self.config));
        entry.index.insert(record.id, record.embedding);
        entry.contents.insert(record.id, record.content);
    }

    fn statement_count(&self, session: &str) -> usize {
        self.sessions
            .lock()
            .get(session)
            .map_or(0, |entry| entry.index.len())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingEmbeddingProvider;

    fn store() -> VectorMemoryStore {
        VectorMemoryStore::in_memory(
            Arc::new(HashingEmbeddingProvider::new(512)),
            MemoryConfig::default(),
        )
    }

    #[tokio::test]
    async fn empty_store_returns_nothing() {
        let store = store();
        assert!(store.query("s", "anything").await.is_empty());
        assert_eq!(store.statement_count("s"), 0);
    }

    #[tokio::test]
    async fn returns_at_most_top_k_most_similar() {
        let store = store();
        store.store("s", "I was home all night watching television").await;
        store.store("s", "My car is a blue sedan").await;
        store.store("s", "I never met Emily Parker").await;

        let matches = store.query("s", "I was home all night").await;
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0], "I was home all night watching television");
    }

    #[tokio::test]
    async fn sessions_do_not_share_memory() {
        let store = store();
        store.store("alice", "I was at the docks").await;
        assert!(store.query("bob", "I was at the docks").await.is_empty());
        assert_eq!(store.query("alice", "the docks").await.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_statements_are_independent_records() {
        let store = store();
        store.store("s", "I was home all night").await;
        store.store("s", "I was home all night").await;
        assert_eq!(store.statement_count("s"), 2);

        let matches = store.query("s", "I was home all night").await;
        assert_eq!(matches, vec!["I was home all night", "I was home all night"]);
    }

    #[tokio::test]
    async fn large_sessions_switch_to_hnsw() {
        let config = MemoryConfig {
            brute_force_threshold: 10,
            ..MemoryConfig::default()
        };
        let store =
            VectorMemoryStore::in_memory(Arc::new(HashingEmbeddingProvider::new(512)), config);
        for i in 0..30 {
            store.store("s", &format!("filler statement number {i}")).await;
        }
        store.store("s", "the red umbrella was in the hallway").await;

        let matches = store.query("s", "red umbrella hallway").await;
        assert_eq!(matches[0], "the red umbrella was in the hallway");
    }

    #[tokio::test]
    async fn persistent_store_reloads_statements() {
        let dir = tempfile::tempdir().expect("tempdir");
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashingEmbeddingProvider::new(128));
        {
            let store = VectorMemoryStore::open(dir.path(), embedder.clone(), MemoryConfig::default())
                .expect("open");
            store.store("s", "I left work at six").await;
        }

        let store =
            VectorMemoryStore::open(dir.path(), embedder, MemoryConfig::default()).expect("reopen");
        assert_eq!(store.session_count(), 1);
        assert_eq!(store.query("s", "left work").await, vec!["I left work at six"]);
    }

    #[tokio::test]
    async fn null_store_is_inert() {
        let store = NullMemoryStore;
        store.store("s", "something").await;
        assert!(store.query("s", "something").await.is_empty());
        assert_eq!(store.statement_count("s"), 0);
    }
}
