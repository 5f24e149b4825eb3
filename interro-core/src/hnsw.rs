//! HNSW Vector Index: approximate nearest-neighbour search over statements.
//!
//! Wraps `instant-distance` to provide cosine-similarity search over the
//! embeddings of one session's witness statements. Below the configured
//! brute-force threshold (or before the graph is built) a linear scan is
//! used instead, which is exact and cheap for short interrogations.
//!
//! ## Usage
//!
//! ```rust
//! # use interro_core::hnsw::HnswIndex;
//! # use interro_core::types::{Embedding, RecordId};
//! let mut index = HnswIndex::new();
//! index.insert(RecordId::new(), Embedding(vec![0.1, 0.2, 0.3]));
//! index.insert(RecordId::new(), Embedding(vec![0.9, 0.8, 0.7]));
//! index.build();
//! let results = index.search(&Embedding(vec![0.1, 0.2, 0.3]), 2);
//! assert_eq!(results.len(), 2);
//! ```

use instant_distance::{Builder, HnswMap, Point, Search};
use ordered_float::OrderedFloat;

use crate::types::{Embedding, RecordId};

// ---------------------------------------------------------------------------
// HnswPoint: adapter from Embedding to instant-distance Point trait
// ---------------------------------------------------------------------------

/// A point in the index, pre-normalised so cosine similarity is a dot product.
#[derive(Clone, Debug)]
struct HnswPoint {
    normalized: Vec<f32>,
}

impl HnswPoint {
    fn from_embedding(embedding: &Embedding) -> Self {
        let norm = embedding
            .0
            .iter()
            .map(|x| x * x)
            .sum::<f32>()
            .sqrt()
            .max(f32::EPSILON);
        let normalized: Vec<f32> = embedding.0.iter().map(|x| x / norm).collect();
        Self { normalized }
    }
}

impl Point for HnswPoint {
    /// Cosine distance = 1 - `cosine_similarity`.
    fn distance(&self, other: &Self) -> f32 {
        if self.normalized.len() != other.normalized.len() {
            return 1.0;
        }
        let dot: f32 = self
            .normalized
            .iter()
            .zip(other.normalized.iter())
            .map(|(a, b)| a * b)
            .sum();
        (1.0 - dot).max(0.0)
    }
}

// ---------------------------------------------------------------------------
// Search Results
// ---------------------------------------------------------------------------

/// A single search result.
#[derive(Debug, Clone)]
pub struct HnswResult {
    /// The record whose embedding matched.
    pub record_id: RecordId,
    /// Cosine distance (0.0 = identical, 1.0 = orthogonal).
    pub distance: f32,
    /// Cosine similarity (1.0 - distance).
    pub similarity: f32,
}

// ---------------------------------------------------------------------------
// HnswIndex: incremental insert + batch-build + search
// ---------------------------------------------------------------------------

/// HNSW-based approximate nearest-neighbour index.
///
/// ## Lifecycle
///
/// 1. **Insert**: add embeddings with their record IDs via [`HnswIndex::insert`].
/// 2. **Build**: [`HnswIndex::build`] constructs the graph (O(N log N)).
/// 3. **Search**: [`HnswIndex::search`] returns nearest neighbours.
///
/// `instant-distance` graphs are immutable, so inserts after a build mark
/// the index dirty; [`HnswIndex::needs_rebuild`] reports when the dirty
/// share exceeds the rebuild threshold. Until then, searches also scan the
/// points inserted since the last build so nothing is ever missed.
pub struct HnswIndex {
    points: Vec<HnswPoint>,
    values: Vec<RecordId>,
    map: Option<HnswMap<HnswPoint, RecordId>>,
    /// Number of points (from the front of `points`) covered by `map`.
    built_len: usize,
    ef_construction: usize,
    ef_search: usize,
    auto_rebuild_threshold: f32,
}

impl HnswIndex {
    /// Create a new empty index with default parameters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            points: Vec::new(),
            values: Vec::new(),
            map: None,
            built_len: 0,
            ef_construction: 100,
            ef_search: 50,
            auto_rebuild_threshold: 0.2,
        }
    }

    /// Create with custom HNSW parameters.
    #[must_use]
    pub fn with_params(ef_construction: usize, ef_search: usize) -> Self {
        Self {
            ef_construction,
            ef_search,
            ..Self::new()
        }
    }

    /// Insert a record embedding. Duplicated embeddings are kept as
    /// separate entries.
    pub fn insert(&mut self, record_id: RecordId, embedding: Embedding) {
        self.points.push(HnswPoint::from_embedding(&embedding));
        self.values.push(record_id);
    }

    /// Number of indexed points (built + pending).
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points inserted since the last build.
    #[must_use]
    pub fn dirty_count(&self) -> usize {
        self.points.len() - self.built_len
    }

    /// Whether the dirty share exceeds the rebuild threshold.
    #[must_use]
    pub fn needs_rebuild(&self) -> bool {
        let total = self.points.len();
        if total == 0 {
            return false;
        }
        if self.map.is_none() {
            return true;
        }
        (self.dirty_count() as f32 / total as f32) > self.auto_rebuild_threshold
    }

    /// Build (or rebuild) the HNSW graph from all points.
    pub fn build(&mut self) {
        if self.points.is_empty() {
            return;
        }

        let builder = Builder::default()
            .ef_construction(self.ef_construction)
            .ef_search(self.ef_search)
            .seed(42);

        self.map = Some(builder.build(self.points.clone(), self.values.clone()));
        self.built_len = self.points.len();
    }

    /// Search for the `k` nearest neighbours of `query`, most similar first.
    #[must_use]
    pub fn search(&self, query: &Embedding, k: usize) -> Vec<HnswResult> {
        if k == 0 || self.points.is_empty() {
            return Vec::new();
        }
        let query_point = HnswPoint::from_embedding(query);

        let Some(map) = &self.map else {
            return self.brute_force_search(&query_point, k, 0);
        };

        let mut search = Search::default();
        let mut results: Vec<HnswResult> = map
            .search(&query_point, &mut search)
            .take(k)
            .map(|item| HnswResult {
                record_id: *item.value,
                distance: item.distance,
                similarity: 1.0 - item.distance,
            })
            .collect();

        if self.dirty_count() > 0 {
            results.extend(self.brute_force_search(&query_point, k, self.built_len));
            results.sort_by_key(|r| OrderedFloat(r.distance));
            results.truncate(k);
        }
        results
    }

    /// Exact linear scan over every point, ignoring the graph.
    #[must_use]
    pub fn brute_force(&self, query: &Embedding, k: usize) -> Vec<HnswResult> {
        self.brute_force_search(&HnswPoint::from_embedding(query), k, 0)
    }

    fn brute_force_search(&self, query: &HnswPoint, k: usize, from: usize) -> Vec<HnswResult> {
        let mut scored: Vec<(f32, usize)> = self.points[from..]
            .iter()
            .enumerate()
            .map(|(i, point)| (query.distance(point), from + i))
            .collect();

        // Stable sort keeps insertion order among equal distances.
        scored.sort_by_key(|(d, _)| OrderedFloat(*d));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(dist, idx)| HnswResult {
                record_id: self.values[idx],
                distance: dist,
                similarity: 1.0 - dist,
            })
            .collect()
    }

    /// Whether a built graph exists.
    #[must_use]
    pub fn is_built(&self) -> bool {
        self.map.is_some()
    }
}

impl Default for HnswIndex {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
