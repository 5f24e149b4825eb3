//! Vector embedding abstraction layer.
//!
//! Provides a trait-based interface for turning witness statements into
//! embeddings for semantic similarity search.
//!
//! The production implementation calls a remote embedding API (see
//! `interro_llm::embedding`). The hashing provider here needs no network
//! and no model files: it is used in tests and whenever no credential is
//! configured.

use async_trait::async_trait;

use crate::error::{InterroError, Result};
use crate::types::Embedding;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Generate vector embeddings from text.
///
/// Implementations must be `Send + Sync` for use from async contexts.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string.
    ///
    /// Returns a vector of `dimensions()` floats.
    ///
    /// # Errors
    ///
    /// Returns [`InterroError::Embedding`] if the backend fails to
    /// produce an embedding.
    async fn embed(&self, text: &str) -> Result<Embedding>;

    /// The dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// A human-readable name for the model (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Hashing provider (offline)
// ---------------------------------------------------------------------------

/// Deterministic bag-of-words embedder using the hashing trick.
///
/// Each lowercase alphanumeric token is hashed (FNV-1a) into one of
/// `dims` buckets with a hash-derived sign, then the vector is
/// L2-normalised. Statements sharing vocabulary land close together,
/// which is enough for contradiction lookup in tests and offline runs.
pub struct HashingEmbeddingProvider {
    dims: usize,
    name: String,
}

impl HashingEmbeddingProvider {
    /// Create a new hashing provider with the given dimensionality.
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        let dims = dimensions.max(1);
        Self {
            dims,
            name: format!("hashing-bow-{dims}"),
        }
    }

    /// Synchronous embedding (the computation never blocks).
    #[must_use]
    pub fn embed_now(&self, text: &str) -> Embedding {
        let mut v = vec![0.0_f32; self.dims];
        for token in tokenize(text) {
            let h = fnv1a(token.as_bytes());
            #[allow(clippy::cast_possible_truncation)]
            let bucket = (h % self.dims as u64) as usize;
            let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
            v[bucket] += sign;
        }

        let mag: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if mag >= f32::EPSILON {
            for x in &mut v {
                *x /= mag;
            }
        }
        Embedding(v)
    }
}

impl Default for HashingEmbeddingProvider {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        if text.trim().is_empty() {
            return Err(InterroError::Embedding("cannot embed empty text".into()));
        }
        Ok(self.embed_now(text))
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// 64-bit FNV-1a. Stable across builds, which matters because hashed
/// embeddings are persisted.
fn fnv1a(data: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = OFFSET;
    for &byte in data {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hashing_is_deterministic() {
        let provider = HashingEmbeddingProvider::new(64);
        let a = provider.embed("I was home all night").await.expect("embed");
        let b = provider.embed("I was home all night").await.expect("embed");
        assert_eq!(a, b);
        assert_eq!(a.dimensions(), 64);
    }

    #[tokio::test]
    async fn hashing_returns_unit_vectors() {
        let provider = HashingEmbeddingProvider::default();
        let emb = provider.embed("the car was parked outside").await.expect("embed");
        let mag: f32 = emb.0.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((mag - 1.0).abs() < 0.01, "expected unit vector, got magnitude {mag}");
    }

    #[tokio::test]
    async fn shared_vocabulary_is_closer() {
        let provider = HashingEmbeddingProvider::new(512);
        let home = provider.embed("I was at home all night").await.expect("embed");
        let home2 = provider.embed("I stayed home that night").await.expect("embed");
        let bar = provider.embed("Drinks at the harbour bar with friends").await.expect("embed");
        assert!(home.cosine_similarity(&home2) > home.cosine_similarity(&bar));
    }

    #[tokio::test]
    async fn case_and_punctuation_are_ignored() {
        let provider = HashingEmbeddingProvider::new(32);
        let a = provider.embed("Home, ALL night!").await.expect("embed");
        let b = provider.embed("home all night").await.expect("embed");
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn empty_text_is_an_error() {
        let provider = HashingEmbeddingProvider::new(8);
        assert!(provider.embed("   ").await.is_err());
    }

    #[test]
    fn fnv_reference_values() {
        assert_eq!(fnv1a(b""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a(b"a"), 0xaf63_dc4c_8601_ec8c);
    }
}
