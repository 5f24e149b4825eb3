//! Remote embedding provider backed by an OpenAI-compatible `/v1/embeddings`
//! endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

use interro_core::embedding::EmbeddingProvider;
use interro_core::error::{InterroError, Result};
use interro_core::types::Embedding;

/// Embeddings from an OpenAI-compatible API.
pub struct OpenAiEmbeddingProvider {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
    dims: usize,
    timeout: Duration,
}

impl std::fmt::Debug for OpenAiEmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiEmbeddingProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("dims", &self.dims)
            .finish_non_exhaustive()
    }
}

impl OpenAiEmbeddingProvider {
    /// Create a provider for `model` at `base_url`.
    #[must_use]
    pub fn new(base_url: &str, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        let dims = known_dimensions(&model);
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model,
            dims,
            timeout: Duration::from_secs(30),
        }
    }

    /// Override the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Output width of the well-known embedding models.
fn known_dimensions(model: &str) -> usize {
    match model {
        "text-embedding-3-large" => 3072,
        _ => 1536,
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        if text.trim().is_empty() {
            return Err(InterroError::Embedding("cannot embed empty text".into()));
        }

        let url = format!("{}/v1/embeddings", self.base_url);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&json!({ "model": self.model, "input": text }))
            .send()
            .await
            .map_err(|e| InterroError::Embedding(format!("embedding request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(InterroError::Embedding(format!(
                "embedding endpoint returned HTTP {status}"
            )));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| InterroError::Embedding(format!("invalid embedding response: {e}")))?;

        let values = body["data"][0]["embedding"]
            .as_array()
            .ok_or_else(|| InterroError::Embedding("missing data[0].embedding".into()))?;

        #[allow(clippy::cast_possible_truncation)]
        let vector = values
            .iter()
            .map(|v| {
                v.as_f64()
                    .map(|x| x as f32)
                    .ok_or_else(|| InterroError::Embedding("non-numeric embedding value".into()))
            })
            .collect::<Result<Vec<f32>>>()?;

        debug!(model = %self.model, dims = vector.len(), "Embedded statement");
        Ok(Embedding(vector))
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
