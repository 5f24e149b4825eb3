//! LLM Client: one interface over OpenAI-compatible and Ollama backends.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, info, warn};

use interro_core::config::LlmConfig;

use crate::error::LlmError;
use crate::types::{LlmRequest, LlmResponse};

// ---------------------------------------------------------------------------
// Model boundary
// ---------------------------------------------------------------------------

/// Anything that turns a chat request into generated text.
///
/// Failures are returned, never swallowed: the caller decides how to
/// degrade.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a reply for `request`.
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Name of the backing model.
    fn model_name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

/// Provider backend for LLM inference.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    /// Ollama running locally.
    Ollama {
        /// e.g. `http://localhost:11434`.
        base_url: String,
    },
    /// OpenAI-compatible chat-completions API.
    OpenAiCompatible {
        /// e.g. `https://api.openai.com`.
        base_url: String,
        /// Bearer credential.
        api_key: String,
    },
    /// No LLM available: every call fails with [`LlmError::Unavailable`].
    None,
}

/// HTTP client that routes requests to the configured backend.
pub struct LlmClient {
    provider: LlmProvider,
    http: Client,
    model: String,
    max_retries: u32,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let provider = match &self.provider {
            LlmProvider::Ollama { .. } => "ollama",
            LlmProvider::OpenAiCompatible { .. } => "openai",
            LlmProvider::None => "none",
        };
        f.debug_struct("LlmClient")
            .field("provider", &provider)
            .field("model", &self.model)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

impl LlmClient {
    /// Create a new LLM client.
    #[must_use]
    pub fn new(provider: LlmProvider, model: impl Into<String>, max_retries: u32) -> Self {
        Self {
            provider,
            http: Client::new(),
            model: model.into(),
            max_retries,
        }
    }

    /// Create a client with no backend; every call fails.
    #[must_use]
    pub fn none() -> Self {
        Self::new(LlmProvider::None, String::new(), 0)
    }

    /// Build a client from configuration and an optional credential.
    ///
    /// An `openai` provider without a credential resolves to
    /// [`LlmProvider::None`]: running without a model is a supported mode.
    #[must_use]
    pub fn from_config(config: &LlmConfig, api_key: Option<String>) -> Self {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let provider = match config.provider.to_lowercase().as_str() {
            "openai" => match api_key.filter(|k| !k.trim().is_empty()) {
                Some(api_key) => LlmProvider::OpenAiCompatible { base_url, api_key },
                None => {
                    warn!(
                        env = %config.api_key_env,
                        "No API credential found; dialogue runs in offline mode"
                    );
                    LlmProvider::None
                }
            },
            "ollama" => LlmProvider::Ollama { base_url },
            "none" => LlmProvider::None,
            other => {
                warn!(provider = other, "Unknown LLM provider; dialogue runs in offline mode");
                LlmProvider::None
            }
        };

        let client = Self::new(provider, config.model.clone(), config.max_retries);
        if client.is_available() {
            info!(model = %client.model, provider = ?client, "LLM client configured");
        }
        client
    }

    /// Check if the client has a backend configured.
    #[must_use]
    pub fn is_available(&self) -> bool {
        !matches!(self.provider, LlmProvider::None)
    }

    /// Generate a response from the configured backend.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Unavailable`] without a backend, otherwise the
    /// failure of the last attempt.
    pub async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        match &self.provider {
            LlmProvider::None => Err(LlmError::Unavailable("No LLM provider configured".into())),
            LlmProvider::Ollama { base_url } => {
                let url = format!("{base_url}/api/chat");
                let body = json!({
                    "model": self.model,
                    "messages": request.messages,
                    "stream": false,
                    "options": {
                        "temperature": request.temperature,
                        "num_predict": request.max_tokens,
                    }
                });
                self.send_with_retries(&url, None, &body, request.timeout_ms, parse_ollama)
                    .await
            }
            LlmProvider::OpenAiCompatible { base_url, api_key } => {
                let url = format!("{base_url}/v1/chat/completions");
                let body = json!({
                    "model": self.model,
                    "messages": request.messages,
                    "max_tokens": request.max_tokens,
                    "temperature": request.temperature,
                });
                self.send_with_retries(&url, Some(api_key), &body, request.timeout_ms, parse_openai)
                    .await
            }
        }
    }

    async fn send_with_retries(
        &self,
        url: &str,
        api_key: Option<&str>,
        body: &serde_json::Value,
        timeout_ms: u64,
        parse: fn(&serde_json::Value) -> Result<(String, u32), LlmError>,
    ) -> Result<LlmResponse, LlmError> {
        let mut last_error: Option<LlmError> = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                debug!("Retrying LLM call (attempt {}/{})", attempt + 1, self.max_retries + 1);
            }

            let start = Instant::now();
            let mut builder = self
                .http
                .post(url)
                .json(body)
                .timeout(Duration::from_millis(timeout_ms));
            if let Some(key) = api_key {
                builder = builder.bearer_auth(key);
            }

            let outcome = match builder.send().await {
                Ok(resp) if resp.status().is_success() => {
                    match resp.json::<serde_json::Value>().await {
                        Ok(json) => parse(&json),
                        Err(e) => Err(LlmError::ParseError(e.to_string())),
                    }
                }
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    let text = resp.text().await.unwrap_or_default();
                    Err(LlmError::Http { status, body: truncate_chars(text, ERROR_BODY_LIMIT) })
                }
                Err(e) if e.is_timeout() => Err(LlmError::Timeout(timeout_ms)),
                Err(e) => Err(LlmError::from(e)),
            };

            #[allow(clippy::cast_possible_truncation)]
            let latency_ms = start.elapsed().as_millis() as u64;

            match outcome {
                Ok((text, tokens_generated)) => {
                    debug!(latency_ms, tokens_generated, model = %self.model, "LLM call succeeded");
                    return Ok(LlmResponse {
                        text,
                        tokens_generated,
                        latency_ms,
                        model: self.model.clone(),
                    });
                }
                Err(e) => {
                    warn!(latency_ms, error = %e, "LLM call failed");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if self.max_retries == 0 => Err(e),
            Some(e) => Err(LlmError::RetriesExhausted {
                attempts: self.max_retries + 1,
                last_error: e.to_string(),
            }),
            None => Err(LlmError::Unavailable("no attempt was made".into())),
        }
    }
}

#[async_trait]
impl LanguageModel for LlmClient {
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.complete(request).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Longest provider error body kept in [`LlmError::Http`], in characters.
const ERROR_BODY_LIMIT: usize = 512;

/// Keep at most `max` characters, cutting on a char boundary.
fn truncate_chars(mut text: String, max: usize) -> String {
    let cut = text.char_indices().nth(max).map_or(text.len(), |(i, _)| i);
    text.truncate(cut);
    text
}

fn parse_openai(json: &serde_json::Value) -> Result<(String, u32), LlmError> {
    let text = json["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| LlmError::ParseError("missing choices[0].message.content".into()))?;
    let tokens = json["usage"]["completion_tokens"].as_u64().unwrap_or(0);
    Ok((text.to_string(), u32::try_from(tokens).unwrap_or(u32::MAX)))
}

fn parse_ollama(json: &serde_json::Value) -> Result<(String, u32), LlmError> {
    let text = json["message"]["content"]
        .as_str()
        .ok_or_else(|| LlmError::ParseError("missing message.content".into()))?;
    let tokens = json["eval_count"].as_u64().unwrap_or(0);
    Ok((text.to_string(), u32::try_from(tokens).unwrap_or(u32::MAX)))
}
