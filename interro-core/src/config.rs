//! Configuration for the interrogation backend.
//!
//! Maps directly to `interro.toml`. Every field has a default, so an empty
//! file (or no file at all) yields the reference behaviour.

use serde::{Deserialize, Serialize};

use crate::error::{InterroError, Result};

/// Top-level configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InterroConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Turn-taking, context window and silence handling.
    #[serde(default)]
    pub dialogue: DialogueConfig,
    /// Witness statement memory.
    #[serde(default)]
    pub memory: MemoryConfig,
    /// Language model integration.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Per-session state retention.
    #[serde(default)]
    pub sessions: SessionConfig,
}

impl InterroConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `InterroError::Config` if the TOML is invalid or fails validation.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| InterroError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Apply `INTERRO_*` environment overrides on top of the file values.
    ///
    /// # Errors
    /// Returns `InterroError::Config` if an override cannot be parsed.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup (testable without
    /// touching the process environment).
    ///
    /// # Errors
    /// Returns `InterroError::Config` if an override cannot be parsed.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("INTERRO_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| InterroError::Config(format!("INTERRO_PORT is not a port: '{port}'")))?;
        }
        if let Some(dir) = lookup("INTERRO_MEMORY_DIR") {
            self.memory.directory = dir;
        }
        if let Some(level) = lookup("INTERRO_LOG") {
            self.general.log_level = level;
        }
        self.validate()
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    /// Returns `InterroError::Config` describing the first violation found.
    pub fn validate(&self) -> Result<()> {
        let policy = &self.dialogue.policy;
        for (name, p) in [
            ("silence_reynolds", policy.silence_reynolds),
            ("reynolds_momentum", policy.reynolds_momentum),
            ("chen_handback", policy.chen_handback),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(InterroError::Config(format!(
                    "dialogue.policy.{name} must be within [0, 1], got {p}"
                )));
            }
        }
        if self.dialogue.history_window == 0 {
            return Err(InterroError::Config("dialogue.history_window must be > 0".into()));
        }
        if self.dialogue.silence_sentinel.trim().is_empty() {
            return Err(InterroError::Config("dialogue.silence_sentinel must not be empty".into()));
        }
        if self.memory.top_k == 0 {
            return Err(InterroError::Config("memory.top_k must be > 0".into()));
        }
        if self.sessions.max_sessions == 0 {
            return Err(InterroError::Config("sessions.max_sessions must be > 0".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General system settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Name reported by the status endpoint.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl ServerConfig {
    /// `host:port` string for the listener.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            service_name: default_service_name(),
        }
    }
}

/// Dialogue flow settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueConfig {
    /// How many of the most recent turns are sent to the model.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    /// Message text that signals the witness stayed silent.
    #[serde(default = "default_silence_sentinel")]
    pub silence_sentinel: String,
    /// Silence duration quoted to the detectives.
    #[serde(default = "default_silence_seconds")]
    pub silence_seconds: u32,
    /// The missing person the interrogation is about.
    #[serde(default = "default_case_subject")]
    pub case_subject: String,
    /// Fixed RNG seed for every session (tests, replays). `None` = entropy.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Persona transition probabilities.
    #[serde(default)]
    pub policy: TransitionPolicy,
}

impl DialogueConfig {
    /// Whether `message` is the silence sentinel (surrounding whitespace ignored).
    #[must_use]
    pub fn is_silence(&self, message: &str) -> bool {
        message.trim() == self.silence_sentinel
    }
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            silence_sentinel: default_silence_sentinel(),
            silence_seconds: default_silence_seconds(),
            case_subject: default_case_subject(),
            seed: None,
            policy: TransitionPolicy::default(),
        }
    }
}

/// Probability that Reynolds takes the next turn, per situation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionPolicy {
    /// The witness went silent.
    #[serde(default = "default_0_8")]
    pub silence_reynolds: f64,
    /// Reynolds spoke last and keeps pressing.
    #[serde(default = "default_0_7")]
    pub reynolds_momentum: f64,
    /// Chen spoke last and hands back to Reynolds.
    #[serde(default = "default_0_85")]
    pub chen_handback: f64,
}

impl Default for TransitionPolicy {
    fn default() -> Self {
        Self {
            silence_reynolds: 0.8,
            reynolds_momentum: 0.7,
            chen_handback: 0.85,
        }
    }
}

/// Witness memory (contradiction lookup) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Whether statements are stored and searched at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Directory holding the persistent store.
    #[serde(default = "default_memory_dir")]
    pub directory: String,
    /// Number of past statements retrieved per message.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Embedding backend: "openai" or "hashing".
    #[serde(default = "default_embedding_provider")]
    pub embedding_provider: String,
    /// Remote embedding model name.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    /// Vector width of the offline hashing embedder.
    #[serde(default = "default_hashing_dimensions")]
    pub hashing_dimensions: usize,
    /// Below this many records a session is searched by linear scan.
    #[serde(default = "default_brute_force_threshold")]
    pub brute_force_threshold: usize,
    /// HNSW `ef_construction`.
    #[serde(default = "default_ef_construction")]
    pub ef_construction: usize,
    /// HNSW `ef_search`.
    #[serde(default = "default_ef_search")]
    pub ef_search: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: default_memory_dir(),
            top_k: default_top_k(),
            embedding_provider: default_embedding_provider(),
            embedding_model: default_embedding_model(),
            hashing_dimensions: default_hashing_dimensions(),
            brute_force_threshold: default_brute_force_threshold(),
            ef_construction: default_ef_construction(),
            ef_search: default_ef_search(),
        }
    }
}

/// Language model integration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider: "openai", "ollama", "none".
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Base URL for the LLM API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Chat model name.
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Maximum tokens per reply.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Hard timeout for any LLM call in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Extra attempts after a failed call.
    #[serde(default)]
    pub max_retries: u32,
    /// Environment variable holding the API credential.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            request_timeout_ms: default_timeout_ms(),
            max_retries: 0,
            api_key_env: default_api_key_env(),
        }
    }
}

/// Per-session state retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Least-recently-used sessions beyond this count are dropped.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    /// Sessions idle for longer than this are dropped.
    #[serde(default = "default_idle_ttl")]
    pub idle_ttl_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
            idle_ttl_secs: default_idle_ttl(),
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8000 }
fn default_service_name() -> String { "Interrogation Learning System Backend".to_string() }
fn default_history_window() -> usize { 10 }
fn default_silence_sentinel() -> String { "[SILENCE]".to_string() }
fn default_silence_seconds() -> u32 { 10 }
fn default_case_subject() -> String { "Emily Parker".to_string() }
fn default_memory_dir() -> String { "./interro_memory".to_string() }
fn default_top_k() -> usize { 2 }
fn default_embedding_provider() -> String { "openai".to_string() }
fn default_embedding_model() -> String { "text-embedding-3-small".to_string() }
fn default_hashing_dimensions() -> usize { 256 }
fn default_brute_force_threshold() -> usize { 100 }
fn default_ef_construction() -> usize { 100 }
fn default_ef_search() -> usize { 50 }
fn default_provider() -> String { "openai".to_string() }
fn default_base_url() -> String { "https://api.openai.com".to_string() }
fn default_model() -> String { "gpt-4o".to_string() }
fn default_temperature() -> f32 { 0.7 }
fn default_max_tokens() -> u32 { 300 }
fn default_timeout_ms() -> u64 { 30_000 }
fn default_api_key_env() -> String { "OPENAI_API_KEY".to_string() }
fn default_max_sessions() -> usize { 1024 }
fn default_idle_ttl() -> u64 { 1800 }
fn default_0_7() -> f64 { 0.7 }
fn default_0_8() -> f64 { 0.8 }
fn default_0_85() -> f64 { 0.85 }
