//! interro HTTP server binary.
//!
//! # Environment Variables
//!
//! - `INTERRO_CONFIG`: path to a TOML config (default: `interro.toml` if present)
//! - `INTERRO_PORT`, `INTERRO_MEMORY_DIR`, `INTERRO_LOG`: config overrides
//! - `OPENAI_API_KEY`: model credential (name set by `llm.api_key_env`);
//!   without it the server answers in degraded mode
//! - `RUST_LOG`: tracing filter (default: `general.log_level`)
//!
//! A `.env` file in the working directory is loaded first.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use interro_core::config::MemoryConfig;
use interro_core::embedding::{EmbeddingProvider, HashingEmbeddingProvider};
use interro_core::store::{MemoryStore, NullMemoryStore, VectorMemoryStore};
use interro_core::InterroConfig;
use interro_llm::{LanguageModel, LlmClient, OpenAiEmbeddingProvider};
use interro_server::{AppState, Orchestrator, RequestSettings, SessionStore, app_router};

fn load_config() -> anyhow::Result<InterroConfig> {
    let path = std::env::var("INTERRO_CONFIG").map(PathBuf::from).ok();
    let mut config = match path {
        Some(path) => InterroConfig::from_file(&path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => {
            let default = PathBuf::from("interro.toml");
            if default.exists() {
                InterroConfig::from_file(&default).context("loading interro.toml")?
            } else {
                InterroConfig::default()
            }
        }
    };
    config.apply_env_overrides().context("applying INTERRO_* overrides")?;
    Ok(config)
}

fn build_memory(config: &MemoryConfig, llm_base_url: &str, api_key: Option<&str>) -> Arc<dyn MemoryStore> {
    if !config.enabled {
        tracing::info!("Witness memory disabled");
        return Arc::new(NullMemoryStore);
    }

    let embedder: Arc<dyn EmbeddingProvider> = match (config.embedding_provider.as_str(), api_key) {
        ("openai", Some(key)) => Arc::new(OpenAiEmbeddingProvider::new(
            llm_base_url,
            key,
            config.embedding_model.clone(),
        )),
        (provider, _) => {
            if provider != "hashing" {
                tracing::warn!(provider, "Embedding credential missing; using hashing embedder");
            }
            Arc::new(HashingEmbeddingProvider::new(config.hashing_dimensions))
        }
    };

    match VectorMemoryStore::open(&config.directory, embedder.clone(), config.clone()) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::warn!(error = %e, dir = %config.directory, "Persistent memory unavailable; keeping it in memory");
            Arc::new(VectorMemoryStore::in_memory(embedder, config.clone()))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = load_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level)),
        )
        .init();

    let api_key = std::env::var(&config.llm.api_key_env)
        .ok()
        .filter(|k| !k.trim().is_empty());

    let client = LlmClient::from_config(&config.llm, api_key.clone());
    let model: Option<Arc<dyn LanguageModel>> = if client.is_available() {
        Some(Arc::new(client))
    } else {
        tracing::warn!("Running in degraded mode: replies echo the witness");
        None
    };

    let memory = build_memory(&config.memory, &config.llm.base_url, api_key.as_deref());
    let orchestrator = Orchestrator::new(model, memory, config.dialogue.clone())
        .with_request_settings(RequestSettings::from(&config.llm));
    let sessions = SessionStore::from_config(&config.sessions, &config.dialogue);
    let state = AppState::new(orchestrator, sessions, &config.server.service_name);

    let sweeper = state.sessions.clone();
    let sweep_every = Duration::from_secs(config.sessions.idle_ttl_secs.clamp(1, 60));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_every);
        loop {
            interval.tick().await;
            sweeper.sweep_expired();
        }
    });

    let bind_addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;
    tracing::info!("{} listening on {bind_addr}", config.server.service_name);

    axum::serve(listener, app_router(state))
        .await
        .context("server error")?;
    Ok(())
}
