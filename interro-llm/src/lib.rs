//! # interro-llm: language-model layer for the interrogation backend
//!
//! Everything that talks to, or prepares input for, a model:
//!   - **Client**: OpenAI-compatible chat completions or local Ollama,
//!     behind the [`LanguageModel`] trait
//!   - **Embeddings**: remote `/v1/embeddings` provider for witness memory
//!   - **Prompts**: persona profiles, silence tactics and the per-turn
//!     system instruction ([`PromptComposer`])
//!   - **Context**: the labelled, bounded message window
//!
//! Every model call returns a `Result`; callers choose how to degrade.

#![deny(clippy::unwrap_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod context;
pub mod embedding;
pub mod error;
pub mod prompt;
pub mod types;

pub use client::{LanguageModel, LlmClient, LlmProvider};
pub use context::{assemble_messages, build_context_window};
pub use embedding::OpenAiEmbeddingProvider;
pub use error::LlmError;
pub use prompt::PromptComposer;
pub use types::{ChatMessage, ChatRole, LlmRequest, LlmResponse};
