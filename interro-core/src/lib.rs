//! # interro core library
//!
//! Domain model and stateful policies for a two-detective interrogation:
//!
//! - **Personas**: Reynolds (bad cop) and Chen (good cop)
//! - **Turn selection**: who answers the witness next ([`TurnSelector`])
//! - **Conversation history**: append-only, attributed turns
//!   ([`ConversationHistory`])
//! - **Witness memory**: past statements indexed for similarity search so
//!   the detectives can catch contradictions ([`MemoryStore`])
//!
//! Nothing in this crate talks to a language model; see `interro-llm`.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

pub mod config;
pub mod embedding;
pub mod error;
pub mod history;
pub mod hnsw;
pub mod persistence;
pub mod store;
pub mod turn;
pub mod types;

pub use config::InterroConfig;
pub use error::InterroError;
pub use history::ConversationHistory;
pub use store::{MemoryStore, NullMemoryStore, VectorMemoryStore};
pub use turn::TurnSelector;
pub use types::*;
