//! # interro-server: dialogue orchestration and HTTP surface
//!
//! - [`Orchestrator`]: processes one witness message per call against a
//!   session's state
//! - [`SessionStore`]: bounded, per-`session_id` conversation state
//! - [`routes`]: axum router exposing `/chat` and the health endpoints

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod orchestrator;
pub mod routes;
pub mod session;

pub use orchestrator::{Orchestrator, RequestSettings, degraded_text};
pub use routes::{AppState, app_router};
pub use session::{SessionState, SessionStore, SharedSession};
