//! Append-only conversation history.
//!
//! Storage is unbounded; only the most recent window is ever read back
//! when building model context. Turns are never reordered or removed.

use serde::Serialize;

use crate::types::{Persona, Role, Turn};

/// Insertion-ordered sequence of [`Turn`]s for one session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversationHistory {
    turns: Vec<Turn>,
}

impl ConversationHistory {
    /// Create an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a witness turn.
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::user(content));
    }

    /// Append a detective turn attributed to `speaker`.
    pub fn push_assistant(&mut self, speaker: Persona, content: impl Into<String>) {
        self.turns.push(Turn::assistant(speaker, content));
    }

    /// The last `limit` turns, oldest first.
    #[must_use]
    pub fn recent(&self, limit: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(limit);
        &self.turns[start..]
    }

    /// Every stored turn, oldest first.
    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The persona of the most recent assistant turn, if any.
    #[must_use]
    pub fn last_speaker(&self) -> Option<Persona> {
        self.turns
            .iter()
            .rev()
            .find(|t| t.role == Role::Assistant)
            .and_then(|t| t.speaker)
    }

    /// Number of stored turns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether nothing has been said yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
