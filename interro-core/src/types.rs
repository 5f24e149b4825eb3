//! Core type definitions for the interrogation dialogue.
//!
//! Personas, turns, speaker attribution and the reply handed back to
//! callers. All types are serializable so they can cross the HTTP
//! boundary and be inspected in tests.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Personas
// ---------------------------------------------------------------------------

/// One of the two interrogating detectives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Persona {
    /// Detective James Reynolds: the "bad cop". Opens every interrogation.
    #[default]
    Reynolds,
    /// Detective Sarah Chen: the "good cop".
    Chen,
}

impl Persona {
    /// Every persona, in a stable order.
    pub const ALL: [Persona; 2] = [Persona::Reynolds, Persona::Chen];

    /// Short name used for speaker labels and the wire format.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Reynolds => "Reynolds",
            Self::Chen => "Chen",
        }
    }

    /// Full in-world name.
    #[must_use]
    pub fn full_name(self) -> &'static str {
        match self {
            Self::Reynolds => "Detective James Reynolds",
            Self::Chen => "Detective Sarah Chen",
        }
    }

    /// The emotion tag a reply from this persona carries.
    #[must_use]
    pub fn emotion(self) -> Emotion {
        match self {
            Self::Reynolds => Emotion::Stern,
            Self::Chen => Emotion::Supportive,
        }
    }

    /// Parse a short persona name (case-insensitive).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "reynolds" => Some(Self::Reynolds),
            "chen" => Some(Self::Chen),
            _ => None,
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Speaker & Emotion (reply attribution)
// ---------------------------------------------------------------------------

/// Who produced a reply: a detective, or the system itself in degraded mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Speaker {
    /// One of the detectives.
    Persona(Persona),
    /// Diagnostic replies when no language model answered.
    System,
}

impl Speaker {
    /// Wire name (`"Reynolds"`, `"Chen"`, `"System"`).
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Persona(p) => p.name(),
            Self::System => "System",
        }
    }
}

impl From<Persona> for Speaker {
    fn from(p: Persona) -> Self {
        Self::Persona(p)
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Speaker {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Speaker {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if raw.eq_ignore_ascii_case("system") {
            return Ok(Self::System);
        }
        Persona::from_name(&raw)
            .map(Self::Persona)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown speaker '{raw}'")))
    }
}

/// Emotion tag used by the front end to pick voice and styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    /// Reynolds.
    Stern,
    /// Chen.
    Supportive,
    /// System replies.
    Neutral,
}

impl Emotion {
    /// Lowercase tag.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stern => "stern",
            Self::Supportive => "supportive",
            Self::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Turns
// ---------------------------------------------------------------------------

/// Which side of the table a turn came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The witness.
    User,
    /// One of the detectives.
    Assistant,
}

/// One message in the conversation. Immutable once appended to history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// User or assistant.
    pub role: Role,
    /// Raw text, without any speaker label.
    pub content: String,
    /// The persona that spoke (assistant turns only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<Persona>,
}

impl Turn {
    /// A witness turn.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            speaker: None,
        }
    }

    /// A detective turn attributed to `speaker`.
    #[must_use]
    pub fn assistant(speaker: Persona, content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            speaker: Some(speaker),
        }
    }
}

// ---------------------------------------------------------------------------
// Reply
// ---------------------------------------------------------------------------

/// The structured result of processing one witness message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueReply {
    /// What the speaker says.
    pub text: String,
    /// Who says it.
    #[serde(rename = "agent")]
    pub speaker: Speaker,
    /// Emotion tag derived from the speaker.
    pub emotion: Emotion,
}

impl DialogueReply {
    /// A generated reply from a detective.
    #[must_use]
    pub fn from_persona(persona: Persona, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            speaker: Speaker::Persona(persona),
            emotion: persona.emotion(),
        }
    }

    /// A system diagnostic reply (degraded mode).
    #[must_use]
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            speaker: Speaker::System,
            emotion: Emotion::Neutral,
        }
    }
}

// ---------------------------------------------------------------------------
// Memory records
// ---------------------------------------------------------------------------

/// Unique identifier for a stored witness statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(pub Uuid);

impl RecordId {
    /// Create a new random record ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A dense vector embedding for semantic similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding(pub Vec<f32>);

impl Embedding {
    /// Cosine similarity between two embeddings.
    /// Returns 0.0 if either vector is zero-length or dimensions differ.
    #[must_use]
    pub fn cosine_similarity(&self, other: &Self) -> f32 {
        if self.0.len() != other.0.len() || self.0.is_empty() {
            return 0.0;
        }
        let (mut dot, mut norm_a, mut norm_b) = (0.0_f32, 0.0_f32, 0.0_f32);
        for (a, b) in self.0.iter().zip(other.0.iter()) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }
        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom < f32::EPSILON {
            0.0
        } else {
            dot / denom
        }
    }

    /// Dimensionality of the embedding.
    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.0.len()
    }
}
