//! Dialogue orchestrator: one witness message in, one detective reply out.
//!
//! Per message: record the witness turn, look up earlier statements, pick
//! the speaker, compose the instruction, call the model, then commit the
//! reply and remember the statement. Memory lookup always precedes the
//! write of the same statement, and silence touches memory not at all.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use interro_core::config::{DialogueConfig, LlmConfig};
use interro_core::store::MemoryStore;
use interro_core::types::DialogueReply;
use interro_llm::context::{assemble_messages, build_context_window};
use interro_llm::{LanguageModel, LlmRequest, PromptComposer};

use crate::session::{SessionState, SessionStore};

/// Reply text used whenever no generated answer is available.
#[must_use]
pub fn degraded_text(user_text: &str) -> String {
    format!(
        "[OFFLINE] No language model is available (set OPENAI_API_KEY in .env). You said: {user_text}"
    )
}

/// Generation parameters forwarded with every model call.
#[derive(Debug, Clone, Copy)]
pub struct RequestSettings {
    /// Sampling temperature.
    pub temperature: f32,
    /// Token limit per reply.
    pub max_tokens: u32,
    /// Per-call timeout.
    pub timeout_ms: u64,
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self::from(&LlmConfig::default())
    }
}

impl From<&LlmConfig> for RequestSettings {
    fn from(config: &LlmConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_ms: config.request_timeout_ms,
        }
    }
}

/// Ties turn selection, memory, prompts and the model together.
pub struct Orchestrator {
    model: Option<Arc<dyn LanguageModel>>,
    memory: Arc<dyn MemoryStore>,
    composer: PromptComposer,
    dialogue: DialogueConfig,
    request: RequestSettings,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("model", &self.model.as_ref().map(|m| m.model_name().to_string()))
            .field("composer", &self.composer)
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Create an orchestrator. `model = None` runs in degraded mode.
    #[must_use]
    pub fn new(
        model: Option<Arc<dyn LanguageModel>>,
        memory: Arc<dyn MemoryStore>,
        dialogue: DialogueConfig,
    ) -> Self {
        Self {
            model,
            memory,
            composer: PromptComposer::from_config(&dialogue),
            dialogue,
            request: RequestSettings::default(),
        }
    }

    /// Override generation parameters.
    #[must_use]
    pub fn with_request_settings(mut self, request: RequestSettings) -> Self {
        self.request = request;
        self
    }

    /// Whether every reply will be the degraded diagnostic.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.model.is_none()
    }

    /// Dialogue settings in use.
    #[must_use]
    pub fn dialogue(&self) -> &DialogueConfig {
        &self.dialogue
    }

    /// Look up (or create) `session_id` and process `user_text` under its
    /// lock. Requests of one session are serialised; different sessions
    /// run concurrently.
    pub async fn handle(&self, sessions: &SessionStore, session_id: &str, user_text: &str) -> DialogueReply {
        let session = sessions.get_or_create(session_id);
        let mut state = session.lock().await;
        self.process(session_id, &mut state, user_text).await
    }

    /// Process one witness message against `state`.
    ///
    /// Never fails: a missing model or a failed call yields the degraded
    /// reply. In that case the witness turn stays in history but no
    /// detective turn is recorded, `last_speaker` is unchanged and the
    /// statement is not remembered.
    pub async fn process(&self, session_id: &str, state: &mut SessionState, user_text: &str) -> DialogueReply {
        state.history.push_user(user_text);

        let Some(model) = &self.model else {
            debug!(session = session_id, "No model configured; degraded reply");
            return DialogueReply::system(degraded_text(user_text));
        };

        let is_silence = self.dialogue.is_silence(user_text);

        let matches = if is_silence {
            Vec::new()
        } else {
            self.memory.query(session_id, user_text).await
        };
        debug!(session = session_id, matches = matches.len(), "Memory lookup");

        let speaker = state.selector.draw(is_silence, &mut state.rng);

        let instruction = self
            .composer
            .compose(speaker, is_silence, &matches, &mut state.rng);
        let window = build_context_window(&state.history, self.dialogue.history_window);
        debug!(
            session = session_id,
            prompt_chars = instruction.len(),
            window = window.len(),
            "Prompt composed"
        );

        let request = LlmRequest::new(assemble_messages(instruction, window))
            .with_temperature(self.request.temperature)
            .with_max_tokens(self.request.max_tokens)
            .with_timeout(self.request.timeout_ms);

        let start = Instant::now();
        let response = match model.generate(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(session = session_id, speaker = %speaker, error = %e, "Model call failed; degraded reply");
                return DialogueReply::system(degraded_text(user_text));
            }
        };

        state.selector.record(speaker);
        state.history.push_assistant(speaker, response.text.clone());

        if !is_silence {
            self.memory.store(session_id, user_text).await;
        }

        info!(
            session = session_id,
            speaker = %speaker,
            silence = is_silence,
            matches = matches.len(),
            latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Turn processed"
        );

        DialogueReply::from_persona(speaker, response.text)
    }
}
