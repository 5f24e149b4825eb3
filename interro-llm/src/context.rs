//! Context window construction.
//!
//! Converts the tail of a [`ConversationHistory`] into chat messages. Each
//! detective turn is prefixed with its speaker label so the model can tell
//! who said what; the label exists only in the model context, never in
//! stored history.

use interro_core::history::ConversationHistory;
use interro_core::types::{Role, Turn};

use crate::types::ChatMessage;

/// Label prepended to a detective turn, e.g. `[Reynolds]: `.
#[must_use]
pub fn speaker_label(turn: &Turn) -> String {
    let name = turn.speaker.map_or("Detective", |p| p.name());
    format!("[{name}]: ")
}

/// Map one turn to a chat message.
#[must_use]
pub fn to_chat_message(turn: &Turn) -> ChatMessage {
    match turn.role {
        Role::User => ChatMessage::user(turn.content.clone()),
        Role::Assistant => ChatMessage::assistant(format!("{}{}", speaker_label(turn), turn.content)),
    }
}

/// The last `limit` turns of `history`, oldest first.
#[must_use]
pub fn build_context_window(history: &ConversationHistory, limit: usize) -> Vec<ChatMessage> {
    history.recent(limit).iter().map(to_chat_message).collect()
}

/// Prepend the per-turn instruction to the window.
#[must_use]
pub fn assemble_messages(instruction: impl Into<String>, window: Vec<ChatMessage>) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(window.len() + 1);
    messages.push(ChatMessage::system(instruction));
    messages.extend(window);
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatRole;
    use interro_core::types::Persona;

    fn fifteen_turns() -> ConversationHistory {
        let mut history = ConversationHistory::new();
        for i in 0..15 {
            if i % 3 == 2 {
                history.push_assistant(Persona::Chen, format!("turn {i}"));
            } else if i % 2 == 1 {
                history.push_assistant(Persona::Reynolds, format!("turn {i}"));
            } else {
                history.push_user(format!("turn {i}"));
            }
        }
        history
    }

    #[test]
    fn window_keeps_last_ten_in_order() {
        let history = fifteen_turns();
        let window = build_context_window(&history, 10);
        assert_eq!(window.len(), 10);
        for (msg, turn) in window.iter().zip(&history.turns()[5..]) {
            assert!(msg.content.ends_with(&turn.content));
            match turn.role {
                Role::User => {
                    assert_eq!(msg.role, ChatRole::User);
                    assert_eq!(msg.content, turn.content);
                }
                Role::Assistant => {
                    assert_eq!(msg.role, ChatRole::Assistant);
                    let speaker = turn.speaker.expect("assistant turns are attributed");
                    assert_eq!(msg.content, format!("[{}]: {}", speaker.name(), turn.content));
                }
            }
        }
    }

    #[test]
    fn label_does_not_leak_into_history() {
        let mut history = ConversationHistory::new();
        history.push_assistant(Persona::Reynolds, "Where were you?");
        let window = build_context_window(&history, 10);
        assert_eq!(window[0].content, "[Reynolds]: Where were you?");
        assert_eq!(history.turns()[0].content, "Where were you?");
    }

    #[test]
    fn short_history_is_returned_whole() {
        let mut history = ConversationHistory::new();
        history.push_user("hello");
        assert_eq!(build_context_window(&history, 10).len(), 1);
        assert!(build_context_window(&ConversationHistory::new(), 10).is_empty());
    }

    #[test]
    fn instruction_leads_the_messages() {
        let messages = assemble_messages("be stern", vec![ChatMessage::user("hi")]);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], ChatMessage::system("be stern"));
        assert_eq!(messages[1].role, ChatRole::User);
    }
}
