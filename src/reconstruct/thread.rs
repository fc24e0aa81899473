//! Conversation tracking for `In-Reply-To`.
//!
//! Threading is approximate: a message replies to the message of the same
//! conversation that was processed right before it, not to its true parent.

use std::collections::HashMap;

/// Conversation id → id of the last message emitted for it.
#[derive(Debug, Clone, Default)]
pub struct ThreadState {
    last: HashMap<i64, String>,
}

impl ThreadState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The message a new member of `conversation` would reply to.
    pub fn previous(&self, conversation: i64) -> Option<&str> {
        self.last.get(&conversation).map(String::as_str)
    }

    /// Record `message_id` as the latest message of `conversation` and
    /// return the one it replaces.
    pub fn advance(&mut self, conversation: i64, message_id: impl Into<String>) -> Option<String> {
        self.last.insert(conversation, message_id.into())
    }

    /// Number of conversations seen so far.
    pub fn conversations(&self) -> usize {
        self.last.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_message_has_no_parent() {
        let mut state = ThreadState::new();
        assert_eq!(state.advance(1, "m1"), None);
        assert_eq!(state.previous(1), Some("m1"));
    }

    #[test]
    fn test_reply_targets_immediately_preceding_message() {
        let mut state = ThreadState::new();
        state.advance(1, "m1");
        assert_eq!(state.advance(1, "m2").as_deref(), Some("m1"));
        assert_eq!(state.advance(1, "m3").as_deref(), Some("m2"));
    }

    #[test]
    fn test_conversations_are_independent() {
        let mut state = ThreadState::new();
        state.advance(1, "a");
        assert_eq!(state.advance(2, "b"), None);
        assert_eq!(state.conversations(), 2);
    }
}
