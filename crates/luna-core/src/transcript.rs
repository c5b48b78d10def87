//! The visible record of a session.
//!
//! Unlike the conversation, the transcript carries error entries and omits the
//! system prompt. It is owned by the UI task and never shared.

use crate::state::{ChatMessage, ChatRole};

#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, role: ChatRole, content: impl Into<String>) {
        self.entries.push(ChatMessage::new(role, content));
    }

    pub fn entries(&self) -> &[ChatMessage] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn errors(&self) -> impl Iterator<Item = &ChatMessage> {
        self.entries.iter().filter(|m| m.role == ChatRole::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_keep_push_order() {
        let mut transcript = Transcript::new();
        assert!(transcript.is_empty());

        transcript.push(ChatRole::User, "Best time to visit Kyoto?");
        transcript.push(ChatRole::Error, "Something went wrong: timeout");
        transcript.push(ChatRole::User, "Best time to visit Kyoto?");
        transcript.push(ChatRole::Assistant, "Late March for the cherry blossoms.");

        let roles: Vec<ChatRole> = transcript.entries().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![ChatRole::User, ChatRole::Error, ChatRole::User, ChatRole::Assistant]
        );
        assert_eq!(transcript.len(), 4);
    }

    #[test]
    fn test_errors_only_yields_error_entries() {
        let mut transcript = Transcript::new();
        transcript.push(ChatRole::User, "hi");
        transcript.push(ChatRole::Error, "Something went wrong: 401");
        transcript.push(ChatRole::Assistant, "hello");
        transcript.push(ChatRole::Error, "Something went wrong: 500");

        let errors: Vec<&str> = transcript.errors().map(|m| m.content.as_str()).collect();
        assert_eq!(errors, vec!["Something went wrong: 401", "Something went wrong: 500"]);
    }
}
