//! Append-only conversation log sent to the model on every call.
//!
//! The full history is replayed on each request. Nothing is ever edited,
//! removed or windowed, so the payload grows with the session.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::ConversationError;
use crate::state::{ChatMessage, ChatRole};

/// Shared handle to the conversation.
///
/// Clones point at the same log, so a worker task can append a reply while
/// the UI task takes snapshots for rendering.
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Arc<Mutex<Vec<ChatMessage>>>,
}

impl Conversation {
    /// Start a conversation seeded with a single system message
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: Arc::new(Mutex::new(vec![ChatMessage::system(system_prompt)])),
        }
    }

    pub fn append(&self, message: ChatMessage) -> Result<(), ConversationError> {
        match message.role {
            ChatRole::Error => return Err(ConversationError::ErrorRole),
            ChatRole::User if message.content.trim().is_empty() => {
                return Err(ConversationError::EmptyMessage)
            }
            _ => {}
        }
        self.lock().push(message);
        Ok(())
    }

    /// Copy of the full ordered history
    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn last(&self) -> Option<ChatMessage> {
        self.lock().last().cloned()
    }

    // A panic while holding the lock can't leave a half-pushed Vec behind,
    // so a poisoned guard is still safe to use.
    fn lock(&self) -> MutexGuard<'_, Vec<ChatMessage>> {
        self.messages.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
