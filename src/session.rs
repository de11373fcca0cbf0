//! Conversation transcript owned by one connection or one call

use crate::llm::ChatMessage;
use uuid::Uuid;

/// Append-only transcript: one system preamble, then user/assistant messages
/// in the order they happened. Nothing is ever removed or reordered.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    messages: Vec<ChatMessage>,
}

impl Session {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            messages: vec![ChatMessage::system(system_prompt)],
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::assistant(content));
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }
}
