use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
    /// Synthetic entry describing a failure to the user.
    Error,
}

/// One entry of the user-visible conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<bool>,
}

impl ChatMessage {
    fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            error: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(ChatRole::System, content)
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            error: Some(true),
            ..Self::new(ChatRole::Error, content)
        }
    }
}

/// Ordered conversation as shown to the user.
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    messages: Vec<ChatMessage>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<ChatMessage>) -> Self {
        Self { messages }
    }

    /// Append a message and return its index.
    pub fn push(&mut self, message: ChatMessage) -> usize {
        self.messages.push(message);
        self.messages.len() - 1
    }

    /// Append text to the assistant message at `index`. Returns false when
    /// that slot no longer holds an assistant message.
    pub fn append_to(&mut self, index: usize, chunk: &str) -> bool {
        match self.messages.get_mut(index) {
            Some(message) if message.role == ChatRole::Assistant => {
                message.content.push_str(chunk);
                true
            }
            _ => false,
        }
    }

    /// Remove the assistant message at `index` if nothing was written to it.
    pub fn remove_if_empty(&mut self, index: usize) -> bool {
        let empty = matches!(
            self.messages.get(index),
            Some(message) if message.role == ChatRole::Assistant && message.content.is_empty()
        );
        if empty {
            self.messages.remove(index);
        }
        empty
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn to_vec(&self) -> Vec<ChatMessage> {
        self.messages.clone()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
