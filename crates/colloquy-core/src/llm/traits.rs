use crate::error::ChatError;
use crate::llm::provider::ProviderId;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One entry of a provider's private transcript.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Finite, single-consumer sequence of reply fragments.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, ChatError>> + Send>>;

/// What a provider hands back for one prompt.
pub enum PromptOutput {
    Stream(TextStream),
    Complete(String),
}

impl std::fmt::Debug for PromptOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PromptOutput::Stream(_) => f.write_str("PromptOutput::Stream(..)"),
            PromptOutput::Complete(text) => f.debug_tuple("PromptOutput::Complete").field(text).finish(),
        }
    }
}

/// A text-generation backend. Implementations keep their own transcript.
#[async_trait::async_trait]
pub trait ChatProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Prepare the backend with the system prompt. Must succeed before `prompt`.
    async fn init(&self, system_prompt: &str) -> Result<(), ChatError>;

    /// Send one user turn. The token aborts the outstanding call.
    async fn prompt(
        &self,
        text: &str,
        cancel: CancellationToken,
    ) -> Result<PromptOutput, ChatError>;
}
