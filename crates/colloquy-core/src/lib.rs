pub mod classifier;
pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod llm;
pub mod session;

// Re-export key types
pub use classifier::{describe, ErrorKind, UserFacingError};
pub use config::Settings;
pub use context::{ChatMessage, ChatRole, HistoryStore, KeyValueStore, SystemPromptSource};
pub use error::ChatError;
pub use llm::{build_provider, ChatProvider, PromptOutput, ProviderId, TextStream, Turn};
pub use session::{ChatSession, SendOutcome, SessionConfig, SessionEvent};
