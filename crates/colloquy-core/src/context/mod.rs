mod history;
pub mod persistence;
pub mod system_prompt;

pub use history::{ChatMessage, ChatRole, ConversationHistory};
pub use persistence::{FileStore, HistoryStore, KeyValueStore, MemoryStore};
pub use system_prompt::SystemPromptSource;
