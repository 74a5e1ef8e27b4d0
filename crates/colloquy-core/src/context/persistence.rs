use crate::constants::defaults;
use crate::context::history::{ChatMessage, ChatRole};
use crate::error::ChatError;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Durable string key-value storage the history is written to.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, ChatError>;
    fn set(&self, key: &str, value: &str) -> Result<(), ChatError>;
    fn remove(&self, key: &str) -> Result<(), ChatError>;
}

/// Stores each key as `<key>.json` inside a directory. The directory is only
/// created on the first write.
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    /// Create a store under the default data directory (~/.local/share/colloquy/)
    pub fn new() -> Result<Self, ChatError> {
        let base = dirs::data_dir().ok_or_else(|| {
            ChatError::Config("Could not determine data directory".to_string())
        })?;
        Ok(Self::with_dir(base.join(defaults::APP_DIR)))
    }

    /// Create a store with a custom directory (useful for testing)
    pub fn with_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, ChatError> {
        let path = self.key_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path).map_err(|e| {
            ChatError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Ok(Some(contents))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ChatError> {
        fs::create_dir_all(&self.base_dir).map_err(|e| {
            ChatError::Config(format!("Failed to create storage directory: {}", e))
        })?;

        let path = self.key_path(key);
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, value).map_err(|e| {
            ChatError::Config(format!("Failed to write temporary file: {}", e))
        })?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            ChatError::Config(format!("Failed to rename storage file: {}", e))
        })?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ChatError> {
        let path = self.key_path(key);
        if path.exists() {
            fs::remove_file(&path).map_err(|e| {
                ChatError::Config(format!("Failed to delete {}: {}", path.display(), e))
            })?;
        }
        Ok(())
    }
}

/// Process-local store; nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, ChatError> {
        Ok(self.values().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ChatError> {
        self.values().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ChatError> {
        self.values().remove(key);
        Ok(())
    }
}

/// Reads and writes the message history under a single key.
#[derive(Clone)]
pub struct HistoryStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl HistoryStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_key(store, defaults::HISTORY_KEY)
    }

    pub fn with_key(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Load the saved history. Missing, unreadable or malformed data all
    /// come back as an empty history.
    pub fn load(&self) -> Vec<ChatMessage> {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to read saved history: {}", e);
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<ChatMessage>>(&raw) {
            Ok(messages) => messages,
            Err(e) => {
                tracing::warn!("Ignoring malformed saved history: {}", e);
                Vec::new()
            }
        }
    }

    /// Overwrite the saved history. System entries are never written.
    pub fn save(&self, messages: &[ChatMessage]) -> Result<(), ChatError> {
        let persisted: Vec<&ChatMessage> = messages
            .iter()
            .filter(|m| m.role != ChatRole::System)
            .collect();
        let contents = serde_json::to_string(&persisted)?;
        self.store.set(&self.key, &contents)
    }

    pub fn clear(&self) -> Result<(), ChatError> {
        self.store.remove(&self.key)
    }
}
