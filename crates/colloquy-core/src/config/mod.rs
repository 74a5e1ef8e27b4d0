use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::{defaults, endpoints, models, ui};
use crate::context::{FileStore, HistoryStore, SystemPromptSource};
use crate::llm::ProviderId;
use crate::session::SessionConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub provider: ProviderId,
    pub session: SessionSettings,
    pub remote: RemoteSettings,
    pub ui: UiSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Maximum history length before sends are refused.
    pub limit: usize,
    /// File path or URL of the initial system prompt; empty for none.
    pub system_prompt: String,
    /// Directory holding the saved history; the platform data dir when unset.
    pub storage_dir: Option<PathBuf>,
    /// Greeting shown while the conversation is empty; blank for none.
    pub first_bot_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSettings {
    pub base_url: String,
    pub model: String,
    pub api_key_env: String,
    pub max_new_tokens: u32,
    pub request_timeout_secs: Option<u64>,
}

/// Presentation of the chat surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    pub chatbot_name: String,
    /// Printed under the banner; blank for none.
    pub welcome_message: String,
    /// Ask before `/clear` wipes the conversation.
    pub confirm_clear: bool,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            chatbot_name: ui::CHATBOT_NAME.to_string(),
            welcome_message: ui::WELCOME_MESSAGE.to_string(),
            confirm_clear: true,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            limit: defaults::MESSAGE_LIMIT,
            system_prompt: defaults::SYSTEM_PROMPT_FILE.to_string(),
            storage_dir: None,
            first_bot_message: Some(ui::FIRST_BOT_MESSAGE.to_string()),
        }
    }
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            base_url: endpoints::REMOTE_INFERENCE_BASE_URL.to_string(),
            model: models::DEFAULT_REMOTE_MODEL.to_string(),
            api_key_env: endpoints::REMOTE_API_KEY_ENV.to_string(),
            max_new_tokens: defaults::MAX_NEW_TOKENS,
            request_timeout_secs: None,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            // Most environments have no on-device model, so default to the endpoint
            provider: ProviderId::Remote,
            session: SessionSettings::default(),
            remote: RemoteSettings::default(),
            ui: UiSettings::default(),
        }
    }
}

impl Settings {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(defaults::APP_DIR)
            .join("config.toml")
    }

    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Read settings from `path`, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn load_from(path: &std::path::Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => tracing::warn!("Invalid config at {}: {}", path.display(), e),
                },
                Err(e) => tracing::warn!("Failed to read config at {}: {}", path.display(), e),
            }
        }
        Self::default()
    }

    pub fn save(&self) -> Result<(), crate::error::ChatError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<(), crate::error::ChatError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::ChatError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the API key from the environment variable specified in settings.
    pub fn api_key(&self) -> Option<String> {
        if self.remote.api_key_env.is_empty() {
            return None;
        }
        std::env::var(&self.remote.api_key_env)
            .ok()
            .filter(|key| !key.is_empty())
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            limit: self.session.limit,
            system_prompt: SystemPromptSource::parse(&self.session.system_prompt),
            first_bot_message: self.session.first_bot_message.clone(),
        }
    }

    /// Build the history store at the configured location.
    pub fn history_store(&self) -> Result<HistoryStore, crate::error::ChatError> {
        let store = match self.session.storage_dir {
            Some(ref dir) => FileStore::with_dir(dir),
            None => FileStore::new()?,
        };
        Ok(HistoryStore::new(std::sync::Arc::new(store)))
    }
}
