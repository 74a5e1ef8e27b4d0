use crate::constants::defaults;
use std::path::PathBuf;

/// Where the initial system prompt is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemPromptSource {
    /// Fetched with a plain HTTP GET.
    Url(String),
    File(PathBuf),
    None,
}

impl Default for SystemPromptSource {
    fn default() -> Self {
        Self::File(PathBuf::from(defaults::SYSTEM_PROMPT_FILE))
    }
}

impl SystemPromptSource {
    /// Treat `http(s)://` locations as URLs and everything else as a path.
    pub fn parse(location: &str) -> Self {
        let location = location.trim();
        if location.is_empty() {
            Self::None
        } else if location.starts_with("http://") || location.starts_with("https://") {
            Self::Url(location.to_string())
        } else {
            Self::File(PathBuf::from(location))
        }
    }

    /// Read the prompt text. Any failure leaves the session without a system
    /// prompt rather than stopping it.
    pub async fn load(&self) -> String {
        match self {
            Self::Url(url) => fetch(url).await.unwrap_or_else(|e| {
                tracing::warn!("System prompt not available at {}, continuing without one: {}", url, e);
                String::new()
            }),
            Self::File(path) => tokio::fs::read_to_string(path).await.unwrap_or_else(|e| {
                tracing::warn!(
                    "System prompt file {} not found, continuing without one: {}",
                    path.display(),
                    e
                );
                String::new()
            }),
            Self::None => String::new(),
        }
    }
}

async fn fetch(url: &str) -> Result<String, reqwest::Error> {
    reqwest::get(url).await?.error_for_status()?.text().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_locations() {
        assert_eq!(
            SystemPromptSource::parse("https://example.com/llms.txt"),
            SystemPromptSource::Url("https://example.com/llms.txt".into())
        );
        assert_eq!(
            SystemPromptSource::parse("prompts/llms.txt"),
            SystemPromptSource::File(PathBuf::from("prompts/llms.txt"))
        );
        assert_eq!(SystemPromptSource::parse("  "), SystemPromptSource::None);
    }

    #[tokio::test]
    async fn test_load_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("llms.txt");
        std::fs::write(&path, "Você é um assistente.").unwrap();

        let prompt = SystemPromptSource::File(path).load().await;
        assert_eq!(prompt, "Você é um assistente.");
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let prompt = SystemPromptSource::File(temp_dir.path().join("absent.txt"))
            .load()
            .await;
        assert!(prompt.is_empty());
    }
}
