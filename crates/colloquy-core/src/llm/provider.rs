use crate::config::Settings;
use crate::error::ChatError;
use crate::llm::native::{LanguageModelHost, NativeModelProvider};
use crate::llm::remote::RemoteInferenceProvider;
use crate::llm::traits::ChatProvider;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

/// Identifies which backend a session talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    /// On-device model exposed by the host environment.
    Native,
    /// Hosted text-generation endpoint.
    Remote,
}

impl ProviderId {
    pub fn name(&self) -> &str {
        match self {
            Self::Native => "Native model (on-device)",
            Self::Remote => "Remote inference (Hugging Face)",
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ProviderId {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "native" | "chrome" => Ok(Self::Native),
            "remote" | "huggingface" | "hf" => Ok(Self::Remote),
            other => Err(ChatError::Config(format!("Unknown provider: {other}"))),
        }
    }
}

/// Build the provider selected in settings.
///
/// `host` is the on-device model capability, if the environment has one. Its
/// absence is normal and only matters for [`ProviderId::Native`], whose `init`
/// will then report the provider as unavailable.
pub fn build_provider(
    settings: &Settings,
    host: Option<Arc<dyn LanguageModelHost>>,
) -> Result<Arc<dyn ChatProvider>, ChatError> {
    let provider: Arc<dyn ChatProvider> = match settings.provider {
        ProviderId::Native => Arc::new(NativeModelProvider::new(host)),
        ProviderId::Remote => {
            let remote = &settings.remote;
            let mut provider = RemoteInferenceProvider::new(settings.api_key())
                .with_base_url(remote.base_url.clone())
                .with_model(remote.model.clone())
                .with_max_new_tokens(remote.max_new_tokens);
            if let Some(secs) = remote.request_timeout_secs {
                provider = provider.with_timeout(std::time::Duration::from_secs(secs))?;
            }
            Arc::new(provider)
        }
    };
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_id_parses_aliases() {
        assert_eq!("chrome".parse::<ProviderId>().unwrap(), ProviderId::Native);
        assert_eq!("Native".parse::<ProviderId>().unwrap(), ProviderId::Native);
        assert_eq!("huggingface".parse::<ProviderId>().unwrap(), ProviderId::Remote);
        assert_eq!(" remote ".parse::<ProviderId>().unwrap(), ProviderId::Remote);
        assert!("openai".parse::<ProviderId>().is_err());
    }

    #[test]
    fn test_build_provider_respects_settings() {
        let mut settings = Settings::default();
        settings.provider = ProviderId::Native;
        let provider = build_provider(&settings, None).unwrap();
        assert_eq!(provider.id(), ProviderId::Native);

        settings.provider = ProviderId::Remote;
        let provider = build_provider(&settings, None).unwrap();
        assert_eq!(provider.id(), ProviderId::Remote);
    }
}
