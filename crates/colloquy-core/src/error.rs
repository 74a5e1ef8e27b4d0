use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Provider initialization failed: {0}")]
    ProviderInit(String),

    #[error("Session not initialized")]
    SessionNotInitialized,

    #[error("Model unavailable")]
    ModelUnavailable,

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Upstream HTTP error ({status})")]
    UpstreamHttp { status: u16 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Message limit reached ({0})")]
    LimitReached(usize),

    #[error("No response generated")]
    NoResponseGenerated,

    #[error("Request timed out")]
    Timeout,

    /// Opaque failure reported by the on-device model host.
    #[error("{0}")]
    Native(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl ChatError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if let Some(status) = e.status() {
            Self::UpstreamHttp {
                status: status.as_u16(),
            }
        } else {
            Self::Network(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
