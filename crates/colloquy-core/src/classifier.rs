//! Maps failures to stable categories and the sentence shown to the user.

use crate::error::ChatError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ProviderUnavailable,
    ProviderInitError,
    SessionNotInitialized,
    ModelUnavailable,
    QuotaExceeded,
    RateLimited,
    Cancelled,
    UpstreamHttpError,
    NetworkError,
    LimitReached,
    NoResponseGenerated,
    Timeout,
    Unknown,
}

/// Shown when a failure carries no usable text of its own.
pub const FALLBACK_MESSAGE: &str = "Ocorreu um erro inesperado. Tente novamente.";

/// Lowercase needles checked in order; more specific phrases come first.
const NEEDLES: &[(ErrorKind, &[&str])] = &[
    (
        ErrorKind::LimitReached,
        &["limite de mensagens atingido", "message limit reached"],
    ),
    (
        ErrorKind::SessionNotInitialized,
        &["não inicializada", "session not initialized"],
    ),
    (
        ErrorKind::ProviderUnavailable,
        &["não disponível", "provider unavailable", "not available"],
    ),
    (
        ErrorKind::ModelUnavailable,
        &["indisponível", "model unavailable"],
    ),
    (ErrorKind::ProviderInitError, &["initialization failed"]),
    (ErrorKind::QuotaExceeded, &["quota"]),
    (
        ErrorKind::RateLimited,
        &["rate limit", "too many requests"],
    ),
    (
        ErrorKind::Cancelled,
        &["cancelad", "cancelled", "canceled", "abort"],
    ),
    (
        ErrorKind::Timeout,
        &["timeout", "timed out", "tempo esgotado"],
    ),
    (
        ErrorKind::NoResponseGenerated,
        &["nenhuma resposta", "no response generated"],
    ),
    (
        ErrorKind::UpstreamHttpError,
        &["erro na api", "upstream http error", "api error"],
    ),
    (
        ErrorKind::NetworkError,
        &["network", "failed to fetch", "conexão", "connection"],
    ),
];

impl ErrorKind {
    /// Classify free-form failure text by case-insensitive substring.
    pub fn from_message(text: &str) -> Self {
        let lower = text.to_lowercase();
        NEEDLES
            .iter()
            .find(|(_, needles)| needles.iter().any(|needle| lower.contains(needle)))
            .map(|(kind, _)| *kind)
            .unwrap_or(ErrorKind::Unknown)
    }

    /// Classify a typed error. Only errors that carry nothing but text fall
    /// back to [`ErrorKind::from_message`].
    pub fn of(err: &ChatError) -> Self {
        match err {
            ChatError::ProviderUnavailable(_) => Self::ProviderUnavailable,
            ChatError::ProviderInit(_) => Self::ProviderInitError,
            ChatError::SessionNotInitialized => Self::SessionNotInitialized,
            ChatError::ModelUnavailable => Self::ModelUnavailable,
            ChatError::QuotaExceeded(_) => Self::QuotaExceeded,
            ChatError::RateLimited(_) => Self::RateLimited,
            ChatError::Cancelled => Self::Cancelled,
            ChatError::UpstreamHttp { .. } => Self::UpstreamHttpError,
            ChatError::Network(_) => Self::NetworkError,
            ChatError::LimitReached(_) => Self::LimitReached,
            ChatError::NoResponseGenerated => Self::NoResponseGenerated,
            ChatError::Timeout => Self::Timeout,
            ChatError::Native(text) | ChatError::Other(text) => Self::from_message(text),
            ChatError::Config(_) | ChatError::Io(_) | ChatError::Json(_) => Self::Unknown,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::ProviderUnavailable => {
                "O modelo de IA nativo não está disponível neste ambiente."
            }
            Self::ProviderInitError => {
                "Não foi possível inicializar o assistente. Tente recarregar."
            }
            Self::SessionNotInitialized => {
                "O assistente ainda não foi inicializado. Aguarde um instante e tente novamente."
            }
            Self::ModelUnavailable => {
                "O modelo está temporariamente indisponível. Tente novamente mais tarde."
            }
            Self::QuotaExceeded => "A cota de uso do modelo foi excedida. Limpe o chat ou tente mais tarde.",
            Self::RateLimited => "Muitas solicitações em pouco tempo. Aguarde e tente novamente.",
            Self::Cancelled => "Resposta cancelada pelo usuário.",
            Self::UpstreamHttpError => "O serviço de IA retornou um erro. Tente novamente mais tarde.",
            Self::NetworkError => "Falha de conexão. Verifique sua internet e tente novamente.",
            Self::LimitReached => "Limite de mensagens atingido. Limpe o chat para continuar.",
            Self::NoResponseGenerated => "Nenhuma resposta foi gerada. Tente reformular sua pergunta.",
            Self::Timeout => "A resposta demorou demais. Tente novamente.",
            Self::Unknown => FALLBACK_MESSAGE,
        }
    }
}

/// A failure ready to be shown in the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserFacingError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Classify `err` and pick its sentence. Unrecognized errors surface their
/// own text; errors without text get the generic fallback.
pub fn describe(err: &ChatError) -> UserFacingError {
    let kind = ErrorKind::of(err);
    let message = match kind {
        ErrorKind::Unknown => {
            let raw = err.to_string();
            if raw.trim().is_empty() {
                FALLBACK_MESSAGE.to_string()
            } else {
                raw
            }
        }
        known => known.user_message().to_string(),
    };
    UserFacingError { kind, message }
}
