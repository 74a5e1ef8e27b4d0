use crate::error::ChatError;
use crate::llm::provider::ProviderId;
use crate::llm::traits::*;
use futures::stream::{self, Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Model status as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Available,
    Downloadable,
    Downloading,
    Unavailable,
    Unknown(String),
}

impl Availability {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Available => "available",
            Self::Downloadable => "downloadable",
            Self::Downloading => "downloading",
            Self::Unavailable => "unavailable",
            Self::Unknown(status) => status,
        }
    }
}

impl From<&str> for Availability {
    fn from(status: &str) -> Self {
        match status.trim().to_lowercase().as_str() {
            "available" | "readily" => Self::Available,
            "downloadable" | "after-download" => Self::Downloadable,
            "downloading" => Self::Downloading,
            "unavailable" | "no" => Self::Unavailable,
            _ => Self::Unknown(status.to_string()),
        }
    }
}

/// Options passed to the host when a model session is created.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub initial_prompts: Vec<Turn>,
}

/// Raw fragment stream produced by the host model.
pub type HostStream = Pin<Box<dyn Stream<Item = anyhow::Result<String>> + Send>>;

/// The on-device language model capability offered by the environment.
#[async_trait::async_trait]
pub trait LanguageModelHost: Send + Sync {
    async fn availability(&self) -> anyhow::Result<Availability>;

    async fn create(
        &self,
        options: SessionOptions,
    ) -> anyhow::Result<Arc<dyn LanguageModelSession>>;
}

/// A stateful model session created by [`LanguageModelHost::create`].
#[async_trait::async_trait]
pub trait LanguageModelSession: Send + Sync {
    /// Start generating a reply for the transcript. The host is expected to
    /// stop and fail once `cancel` fires.
    async fn prompt_streaming(
        &self,
        transcript: &[Turn],
        cancel: CancellationToken,
    ) -> anyhow::Result<HostStream>;
}

/// Provider backed by the host's on-device model.
pub struct NativeModelProvider {
    host: Option<Arc<dyn LanguageModelHost>>,
    transcript: Arc<Mutex<Vec<Turn>>>,
    session: Mutex<Option<Arc<dyn LanguageModelSession>>>,
}

impl NativeModelProvider {
    pub fn new(host: Option<Arc<dyn LanguageModelHost>>) -> Self {
        Self {
            host,
            transcript: Arc::new(Mutex::new(Vec::new())),
            session: Mutex::new(None),
        }
    }

    /// Snapshot of the provider's private transcript.
    pub async fn transcript(&self) -> Vec<Turn> {
        self.transcript.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl ChatProvider for NativeModelProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Native
    }

    async fn init(&self, system_prompt: &str) -> Result<(), ChatError> {
        let host = self.host.as_ref().ok_or_else(|| {
            ChatError::ProviderUnavailable(
                "no on-device language model in this environment".into(),
            )
        })?;

        let snapshot = {
            let mut transcript = self.transcript.lock().await;
            transcript.push(Turn::system(system_prompt));
            transcript.clone()
        };

        let availability = host
            .availability()
            .await
            .map_err(|e| ChatError::ProviderInit(e.to_string()))?;

        match availability {
            Availability::Available => {
                let session = host
                    .create(SessionOptions {
                        initial_prompts: snapshot,
                    })
                    .await
                    .map_err(|e| ChatError::ProviderInit(e.to_string()))?;
                *self.session.lock().await = Some(session);
                info!("Native model session created");
                Ok(())
            }
            Availability::Unknown(status) => Err(ChatError::ProviderInit(format!(
                "unknown model status: {status}"
            ))),
            other => Err(ChatError::ProviderUnavailable(format!(
                "model is {}",
                other.as_str()
            ))),
        }
    }

    async fn prompt(
        &self,
        text: &str,
        cancel: CancellationToken,
    ) -> Result<PromptOutput, ChatError> {
        let session = self
            .session
            .lock()
            .await
            .clone()
            .ok_or(ChatError::SessionNotInitialized)?;
        let host = self.host.as_ref().ok_or(ChatError::SessionNotInitialized)?;

        // Resource pressure on the device can flip this between calls.
        let availability = host.availability().await.map_err(normalize_host_error)?;
        if availability != Availability::Available {
            debug!(status = availability.as_str(), "Native model not available for prompt");
            return Err(ChatError::ModelUnavailable);
        }
        if cancel.is_cancelled() {
            return Err(ChatError::Cancelled);
        }

        let snapshot = {
            let mut transcript = self.transcript.lock().await;
            transcript.push(Turn::user(text));
            transcript.clone()
        };

        let inner = session
            .prompt_streaming(&snapshot, cancel.clone())
            .await
            .map_err(normalize_host_error)?;

        Ok(PromptOutput::Stream(guard_stream(
            inner,
            cancel,
            self.transcript.clone(),
        )))
    }
}

struct Guarded {
    inner: HostStream,
    cancel: CancellationToken,
    transcript: Arc<Mutex<Vec<Turn>>>,
    reply: String,
}

/// Wrap the host stream: stop with `Cancelled` once the token fires, normalize
/// host errors, and record whatever reply was produced in the transcript.
fn guard_stream(
    inner: HostStream,
    cancel: CancellationToken,
    transcript: Arc<Mutex<Vec<Turn>>>,
) -> TextStream {
    let state = Guarded {
        inner,
        cancel,
        transcript,
        reply: String::new(),
    };

    Box::pin(stream::unfold(Some(state), |state| async move {
        let Some(mut state) = state else {
            return None;
        };
        let next = tokio::select! {
            biased;
            _ = state.cancel.cancelled() => Some(Err(ChatError::Cancelled)),
            next = state.inner.next() => next.map(|item| item.map_err(normalize_host_error)),
        };

        match next {
            Some(Ok(chunk)) => {
                state.reply.push_str(&chunk);
                Some((Ok(chunk), Some(state)))
            }
            Some(Err(e)) => {
                // Partial replies stay in the transcript.
                record_reply(&mut state).await;
                Some((Err(e), None))
            }
            None => {
                record_reply(&mut state).await;
                None
            }
        }
    }))
}

async fn record_reply(state: &mut Guarded) {
    if state.reply.is_empty() {
        return;
    }
    let reply = std::mem::take(&mut state.reply);
    state.transcript.lock().await.push(Turn::assistant(reply));
}

/// Host failures arrive as opaque text; sort them into typed errors here,
/// where the text is all there is to go on.
pub(crate) fn normalize_host_error(err: anyhow::Error) -> ChatError {
    let err = match err.downcast::<ChatError>() {
        Ok(typed) => return typed,
        Err(err) => err,
    };

    let message = err.to_string();
    let lower = message.to_lowercase();

    if lower.contains("abort") || lower.contains("cancel") {
        ChatError::Cancelled
    } else if lower.contains("quota") {
        ChatError::QuotaExceeded(message)
    } else if lower.contains("rate limit")
        || lower.contains("rate-limit")
        || lower.contains("ratelimit")
        || lower.contains("too many requests")
    {
        ChatError::RateLimited(message)
    } else {
        ChatError::Native(message)
    }
}
