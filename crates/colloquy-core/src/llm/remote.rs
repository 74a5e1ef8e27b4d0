use crate::constants::{defaults, endpoints, models, template};
use crate::error::ChatError;
use crate::llm::provider::ProviderId;
use crate::llm::traits::*;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Provider for a hosted text-generation endpoint that takes one flat,
/// templated prompt and answers with the whole reply at once.
pub struct RemoteInferenceProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    max_new_tokens: u32,
    transcript: Mutex<Vec<Turn>>,
}

impl RemoteInferenceProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: models::DEFAULT_REMOTE_MODEL.to_string(),
            base_url: endpoints::REMOTE_INFERENCE_BASE_URL.to_string(),
            max_new_tokens: defaults::MAX_NEW_TOKENS,
            transcript: Mutex::new(Vec::new()),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_new_tokens(mut self, max: u32) -> Self {
        self.max_new_tokens = max;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, ChatError> {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChatError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(self)
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}", self.base_url, self.model)
    }

    /// Snapshot of the provider's private transcript.
    pub async fn transcript(&self) -> Vec<Turn> {
        self.transcript.lock().await.clone()
    }
}

/// Render the transcript into the Llama 3 chat template, leaving an open
/// assistant header where generation continues.
pub fn render_prompt(turns: &[Turn]) -> String {
    let mut prompt = String::from(template::BEGIN_OF_TEXT);
    for turn in turns {
        push_header(&mut prompt, turn.role.as_str());
        prompt.push_str(&turn.content);
        prompt.push_str(template::END_OF_TURN);
    }
    push_header(&mut prompt, Role::Assistant.as_str());
    prompt
}

fn push_header(prompt: &mut String, role: &str) {
    prompt.push_str(template::START_HEADER);
    prompt.push_str(role);
    prompt.push_str(template::END_HEADER);
    prompt.push_str("\n\n");
}

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    inputs: String,
    parameters: GenerationParameters<'a>,
}

#[derive(Debug, Serialize)]
struct GenerationParameters<'a> {
    max_new_tokens: u32,
    return_full_text: bool,
    stop: &'a [&'a str],
}

/// Pull the first `generated_text` out of the response body. Error bodies and
/// empty generations yield `None`.
fn extract_generated_text(body: &Value) -> Option<String> {
    body.get(0)
        .and_then(|first| first.get("generated_text"))
        .and_then(|text| text.as_str())
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

#[async_trait::async_trait]
impl ChatProvider for RemoteInferenceProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Remote
    }

    async fn init(&self, system_prompt: &str) -> Result<(), ChatError> {
        let mut transcript = self.transcript.lock().await;
        transcript.clear();
        transcript.push(Turn::system(system_prompt));

        if self.api_key.is_none() {
            warn!(
                "No API token configured for {}; requests will likely be rejected",
                self.base_url
            );
        }
        Ok(())
    }

    async fn prompt(
        &self,
        text: &str,
        cancel: CancellationToken,
    ) -> Result<PromptOutput, ChatError> {
        let inputs = {
            let mut transcript = self.transcript.lock().await;
            transcript.push(Turn::user(text));
            render_prompt(&transcript)
        };

        let body = GenerationRequest {
            inputs,
            parameters: GenerationParameters {
                max_new_tokens: self.max_new_tokens,
                return_full_text: false,
                stop: template::STOP_SEQUENCES,
            },
        };

        let url = self.endpoint();
        debug!(%url, "Sending remote generation request");

        let mut request = self.client.post(&url).json(&body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ChatError::Cancelled),
            response = request.send() => response?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::UpstreamHttp {
                status: status.as_u16(),
            });
        }

        let payload: Value = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ChatError::Cancelled),
            payload = response.json::<Value>() => payload?,
        };

        let reply = extract_generated_text(&payload)
            .unwrap_or_else(|| template::EMPTY_REPLY_PLACEHOLDER.to_string());

        self.transcript
            .lock()
            .await
            .push(Turn::assistant(reply.clone()));

        Ok(PromptOutput::Complete(reply))
    }
}
