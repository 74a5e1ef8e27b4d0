use crate::classifier::{describe, ErrorKind};
use crate::context::{ChatMessage, ConversationHistory, HistoryStore, SystemPromptSource};
use crate::constants::defaults;
use crate::error::ChatError;
use crate::llm::{ChatProvider, PromptOutput, ProviderId, TextStream};
use futures::StreamExt;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Sends are refused once the history holds more than this many entries.
    pub limit: usize,
    pub system_prompt: SystemPromptSource,
    /// Shown while the conversation is empty. Never stored or sent.
    pub first_bot_message: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            limit: defaults::MESSAGE_LIMIT,
            system_prompt: SystemPromptSource::default(),
            first_bot_message: None,
        }
    }
}

/// Notifications for the chat surface.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    LoadingChanged(bool),
    MessageAppended(ChatMessage),
    /// Text appended to the assistant message currently streaming.
    TextDelta(String),
    MessageRemoved(usize),
    Cleared,
}

/// How a call to [`ChatSession::send_message`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Completed,
    /// Blank input; nothing happened.
    Ignored,
    /// Refused before reaching the provider.
    Rejected(ErrorKind),
    Cancelled,
    Failed(ErrorKind),
}

struct SessionState {
    history: ConversationHistory,
    loading: bool,
    cancel: CancellationToken,
    /// Bumped by `clear_chat` so stale indices are never written through.
    epoch: u64,
}

/// Position of a message appended by this session.
#[derive(Debug, Clone, Copy)]
struct Slot {
    epoch: u64,
    index: usize,
}

/// Owns the conversation and drives one provider.
///
/// All methods take `&self`; share the session behind an `Arc` so the chat
/// surface can `abort` or `clear_chat` while a send is in flight. Only one
/// send is expected at a time.
pub struct ChatSession {
    provider: Arc<dyn ChatProvider>,
    store: HistoryStore,
    config: SessionConfig,
    state: Mutex<SessionState>,
    events: Option<UnboundedSender<SessionEvent>>,
}

impl ChatSession {
    /// Create a session, restoring the saved history.
    pub fn new(provider: Arc<dyn ChatProvider>, store: HistoryStore, config: SessionConfig) -> Self {
        let history = store.load();
        debug!(messages = history.len(), "Restored chat history");

        Self {
            provider,
            store,
            config,
            state: Mutex::new(SessionState {
                history: ConversationHistory::from_messages(history),
                loading: false,
                cancel: CancellationToken::new(),
                epoch: 0,
            }),
            events: None,
        }
    }

    pub fn with_events(mut self, tx: UnboundedSender<SessionEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.state().history.to_vec()
    }

    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    pub fn limit(&self) -> usize {
        self.config.limit
    }

    /// The configured greeting, while there is nothing else to show.
    pub fn greeting(&self) -> Option<&str> {
        if !self.state().history.is_empty() {
            return None;
        }
        self.config
            .first_bot_message
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }

    pub fn provider_id(&self) -> ProviderId {
        self.provider.id()
    }

    /// Load the system prompt and initialize the provider. A failure is
    /// reported in the conversation; the session stays usable.
    pub async fn init(&self) {
        let system_prompt = self.config.system_prompt.load().await;

        match self.provider.init(&system_prompt).await {
            Ok(()) => info!(provider = %self.provider.id(), "Chat provider ready"),
            Err(e) => {
                warn!("Chat provider failed to initialize: {}", e);
                self.push_error(&e);
            }
        }
    }

    pub async fn send_message(&self, text: &str) -> SendOutcome {
        if text.trim().is_empty() {
            return SendOutcome::Ignored;
        }

        let cancel = {
            let mut state = self.state();
            if state.history.len() > self.config.limit {
                let kind = self.push_error_locked(
                    &mut state,
                    &ChatError::LimitReached(self.config.limit),
                );
                return SendOutcome::Rejected(kind);
            }

            let token = CancellationToken::new();
            state.cancel = token.clone();
            state.loading = true;
            self.emit(SessionEvent::LoadingChanged(true));
            self.push_locked(&mut state, ChatMessage::user(text));
            token
        };

        let mut placeholder = None;
        let outcome = match self.run_prompt(text, cancel, &mut placeholder).await {
            Ok(()) => SendOutcome::Completed,
            Err(e) => self.fail(e, placeholder),
        };

        self.state().loading = false;
        self.emit(SessionEvent::LoadingChanged(false));
        outcome
    }

    /// Cancel the reply in flight. Does nothing when no send is running.
    pub fn abort(&self) -> bool {
        let mut state = self.state();
        if !state.loading {
            return false;
        }

        state.cancel.cancel();
        // A fresh token keeps the next send from starting out cancelled.
        state.cancel = CancellationToken::new();
        info!("Reply cancelled by user");
        self.push_error_locked(&mut state, &ChatError::Cancelled);
        true
    }

    /// Forget the conversation, in memory and in storage. A reply still in
    /// flight lands in the emptied history.
    pub fn clear_chat(&self) {
        let mut state = self.state();
        state.history.clear();
        state.epoch += 1;
        if let Err(e) = self.store.clear() {
            warn!("Failed to clear saved history: {}", e);
        }
        self.emit(SessionEvent::Cleared);
    }

    async fn run_prompt(
        &self,
        text: &str,
        cancel: CancellationToken,
        placeholder: &mut Option<Slot>,
    ) -> Result<(), ChatError> {
        match self.provider.prompt(text, cancel).await? {
            PromptOutput::Complete(reply) => {
                let mut state = self.state();
                self.push_locked(&mut state, ChatMessage::assistant(reply));
                Ok(())
            }
            PromptOutput::Stream(stream) => {
                let slot = {
                    let mut state = self.state();
                    self.push_locked(&mut state, ChatMessage::assistant(""))
                };
                *placeholder = Some(slot);
                self.consume_stream(stream, placeholder).await
            }
        }
    }

    async fn consume_stream(
        &self,
        mut stream: TextStream,
        placeholder: &mut Option<Slot>,
    ) -> Result<(), ChatError> {
        let mut produced = false;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if chunk.is_empty() {
                continue;
            }
            produced = true;

            let mut state = self.state();
            let appended = match placeholder {
                Some(slot) if slot.epoch == state.epoch => {
                    state.history.append_to(slot.index, &chunk)
                }
                _ => false,
            };

            if appended {
                self.persist(&state.history);
                self.emit(SessionEvent::TextDelta(chunk));
            } else {
                // Cleared mid-stream: keep writing into a fresh entry.
                *placeholder = Some(self.push_locked(&mut state, ChatMessage::assistant(chunk)));
            }
        }

        if produced {
            Ok(())
        } else {
            Err(ChatError::NoResponseGenerated)
        }
    }

    fn fail(&self, err: ChatError, placeholder: Option<Slot>) -> SendOutcome {
        let mut state = self.state();

        if let Some(slot) = placeholder {
            if slot.epoch == state.epoch && state.history.remove_if_empty(slot.index) {
                self.emit(SessionEvent::MessageRemoved(slot.index));
            }
        }

        if err.is_cancelled() {
            debug!("Prompt cancelled");
            self.persist(&state.history);
            return SendOutcome::Cancelled;
        }

        warn!("Prompt failed: {}", err);
        SendOutcome::Failed(self.push_error_locked(&mut state, &err))
    }

    fn push_error(&self, err: &ChatError) -> ErrorKind {
        let mut state = self.state();
        self.push_error_locked(&mut state, err)
    }

    fn push_error_locked(&self, state: &mut SessionState, err: &ChatError) -> ErrorKind {
        let described = describe(err);
        self.push_locked(state, ChatMessage::error(described.message));
        described.kind
    }

    fn push_locked(&self, state: &mut SessionState, message: ChatMessage) -> Slot {
        let index = state.history.push(message.clone());
        self.persist(&state.history);
        self.emit(SessionEvent::MessageAppended(message));
        Slot {
            epoch: state.epoch,
            index,
        }
    }

    fn persist(&self, history: &ConversationHistory) {
        if let Err(e) = self.store.save(history.messages()) {
            warn!("Failed to save chat history: {}", e);
        }
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(ref tx) = self.events {
            let _ = tx.send(event);
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
