use colloquy_core::llm::*;
use colloquy_core::{
    ChatError, ChatRole, ChatSession, HistoryStore, SendOutcome, SessionConfig, SessionEvent,
    SystemPromptSource,
};
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Mock host whose reported status can be changed between calls.
struct MockHost {
    status: Mutex<VecDeque<Availability>>,
    session: Arc<MockModelSession>,
    created_with: Mutex<Option<SessionOptions>>,
}

impl MockHost {
    fn new(statuses: Vec<Availability>, session: Arc<MockModelSession>) -> Arc<Self> {
        Arc::new(Self {
            status: Mutex::new(statuses.into()),
            session,
            created_with: Mutex::new(None),
        })
    }
}

#[async_trait::async_trait]
impl LanguageModelHost for MockHost {
    async fn availability(&self) -> anyhow::Result<Availability> {
        let mut status = self.status.lock().unwrap();
        // The last status sticks once the queue runs dry.
        if status.len() > 1 {
            Ok(status.pop_front().unwrap())
        } else {
            Ok(status.front().cloned().unwrap_or(Availability::Unavailable))
        }
    }

    async fn create(
        &self,
        options: SessionOptions,
    ) -> anyhow::Result<Arc<dyn LanguageModelSession>> {
        *self.created_with.lock().unwrap() = Some(options);
        Ok(self.session.clone())
    }
}

enum Reply {
    Chunks(Vec<&'static str>),
    ChunksThenFail(Vec<&'static str>, &'static str),
    /// Yields the chunks, then never finishes.
    ChunksThenHang(Vec<&'static str>),
    Hang,
}

struct MockModelSession {
    replies: Mutex<VecDeque<Reply>>,
    seen: Mutex<Vec<Vec<Turn>>>,
}

impl MockModelSession {
    fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            seen: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait::async_trait]
impl LanguageModelSession for MockModelSession {
    async fn prompt_streaming(
        &self,
        transcript: &[Turn],
        _cancel: CancellationToken,
    ) -> anyhow::Result<HostStream> {
        self.seen.lock().unwrap().push(transcript.to_vec());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Reply::Chunks(vec![]));

        let stream: HostStream = match reply {
            Reply::Chunks(chunks) => {
                Box::pin(stream::iter(chunks.into_iter().map(|c| Ok(c.to_string()))))
            }
            Reply::ChunksThenFail(chunks, msg) => Box::pin(
                stream::iter(chunks.into_iter().map(|c| Ok(c.to_string())))
                    .chain(stream::once(async move { Err(anyhow::anyhow!(msg)) })),
            ),
            Reply::ChunksThenHang(chunks) => Box::pin(
                stream::iter(chunks.into_iter().map(|c| Ok(c.to_string())))
                    .chain(stream::pending()),
            ),
            Reply::Hang => Box::pin(stream::pending()),
        };
        Ok(stream)
    }
}

async fn collect(output: PromptOutput) -> Vec<Result<String, ChatError>> {
    match output {
        PromptOutput::Stream(stream) => stream.collect().await,
        PromptOutput::Complete(text) => vec![Ok(text)],
    }
}

// ========================================================================
// Init
// ========================================================================

#[tokio::test]
async fn test_init_creates_session_with_system_prompt() {
    let session = MockModelSession::new(vec![]);
    let host = MockHost::new(vec![Availability::Available], session);
    let provider = NativeModelProvider::new(Some(host.clone()));

    provider.init("Seja breve.").await.unwrap();

    let options = host.created_with.lock().unwrap().take().unwrap();
    assert_eq!(options.initial_prompts, vec![Turn::system("Seja breve.")]);
    assert_eq!(provider.transcript().await, vec![Turn::system("Seja breve.")]);
}

#[tokio::test]
async fn test_init_reports_each_non_ready_status() {
    for status in [
        Availability::Downloadable,
        Availability::Downloading,
        Availability::Unavailable,
    ] {
        let host = MockHost::new(vec![status.clone()], MockModelSession::new(vec![]));
        let provider = NativeModelProvider::new(Some(host));
        let err = provider.init("").await.unwrap_err();
        assert!(
            matches!(err, ChatError::ProviderUnavailable(_)),
            "{status:?} gave {err:?}"
        );
    }
}

#[tokio::test]
async fn test_init_unknown_status_is_init_error() {
    let host = MockHost::new(
        vec![Availability::from("warming-up")],
        MockModelSession::new(vec![]),
    );
    let provider = NativeModelProvider::new(Some(host));

    let err = provider.init("").await.unwrap_err();
    assert!(matches!(err, ChatError::ProviderInit(_)));
}

// ========================================================================
// Prompt
// ========================================================================

#[tokio::test]
async fn test_prompt_streams_and_records_transcript() {
    let session = MockModelSession::new(vec![Reply::Chunks(vec!["Ol", "á"])]);
    let host = MockHost::new(vec![Availability::Available], session.clone());
    let provider = NativeModelProvider::new(Some(host));
    provider.init("S").await.unwrap();

    let output = provider.prompt("oi", CancellationToken::new()).await.unwrap();
    let chunks: Vec<String> = collect(output).await.into_iter().map(|c| c.unwrap()).collect();

    assert_eq!(chunks, vec!["Ol", "á"]);
    assert_eq!(
        session.seen.lock().unwrap()[0],
        vec![Turn::system("S"), Turn::user("oi")]
    );
    assert_eq!(
        provider.transcript().await,
        vec![Turn::system("S"), Turn::user("oi"), Turn::assistant("Olá")]
    );
}

#[tokio::test]
async fn test_prompt_when_model_became_unavailable() {
    let host = MockHost::new(
        vec![Availability::Available, Availability::Downloading],
        MockModelSession::new(vec![]),
    );
    let provider = NativeModelProvider::new(Some(host));
    provider.init("").await.unwrap();

    let err = provider
        .prompt("oi", CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::ModelUnavailable));
}

#[tokio::test]
async fn test_prompt_with_cancelled_token() {
    let host = MockHost::new(vec![Availability::Available], MockModelSession::new(vec![]));
    let provider = NativeModelProvider::new(Some(host));
    provider.init("").await.unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = provider.prompt("oi", cancel).await.unwrap_err();
    assert!(err.is_cancelled());
}

#[tokio::test]
async fn test_cancel_stops_hanging_stream() {
    let host = MockHost::new(
        vec![Availability::Available],
        MockModelSession::new(vec![Reply::Hang]),
    );
    let provider = NativeModelProvider::new(Some(host));
    provider.init("").await.unwrap();

    let cancel = CancellationToken::new();
    let output = provider.prompt("oi", cancel.clone()).await.unwrap();
    let PromptOutput::Stream(mut stream) = output else {
        panic!("native replies stream");
    };

    cancel.cancel();
    let item = stream.next().await.unwrap();
    assert!(item.unwrap_err().is_cancelled());
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn test_host_errors_are_normalized() {
    let session = MockModelSession::new(vec![
        Reply::ChunksThenFail(vec!["a"], "QuotaExceededError: input too large"),
        Reply::ChunksThenFail(vec![], "Too Many Requests"),
    ]);
    let host = MockHost::new(vec![Availability::Available], session);
    let provider = NativeModelProvider::new(Some(host));
    provider.init("").await.unwrap();

    let items = collect(provider.prompt("1", CancellationToken::new()).await.unwrap()).await;
    assert_eq!(items[0].as_deref().ok(), Some("a"));
    assert!(matches!(items[1], Err(ChatError::QuotaExceeded(_))));

    let items = collect(provider.prompt("2", CancellationToken::new()).await.unwrap()).await;
    assert!(matches!(items[0], Err(ChatError::RateLimited(_))));
}

// ========================================================================
// Transcript after interrupted replies
// ========================================================================

#[tokio::test]
async fn test_cancelled_partial_reply_stays_in_transcript() {
    let session = MockModelSession::new(vec![
        Reply::ChunksThenHang(vec!["Par"]),
        Reply::Chunks(vec!["ok"]),
    ]);
    let host = MockHost::new(vec![Availability::Available], session.clone());
    let provider = NativeModelProvider::new(Some(host));
    provider.init("").await.unwrap();

    let cancel = CancellationToken::new();
    let PromptOutput::Stream(mut stream) = provider.prompt("hi", cancel.clone()).await.unwrap()
    else {
        panic!("native replies stream");
    };
    assert_eq!(stream.next().await.unwrap().unwrap(), "Par");
    cancel.cancel();
    assert!(stream.next().await.unwrap().unwrap_err().is_cancelled());

    collect(provider.prompt("again", CancellationToken::new()).await.unwrap()).await;

    assert_eq!(
        session.seen.lock().unwrap()[1],
        vec![
            Turn::system(""),
            Turn::user("hi"),
            Turn::assistant("Par"),
            Turn::user("again"),
        ]
    );
    assert_eq!(
        provider.transcript().await.last(),
        Some(&Turn::assistant("ok"))
    );
}

#[tokio::test]
async fn test_failed_partial_reply_stays_in_transcript() {
    let session = MockModelSession::new(vec![Reply::ChunksThenFail(vec!["Meio"], "device lost")]);
    let host = MockHost::new(vec![Availability::Available], session);
    let provider = NativeModelProvider::new(Some(host));
    provider.init("S").await.unwrap();

    let items = collect(provider.prompt("oi", CancellationToken::new()).await.unwrap()).await;
    assert!(matches!(items.last(), Some(Err(ChatError::Native(_)))));

    assert_eq!(
        provider.transcript().await,
        vec![Turn::system("S"), Turn::user("oi"), Turn::assistant("Meio")]
    );
}

#[tokio::test]
async fn test_session_history_matches_transcript_after_abort() {
    let model = MockModelSession::new(vec![
        Reply::ChunksThenHang(vec!["Par"]),
        Reply::Chunks(vec!["ok"]),
    ]);
    let host = MockHost::new(vec![Availability::Available], model.clone());
    let provider = Arc::new(NativeModelProvider::new(Some(host)));
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let chat = Arc::new(
        ChatSession::new(
            provider.clone(),
            HistoryStore::in_memory(),
            SessionConfig {
                limit: 10,
                system_prompt: SystemPromptSource::None,
                first_bot_message: None,
            },
        )
        .with_events(tx),
    );
    chat.init().await;

    let task = tokio::spawn({
        let chat = chat.clone();
        async move { chat.send_message("hi").await }
    });
    while let Some(event) = rx.recv().await {
        if matches!(event, SessionEvent::TextDelta(_)) {
            break;
        }
    }
    assert!(chat.abort());
    assert_eq!(task.await.unwrap(), SendOutcome::Cancelled);

    assert_eq!(chat.send_message("again").await, SendOutcome::Completed);

    // Error entries are shown to the user only; everything else is mirrored.
    let history: Vec<(ChatRole, String)> = chat
        .messages()
        .into_iter()
        .filter(|m| m.role != ChatRole::Error)
        .map(|m| (m.role, m.content))
        .collect();
    let transcript: Vec<(ChatRole, String)> = provider
        .transcript()
        .await
        .into_iter()
        .filter(|t| t.role != Role::System)
        .map(|t| {
            let role = match t.role {
                Role::User => ChatRole::User,
                _ => ChatRole::Assistant,
            };
            (role, t.content)
        })
        .collect();
    assert_eq!(history, transcript);
    assert_eq!(
        model.seen.lock().unwrap()[1][2],
        Turn::assistant("Par")
    );
}
