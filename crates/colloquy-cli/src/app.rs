use anyhow::Result;
use colloquy_core::constants::ui::CLEAR_CONFIRMATION;
use colloquy_core::{build_provider, ChatSession, SendOutcome, SessionEvent, Settings};
use std::io::{self, Stdout, Write};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::sync::Notify;

use crate::commands::{handle_command, interjection, is_confirmation, CommandResult, Interjection};
use crate::render::{format_message, Renderer};

type Input = Lines<BufReader<Stdin>>;

/// A session wired to stdout.
struct Terminal {
    session: Arc<ChatSession>,
    events: UnboundedReceiver<SessionEvent>,
    renderer: Renderer,
    stdout: Stdout,
    confirm_clear: bool,
    /// `/quit` arrived while a reply was streaming.
    quit_requested: bool,
}

impl Terminal {
    fn open(settings: &Settings) -> Result<Self> {
        let provider = build_provider(settings, None)?;
        let store = settings.history_store()?;
        let (tx, events) = mpsc::unbounded_channel();
        let session = ChatSession::new(provider, store, settings.session_config()).with_events(tx);

        Ok(Self {
            session: Arc::new(session),
            events,
            renderer: Renderer::new(),
            stdout: io::stdout(),
            confirm_clear: settings.ui.confirm_clear,
            quit_requested: false,
        })
    }

    async fn init(&mut self) -> Result<()> {
        self.session.init().await;
        self.drain()
    }

    /// Render whatever is already queued.
    fn drain(&mut self) -> Result<()> {
        while let Ok(event) = self.events.try_recv() {
            self.renderer.render(&event, &mut self.stdout)?;
        }
        Ok(())
    }

    /// Send `text`, rendering the reply as it arrives. With `input`, lines
    /// typed meanwhile are read so `/stop`, `/quit` and `/clear` work mid-reply.
    async fn send(&mut self, text: &str, mut input: Option<&mut Input>) -> Result<SendOutcome> {
        let session = self.session.clone();
        let send = session.send_message(text);
        tokio::pin!(send);

        let mut input_open = input.is_some();
        let outcome = loop {
            tokio::select! {
                outcome = &mut send => break outcome,
                Some(event) = self.events.recv() => {
                    self.renderer.render(&event, &mut self.stdout)?;
                }
                line = next_line(&mut input), if input_open => match line? {
                    Some(line) => match interjection(&line, self.confirm_clear) {
                        Interjection::Abort => {
                            session.abort();
                        }
                        Interjection::Quit => {
                            session.abort();
                            self.quit_requested = true;
                        }
                        Interjection::Clear => session.clear_chat(),
                        Interjection::Busy => {
                            eprintln!("(busy: wait for the reply or type /stop)");
                        }
                    },
                    None => input_open = false,
                },
            }
        };

        self.drain()?;
        Ok(outcome)
    }

    fn show_greeting(&self) {
        if let Some(greeting) = self.session.greeting() {
            println!("assistant: {greeting}");
        }
    }
}

/// Ask before clearing; end of input counts as no.
async fn confirm_clear(input: &mut Input) -> Result<bool> {
    print!("{CLEAR_CONFIRMATION} [s/N] ");
    io::stdout().flush()?;
    Ok(input
        .next_line()
        .await?
        .is_some_and(|answer| is_confirmation(&answer)))
}

async fn next_line(input: &mut Option<&mut Input>) -> io::Result<Option<String>> {
    match input {
        Some(lines) => lines.next_line().await,
        None => std::future::pending().await,
    }
}

/// Ctrl-C cancels the reply in flight, or asks to quit when idle.
fn spawn_interrupt_handler(session: Arc<ChatSession>, quit: Arc<Notify>) {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if !session.abort() {
                quit.notify_one();
            }
        }
    });
}

pub async fn run_single_prompt(settings: &Settings, prompt: &str) -> Result<()> {
    let mut terminal = Terminal::open(settings)?;
    terminal.init().await?;

    spawn_interrupt_handler(terminal.session.clone(), Arc::new(Notify::new()));

    match terminal.send(prompt, None).await? {
        SendOutcome::Failed(kind) | SendOutcome::Rejected(kind) => {
            anyhow::bail!("prompt did not complete ({kind:?})")
        }
        _ => Ok(()),
    }
}

pub async fn run_repl(settings: Settings) -> Result<()> {
    let mut terminal = Terminal::open(&settings)?;

    println!(
        "{} ({}) - type /help for commands",
        settings.ui.chatbot_name,
        terminal.session.provider_id()
    );
    if !settings.ui.welcome_message.trim().is_empty() {
        println!("{}", settings.ui.welcome_message);
    }
    for message in terminal.session.messages() {
        println!("{}", format_message(&message));
    }
    terminal.show_greeting();
    terminal.init().await?;

    let quit = Arc::new(Notify::new());
    spawn_interrupt_handler(terminal.session.clone(), quit.clone());

    let mut input: Input = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let line = tokio::select! {
            line = input.next_line() => line?,
            _ = quit.notified() => break,
        };
        let Some(line) = line else {
            break;
        };

        match handle_command(&line) {
            CommandResult::Quit => break,
            CommandResult::Message(msg) => println!("{msg}"),
            CommandResult::Clear => {
                if settings.ui.confirm_clear && !confirm_clear(&mut input).await? {
                    println!("Chat mantido.");
                    continue;
                }
                terminal.session.clear_chat();
                terminal.drain()?;
                terminal.show_greeting();
            }
            CommandResult::History => {
                for message in terminal.session.messages() {
                    println!("{}", format_message(&message));
                }
            }
            CommandResult::ShowStatus => println!(
                "provider: {}, messages: {} (limit {})",
                terminal.session.provider_id(),
                terminal.session.messages().len(),
                terminal.session.limit()
            ),
            CommandResult::Stop => println!("Nothing to stop."),
            CommandResult::NotACommand => {
                let outcome = terminal.send(&line, Some(&mut input)).await?;
                tracing::debug!(?outcome, "Send finished");
                if terminal.quit_requested {
                    break;
                }
            }
        }
    }

    Ok(())
}
