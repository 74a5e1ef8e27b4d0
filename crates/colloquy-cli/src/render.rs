use colloquy_core::constants::ui::TYPING_INDICATOR;
use colloquy_core::{ChatMessage, ChatRole, SessionEvent};
use std::io::{self, Write};

/// Moves to column 0 and erases the line.
const ERASE_LINE: &str = "\r\x1b[2K";

/// Writes session events to a terminal as plain lines.
#[derive(Debug, Default)]
pub struct Renderer {
    /// A reply is being written and its line is still open.
    mid_line: bool,
    /// The typing indicator is on screen.
    typing: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, event: &SessionEvent, out: &mut impl Write) -> io::Result<()> {
        match event {
            SessionEvent::LoadingChanged(true) => {
                self.end_line(out)?;
                write!(out, "{TYPING_INDICATOR}")?;
                self.typing = true;
            }
            SessionEvent::TextDelta(text) => {
                self.clear_typing(out)?;
                write!(out, "{text}")?;
                self.mid_line = true;
            }
            SessionEvent::MessageAppended(message) => match message.role {
                ChatRole::Assistant if !message.content.is_empty() => {
                    self.clear_typing(out)?;
                    write!(out, "{}", message.content)?;
                    self.mid_line = true;
                }
                ChatRole::Error => {
                    self.clear_typing(out)?;
                    self.end_line(out)?;
                    writeln!(out, "! {}", message.content)?;
                }
                _ => {}
            },
            SessionEvent::Cleared => {
                self.clear_typing(out)?;
                self.end_line(out)?;
                writeln!(out, "(chat cleared)")?;
            }
            SessionEvent::LoadingChanged(false) => {
                self.clear_typing(out)?;
                self.end_line(out)?;
            }
            SessionEvent::MessageRemoved(_) => {}
        }
        out.flush()
    }

    fn clear_typing(&mut self, out: &mut impl Write) -> io::Result<()> {
        if self.typing {
            write!(out, "{ERASE_LINE}")?;
            self.typing = false;
        }
        Ok(())
    }

    fn end_line(&mut self, out: &mut impl Write) -> io::Result<()> {
        if self.mid_line {
            writeln!(out)?;
            self.mid_line = false;
        }
        Ok(())
    }
}

/// One history entry as shown by `/history`.
pub fn format_message(message: &ChatMessage) -> String {
    let label = match message.role {
        ChatRole::User => "you",
        ChatRole::Assistant => "assistant",
        ChatRole::System => "system",
        ChatRole::Error => "error",
    };
    format!("{label}: {}", message.content)
}
