/// Result of processing a slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Display a message to the user.
    Message(String),
    /// Clear the chat, in memory and on disk.
    Clear,
    /// Print the whole conversation.
    History,
    /// Show provider and message count.
    ShowStatus,
    /// Cancel the reply in flight.
    Stop,
    /// Quit the application.
    Quit,
    /// Not a command - treat as regular input.
    NotACommand,
}

pub fn handle_command(input: &str) -> CommandResult {
    let input = input.trim();
    let cmd = input.split_whitespace().next().unwrap_or("");

    match cmd {
        "/help" | "/h" => show_help(),
        "/exit" | "/quit" | "/q" => CommandResult::Quit,
        "/clear" | "/new" => CommandResult::Clear,
        "/history" => CommandResult::History,
        "/status" => CommandResult::ShowStatus,
        "/stop" => CommandResult::Stop,
        "/version" => CommandResult::Message(format!("Colloquy v{}", env!("CARGO_PKG_VERSION"))),
        _ => {
            if input.starts_with('/') {
                CommandResult::Message(format!("Unknown command: {cmd}. Type /help for commands."))
            } else {
                CommandResult::NotACommand
            }
        }
    }
}

/// What a line typed while a reply is streaming does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interjection {
    /// Cancel the reply.
    Abort,
    /// Cancel the reply, then leave.
    Quit,
    Clear,
    /// Anything else waits for the reply.
    Busy,
}

/// `/clear` only interrupts a reply when it needs no confirmation.
pub fn interjection(input: &str, confirm_clear: bool) -> Interjection {
    match handle_command(input) {
        CommandResult::Stop => Interjection::Abort,
        CommandResult::Quit => Interjection::Quit,
        CommandResult::Clear if !confirm_clear => Interjection::Clear,
        _ => Interjection::Busy,
    }
}

/// Accept Portuguese and English yes answers; anything else declines.
pub fn is_confirmation(answer: &str) -> bool {
    matches!(
        answer.trim().to_lowercase().as_str(),
        "s" | "sim" | "y" | "yes"
    )
}

fn show_help() -> CommandResult {
    let help_text = "\
Colloquy commands

  /clear, /new        Clear the conversation and saved history (asks first)
  /history            Show the whole conversation
  /status             Show provider and message count
  /stop               Cancel the reply being generated (also Ctrl-C)
  /version            Show version information
  /help, /h           Show this help message
  /exit, /quit, /q    Quit (cancels a reply in progress)";

    CommandResult::Message(help_text.into())
}
