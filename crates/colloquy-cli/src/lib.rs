// Library interface for colloquy-cli so integration tests can reach the
// command parser and the event renderer.

// Both files are also declared in main.rs; the path attribute keeps them from
// being loaded twice.

#[path = "commands.rs"]
pub mod commands;

#[path = "render.rs"]
pub mod render;

pub use commands::{handle_command, interjection, is_confirmation, CommandResult, Interjection};
pub use render::Renderer;
