use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

mod app;
mod commands;
mod render;

#[derive(Parser)]
#[command(name = "colloquy")]
#[command(about = "Colloquy - chat with a native or hosted language model")]
#[command(version)]
struct Cli {
    /// Run a single prompt and exit
    #[arg(short, long)]
    prompt: Option<String>,

    /// Chat provider (native, remote)
    #[arg(long)]
    provider: Option<String>,

    /// Model id for the remote provider
    #[arg(short, long)]
    model: Option<String>,

    /// Refuse new messages once the history holds more than this many entries
    #[arg(long)]
    limit: Option<usize>,

    /// File path or URL of the system prompt
    #[arg(long)]
    system_prompt: Option<String>,

    /// Directory for the saved conversation
    #[arg(long)]
    storage_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut settings = colloquy_core::Settings::load();

    if let Some(ref provider) = cli.provider {
        settings.provider = provider.parse()?;
    }
    if let Some(model) = cli.model {
        settings.remote.model = model;
    }
    if let Some(limit) = cli.limit {
        settings.session.limit = limit;
    }
    if let Some(system_prompt) = cli.system_prompt {
        settings.session.system_prompt = system_prompt;
    }
    if let Some(dir) = cli.storage_dir {
        settings.session.storage_dir = Some(dir);
    }

    if let Some(prompt) = cli.prompt {
        app::run_single_prompt(&settings, &prompt).await?;
    } else {
        app::run_repl(settings).await?;
    }

    Ok(())
}
