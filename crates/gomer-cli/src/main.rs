//! # gomer
//!
//! Command-line client for a shared Go playground: follow the shared source
//! in a local file, push edits, and trigger runs and formatting.

#![deny(unsafe_code)]

mod commands;
mod input;
mod sink;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use gomer_bridge::Action;
use gomer_settings::GomerSettings;

/// Shared Go playground client.
#[derive(Parser, Debug)]
#[command(name = "gomer", version, about = "Shared Go playground client")]
struct Cli {
    /// Playground origin, e.g. `http://127.0.0.1:8080` (overrides settings).
    #[arg(long, global = true)]
    origin: Option<String>,

    /// Settings file (default: `~/.gomer/settings.json`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter directive (overrides settings; `RUST_LOG` still wins).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log JSON lines to stderr.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Follow the shared source interactively.
    Session(FileArgs),
    /// Push the file's contents to everyone once.
    Send(FileArgs),
    /// Run the file on the server and print the output.
    Run(FileArgs),
    /// Format the file on the server and rewrite it.
    Format(FileArgs),
}

#[derive(Args, Debug)]
struct FileArgs {
    /// Local copy of the shared source.
    #[arg(long, short, default_value = "main.go")]
    file: PathBuf,
}

impl Cli {
    /// Defaults, settings file, env, then flags; validated once at the end.
    fn resolve_settings(&self) -> Result<GomerSettings> {
        let path = match &self.config {
            Some(path) => {
                anyhow::ensure!(path.exists(), "settings file not found: {}", path.display());
                path.clone()
            }
            None => gomer_settings::settings_path(),
        };
        let mut settings = gomer_settings::read_layers(&path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?;

        if let Some(origin) = &self.origin {
            settings.server.origin.clone_from(origin);
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
        if self.json_logs {
            settings.logging.json = true;
        }
        settings.validate().context("invalid settings")?;
        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = cli.resolve_settings()?;
    gomer_logging::init_subscriber(&settings.logging.level, settings.logging.json);
    tracing::debug!(origin = %settings.server.origin, "settings resolved");

    let server = &settings.server;
    match cli.command {
        Command::Session(args) => commands::session(server, &args.file).await,
        Command::Send(args) => commands::send(server, &args.file).await,
        Command::Run(args) => commands::one_shot(server, &args.file, Action::Run).await,
        Command::Format(args) => commands::one_shot(server, &args.file, Action::Format).await,
    }
}
