// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! pmux - process supervisor multiplexing workers over tmux

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "pmux",
    version,
    about = "Spawn, observe and terminate worker programs inside detached tmux sessions"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the control-plane HTTP server
    Server(commands::server::ServerArgs),
    /// Execute a program inside a wrapper suitable for interacting with pmux
    Wrap(commands::wrap::WrapArgs),
    /// Print the identifiers of the running pmux sessions
    ListSessions,
}

#[tokio::main]
async fn main() {
    setup_logging();

    if let Err(e) = run().await {
        // wrap mirrors the worker's exit code when possible
        let code = match e.downcast_ref::<pmux_wrap::WrapError>() {
            Some(pmux_wrap::WrapError::RunFailed { code: Some(code) }) if *code > 0 => *code,
            _ => 1,
        };
        eprintln!("Error: {e}");
        std::process::exit(code);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Server(args) => commands::server::handle(args).await,
        Commands::Wrap(args) => commands::wrap::handle(args).await,
        Commands::ListSessions => commands::sessions::handle().await,
    }
}

fn setup_logging() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
