// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! mockcmd - reference worker for pmux
//!
//! Conforming worker used by end-to-end tests: it hosts the rendezvous
//! socket it is given, writes one CSV progress row per second, and exits
//! when told to `cancel` (or, in normal mode, once its ticks complete).

use anyhow::Result;
use clap::Parser;
use pmux_bridge::{BridgeError, CommBridge, ProgressWriter};
use pmux_core::WrapMode;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(
    name = "mockcmd",
    version,
    about = "A mocked worker which can be executed by pmux, but does not do anything useful"
)]
struct Args {
    /// Path to the configuration file.
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Path to the communication socket address.
    #[arg(long = "socket-path", default_value = "io.sock")]
    socket_path: PathBuf,

    /// Worker mode: "normal" exits once the ticks complete, "live" keeps
    /// ticking until a cancel command arrives.
    #[arg(long, default_value = "normal")]
    mode: String,

    /// Number of ticks in normal mode.
    #[arg(long, default_value_t = 3600)]
    total: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mode: WrapMode = args.mode.parse().map_err(anyhow::Error::msg)?;
    tracing::info!(
        config = %args.config.display(),
        socket = %args.socket_path.display(),
        %mode,
        "mockcmd starting"
    );

    eprintln!("mockcmd stderr");
    println!("mockcmd stdout");

    let cancel = CancellationToken::new();

    let command_cancel = cancel.clone();
    let bridge = CommBridge::bind(&args.socket_path)?.on_command(move |command| {
        match command {
            "cancel" => {
                command_cancel.cancel();
                Ok(())
            }
            other => Err(BridgeError::Command(format!(
                "unsupported command {other:?}"
            ))),
        }
    });
    let handle = bridge.handle();
    let server = tokio::spawn(bridge.serve(cancel.clone()));

    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_cancel.cancel();
        }
    });

    let mut progress = ProgressWriter::new(handle);
    let mut tick = tokio::time::interval(Duration::from_secs(1));
    let mut partial = 0u64;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tick.tick() => {
                partial += 1;
                progress.record(1, 1, args.total, partial, &format!("waiting {partial}..."));
                println!("waiting {partial}... done!");
                if mode == WrapMode::Normal && partial >= args.total {
                    break;
                }
            }
        }
    }

    cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(2), server).await;
    Ok(())
}
