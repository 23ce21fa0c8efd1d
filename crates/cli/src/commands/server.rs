// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `pmux server` - control plane

use anyhow::Result;
use clap::Args;
use pmux_adapters::{MuxAdapter, TmuxAdapter};
use pmux_core::WrapMode;
use pmux_server::ServerConfig;
use tokio_util::sync::CancellationToken;

#[derive(Args, Debug)]
pub struct ServerArgs {
    /// Server listening port.
    #[arg(short, long, default_value_t = 4002)]
    port: u16,

    /// Pmux will spawn sessions running this executable.
    #[arg(short = 'n', long = "exec-name")]
    exec_name: String,

    /// Comma separated list of arguments passed to the executable.
    #[arg(long, default_value = "")]
    args: String,

    /// Dirty mode: all files created by pmux child processes are kept.
    #[arg(long)]
    dirty: bool,

    /// Normal mode: workers execute their task and exit on their own.
    #[arg(long, conflicts_with = "live")]
    normal: bool,

    /// Live mode: workers wait for a command instead of exiting on their own.
    #[arg(long)]
    live: bool,
}

pub async fn handle(args: ServerArgs) -> Result<()> {
    let mux = TmuxAdapter::new();
    mux.verify().await?;

    let mut config = ServerConfig::new(args.exec_name);
    config.port = args.port;
    config.args = split_args(&args.args);
    config.keep_files = args.dirty;
    // --normal is the default; the flag exists so callers can be explicit.
    config.mode = match (args.normal, args.live) {
        (_, true) => WrapMode::Live,
        _ => WrapMode::Normal,
    };

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, shutting down");
            trigger.cancel();
        }
    });

    pmux_server::serve(config, mux, cancel).await?;
    Ok(())
}

fn split_args(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
