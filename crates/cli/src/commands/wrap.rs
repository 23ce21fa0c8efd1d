// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `pmux wrap` - wrapper orchestrator
//!
//! Invoked by `pmux server` inside the detached tmux session; usually not
//! run by humans.

use anyhow::Result;
use clap::Args;
use pmux_core::{Sid, WrapMode};
use pmux_wrap::{WrapError, Wrapper, WrapperConfig};
use std::path::{Path, PathBuf};
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

#[derive(Args, Debug)]
pub struct WrapArgs {
    /// Root process sandbox directory.
    #[arg(long)]
    root: Option<PathBuf>,

    /// Override session identifier.
    #[arg(long)]
    sid: Option<String>,

    /// Registration URL to contact before running the task.
    #[arg(long = "reg-url")]
    reg_url: Option<String>,

    /// File receiving wrapper errors when the session directory is not
    /// available (defaults to the session's stderr file).
    #[arg(long)]
    stderr: Option<PathBuf>,

    /// Live mode: the worker waits for a command instead of exiting on its
    /// own.
    #[arg(long)]
    live: bool,

    /// Worker executable.
    worker: String,

    /// Arguments passed to the worker.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

pub async fn handle(args: WrapArgs) -> Result<()> {
    let mut config = WrapperConfig::new(&args.worker);
    if let Some(root) = args.root {
        config.root_dir = root;
    }
    if let Some(sid) = args.sid {
        config.sid = Some(Sid::parse(sid)?);
    }
    config.register_url = args.reg_url;
    config.args = args.args;
    config.mode = if args.live {
        WrapMode::Live
    } else {
        WrapMode::Normal
    };

    let wrapper = match Wrapper::new(config) {
        Ok(wrapper) => wrapper,
        Err(e) => {
            // No session directory to write into yet; fall back to the
            // explicitly provided stderr path.
            append_error(args.stderr.as_deref(), &e);
            return Err(e.into());
        }
    };

    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    wrapper.run(cancel).await?;
    Ok(())
}

/// Cancel the run on SIGHUP or interrupt. tmux sends SIGHUP to all child
/// processes when the session is terminated, so children must clean up.
fn spawn_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "unable to install SIGHUP handler");
                return;
            }
        };
        let mut interrupt = match signal(SignalKind::interrupt()) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "unable to install SIGINT handler");
                return;
            }
        };

        tokio::select! {
            _ = hangup.recv() => tracing::info!("SIGHUP received, exiting"),
            _ = interrupt.recv() => tracing::info!("interrupt received, exiting"),
        }
        cancel.cancel();
    });
}

fn append_error(path: Option<&Path>, err: &WrapError) {
    use std::io::Write;

    let Some(path) = path else { return };
    let file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path);
    match file {
        Ok(mut f) => {
            let _ = writeln!(f, "pmux wrap: {err}");
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "unable to record wrap error");
        }
    }
}
