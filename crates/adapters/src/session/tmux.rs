// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tmux multiplexer adapter

use super::{MuxAdapter, MuxError};
use crate::subprocess::{lookup_path, run_with_timeout, MUX_TIMEOUT};
use async_trait::async_trait;
use pmux_core::Sid;
use tokio::process::Command;

/// Tmux-based multiplexer adapter
#[derive(Clone, Default)]
pub struct TmuxAdapter;

impl TmuxAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MuxAdapter for TmuxAdapter {
    async fn verify(&self) -> Result<(), MuxError> {
        match lookup_path("tmux") {
            Some(path) => {
                tracing::info!(path = %path.display(), "using tmux");
                Ok(())
            }
            None => Err(MuxError::ToolUnavailable(
                "tmux not found on PATH".to_string(),
            )),
        }
    }

    async fn version(&self) -> Result<String, MuxError> {
        let mut cmd = Command::new("tmux");
        cmd.arg("-V");

        let output = run_with_timeout(cmd, MUX_TIMEOUT, "tmux -V")
            .await
            .map_err(MuxError::ToolError)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MuxError::ToolError(format!(
                "unable to fetch tmux version: {}",
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().next().unwrap_or_default().to_string())
    }

    async fn new_session(&self, sid: &Sid, cmd: &str, args: &[String]) -> Result<(), MuxError> {
        let mut tmux_cmd = Command::new("tmux");
        tmux_cmd
            .arg("new")
            .arg("-s")
            .arg(sid.as_str())
            .arg("-d")
            .arg(cmd)
            .args(args);

        let output = run_with_timeout(tmux_cmd, MUX_TIMEOUT, "tmux new")
            .await
            .map_err(MuxError::ToolError)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!(sid = %sid, stderr = %stderr, "tmux new failed");
            return Err(MuxError::ToolError(format!(
                "unable to create new tmux session: {}",
                stderr.trim()
            )));
        }

        // Log stderr even on success - may contain useful warnings
        if !output.stderr.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(sid = %sid, stderr = %stderr, "tmux new stderr (non-fatal)");
        }

        Ok(())
    }

    async fn kill_session(&self, sid: &Sid) -> Result<(), MuxError> {
        let mut cmd = Command::new("tmux");
        cmd.arg("kill-session").arg("-t").arg(sid.as_str());

        let output = run_with_timeout(cmd, MUX_TIMEOUT, "tmux kill-session")
            .await
            .map_err(MuxError::ToolError)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MuxError::ToolError(format!(
                "unable to kill tmux session: {}",
                stderr.trim()
            )));
        }

        Ok(())
    }

    async fn list_sessions(&self) -> (Vec<Sid>, Option<MuxError>) {
        let mut cmd = Command::new("tmux");
        cmd.arg("list-sessions");

        let output = match run_with_timeout(cmd, MUX_TIMEOUT, "tmux list-sessions").await {
            Ok(output) => output,
            Err(e) => return (Vec::new(), Some(MuxError::ToolError(e))),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            // A tmux server only exists while it has sessions; its absence
            // means there is nothing to list.
            if stderr.contains("no server running") || stderr.contains("No such file") {
                return (Vec::new(), None);
            }
            return (
                Vec::new(),
                Some(MuxError::ToolError(format!(
                    "unable to list tmux sessions: {}",
                    stderr.trim()
                ))),
            );
        }

        match std::str::from_utf8(&output.stdout) {
            Ok(text) => (parse_listing(text), None),
            Err(e) => {
                // Parse what survived and report the rest as a non-fatal
                // partial failure.
                let valid = std::str::from_utf8(&output.stdout[..e.valid_up_to()])
                    .unwrap_or_default();
                (
                    parse_listing(valid),
                    Some(MuxError::ListParse(e.to_string())),
                )
            }
        }
    }
}

/// Extract pmux session identifiers from `tmux list-sessions` output,
/// skipping foreign sessions.
fn parse_listing(text: &str) -> Vec<Sid> {
    let mut acc = Vec::new();
    for line in text.lines() {
        let name = line.split(':').next().unwrap_or_default();
        match Sid::parse(name) {
            Ok(sid) => acc.push(sid),
            Err(err) => {
                tracing::warn!(line, error = %err, "list_sessions: skipping line");
            }
        }
    }
    acc
}

#[cfg(test)]
#[path = "tmux_tests.rs"]
mod tests;
