// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal multiplexer adapters

mod tmux;

pub use tmux::TmuxAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeMuxAdapter, MuxCall};

use async_trait::async_trait;
use pmux_core::Sid;
use thiserror::Error;

/// Errors from multiplexer operations
#[derive(Debug, Error)]
pub enum MuxError {
    #[error("tmux is not available: {0}")]
    ToolUnavailable(String),
    #[error("tmux command failed: {0}")]
    ToolError(String),
    #[error("unable to parse session listing: {0}")]
    ListParse(String),
}

/// Adapter for the external detached-terminal tool keeping wrap processes
/// alive after the spawning request returns.
///
/// Sessions are addressed by [`Sid`], so the prefix is validated before any
/// identifier reaches the tool, and the adapter never touches sessions
/// owned by others.
#[async_trait]
pub trait MuxAdapter: Clone + Send + Sync + 'static {
    /// Fail if the external tool cannot be executed at all.
    async fn verify(&self) -> Result<(), MuxError>;

    /// First line of the tool's version output.
    async fn version(&self) -> Result<String, MuxError>;

    /// Create a detached session named `sid` running `cmd args…`. There is
    /// no guarantee the session is still running once this returns.
    async fn new_session(&self, sid: &Sid, cmd: &str, args: &[String]) -> Result<(), MuxError>;

    /// Terminate a session, killing all its child processes.
    async fn kill_session(&self, sid: &Sid) -> Result<(), MuxError>;

    /// Identifiers of the running sessions started by pmux.
    ///
    /// Foreign sessions are skipped. A midway parse failure yields the
    /// valid prefix of the listing together with the non-fatal error.
    async fn list_sessions(&self) -> (Vec<Sid>, Option<MuxError>);

    /// Whether a session named `sid` is currently running. Listing errors
    /// are logged and reported as absence.
    async fn has_session(&self, sid: &Sid) -> bool {
        let (sessions, err) = self.list_sessions().await;
        if let Some(err) = err {
            tracing::error!(error = %err, "has_session: listing failed");
            return false;
        }
        sessions.iter().any(|s| s == sid)
    }
}
