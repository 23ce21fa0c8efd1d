// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake multiplexer adapter for testing

use super::{MuxAdapter, MuxError};
use async_trait::async_trait;
use parking_lot::Mutex;
use pmux_core::Sid;
use std::sync::Arc;

/// Recorded multiplexer call
#[derive(Debug, Clone)]
pub enum MuxCall {
    Verify,
    Version,
    NewSession {
        sid: Sid,
        cmd: String,
        args: Vec<String>,
    },
    KillSession {
        sid: Sid,
    },
    ListSessions,
}

#[derive(Default)]
struct FakeMuxState {
    sessions: Vec<Sid>,
    calls: Vec<MuxCall>,
    fail_new_session: Option<String>,
    list_error: Option<String>,
}

/// Fake multiplexer adapter for testing
#[derive(Clone, Default)]
pub struct FakeMuxAdapter {
    inner: Arc<Mutex<FakeMuxState>>,
}

impl FakeMuxAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<MuxCall> {
        self.inner.lock().calls.clone()
    }

    /// Currently "running" sessions
    pub fn sessions(&self) -> Vec<Sid> {
        self.inner.lock().sessions.clone()
    }

    /// Add a pre-existing session
    pub fn add_session(&self, sid: Sid) {
        self.inner.lock().sessions.push(sid);
    }

    /// Make the next `new_session` calls fail with the given message
    pub fn fail_new_session(&self, message: impl Into<String>) {
        self.inner.lock().fail_new_session = Some(message.into());
    }

    /// Make `list_sessions` report a non-fatal error alongside its results
    pub fn set_list_error(&self, message: impl Into<String>) {
        self.inner.lock().list_error = Some(message.into());
    }
}

#[async_trait]
impl MuxAdapter for FakeMuxAdapter {
    async fn verify(&self) -> Result<(), MuxError> {
        self.inner.lock().calls.push(MuxCall::Verify);
        Ok(())
    }

    async fn version(&self) -> Result<String, MuxError> {
        self.inner.lock().calls.push(MuxCall::Version);
        Ok("tmux 3.4 (fake)".to_string())
    }

    async fn new_session(&self, sid: &Sid, cmd: &str, args: &[String]) -> Result<(), MuxError> {
        let mut inner = self.inner.lock();

        inner.calls.push(MuxCall::NewSession {
            sid: sid.clone(),
            cmd: cmd.to_string(),
            args: args.to_vec(),
        });

        if let Some(message) = &inner.fail_new_session {
            return Err(MuxError::ToolError(message.clone()));
        }

        inner.sessions.push(sid.clone());
        Ok(())
    }

    async fn kill_session(&self, sid: &Sid) -> Result<(), MuxError> {
        let mut inner = self.inner.lock();

        inner.calls.push(MuxCall::KillSession { sid: sid.clone() });

        let before = inner.sessions.len();
        inner.sessions.retain(|s| s != sid);
        if inner.sessions.len() == before {
            return Err(MuxError::ToolError(format!("session not found: {sid}")));
        }
        Ok(())
    }

    async fn list_sessions(&self) -> (Vec<Sid>, Option<MuxError>) {
        let mut inner = self.inner.lock();

        inner.calls.push(MuxCall::ListSessions);

        let err = inner
            .list_error
            .clone()
            .map(MuxError::ListParse);
        (inner.sessions.clone(), err)
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
