// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Process wrapper
//!
//! A [`Wrapper`] supervises one worker process inside a tmux session: it
//! owns the session directory, serves the per-session HTTP API on an
//! ephemeral port, registers that port with an optional upstream
//! coordinator, and posts a success/failure callback when the worker is
//! done. Worker stdout and stderr are persisted into the session directory,
//! where the wrapper appends its own errors as well.

mod api;

use pmux_adapters::subprocess::lookup_path;
use pmux_adapters::{MuxAdapter, MuxError};
use pmux_core::{default_root, Sandbox, SandboxError, SessionFile, Sid, WrapMode};
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Grace period for the wrapper API server after the worker exits.
const SERVER_SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Safety deadline for the server to drain before it is abandoned.
const SERVER_DRAIN_DEADLINE: Duration = Duration::from_secs(5);

/// Errors from wrapper operations
#[derive(Debug, Error)]
pub enum WrapError {
    #[error("executable not found on PATH: {0}")]
    ExecNotFound(String),
    #[error(transparent)]
    Sandbox(#[from] SandboxError),
    #[error("unable to bind wrapper API listener: {0}")]
    Bind(#[source] io::Error),
    #[error("registration failed: {0}")]
    RegistrationFailed(String),
    #[error("callback failed: {0}")]
    CallbackFailed(String),
    #[error("wrapper API server failure: {0}")]
    ServerFailure(String),
    #[error("unable to launch worker {name}: {source}")]
    SpawnFailed {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("unable to await worker: {0}")]
    Wait(#[source] io::Error),
    #[error("worker exited with status {}", display_exit_code(.code))]
    RunFailed { code: Option<i32> },
    #[error("run interrupted by signal")]
    Interrupted,
    #[error("could not start wrapper session: {0}")]
    SessionStartFailed(String),
    #[error(transparent)]
    Mux(#[from] MuxError),
}

fn display_exit_code(code: &Option<i32>) -> String {
    match code {
        Some(c) => c.to_string(),
        None => "unknown (signal)".to_string(),
    }
}

/// Final status reported to the upstream coordinator.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WrapStatus {
    Success,
    Error,
}

#[derive(Serialize)]
struct CallbackPayload {
    status: WrapStatus,
    error: String,
}

/// Configuration record for a [`Wrapper`].
///
/// The working directory is always derived from `root_dir` and the SID at
/// materialization time, so fields may be set in any order.
#[derive(Debug, Clone)]
pub struct WrapperConfig {
    pub root_dir: PathBuf,
    /// Override the generated session identifier.
    pub sid: Option<Sid>,
    pub exec_name: String,
    pub args: Vec<String>,
    pub register_url: Option<String>,
    pub mode: WrapMode,
}

impl WrapperConfig {
    pub fn new(exec_name: impl Into<String>) -> Self {
        Self {
            root_dir: default_root(),
            sid: None,
            exec_name: exec_name.into(),
            args: Vec::new(),
            register_url: None,
            mode: WrapMode::default(),
        }
    }
}

/// Per-session supervisor bundling the worker executable, the session
/// directory, and the upstream registration target.
pub struct Wrapper {
    sid: Sid,
    sandbox: Sandbox,
    exec_name: String,
    args: Vec<String>,
    register_url: Option<String>,
    mode: WrapMode,
    client: reqwest::Client,
}

impl Wrapper {
    /// Validate the configuration and materialize the session directory.
    pub fn new(config: WrapperConfig) -> Result<Self, WrapError> {
        if lookup_path(&config.exec_name).is_none() {
            return Err(WrapError::ExecNotFound(config.exec_name));
        }

        let sid = config.sid.unwrap_or_else(Sid::generate);
        let sandbox = Sandbox::new(config.root_dir, sid.clone());
        sandbox.materialize()?;

        let register_url = config.register_url.filter(|u| !u.is_empty());

        Ok(Self {
            sid,
            sandbox,
            exec_name: config.exec_name,
            args: config.args,
            register_url,
            mode: config.mode,
            client: reqwest::Client::new(),
        })
    }

    pub fn sid(&self) -> &Sid {
        &self.sid
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    pub fn workdir(&self) -> PathBuf {
        self.sandbox.workdir()
    }

    /// Start this wrapper in a new detached tmux session, so it outlives
    /// the caller. The session identifier is persisted into the `sid` file
    /// first. There is no guarantee the session is still running once this
    /// returns.
    pub async fn start_session<M: MuxAdapter>(&self, mux: &M) -> Result<Sid, WrapError> {
        self.sandbox.write_sid_file()?;

        let exe = std::env::current_exe()
            .map_err(|e| WrapError::SessionStartFailed(e.to_string()))?;

        let mut args = vec![
            "wrap".to_string(),
            format!("--root={}", self.sandbox.root().display()),
            format!("--sid={}", self.sid),
            format!("--stderr={}", self.sandbox.path(SessionFile::Stderr).display()),
        ];
        if let Some(url) = &self.register_url {
            args.push(format!("--reg-url={url}"));
        }
        if self.mode == WrapMode::Live {
            args.push("--live".to_string());
        }
        args.push("--".to_string());
        args.push(self.exec_name.clone());
        args.extend(self.args.iter().cloned());

        // tmux joins its command arguments with spaces and hands the result
        // to a shell, so every argument has to survive re-splitting.
        let args: Vec<String> = args.iter().map(|a| shell_quote(a)).collect();

        mux.new_session(&self.sid, &shell_quote(&exe.to_string_lossy()), &args)
            .await?;
        Ok(self.sid.clone())
    }

    /// Kill the associated tmux session, if any is running.
    pub async fn kill_session<M: MuxAdapter>(&self, mux: &M) -> Result<(), WrapError> {
        mux.kill_session(&self.sid).await?;
        Ok(())
    }

    /// Remove any trace of the session from the system: the tmux session
    /// (best-effort) and the session files.
    pub async fn trash<M: MuxAdapter>(&self, mux: &M) -> Result<(), WrapError> {
        if let Err(e) = mux.kill_session(&self.sid).await {
            tracing::warn!(sid = %self.sid, error = %e, "error while trashing session");
        }
        self.sandbox.trash_files()?;
        Ok(())
    }

    /// Execute the worker and wait for it to exit, serving the wrapper API
    /// alongside. The single terminal operation of a wrapper.
    ///
    /// On any error the message is appended to the session's stderr file
    /// before returning, so it is retrievable after the tmux session is
    /// gone.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), WrapError> {
        let result = self.run_supervised(cancel).await;
        if let Err(err) = &result {
            self.append_error(err);
        }
        result
    }

    async fn run_supervised(&self, cancel: CancellationToken) -> Result<(), WrapError> {
        let listener = TcpListener::bind(("127.0.0.1", 0))
            .await
            .map_err(WrapError::Bind)?;
        let port = listener.local_addr().map_err(WrapError::Bind)?.port();

        self.register(port).await?;

        let outcome = self.run_worker(cancel, listener).await;
        let callback_result = self.callback(&outcome).await;

        match (outcome, callback_result) {
            (Err(run_err), _) => Err(run_err),
            (Ok(()), Err(cb_err)) => Err(cb_err),
            (Ok(()), Ok(())) => Ok(()),
        }
    }

    async fn run_worker(
        &self,
        cancel: CancellationToken,
        listener: TcpListener,
    ) -> Result<(), WrapError> {
        let stdout = self.sandbox.open_append(SessionFile::Stdout)?;
        let stderr = self.sandbox.open_append(SessionFile::Stderr)?;
        let config_path = self.sandbox.path(SessionFile::Config);
        let sock_path = self.sandbox.sock_path();

        let mut args = self.args.clone();
        if self.mode == WrapMode::Live {
            args.push("--mode=live".to_string());
        }
        args.push(format!("--config={}", config_path.display()));
        args.push(format!("--socket-path={}", sock_path.display()));

        tracing::info!(
            worker = %self.exec_name,
            config = %config_path.display(),
            socket = %sock_path.display(),
            "executing worker"
        );

        let mut child = Command::new(&self.exec_name)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| WrapError::SpawnFailed {
                name: self.exec_name.clone(),
                source,
            })?;

        let server_cancel = CancellationToken::new();
        let app = api::router(std::sync::Arc::new(api::ApiState {
            sock_path,
            stdout_path: self.sandbox.path(SessionFile::Stdout),
            stderr_path: self.sandbox.path(SessionFile::Stderr),
        }));
        let shutdown = server_cancel.clone();
        let mut server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await
        });

        // Whichever of worker and API server finishes first takes the
        // other one down with it.
        tokio::select! {
            status = child.wait() => {
                shutdown_server(&server_cancel, &mut server).await;
                let status = status.map_err(WrapError::Wait)?;

                if status.success() {
                    Ok(())
                } else {
                    Err(WrapError::RunFailed { code: status.code() })
                }
            }
            res = &mut server => {
                let message = match res {
                    Ok(Ok(())) => "wrapper API server exited unexpectedly".to_string(),
                    Ok(Err(e)) => e.to_string(),
                    Err(join_err) => join_err.to_string(),
                };
                tracing::error!(error = %message, "wrapper API server died, terminating worker");
                let _ = child.start_kill();
                let _ = child.wait().await;
                Err(WrapError::ServerFailure(message))
            }
            _ = cancel.cancelled() => {
                tracing::info!(sid = %self.sid, "cancelled, terminating worker");
                let _ = child.start_kill();
                let _ = child.wait().await;
                shutdown_server(&server_cancel, &mut server).await;
                Err(WrapError::Interrupted)
            }
        }
    }

    /// POST the chosen port to the registration URL, if one is set. Any
    /// response other than 200 fails the run before the worker starts.
    async fn register(&self, port: u16) -> Result<(), WrapError> {
        let Some(url) = &self.register_url else {
            tracing::warn!("registration URL not set");
            return Ok(());
        };
        tracing::info!(port, sid = %self.sid, "registering wrapper port");

        let resp = self
            .client
            .post(url)
            .json(&serde_json::json!({ "port": port }))
            .send()
            .await
            .map_err(|e| WrapError::RegistrationFailed(e.to_string()))?;
        if resp.status() != reqwest::StatusCode::OK {
            return Err(WrapError::RegistrationFailed(format!(
                "status code returned is: {}",
                resp.status().as_u16()
            )));
        }
        Ok(())
    }

    /// POST the final outcome to the registration URL, if one is set.
    async fn callback(&self, outcome: &Result<(), WrapError>) -> Result<(), WrapError> {
        let Some(url) = &self.register_url else {
            tracing::warn!("registration URL not set");
            return Ok(());
        };
        tracing::info!(sid = %self.sid, success = outcome.is_ok(), "posting callback");

        let payload = match outcome {
            Ok(()) => CallbackPayload {
                status: WrapStatus::Success,
                error: String::new(),
            },
            Err(e) => CallbackPayload {
                status: WrapStatus::Error,
                error: e.to_string(),
            },
        };

        let resp = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| WrapError::CallbackFailed(e.to_string()))?;
        if resp.status() != reqwest::StatusCode::OK {
            return Err(WrapError::CallbackFailed(format!(
                "status code returned is: {}",
                resp.status().as_u16()
            )));
        }
        Ok(())
    }

    /// Best-effort append of a wrapper error to the session's stderr file,
    /// where the worker writes its own errors.
    fn append_error(&self, err: &WrapError) {
        use std::io::Write;

        match self.sandbox.open_append(SessionFile::Stderr) {
            Ok(mut f) => {
                if let Err(e) = writeln!(f, "pmux wrap: {err}") {
                    tracing::warn!(error = %e, "unable to append error to stderr file");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "unable to open stderr file for error append");
            }
        }
    }
}

/// Quote an argument for shell word-splitting.
fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "@%_+=:,./-".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', "'\\''"))
    }
}

/// Shut the API server down with a short grace period, then wait for it to
/// drain bounded by a safety deadline.
async fn shutdown_server(
    cancel: &CancellationToken,
    server: &mut tokio::task::JoinHandle<io::Result<()>>,
) {
    cancel.cancel();

    if let Ok(res) = tokio::time::timeout(SERVER_SHUTDOWN_GRACE, &mut *server).await {
        log_server_result(res);
        return;
    }
    match tokio::time::timeout(SERVER_DRAIN_DEADLINE, &mut *server).await {
        Ok(res) => log_server_result(res),
        Err(_) => {
            tracing::warn!(
                "wrap run was stuck (for {}s) waiting for the server to quit",
                SERVER_DRAIN_DEADLINE.as_secs()
            );
            server.abort();
        }
    }
}

fn log_server_result(res: Result<io::Result<()>, tokio::task::JoinError>) {
    match res {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "wrapper API server exited with error"),
        Err(e) => tracing::warn!(error = %e, "wrapper API server task panicked"),
    }
}

#[cfg(test)]
#[path = "wrapper_tests.rs"]
mod tests;
