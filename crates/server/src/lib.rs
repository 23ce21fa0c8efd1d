// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Control-plane HTTP server
//!
//! Top-level API for session management: list running sessions, create a
//! session (persisting the supplied config and launching the wrapper in a
//! detached tmux session so it outlives the request), and delete one.

mod handlers;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{delete, get};
use axum::Router;
use pmux_adapters::MuxAdapter;
use pmux_core::{default_root, WrapMode};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Drain deadline for in-flight requests at shutdown.
const SHUTDOWN_DRAIN_DEADLINE: Duration = Duration::from_secs(15);

/// Errors from running the control plane
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("unable to bind control-plane listener: {0}")]
    Bind(#[source] io::Error),
    #[error("control-plane server failed: {0}")]
    Serve(#[source] io::Error),
}

/// Control-plane configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Executable spawned inside every created session.
    pub exec_name: String,
    /// Extra arguments passed to the executable.
    pub args: Vec<String>,
    /// Dirty mode: deleted sessions keep their files on disk.
    pub keep_files: bool,
    pub mode: WrapMode,
    pub root_dir: PathBuf,
}

impl ServerConfig {
    pub fn new(exec_name: impl Into<String>) -> Self {
        Self {
            port: 4002,
            exec_name: exec_name.into(),
            args: Vec::new(),
            keep_files: false,
            mode: WrapMode::default(),
            root_dir: default_root(),
        }
    }
}

/// Shared state behind every control-plane handler.
pub struct AppState<M> {
    pub mux: M,
    pub config: ServerConfig,
}

pub fn router<M: MuxAdapter>(state: Arc<AppState<M>>) -> Router {
    Router::new()
        .route("/health_check", get(handlers::health_check))
        .route(
            "/api/v1/sessions",
            get(handlers::list_sessions::<M>).post(handlers::create_session::<M>),
        )
        .route(
            "/api/v1/sessions/{sid}",
            delete(handlers::delete_session::<M>),
        )
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

async fn log_requests(req: Request, next: Next) -> Response {
    tracing::info!(method = %req.method(), uri = %req.uri(), "request");
    next.run(req).await
}

/// Serve the control plane until cancelled, then drain in-flight requests
/// bounded by [`SHUTDOWN_DRAIN_DEADLINE`].
pub async fn serve<M: MuxAdapter>(
    config: ServerConfig,
    mux: M,
    cancel: CancellationToken,
) -> Result<(), ServeError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await.map_err(ServeError::Bind)?;
    tracing::info!(port = config.port, exec = %config.exec_name, "server listening");

    let app = router(Arc::new(AppState { mux, config }));
    let shutdown = cancel.clone();
    let mut task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
    });

    tokio::select! {
        res = &mut task => {
            return match res {
                Ok(res) => res.map_err(ServeError::Serve),
                Err(join_err) => Err(ServeError::Serve(io::Error::other(join_err))),
            };
        }
        _ = cancel.cancelled() => {}
    }

    tracing::info!("shutting down");
    match tokio::time::timeout(SHUTDOWN_DRAIN_DEADLINE, task).await {
        Ok(Ok(res)) => res.map_err(ServeError::Serve),
        Ok(Err(join_err)) => Err(ServeError::Serve(io::Error::other(join_err))),
        Err(_elapsed) => {
            tracing::warn!(
                "in-flight requests did not drain within {}s",
                SHUTDOWN_DRAIN_DEADLINE.as_secs()
            );
            Ok(())
        }
    }
}
