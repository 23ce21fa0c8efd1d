// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-session wrapper HTTP API
//!
//! Exposes one worker over HTTP: health, chunked tails of the stdout and
//! stderr files, the progress stream, and the command channel. The log and
//! progress endpoints stream their source until it closes, the equivalent
//! of a hijacked connection with chunked delivery.

use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;
use tokio_util::io::ReaderStream;

/// Paths the per-session API serves from.
pub(crate) struct ApiState {
    pub sock_path: PathBuf,
    pub stdout_path: PathBuf,
    pub stderr_path: PathBuf,
}

pub(crate) fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health_check", get(health_check))
        .route("/stdout", get(stdout_stream))
        .route("/stderr", get(stderr_stream))
        .route("/progress", get(progress_stream))
        .route("/command", post(command))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

async fn log_requests(req: Request, next: Next) -> Response {
    tracing::info!(method = %req.method(), uri = %req.uri(), "request");
    next.run(req).await
}

/// Error response: logged, served as plain text with its status code.
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn internal(err: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(status = self.status.as_u16(), error = %self.message, "request failed");
        (self.status, self.message).into_response()
    }
}

async fn health_check() -> &'static str {
    "Online!\n"
}

async fn stdout_stream(State(state): State<Arc<ApiState>>) -> Result<Response, ApiError> {
    file_stream(&state.stdout_path).await
}

async fn stderr_stream(State(state): State<Arc<ApiState>>) -> Result<Response, ApiError> {
    file_stream(&state.stderr_path).await
}

/// Stream a log file as a chunked plain-text body until it is exhausted.
async fn file_stream(path: &std::path::Path) -> Result<Response, ApiError> {
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| ApiError::internal(format!("unable to open {}: {e}", path.display())))?;

    Response::builder()
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(ApiError::internal)
}

/// Dial the rendezvous socket as a subscriber and relay whatever comes
/// back, as CSV.
async fn progress_stream(State(state): State<Arc<ApiState>>) -> Result<Response, ApiError> {
    let mut sock = UnixStream::connect(&state.sock_path)
        .await
        .map_err(|e| ApiError::internal(format!("unable to open progress socket: {e}")))?;
    sock.write_all(b"mode=progress\n")
        .await
        .map_err(|e| ApiError::internal(format!("unable to subscribe to progress socket: {e}")))?;

    Response::builder()
        .header(header::CONTENT_TYPE, "text/csv")
        .body(Body::from_stream(ReaderStream::new(sock)))
        .map_err(ApiError::internal)
}

/// Relay one command line into the rendezvous socket. Returns as soon as
/// the local write completes.
async fn command(State(state): State<Arc<ApiState>>, body: Bytes) -> Result<StatusCode, ApiError> {
    let mut sock = UnixStream::connect(&state.sock_path)
        .await
        .map_err(|e| ApiError::internal(format!("unable to open progress socket: {e}")))?;

    let mut payload = Vec::with_capacity(body.len() + 16);
    payload.extend_from_slice(b"mode=command\n");
    payload.extend_from_slice(&body);
    payload.push(b'\n');

    sock.write_all(&payload)
        .await
        .map_err(|e| ApiError::internal(format!("unable to complete copy: {e}")))?;

    Ok(StatusCode::OK)
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod tests;
