// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session handlers

use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use pmux_adapters::MuxAdapter;
use pmux_core::{Sandbox, SessionFile, Sid};
use pmux_wrap::{Wrapper, WrapperConfig};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

type HandlerError = (StatusCode, String);

fn error_response(status: StatusCode, err: impl std::fmt::Display) -> HandlerError {
    tracing::error!(status = status.as_u16(), error = %err, "request failed");
    (status, err.to_string())
}

pub(crate) async fn health_check() -> &'static str {
    "Online!\n"
}

/// GET /api/v1/sessions - identifiers of the running pmux sessions.
///
/// A partial listing is still served; the non-fatal error is only logged.
pub(crate) async fn list_sessions<M: MuxAdapter>(
    State(state): State<Arc<AppState<M>>>,
) -> Result<Json<Vec<Sid>>, HandlerError> {
    let (sessions, err) = state.mux.list_sessions().await;
    if let Some(err) = err {
        if sessions.is_empty() {
            return Err(error_response(StatusCode::INTERNAL_SERVER_ERROR, err));
        }
        tracing::warn!(error = %err, "serving partial session listing");
    }
    Ok(Json(sessions))
}

/// Request body for POST /api/v1/sessions.
#[derive(Deserialize)]
pub(crate) struct CreateSessionRequest {
    #[serde(default)]
    register_url: String,
    #[serde(default)]
    config: Value,
}

/// POST /api/v1/sessions - materialize a session, persist its config, and
/// launch the wrapper inside a detached tmux session.
///
/// Any failure trashes the partially created session before reporting.
pub(crate) async fn create_session<M: MuxAdapter>(
    State(state): State<Arc<AppState<M>>>,
    Json(body): Json<CreateSessionRequest>,
) -> Result<Json<Value>, HandlerError> {
    let mut config = WrapperConfig::new(&state.config.exec_name);
    config.root_dir = state.config.root_dir.clone();
    config.args = state.config.args.clone();
    config.register_url = Some(body.register_url).filter(|u| !u.is_empty());
    config.mode = state.config.mode;

    let wrapper = Wrapper::new(config)
        .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e))?;

    if let Err(e) = write_config(&wrapper, &body.config) {
        let _ = wrapper.trash(&state.mux).await;
        return Err(error_response(StatusCode::INTERNAL_SERVER_ERROR, e));
    }

    tracing::info!(
        exec = %state.config.exec_name,
        workdir = %wrapper.workdir().display(),
        "starting session"
    );
    match wrapper.start_session(&state.mux).await {
        Ok(sid) => Ok(Json(json!({ "sid": sid }))),
        Err(e) => {
            let _ = wrapper.trash(&state.mux).await;
            Err(error_response(StatusCode::INTERNAL_SERVER_ERROR, e))
        }
    }
}

fn write_config(wrapper: &Wrapper, config: &Value) -> Result<(), String> {
    let file = wrapper
        .sandbox()
        .open(
            SessionFile::Config,
            std::fs::OpenOptions::new().write(true).truncate(true),
        )
        .map_err(|e| format!("unable to store configuration: {e}"))?;
    serde_json::to_writer(file, config)
        .map_err(|e| format!("unable to store configuration: {e}"))
}

/// DELETE /api/v1/sessions/{sid} - kill the session and, unless the server
/// runs in dirty mode, trash its files.
pub(crate) async fn delete_session<M: MuxAdapter>(
    State(state): State<Arc<AppState<M>>>,
    Path(sid): Path<String>,
) -> Result<Json<Value>, HandlerError> {
    let sid = Sid::parse(sid).map_err(|e| error_response(StatusCode::BAD_REQUEST, e))?;

    let sandbox = Sandbox::new(state.config.root_dir.clone(), sid.clone());
    let running = state.mux.has_session(&sid).await;
    if !running && !sandbox.workdir().exists() {
        return Err(error_response(
            StatusCode::NOT_FOUND,
            format!("session not found: {sid}"),
        ));
    }

    if running {
        state
            .mux
            .kill_session(&sid)
            .await
            .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e))?;
    }

    if !state.config.keep_files {
        sandbox
            .trash_files()
            .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e))?;
    }

    Ok(Json(json!({ "sid": sid })))
}

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;
