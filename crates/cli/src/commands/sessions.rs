// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `pmux list-sessions`

use anyhow::Result;
use pmux_adapters::{MuxAdapter, TmuxAdapter};

pub async fn handle() -> Result<()> {
    let mux = TmuxAdapter::new();
    mux.verify().await?;

    let (sessions, err) = mux.list_sessions().await;
    for sid in &sessions {
        println!("{sid}");
    }
    if let Some(err) = err {
        tracing::warn!(error = %err, "session listing is partial");
    }
    Ok(())
}
