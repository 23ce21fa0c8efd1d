// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Progress rendezvous socket
//!
//! A per-session Unix domain socket listener that extends the communication
//! channels available to wrapped workers. A worker that can report progress
//! hosts a [`CommBridge`] on its socket path and writes updates into it; the
//! wrapper exposes the socket over HTTP, dialing it once per subscriber.
//!
//! A connecting client announces itself with a single header line:
//! `mode=progress\n` turns the connection into a subscriber that receives
//! every update from then on (seeded with the most recent one), while
//! `mode=command\n` delivers exactly one command line to the configured
//! handler.

mod progress;

pub use progress::{ProgressWriter, UpdateSink, PROGRESS_HEADER};

use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{unix::OwnedWriteHalf, UnixListener, UnixStream};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Errors from bridge operations
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("unable to listen on {path}: {source}")]
    Bind {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no command handler has been configured")]
    NoCommandHandler,
    #[error("unable to read command: {0}")]
    CommandRead(#[source] io::Error),
    #[error("command rejected: {0}")]
    Command(String),
}

/// Handler invoked for every command received through the socket.
pub type CommandHandler = dyn Fn(&str) -> Result<(), BridgeError> + Send + Sync;

struct LastSlot {
    payload: Option<String>,
    // Subscriber keys are allocated under this lock so they are unique.
    next_key: u64,
}

/// Fan-out state shared between the producer handle and the accept loop.
struct MuxState {
    last: Mutex<LastSlot>,
    clients: Mutex<HashMap<u64, watch::Sender<Option<String>>>>,
}

impl MuxState {
    fn new() -> Self {
        Self {
            last: Mutex::new(LastSlot {
                payload: None,
                next_key: 0,
            }),
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Store `payload` as the latest update and forward it to every
    /// subscriber slot. Returns the total number of bytes handed over.
    ///
    /// Both locks are held for the duration (`last` first) so that a
    /// concurrent subscriber is seeded with either this payload or a later
    /// one, never an earlier one. Slots overwrite: a slow subscriber drops
    /// intermediate payloads instead of stalling the producer.
    fn publish(&self, payload: &str) -> usize {
        let mut last = self.last.lock();
        last.payload = Some(payload.to_string());

        let clients = self.clients.lock();
        for tx in clients.values() {
            tx.send_replace(Some(payload.to_string()));
        }
        payload.len() * clients.len()
    }

    fn subscribe(&self) -> (u64, watch::Receiver<Option<String>>) {
        let mut last = self.last.lock();
        let key = last.next_key;
        last.next_key += 1;
        let (tx, rx) = watch::channel(last.payload.clone());

        self.clients.lock().insert(key, tx);
        (key, rx)
    }

    fn unsubscribe(&self, key: u64) {
        self.clients.lock().remove(&key);
    }

    fn subscriber_count(&self) -> usize {
        self.clients.lock().len()
    }
}

/// Producer-side handle on a bridge, usable while the accept loop runs.
#[derive(Clone)]
pub struct BridgeHandle {
    state: Arc<MuxState>,
}

impl BridgeHandle {
    /// Publish one update to every connected subscriber.
    ///
    /// Returns `payload.len()` times the number of subscribers; zero
    /// subscribers is legal and makes this a cheap store of the latest
    /// value.
    pub fn write(&self, payload: &str) -> usize {
        self.state.publish(payload)
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.subscriber_count()
    }
}

impl UpdateSink for BridgeHandle {
    fn write_update(&self, payload: &str) -> usize {
        self.write(payload)
    }
}

/// Unix socket listener multiplexing one producer to many subscribers,
/// with a command channel in the reverse direction.
pub struct CommBridge {
    path: PathBuf,
    listener: UnixListener,
    state: Arc<MuxState>,
    on_command: Option<Arc<CommandHandler>>,
}

impl CommBridge {
    /// Start a listener on `path`, replacing a stale socket file if one is
    /// left over from a previous run.
    pub fn bind(path: impl Into<PathBuf>) -> Result<Self, BridgeError> {
        let path = path.into();

        if path.exists() {
            let is_socket = std::fs::symlink_metadata(&path)
                .map(|m| {
                    use std::os::unix::fs::FileTypeExt;
                    m.file_type().is_socket()
                })
                .unwrap_or(false);
            if !is_socket {
                return Err(BridgeError::Bind {
                    path,
                    source: io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        "path exists but is not a socket",
                    ),
                });
            }
            std::fs::remove_file(&path).map_err(|source| BridgeError::Bind {
                path: path.clone(),
                source,
            })?;
        }

        let listener = UnixListener::bind(&path).map_err(|source| BridgeError::Bind {
            path: path.clone(),
            source,
        })?;

        Ok(Self {
            path,
            listener,
            state: Arc::new(MuxState::new()),
            on_command: None,
        })
    }

    /// Set the handler called for every `mode=command` connection. Must be
    /// configured before commands arrive; connections announcing a command
    /// without a handler in place are rejected.
    pub fn on_command<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str) -> Result<(), BridgeError> + Send + Sync + 'static,
    {
        self.on_command = Some(Arc::new(handler));
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Producer-side handle, valid for the lifetime of the bridge state.
    pub fn handle(&self) -> BridgeHandle {
        BridgeHandle {
            state: Arc::clone(&self.state),
        }
    }

    /// Accept connections until cancelled, then remove the socket file.
    /// Open subscriber connections are cancelled along with the loop.
    pub async fn serve(self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, _addr)) => {
                            let state = Arc::clone(&self.state);
                            let on_command = self.on_command.clone();
                            let cancel = cancel.clone();
                            tokio::spawn(async move {
                                handle_conn(state, on_command, stream, cancel).await;
                            });
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "unable to accept more connections");
                            break;
                        }
                    }
                }
                _ = cancel.cancelled() => break,
            }
        }

        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "unable to remove socket file");
            }
        }
    }
}

async fn handle_conn(
    state: Arc<MuxState>,
    on_command: Option<Arc<CommandHandler>>,
    stream: UnixStream,
    cancel: CancellationToken,
) {
    let (read_half, write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let mut header = String::new();
    match reader.read_line(&mut header).await {
        Ok(0) => return,
        Ok(_) => {}
        Err(e) => {
            tracing::error!(error = %e, "unable to read connection header");
            return;
        }
    }

    if header.contains("mode=command") {
        if let Err(e) = read_command(on_command, &mut reader).await {
            tracing::error!(error = %e, "unable to read command");
        }
    } else if header.contains("mode=progress") {
        write_updates(&state, write_half, cancel).await;
    } else {
        tracing::error!(header = header.trim(), "unrecognised connection header");
    }
}

/// Read exactly one command line and hand it to the configured handler.
async fn read_command(
    on_command: Option<Arc<CommandHandler>>,
    reader: &mut BufReader<tokio::net::unix::OwnedReadHalf>,
) -> Result<(), BridgeError> {
    let handler = on_command.ok_or(BridgeError::NoCommandHandler)?;

    let mut line = String::new();
    reader
        .read_line(&mut line)
        .await
        .map_err(BridgeError::CommandRead)?;
    let command = line.trim_end_matches('\n');

    tracing::info!(command, "command read");
    handler(command)
}

/// Stream updates to one subscriber until it disconnects or the bridge is
/// cancelled. Disconnection is only observable on the next write.
async fn write_updates(state: &MuxState, mut w: OwnedWriteHalf, cancel: CancellationToken) {
    let (key, mut rx) = state.subscribe();

    loop {
        // First iteration replays the seeded latest value, if any.
        let payload = rx.borrow_and_update().clone();
        if let Some(payload) = payload {
            if let Err(e) = w.write_all(payload.as_bytes()).await {
                tracing::debug!(error = %e, "subscriber connection closed");
                break;
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    state.unsubscribe(key);
}

#[cfg(test)]
#[path = "bridge_tests.rs"]
mod tests;
