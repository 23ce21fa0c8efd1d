// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-session directory layout
//!
//! Each session owns a directory named by its SID under a well-known root.
//! The canonical file set is created empty at materialization time so that
//! consumers can open any of the files before the worker has produced
//! output. Trashing only ever removes files pmux itself owns: foreign
//! entries, and the directory containing them, are preserved.

use crate::Sid;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from session directory operations
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("unable to create session directory {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unable to open session file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unable to write session file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unable to trash session directory {path}: {source}")]
    Trash {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Canonical files present in every session directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionFile {
    /// The session identifier, one line, newline-terminated.
    Sid,
    /// Opaque JSON payload supplied at session creation.
    Config,
    /// Worker standard output, append-only.
    Stdout,
    /// Worker standard error, append-only (also wrapper errors where possible).
    Stderr,
}

impl SessionFile {
    pub const ALL: [SessionFile; 4] = [
        SessionFile::Sid,
        SessionFile::Config,
        SessionFile::Stdout,
        SessionFile::Stderr,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SessionFile::Sid => "sid",
            SessionFile::Config => "config",
            SessionFile::Stdout => "stdout",
            SessionFile::Stderr => "stderr",
        }
    }
}

impl std::fmt::Display for SessionFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default root for session directories: `<tempdir>/pmux/sessionsd`.
pub fn default_root() -> PathBuf {
    std::env::temp_dir().join("pmux").join("sessionsd")
}

/// Handle on one session's directory.
///
/// Purely path arithmetic until [`Sandbox::materialize`] is called; the
/// workdir is always computed from `root + sid`, so there is no ordering
/// constraint between choosing the SID and choosing the root.
#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
    sid: Sid,
}

impl Sandbox {
    pub fn new(root: impl Into<PathBuf>, sid: Sid) -> Self {
        Self {
            root: root.into(),
            sid,
        }
    }

    pub fn sid(&self) -> &Sid {
        &self.sid
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The session's working directory: `<root>/<sid>`.
    pub fn workdir(&self) -> PathBuf {
        self.root.join(self.sid.as_str())
    }

    /// Create the working directory (parents included) and every canonical
    /// file, empty if absent. Idempotent: existing files keep their content.
    pub fn materialize(&self) -> Result<(), SandboxError> {
        let dir = self.workdir();
        std::fs::create_dir_all(&dir).map_err(|source| SandboxError::Create {
            path: dir.clone(),
            source,
        })?;
        for file in SessionFile::ALL {
            let path = dir.join(file.as_str());
            if path.exists() {
                continue;
            }
            File::create(&path).map_err(|source| SandboxError::Create { path, source })?;
        }
        Ok(())
    }

    /// Full path of a canonical file inside the working directory.
    pub fn path(&self, file: SessionFile) -> PathBuf {
        self.workdir().join(file.as_str())
    }

    /// Whether a canonical file is present on disk.
    pub fn exists(&self, file: SessionFile) -> bool {
        self.path(file).exists()
    }

    /// Open a canonical file with the given options. The caller is
    /// responsible for closing the file.
    pub fn open(&self, file: SessionFile, opts: &OpenOptions) -> Result<File, SandboxError> {
        let path = self.path(file);
        opts.open(&path)
            .map_err(|source| SandboxError::Open { path, source })
    }

    /// Open a canonical file append|create|write-only, the way worker
    /// stdout/stderr are kept.
    pub fn open_append(&self, file: SessionFile) -> Result<File, SandboxError> {
        self.open(
            file,
            OpenOptions::new().append(true).create(true).write(true),
        )
    }

    /// Socket address path for this session's rendezvous socket.
    ///
    /// Lives outside the working directory: socket paths have a short
    /// maximum length on some platforms, and the file is owned by the
    /// worker rather than the wrapper.
    pub fn sock_path(&self) -> PathBuf {
        std::env::temp_dir().join(format!("{}.sock", self.sid))
    }

    /// Persist the session identifier into the `sid` file, one line,
    /// newline-terminated. The content always equals the directory name.
    pub fn write_sid_file(&self) -> Result<(), SandboxError> {
        let path = self.path(SessionFile::Sid);
        std::fs::write(&path, format!("{}\n", self.sid))
            .map_err(|source| SandboxError::Write { path, source })
    }

    /// Remove the canonical files, then the directory iff nothing foreign
    /// remains. The rendezvous socket file is removed by path. Trashing a
    /// missing directory is a no-op.
    pub fn trash_files(&self) -> Result<(), SandboxError> {
        let dir = self.workdir();

        match std::fs::read_dir(&dir) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let _ = std::fs::remove_file(self.sock_path());
                return Ok(());
            }
            Err(source) => return Err(SandboxError::Trash { path: dir, source }),
        }

        for file in SessionFile::ALL {
            let path = self.path(file);
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => return Err(SandboxError::Trash { path, source }),
            }
        }

        // Remove the directory only once it is verifiably empty; anything
        // foreign keeps both itself and the directory alive.
        let is_empty = std::fs::read_dir(&dir)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false);
        if is_empty {
            std::fs::remove_dir(&dir).map_err(|source| SandboxError::Trash {
                path: dir.clone(),
                source,
            })?;
        }

        let _ = std::fs::remove_file(self.sock_path());
        Ok(())
    }
}

#[cfg(test)]
#[path = "sandbox_tests.rs"]
mod tests;
