// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session identifier type
//!
//! Every session owned by pmux is named with a fixed prefix followed by a
//! random unique suffix, so the multiplexer adapter never touches sessions
//! created by anything else.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix carried by every pmux session identifier.
pub const SID_PREFIX: &str = "pmux-";

/// Errors from session identifier validation
#[derive(Debug, Error)]
pub enum SidError {
    #[error("session identifier {0:?} does not belong to pmux")]
    InvalidSid(String),
}

/// Unique identifier for a supervised session.
///
/// Used as the tmux session name, the session directory name, and the stem
/// of the rendezvous socket path. Construction always validates the prefix:
/// use [`Sid::generate`] for a fresh identifier or [`Sid::parse`] to accept
/// one from outside.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sid(String);

impl Sid {
    /// Generate a fresh identifier: `pmux-<uuid-v4>`.
    pub fn generate() -> Self {
        Self(format!("{}{}", SID_PREFIX, uuid::Uuid::new_v4()))
    }

    /// Validate and wrap an identifier supplied from outside.
    pub fn parse(s: impl Into<String>) -> Result<Self, SidError> {
        let s = s.into();
        if !s.starts_with(SID_PREFIX) {
            return Err(SidError::InvalidSid(s));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Sid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Sid {
    type Error = SidError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<Sid> for String {
    fn from(sid: Sid) -> Self {
        sid.0
    }
}

impl PartialEq<str> for Sid {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Sid {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl std::borrow::Borrow<str> for Sid {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[path = "sid_tests.rs"]
mod tests;
