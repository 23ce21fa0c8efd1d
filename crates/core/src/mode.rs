// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wrap mode policy flag

use serde::{Deserialize, Serialize};

/// Policy flag deciding how a worker finishes.
///
/// `Normal` workers execute their task and exit on their own; `Live`
/// workers keep running until another process commands them to stop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WrapMode {
    #[default]
    Normal,
    Live,
}

impl WrapMode {
    pub fn as_str(self) -> &'static str {
        match self {
            WrapMode::Normal => "normal",
            WrapMode::Live => "live",
        }
    }
}

impl std::fmt::Display for WrapMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WrapMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(WrapMode::Normal),
            "live" => Ok(WrapMode::Live),
            other => Err(format!("unknown wrap mode {other:?}")),
        }
    }
}

#[cfg(test)]
#[path = "mode_tests.rs"]
mod tests;
