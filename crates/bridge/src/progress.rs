// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CSV progress encoding

use std::borrow::Cow;

/// Header row emitted before the first progress record.
pub const PROGRESS_HEADER: &str = "STAGES,STAGE,TOTAL,PARTIAL,DESCRIPTION";

/// Destination for progress updates.
pub trait UpdateSink {
    /// Deliver one update, returning the number of bytes handed over.
    fn write_update(&self, payload: &str) -> usize;
}

/// Encodes progress records as CSV rows into an [`UpdateSink`].
///
/// The first record is preceded by [`PROGRESS_HEADER`]; every record carries
/// four integer columns and a free-text description.
pub struct ProgressWriter<S> {
    sink: S,
    wrote_header: bool,
}

impl<S: UpdateSink> ProgressWriter<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            wrote_header: false,
        }
    }

    /// Emit one progress record, returning the bytes delivered.
    pub fn record(
        &mut self,
        stages: u64,
        stage: u64,
        total: u64,
        partial: u64,
        description: &str,
    ) -> usize {
        let mut row = String::new();
        if !self.wrote_header {
            row.push_str(PROGRESS_HEADER);
            row.push('\n');
            self.wrote_header = true;
        }
        row.push_str(&format!(
            "{},{},{},{},{}\n",
            stages,
            stage,
            total,
            partial,
            escape_field(description)
        ));
        self.sink.write_update(&row)
    }
}

/// Quote a description when it would break the record framing.
fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
