// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Clone, Default)]
struct CollectingSink {
    payloads: Arc<Mutex<Vec<String>>>,
}

impl UpdateSink for CollectingSink {
    fn write_update(&self, payload: &str) -> usize {
        self.payloads.lock().push(payload.to_string());
        payload.len()
    }
}

#[test]
fn first_record_carries_header() {
    let sink = CollectingSink::default();
    let mut writer = ProgressWriter::new(sink.clone());

    writer.record(1, 1, 10, 3, "warming up");

    let payloads = sink.payloads.lock();
    assert_eq!(
        payloads[0],
        format!("{PROGRESS_HEADER}\n1,1,10,3,warming up\n")
    );
}

#[test]
fn header_is_emitted_once() {
    let sink = CollectingSink::default();
    let mut writer = ProgressWriter::new(sink.clone());

    writer.record(1, 1, 10, 1, "a");
    writer.record(1, 1, 10, 2, "b");

    let payloads = sink.payloads.lock();
    assert_eq!(payloads.len(), 2);
    assert_eq!(payloads[1], "1,1,10,2,b\n");
}

#[test]
fn description_with_commas_is_quoted() {
    let sink = CollectingSink::default();
    let mut writer = ProgressWriter::new(sink.clone());

    writer.record(2, 1, 100, 50, "halfway, roughly");

    let payloads = sink.payloads.lock();
    assert!(payloads[0].ends_with("2,1,100,50,\"halfway, roughly\"\n"));
}

#[test]
fn description_quotes_are_doubled() {
    let sink = CollectingSink::default();
    let mut writer = ProgressWriter::new(sink.clone());

    writer.record(1, 1, 1, 1, "say \"hi\"");

    let payloads = sink.payloads.lock();
    assert!(payloads[0].ends_with("1,1,1,1,\"say \"\"hi\"\"\"\n"));
}

#[test]
fn record_reports_delivered_bytes() {
    let sink = CollectingSink::default();
    let mut writer = ProgressWriter::new(sink);

    let n = writer.record(1, 1, 10, 1, "x");
    assert_eq!(n, PROGRESS_HEADER.len() + 1 + "1,1,10,1,x\n".len());
}
