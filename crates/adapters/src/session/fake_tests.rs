// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn new_session_is_listed_until_killed() {
    let fake = FakeMuxAdapter::new();
    let sid = Sid::generate();

    assert!(!fake.has_session(&sid).await);

    fake.new_session(&sid, "sleep", &["60".to_string()])
        .await
        .unwrap();
    assert!(fake.has_session(&sid).await);

    fake.kill_session(&sid).await.unwrap();
    assert!(!fake.has_session(&sid).await);
}

#[tokio::test]
async fn kill_unknown_session_errors() {
    let fake = FakeMuxAdapter::new();
    let result = fake.kill_session(&Sid::generate()).await;
    assert!(matches!(result, Err(MuxError::ToolError(_))));
}

#[tokio::test]
async fn records_calls_in_order() {
    let fake = FakeMuxAdapter::new();
    let sid = Sid::generate();

    fake.verify().await.unwrap();
    fake.new_session(&sid, "yes", &[]).await.unwrap();
    fake.list_sessions().await;

    let calls = fake.calls();
    assert!(matches!(calls[0], MuxCall::Verify));
    assert!(matches!(calls[1], MuxCall::NewSession { .. }));
    assert!(matches!(calls[2], MuxCall::ListSessions));
}

#[tokio::test]
async fn injected_failure_propagates() {
    let fake = FakeMuxAdapter::new();
    fake.fail_new_session("boom");

    let result = fake.new_session(&Sid::generate(), "yes", &[]).await;
    assert!(matches!(result, Err(MuxError::ToolError(_))));
    assert!(fake.sessions().is_empty());
}

#[tokio::test]
async fn list_error_makes_has_session_false() {
    let fake = FakeMuxAdapter::new();
    let sid = Sid::generate();
    fake.add_session(sid.clone());
    fake.set_list_error("truncated listing");

    // Partial listing still carries the session, but has_session treats a
    // listing error as absence.
    let (sessions, err) = fake.list_sessions().await;
    assert_eq!(sessions.len(), 1);
    assert!(err.is_some());
    assert!(!fake.has_session(&sid).await);
}
