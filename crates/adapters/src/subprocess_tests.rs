// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn completes_within_deadline() {
    let mut cmd = Command::new("echo");
    cmd.arg("hello");

    let output = run_with_timeout(cmd, Duration::from_secs(5), "echo")
        .await
        .unwrap();

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "hello\n");
}

#[tokio::test]
async fn reports_timeout() {
    let mut cmd = Command::new("sleep");
    cmd.arg("2");

    let err = run_with_timeout(cmd, Duration::from_millis(50), "sleep")
        .await
        .unwrap_err();

    assert!(err.contains("timed out"), "unexpected error: {err}");
}

#[test]
fn lookup_path_finds_sh() {
    let path = lookup_path("sh").expect("sh should be on PATH");
    assert!(path.is_absolute());
    assert!(path.ends_with("sh"));
}

#[test]
fn lookup_path_misses_unknown_binary() {
    assert!(lookup_path("definitely-not-a-real-binary-xyz").is_none());
}

#[test]
fn lookup_path_accepts_absolute_paths() {
    let sh = lookup_path("sh").expect("sh should be on PATH");
    let direct = lookup_path(&sh.to_string_lossy()).expect("absolute path should resolve");
    assert_eq!(direct, sh);
}

#[tokio::test]
async fn reports_spawn_failure() {
    let cmd = Command::new("definitely-not-a-real-binary-xyz");

    let err = run_with_timeout(cmd, Duration::from_secs(1), "missing tool")
        .await
        .unwrap_err();

    assert!(err.contains("failed"), "unexpected error: {err}");
}
