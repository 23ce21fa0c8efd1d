// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::net::UnixListener;
use tokio_util::sync::CancellationToken;

struct TestApi {
    addr: SocketAddr,
    cancel: CancellationToken,
    dir: tempfile::TempDir,
}

impl TestApi {
    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestApi {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn start_api() -> TestApi {
    let dir = tempfile::tempdir().unwrap();
    let stdout_path = dir.path().join("stdout");
    let stderr_path = dir.path().join("stderr");
    std::fs::write(&stdout_path, b"stdout content\n").unwrap();
    std::fs::write(&stderr_path, b"stderr content\n").unwrap();

    let state = Arc::new(ApiState {
        sock_path: dir.path().join("io.sock"),
        stdout_path,
        stderr_path,
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let cancel = CancellationToken::new();

    let app = router(state);
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .unwrap();
    });

    TestApi { addr, cancel, dir }
}

#[tokio::test]
async fn health_check_is_online() {
    let api = start_api().await;

    let resp = reqwest::get(api.url("/health_check")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "Online!\n");
}

#[tokio::test]
async fn stdout_streams_file_content() {
    let api = start_api().await;

    let resp = reqwest::get(api.url("/stdout")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()[header::CONTENT_TYPE].to_str().unwrap(),
        "text/plain"
    );
    assert_eq!(resp.text().await.unwrap(), "stdout content\n");
}

#[tokio::test]
async fn stderr_streams_file_content() {
    let api = start_api().await;

    let resp = reqwest::get(api.url("/stderr")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "stderr content\n");
}

#[tokio::test]
async fn progress_relays_socket_as_csv() {
    let api = start_api().await;

    // Scripted worker side: expect the subscribe header, send two rows.
    let listener = UnixListener::bind(api.dir.path().join("io.sock")).unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();
        let header = lines.next_line().await.unwrap().unwrap();
        assert_eq!(header, "mode=progress");
        write_half.write_all(b"1,1,10,5,tick\n").await.unwrap();
        write_half.write_all(b"1,1,10,6,tick\n").await.unwrap();
    });

    let resp = reqwest::get(api.url("/progress")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()[header::CONTENT_TYPE].to_str().unwrap(),
        "text/csv"
    );
    assert_eq!(resp.text().await.unwrap(), "1,1,10,5,tick\n1,1,10,6,tick\n");
}

#[tokio::test]
async fn progress_without_socket_is_500() {
    let api = start_api().await;

    let resp = reqwest::get(api.url("/progress")).await.unwrap();
    assert_eq!(resp.status(), 500);
    let body = resp.text().await.unwrap();
    assert!(body.contains("progress socket"), "unexpected body: {body}");
}

#[tokio::test]
async fn command_is_relayed_with_framing() {
    let api = start_api().await;

    let (tx, rx) = tokio::sync::oneshot::channel();
    let listener = UnixListener::bind(api.dir.path().join("io.sock")).unwrap();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        stream.read_to_end(&mut received).await.unwrap();
        tx.send(received).unwrap();
    });

    let client = reqwest::Client::new();
    let resp = client
        .post(api.url("/command"))
        .body("cancel")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let received = rx.await.unwrap();
    assert_eq!(received, b"mode=command\ncancel\n");
}

#[tokio::test]
async fn command_without_socket_is_500() {
    let api = start_api().await;

    let client = reqwest::Client::new();
    let resp = client
        .post(api.url("/command"))
        .body("cancel")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
}
