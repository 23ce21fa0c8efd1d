// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::io::Write;
use std::path::Path;

fn sandbox_in(root: &Path) -> Sandbox {
    Sandbox::new(root, Sid::generate())
}

#[test]
fn materialize_creates_empty_canonical_files() {
    let root = tempfile::tempdir().unwrap();
    let sandbox = sandbox_in(root.path());

    sandbox.materialize().unwrap();

    for file in SessionFile::ALL {
        let path = sandbox.path(file);
        let meta = std::fs::metadata(&path).unwrap();
        assert!(meta.is_file(), "{file} missing");
        assert_eq!(meta.len(), 0, "{file} not empty");
    }
}

#[test]
fn materialize_is_idempotent_and_keeps_content() {
    let root = tempfile::tempdir().unwrap();
    let sandbox = sandbox_in(root.path());

    sandbox.materialize().unwrap();
    std::fs::write(sandbox.path(SessionFile::Config), b"{\"foo\":1}").unwrap();

    sandbox.materialize().unwrap();
    let content = std::fs::read_to_string(sandbox.path(SessionFile::Config)).unwrap();
    assert_eq!(content, "{\"foo\":1}");
}

#[test]
fn workdir_is_named_by_sid() {
    let root = tempfile::tempdir().unwrap();
    let sandbox = sandbox_in(root.path());

    assert_eq!(
        sandbox.workdir(),
        root.path().join(sandbox.sid().as_str())
    );
}

#[test]
fn sid_file_content_equals_directory_name() {
    let root = tempfile::tempdir().unwrap();
    let sandbox = sandbox_in(root.path());

    sandbox.materialize().unwrap();
    sandbox.write_sid_file().unwrap();

    let content = std::fs::read_to_string(sandbox.path(SessionFile::Sid)).unwrap();
    assert_eq!(content, format!("{}\n", sandbox.sid()));
}

#[test]
fn sock_path_is_outside_workdir() {
    let root = tempfile::tempdir().unwrap();
    let sandbox = sandbox_in(root.path());

    assert!(!sandbox.sock_path().starts_with(sandbox.workdir()));
    assert!(sandbox
        .sock_path()
        .to_string_lossy()
        .ends_with(&format!("{}.sock", sandbox.sid())));
}

#[test]
fn open_append_appends() {
    let root = tempfile::tempdir().unwrap();
    let sandbox = sandbox_in(root.path());
    sandbox.materialize().unwrap();

    {
        let mut f = sandbox.open_append(SessionFile::Stdout).unwrap();
        f.write_all(b"first\n").unwrap();
    }
    {
        let mut f = sandbox.open_append(SessionFile::Stdout).unwrap();
        f.write_all(b"second\n").unwrap();
    }

    let content = std::fs::read_to_string(sandbox.path(SessionFile::Stdout)).unwrap();
    assert_eq!(content, "first\nsecond\n");
}

#[test]
fn trash_removes_clean_directory() {
    let root = tempfile::tempdir().unwrap();
    let sandbox = sandbox_in(root.path());
    sandbox.materialize().unwrap();

    sandbox.trash_files().unwrap();

    assert!(!sandbox.workdir().exists());
}

#[test]
fn trash_preserves_foreign_files() {
    let root = tempfile::tempdir().unwrap();
    let sandbox = sandbox_in(root.path());
    sandbox.materialize().unwrap();

    let extra = sandbox.workdir().join("extra-file");
    std::fs::write(&extra, b"keep me").unwrap();

    sandbox.trash_files().unwrap();

    // Directory and the foreign file survive; canonical files are gone.
    assert!(sandbox.workdir().exists());
    assert!(extra.exists());
    for file in SessionFile::ALL {
        assert!(!sandbox.exists(file), "{file} should be removed");
    }
}

#[test]
fn trash_removes_directory_after_partial_materialization() {
    let root = tempfile::tempdir().unwrap();
    let sandbox = sandbox_in(root.path());
    sandbox.materialize().unwrap();

    // A missing canonical file must not stop the directory removal.
    std::fs::remove_file(sandbox.path(SessionFile::Stdout)).unwrap();

    sandbox.trash_files().unwrap();
    assert!(!sandbox.workdir().exists());
}

#[test]
fn trash_missing_directory_is_noop() {
    let root = tempfile::tempdir().unwrap();
    let sandbox = sandbox_in(root.path());

    sandbox.trash_files().unwrap();
}

#[test]
fn trash_removes_socket_file() {
    let root = tempfile::tempdir().unwrap();
    let sandbox = sandbox_in(root.path());
    sandbox.materialize().unwrap();

    std::fs::write(sandbox.sock_path(), b"").unwrap();
    sandbox.trash_files().unwrap();

    assert!(!sandbox.sock_path().exists());
}

#[test]
fn default_root_is_under_tempdir() {
    let root = default_root();
    assert!(root.starts_with(std::env::temp_dir()));
    assert!(root.ends_with("pmux/sessionsd"));
}
