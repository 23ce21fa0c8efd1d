// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashSet;

#[test]
fn generate_carries_prefix() {
    let sid = Sid::generate();
    assert!(sid.as_str().starts_with(SID_PREFIX));
}

#[test]
fn generate_has_uuid_shape() {
    let sid = Sid::generate();
    // pmux- (5) + uuid v4 (36)
    assert_eq!(sid.as_str().len(), SID_PREFIX.len() + 36);
    let suffix = &sid.as_str()[SID_PREFIX.len()..];
    assert!(suffix
        .chars()
        .all(|c| c.is_ascii_hexdigit() || c == '-'));
    assert_eq!(suffix.matches('-').count(), 4);
}

#[test]
fn generate_is_unique() {
    let sids: HashSet<String> = (0..1000).map(|_| Sid::generate().0).collect();
    assert_eq!(sids.len(), 1000);
}

#[test]
fn parse_accepts_generated() {
    let sid = Sid::generate();
    let parsed = Sid::parse(sid.as_str()).unwrap();
    assert_eq!(parsed, sid);
}

#[test]
fn parse_rejects_foreign_identifiers() {
    for s in ["", "foo", "tmux-abc", "PMUX-abc", " pmux-abc"] {
        assert!(
            matches!(Sid::parse(s), Err(SidError::InvalidSid(_))),
            "expected rejection of {s:?}"
        );
    }
}

#[test]
fn serde_round_trip_validates() {
    let sid = Sid::generate();
    let json = serde_json::to_string(&sid).unwrap();
    let back: Sid = serde_json::from_str(&json).unwrap();
    assert_eq!(back, sid);

    let err = serde_json::from_str::<Sid>("\"not-a-sid\"");
    assert!(err.is_err());
}

#[test]
fn display_matches_as_str() {
    let sid = Sid::generate();
    assert_eq!(sid.to_string(), sid.as_str());
}
