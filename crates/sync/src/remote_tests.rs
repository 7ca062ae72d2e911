// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Bramble Authors

//! Tests for the mock remote's contents-API semantics. The engine tests
//! lean on these behaviors, so they are pinned down here first.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use crate::remote::{RemoteError, RemoteStore};
use crate::test_helpers::{blob_fingerprint, MockRemote};

#[tokio::test]
async fn blind_create_then_update() {
    let remote = MockRemote::new();
    remote.create_workspace("ws");

    let fp1 = remote.put_file("ws", "notes/a.md", "one", None).await.unwrap();
    assert_eq!(fp1, blob_fingerprint("one"));

    // blind create over an existing file is a conflict
    let err = remote.put_file("ws", "notes/a.md", "two", None).await.unwrap_err();
    assert_eq!(err, RemoteError::Conflict);

    // update with the right fingerprint succeeds
    let fp2 = remote
        .put_file("ws", "notes/a.md", "two", Some(fp1.as_str()))
        .await
        .unwrap();
    assert_eq!(remote.contents("ws", "notes/a.md").unwrap(), "two");
    assert_ne!(fp1, fp2);
}

#[tokio::test]
async fn update_with_stale_fingerprint_conflicts() {
    let remote = MockRemote::new();
    remote.create_workspace("ws");
    remote.write_raw("ws", "notes/a.md", "current");

    let err = remote
        .put_file("ws", "notes/a.md", "new", Some("stale"))
        .await
        .unwrap_err();
    assert_eq!(err, RemoteError::Conflict);
}

#[tokio::test]
async fn update_of_missing_path_is_not_found() {
    let remote = MockRemote::new();
    remote.create_workspace("ws");

    let err = remote
        .put_file("ws", "notes/a.md", "new", Some("whatever"))
        .await
        .unwrap_err();
    assert_eq!(err, RemoteError::NotFound);
}

#[tokio::test]
async fn delete_semantics() {
    let remote = MockRemote::new();
    remote.create_workspace("ws");
    let fp = remote.write_raw("ws", "notes/a.md", "body");

    let err = remote.delete_file("ws", "notes/a.md", "stale").await.unwrap_err();
    assert_eq!(err, RemoteError::Conflict);

    remote.delete_file("ws", "notes/a.md", &fp).await.unwrap();
    let err = remote.delete_file("ws", "notes/a.md", &fp).await.unwrap_err();
    assert_eq!(err, RemoteError::NotFound);
}

#[tokio::test]
async fn listing_missing_workspace_is_not_found() {
    let remote = MockRemote::new();
    let err = remote.list_entries("nope").await.unwrap_err();
    assert_eq!(err, RemoteError::NotFound);
    assert_eq!(remote.root_fingerprint("nope").await.unwrap(), None);
}

#[tokio::test]
async fn root_fingerprint_tracks_writes() {
    let remote = MockRemote::new();
    remote.create_workspace("ws");
    let empty = remote.root_fingerprint("ws").await.unwrap().unwrap();

    remote.write_raw("ws", "notes/a.md", "body");
    let after = remote.root_fingerprint("ws").await.unwrap().unwrap();
    assert_ne!(empty, after);

    let listing = remote.list_entries("ws").await.unwrap();
    assert_eq!(listing.root_fingerprint, after);
    assert_eq!(listing.files.len(), 1);
    assert_eq!(listing.files[0].path, "notes/a.md");
}

#[tokio::test]
async fn fetch_blobs_returns_only_known_fingerprints() {
    let remote = MockRemote::new();
    remote.create_workspace("ws");
    let fp = remote.write_raw("ws", "notes/a.md", "body");

    let wanted = vec![fp.clone(), "unknown".to_string()];
    let blobs = remote.fetch_blobs("ws", &wanted).await.unwrap();
    assert_eq!(blobs.len(), 1);
    assert_eq!(blobs.get(&fp).map(String::as_str), Some("body"));
}

#[tokio::test]
async fn unauthorized_applies_to_every_call() {
    let remote = MockRemote::new();
    remote.create_workspace("ws");
    remote.set_unauthorized(true);

    assert_eq!(
        remote.root_fingerprint("ws").await.unwrap_err(),
        RemoteError::Unauthorized
    );
    assert_eq!(
        remote.list_entries("ws").await.unwrap_err(),
        RemoteError::Unauthorized
    );
    assert_eq!(
        remote.put_file("ws", "notes/a.md", "x", None).await.unwrap_err(),
        RemoteError::Unauthorized
    );
}
