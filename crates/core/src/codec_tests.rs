// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Bramble Authors

//! Tests for the flat-file codec and path mapping.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use yare::parameterized;

use super::*;

fn sample_note(content: &str) -> Note {
    let mut note = Note::new(
        "0000000000001-abcd".into(),
        "ws".into(),
        content.into(),
        1_700_000_000_000,
    );
    note.updated_at = 1_700_000_000_999;
    note
}

#[parameterized(
    plain = { "hello world", false, false },
    tagged = { "# Title\nhello #tag1 #tag2", false, false },
    deleted = { "gone but kept", true, false },
    template = { "# Weekly\n- [ ] item", false, true },
    empty_body = { "", false, false },
    body_with_delimiter_lines = { "---\nnot a header\n---\n", false, false },
)]
fn round_trip_is_exact(content: &str, deleted: bool, is_template: bool) {
    let mut note = sample_note(content);
    note.deleted = deleted;
    note.deleted_at = if deleted { Some(1_700_000_000_500) } else { None };
    note.is_template = is_template;

    let text = serialize(&note).unwrap();
    let decoded = deserialize(&text, &note.id);

    assert_eq!(decoded.content, note.content);
    assert_eq!(decoded.tags, note.tags);
    assert_eq!(decoded.title, note.title);
    assert_eq!(decoded.created_at, note.created_at);
    assert_eq!(decoded.updated_at, note.updated_at);
    assert_eq!(decoded.deleted, note.deleted);
    assert_eq!(decoded.deleted_at, note.deleted_at);
    assert_eq!(decoded.is_template, note.is_template);
}

#[test]
fn serialized_header_lists_referenced_images() {
    let note = sample_note("see ![shot](capture.png)");
    let text = serialize(&note).unwrap();
    let (yaml, _) = split_frontmatter(&text);
    assert!(yaml.unwrap().contains("capture.png"));
}

#[test]
fn deserialize_without_header_uses_defaults() {
    let note = deserialize("just text, no header", "n1");
    assert_eq!(note.id, "n1");
    assert_eq!(note.content, "just text, no header");
    assert!(note.tags.is_empty());
    assert!(note.title.is_none());
    assert!(!note.deleted);
    assert!(!note.is_template);
    assert!(note.created_at > 0);
    assert_eq!(note.sync_status, SyncStatus::Pending);
    assert!(note.remote_fingerprint.is_none());
}

#[test]
fn deserialize_tolerates_broken_yaml() {
    let text = "---\ntags: [unclosed\n---\nbody survives";
    let note = deserialize(text, "n1");
    assert_eq!(note.content, "body survives");
    assert!(note.tags.is_empty());
}

#[test]
fn deserialize_fills_updated_at_from_created_at() {
    let text = "---\ncreated_at: 42\n---\nbody";
    let note = deserialize(text, "n1");
    assert_eq!(note.created_at, 42);
    assert_eq!(note.updated_at, 42);
}

#[test]
fn header_tags_are_normalized() {
    let text = "---\ntags:\n- zebra\n- apple\n- zebra\n---\nbody";
    let note = deserialize(text, "n1");
    assert_eq!(note.tags, vec!["apple", "zebra"]);
}

#[test]
fn path_mapping_round_trips() {
    assert_eq!(remote_path("abc", PathKind::Active), "notes/abc.md");
    assert_eq!(remote_path("abc", PathKind::Trash), "trash/abc.md");
    assert_eq!(
        parse_remote_path("notes/abc.md"),
        Some(("abc".to_string(), PathKind::Active))
    );
    assert_eq!(
        parse_remote_path("trash/abc.md"),
        Some(("abc".to_string(), PathKind::Trash))
    );
}

#[test]
fn foreign_paths_are_ignored() {
    assert_eq!(parse_remote_path("README.md"), None);
    assert_eq!(parse_remote_path("images/logo.png"), None);
    assert_eq!(parse_remote_path("notes/sub/x.md"), None);
    assert_eq!(parse_remote_path("notes/.md"), None);
    assert_eq!(parse_remote_path("notes/x.txt"), None);
}

#[test]
fn path_kind_follows_tombstone_flag() {
    assert_eq!(PathKind::for_deleted(false), PathKind::Active);
    assert_eq!(PathKind::for_deleted(true), PathKind::Trash);
    assert_eq!(PathKind::Active.opposite(), PathKind::Trash);
}
