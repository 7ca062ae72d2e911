// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Bramble Authors

//! Flat-file codec for the remote note representation.
//!
//! A note file is a YAML metadata header between `---` delimiters followed
//! by the raw markdown body. Deserialization is tolerant: a missing or
//! unparseable header falls back to defaults so a hand-edited remote file
//! never poisons the store.
//!
//! The active/trash path mapping lives here and nowhere else; both the fast
//! and the slow syncer resolve remote paths through this module.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::markdown;
use crate::note::{Note, SyncStatus};

/// Remote folder for live notes.
pub const NOTES_DIR: &str = "notes";
/// Remote folder for soft-deleted notes.
pub const TRASH_DIR: &str = "trash";
/// Extension of every note file.
pub const NOTE_EXT: &str = ".md";

const DELIMITER: &str = "---";

/// Which remote folder a note file lives under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathKind {
    Active,
    Trash,
}

impl PathKind {
    /// The folder a note belongs under, given its tombstone flag.
    pub fn for_deleted(deleted: bool) -> Self {
        if deleted {
            PathKind::Trash
        } else {
            PathKind::Active
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            PathKind::Active => PathKind::Trash,
            PathKind::Trash => PathKind::Active,
        }
    }

    pub fn dir(self) -> &'static str {
        match self {
            PathKind::Active => NOTES_DIR,
            PathKind::Trash => TRASH_DIR,
        }
    }
}

/// Remote file path for a note id under the given folder.
pub fn remote_path(id: &str, kind: PathKind) -> String {
    format!("{}/{}{}", kind.dir(), id, NOTE_EXT)
}

/// Parse a remote file path back into a note id and folder.
///
/// Returns None for paths the engine does not own (e.g. a README the user
/// added to the repository).
pub fn parse_remote_path(path: &str) -> Option<(String, PathKind)> {
    let (dir, rest) = path.split_once('/')?;
    let kind = match dir {
        NOTES_DIR => PathKind::Active,
        TRASH_DIR => PathKind::Trash,
        _ => return None,
    };
    let id = rest.strip_suffix(NOTE_EXT)?;
    if id.is_empty() || id.contains('/') {
        return None;
    }
    Some((id.to_string(), kind))
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// The persisted metadata header. Optional fields are omitted when empty so
/// the files stay readable when browsed directly on the remote.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Header {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<i64>,
    #[serde(default, skip_serializing_if = "is_false")]
    deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    deleted_at: Option<i64>,
    #[serde(default, skip_serializing_if = "is_false")]
    is_template: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>,
}

/// Serialize a note into its remote file representation.
pub fn serialize(note: &Note) -> Result<String> {
    let header = Header {
        tags: note.tags.clone(),
        title: note.title.clone(),
        created_at: Some(note.created_at),
        updated_at: Some(note.updated_at),
        deleted: note.deleted,
        deleted_at: note.deleted_at,
        is_template: note.is_template,
        images: markdown::referenced_images(&note.content),
    };
    let yaml = serde_yaml::to_string(&header)?;
    Ok(format!("{}\n{}{}\n{}", DELIMITER, yaml, DELIMITER, note.content))
}

/// Split a note file into its header YAML and body.
///
/// Returns (None, whole input) when no valid header block is present.
pub fn split_frontmatter(raw: &str) -> (Option<&str>, &str) {
    let rest = match raw.strip_prefix("---\n").or_else(|| raw.strip_prefix("---\r\n")) {
        Some(rest) => rest,
        None => return (None, raw),
    };
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        let trimmed = line.trim_end_matches('\n').trim_end_matches('\r');
        if trimmed == DELIMITER {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return (Some(yaml), body);
        }
        offset += line.len();
    }
    (None, raw)
}

/// Decode a note file. Total: unknown or broken headers degrade to defaults.
///
/// Sync bookkeeping fields come back as defaults (`pending`, no fingerprint);
/// the caller owns them. The workspace field is likewise the caller's to set,
/// since remotely it is implied by which repository the file lives in.
pub fn deserialize(text: &str, id: &str) -> Note {
    let (yaml, body) = split_frontmatter(text);
    let header: Header = yaml
        .and_then(|y| serde_yaml::from_str(y).ok())
        .unwrap_or_default();
    let now = Utc::now().timestamp_millis();
    let mut tags = header.tags;
    tags.sort();
    tags.dedup();
    Note {
        id: id.to_string(),
        workspace: String::new(),
        content: body.to_string(),
        tags,
        title: header.title,
        created_at: header.created_at.unwrap_or(now),
        updated_at: header.updated_at.or(header.created_at).unwrap_or(now),
        deleted: header.deleted,
        deleted_at: header.deleted_at,
        is_template: header.is_template,
        remote_fingerprint: None,
        sync_status: SyncStatus::Pending,
        error_message: None,
    }
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
