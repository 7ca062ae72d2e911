// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Bramble Authors

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::markdown;

/// Reserved tag applied to notes forked out of a sync conflict.
pub const CONFLICT_TAG: &str = "conflict";

/// Synchronization state of a note against its remote counterpart.
///
/// Transitions: `pending`/`modified`/`error` -> `syncing` -> `synced` or
/// `error`. Every local mutation puts a note back into `pending` (never
/// synced) or `modified` (synced before), see [`Note::dirty_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Local content matches the remote fingerprint.
    Synced,
    /// Created locally, never synced.
    Pending,
    /// Edited after a successful sync.
    Modified,
    /// An upload for this note is in flight.
    Syncing,
    /// The last sync attempt failed; see the note's error message.
    Error,
}

impl SyncStatus {
    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Synced => "synced",
            SyncStatus::Pending => "pending",
            SyncStatus::Modified => "modified",
            SyncStatus::Syncing => "syncing",
            SyncStatus::Error => "error",
        }
    }

    /// Anything other than `synced` needs reconciliation.
    pub fn is_dirty(&self) -> bool {
        !matches!(self, SyncStatus::Synced)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "synced" => Ok(SyncStatus::Synced),
            "pending" => Ok(SyncStatus::Pending),
            "modified" => Ok(SyncStatus::Modified),
            "syncing" => Ok(SyncStatus::Syncing),
            "error" => Ok(SyncStatus::Error),
            _ => Err(Error::InvalidSyncStatus(s.to_string())),
        }
    }
}

/// The primary entity: one markdown note.
///
/// A note's `id` never changes across its lifecycle, including soft-delete
/// and restore. `remote_fingerprint` is the remote store's content-address
/// of the last synced version and is only trustworthy while `sync_status`
/// is `synced`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Opaque, time-sortable identifier (see [`crate::id`]).
    pub id: String,
    /// The workspace (remote repository) this note belongs to.
    pub workspace: String,
    /// Raw markdown body.
    pub content: String,
    /// Tags mirrored from in-body `#hashtag` syntax. Sorted, deduplicated.
    pub tags: Vec<String>,
    /// Derived from the first heading of the content.
    pub title: Option<String>,
    /// Creation time, epoch milliseconds.
    pub created_at: i64,
    /// Last local modification, epoch milliseconds.
    pub updated_at: i64,
    /// Tombstone flag: deleted notes live under the remote trash path.
    pub deleted: bool,
    /// When the tombstone was set. None while not deleted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<i64>,
    /// Template notes are excluded from normal listings.
    pub is_template: bool,
    /// Remote content-address of the last synced version. None = never synced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_fingerprint: Option<String>,
    /// Current reconciliation state.
    pub sync_status: SyncStatus,
    /// Present only while `sync_status` is `error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Note {
    /// Construct a fresh, never-synced note and derive its title and tags.
    pub fn new(id: String, workspace: String, content: String, now_ms: i64) -> Self {
        let mut note = Note {
            id,
            workspace,
            content,
            tags: Vec::new(),
            title: None,
            created_at: now_ms,
            updated_at: now_ms,
            deleted: false,
            deleted_at: None,
            is_template: false,
            remote_fingerprint: None,
            sync_status: SyncStatus::Pending,
            error_message: None,
        };
        note.refresh_derived();
        note
    }

    /// Re-derive title and tags from the current content.
    pub fn refresh_derived(&mut self) {
        self.title = markdown::derive_title(&self.content);
        self.tags = markdown::extract_tags(&self.content);
    }

    /// The status a local mutation leaves this note in: `pending` while it
    /// has never synced, `modified` once a remote counterpart exists.
    pub fn dirty_status(&self) -> SyncStatus {
        if self.remote_fingerprint.is_none() {
            SyncStatus::Pending
        } else {
            SyncStatus::Modified
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.sync_status.is_dirty()
    }
}

#[cfg(test)]
#[path = "note_tests.rs"]
mod tests;
