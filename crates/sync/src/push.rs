// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Bramble Authors

//! Fast path: push a single note right after a local mutation.
//!
//! The fast path resolves create-vs-update ambiguity and the active/trash
//! switch for soft-deletes and restores, but never resolves true conflicts;
//! those are recorded with a "run a full sync" hint and left to the
//! reconciler.

use std::sync::Arc;

use tokio::sync::Mutex;

use bramble_core::codec::{self, PathKind};
use bramble_core::note::{Note, SyncStatus};

use crate::engine::SyncEngine;
use crate::error::{Error, Result};
use crate::remote::{RemoteError, RemoteStore};

/// Row message recorded when the fast path hits a structural conflict.
pub(crate) const CONFLICT_HINT: &str = "conflict detected: run a full sync to resolve";

impl<R: RemoteStore> SyncEngine<R> {
    /// Push one note's current local state to the remote store.
    ///
    /// No-op for missing notes (already removed by a concurrent permanent
    /// deletion) and for notes already `synced` (idempotent, zero remote
    /// calls). Failures are recorded on the note row before they propagate,
    /// so callers that do not await the result lose nothing.
    pub async fn push_note(&mut self, note_id: &str) -> Result<()> {
        let Some(note) = self.store.get_note(note_id)? else {
            tracing::debug!(id = %note_id, "push skipped: note no longer exists");
            return Ok(());
        };
        if note.sync_status == SyncStatus::Synced {
            return Ok(());
        }
        self.store.set_status(note_id, SyncStatus::Syncing)?;
        match self.push_current(&note).await {
            Ok(fingerprint) => {
                if !self.store.mark_synced(note_id, &fingerprint)? {
                    tracing::debug!(id = %note_id, "note changed while pushing; left dirty");
                }
                Ok(())
            }
            Err(err) => {
                let conflict = matches!(err, Error::Remote(RemoteError::Conflict));
                let message = if conflict {
                    CONFLICT_HINT.to_string()
                } else {
                    err.to_string()
                };
                self.store.mark_error(note_id, &message)?;
                if conflict {
                    Err(Error::Conflict {
                        id: note_id.to_string(),
                    })
                } else {
                    Err(err)
                }
            }
        }
    }

    /// Upload the note to the path its tombstone flag selects, then clean
    /// up the opposite path.
    async fn push_current(&self, note: &Note) -> Result<String> {
        let body = codec::serialize(note)?;
        let workspace = note.workspace.as_str();
        let target = PathKind::for_deleted(note.deleted);
        let expected = match target {
            // trash uploads start as a blind create; `upload` falls back to
            // an update on conflict
            PathKind::Trash => None,
            PathKind::Active => note.remote_fingerprint.as_deref(),
        };
        let fingerprint = self
            .upload(workspace, &note.id, target, &body, expected)
            .await?;
        let known = match target {
            // last-known active fingerprint, recorded before the delete
            PathKind::Trash => note.remote_fingerprint.as_deref(),
            PathKind::Active => None,
        };
        self.clear_counterpart(workspace, &note.id, target.opposite(), known, true)
            .await?;
        Ok(fingerprint)
    }

    /// Re-run the fast path for a note in the `error` state.
    ///
    /// Unlike `push_note`, this is only valid on errored notes and reports
    /// misuse to the caller, since it is driven by an explicit user action.
    pub async fn retry_note(&mut self, note_id: &str) -> Result<()> {
        let note = self
            .store
            .get_note(note_id)?
            .ok_or_else(|| Error::NoteNotFound(note_id.to_string()))?;
        if note.sync_status != SyncStatus::Error {
            return Err(Error::NotRetryable {
                id: note_id.to_string(),
                status: note.sync_status,
            });
        }
        self.store.set_status(note_id, note.dirty_status())?;
        self.push_note(note_id).await
    }
}

/// Submit a fast-path push as a background task.
///
/// The note row is updated inside `push_note` before any error propagates,
/// so dropping the task result cannot leave a note silently stuck; the log
/// line here is for operators, not for correctness.
pub fn push_in_background<R>(engine: Arc<Mutex<SyncEngine<R>>>, note_id: String)
where
    R: RemoteStore + 'static,
{
    tokio::spawn(async move {
        let result = engine.lock().await.push_note(&note_id).await;
        if let Err(err) = result {
            tracing::warn!(id = %note_id, error = %err, "background push failed");
        }
    });
}
