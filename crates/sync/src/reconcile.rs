// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Bramble Authors

//! Slow path: full workspace reconciliation.
//!
//! Phases run strictly in order because each depends on the previous one's
//! side effects:
//!
//! 1. cheap skip: root fingerprint unchanged and nothing dirty
//! 2. snapshot: one batched listing of the active and trash folders
//! 3. pull + prune: remote wins wherever local state is clean
//! 4. push + resolve: local dirty notes upload; true conflicts fork
//!
//! Reconciliation is best-effort per note, never all-or-nothing: a failed
//! upload marks that note and the loop continues.

use std::collections::HashMap;
use std::fmt;

use chrono::Utc;
use serde::Serialize;

use bramble_core::codec::{self, PathKind};
use bramble_core::note::{Note, SyncStatus, CONFLICT_TAG};
use bramble_core::id;

use crate::engine::SyncEngine;
use crate::error::{Error, Result};
use crate::remote::{RemoteError, RemoteListing, RemoteStore};

/// Maximum number of blobs fetched per batched download call.
const DOWNLOAD_BATCH: usize = 50;

/// Outcome of one `sync_workspace` run. Counts reflect notes that actually
/// changed state during this run, not a-priori pending counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub uploaded: usize,
    pub downloaded: usize,
    pub pruned: usize,
    pub conflicts: usize,
    pub failed: usize,
    /// True when the cheap skip fired and no listing or blob call was made.
    pub skipped: bool,
    /// Remote root fingerprint after this run, for the next cheap skip.
    pub root_fingerprint: Option<String>,
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} uploaded, {} downloaded, {} pruned, {} conflicts",
            self.uploaded, self.downloaded, self.pruned, self.conflicts
        )
    }
}

/// Per-id fingerprints recorded by the phase-1 snapshot.
#[derive(Debug, Clone, Default)]
struct RemoteState {
    active: Option<String>,
    trash: Option<String>,
}

impl RemoteState {
    /// The authoritative copy: active wins when both paths are populated.
    fn current(&self) -> Option<(PathKind, &str)> {
        if let Some(fp) = self.active.as_deref() {
            return Some((PathKind::Active, fp));
        }
        self.trash.as_deref().map(|fp| (PathKind::Trash, fp))
    }
}

fn snapshot_by_id(listing: &RemoteListing) -> HashMap<String, RemoteState> {
    let mut map: HashMap<String, RemoteState> = HashMap::new();
    for file in &listing.files {
        let Some((note_id, kind)) = codec::parse_remote_path(&file.path) else {
            continue;
        };
        let state = map.entry(note_id).or_default();
        match kind {
            PathKind::Active => state.active = Some(file.fingerprint.clone()),
            PathKind::Trash => state.trash = Some(file.fingerprint.clone()),
        }
    }
    map
}

/// A conflict exists iff local edited a version the remote has moved past,
/// or two stores independently created the same id.
fn is_conflict(note: &Note, remote_fingerprint: &str) -> bool {
    match note.remote_fingerprint.as_deref() {
        Some(prior) => prior != remote_fingerprint,
        None => true,
    }
}

enum PushOutcome {
    Uploaded,
    Forked,
}

impl<R: RemoteStore> SyncEngine<R> {
    /// Reconcile one workspace. `known_root` enables the phase-0 cheap
    /// skip, the primary cost control against remote rate limits.
    pub async fn sync_workspace(
        &mut self,
        workspace: &str,
        known_root: Option<&str>,
    ) -> Result<SyncReport> {
        self.reset_cancel();
        let mut report = SyncReport::default();

        // Phase 0: cheap skip
        if let Some(known) = known_root {
            let current = self.remote.root_fingerprint(workspace).await?;
            if current.as_deref() == Some(known) && self.store.count_dirty(workspace)? == 0 {
                tracing::debug!(workspace, "root unchanged and nothing dirty; skipping");
                report.skipped = true;
                report.root_fingerprint = current;
                return Ok(report);
            }
        }
        self.ensure_not_cancelled()?;

        // Phase 1: snapshot
        let listing = match self.remote.list_entries(workspace).await {
            Ok(listing) => listing,
            Err(RemoteError::NotFound) => {
                // destructive external event: the workspace itself is gone
                let removed = self.store.delete_workspace(workspace)?;
                tracing::warn!(workspace, removed, "workspace deleted remotely; local data dropped");
                return Err(Error::WorkspaceDeleted(workspace.to_string()));
            }
            Err(err) => return Err(err.into()),
        };
        let snapshot = snapshot_by_id(&listing);
        self.ensure_not_cancelled()?;

        // Phase 2a: pull
        let mut wanted: Vec<(String, PathKind, String)> = Vec::new();
        for (note_id, state) in &snapshot {
            let Some((kind, fingerprint)) = state.current() else {
                continue;
            };
            match self.store.get_note(note_id)? {
                None => wanted.push((note_id.clone(), kind, fingerprint.to_string())),
                Some(local)
                    if local.sync_status == SyncStatus::Synced
                        && local.remote_fingerprint.as_deref() != Some(fingerprint) =>
                {
                    wanted.push((note_id.clone(), kind, fingerprint.to_string()));
                }
                // dirty local notes are never overwritten here; phase 3
                // decides between upload and fork
                Some(_) => {}
            }
        }
        for chunk in wanted.chunks(DOWNLOAD_BATCH) {
            let fingerprints: Vec<String> = chunk.iter().map(|(_, _, fp)| fp.clone()).collect();
            let blobs = self.remote.fetch_blobs(workspace, &fingerprints).await?;
            for (note_id, kind, fingerprint) in chunk {
                let Some(text) = blobs.get(fingerprint) else {
                    tracing::warn!(workspace, id = %note_id, "blob missing from batch response");
                    continue;
                };
                self.apply_remote_blob(workspace, note_id, *kind, fingerprint, text)?;
                report.downloaded += 1;
            }
            self.ensure_not_cancelled()?;
        }

        // Phase 2b: prune. Only clean notes follow a remote-side permanent
        // deletion; dirty ones hold unsynced work.
        for note in self.store.list_by_statuses(workspace, &[SyncStatus::Synced])? {
            if !snapshot.contains_key(&note.id) {
                self.store.delete_note(&note.id)?;
                report.pruned += 1;
            }
        }
        self.ensure_not_cancelled()?;

        // Phase 3: push and resolve
        for note in self.store.list_dirty(workspace)? {
            match self.push_reconciled(&note, &snapshot).await {
                Ok(PushOutcome::Uploaded) => report.uploaded += 1,
                Ok(PushOutcome::Forked) => report.conflicts += 1,
                Err(err) => {
                    self.store.mark_error(&note.id, &err.to_string())?;
                    if matches!(err, Error::Remote(RemoteError::Unauthorized)) {
                        return Err(err);
                    }
                    tracing::warn!(workspace, id = %note.id, error = %err, "note push failed; continuing");
                    report.failed += 1;
                }
            }
        }

        // Epilogue: remember where the remote tree ended up so the next
        // cycle can skip cheaply.
        self.store.ensure_workspace(workspace)?;
        match self.remote.root_fingerprint(workspace).await {
            Ok(latest) => {
                self.store
                    .set_workspace_fingerprint(workspace, latest.as_deref())?;
                report.root_fingerprint = latest;
            }
            Err(err) => {
                tracing::debug!(workspace, error = %err, "root refresh failed; next cycle does a full pass");
            }
        }
        Ok(report)
    }

    /// Phase-3 handling of one dirty note.
    async fn push_reconciled(
        &mut self,
        note: &Note,
        snapshot: &HashMap<String, RemoteState>,
    ) -> Result<PushOutcome> {
        let workspace = note.workspace.as_str();
        self.store.set_status(&note.id, SyncStatus::Syncing)?;

        if note.deleted {
            // same sequence as the fast path's soft-delete branch, except
            // cleanup uses the snapshot's recorded active fingerprint
            let body = codec::serialize(note)?;
            let fingerprint = self
                .upload(workspace, &note.id, PathKind::Trash, &body, None)
                .await?;
            let known_active = snapshot.get(&note.id).and_then(|s| s.active.as_deref());
            self.clear_counterpart(workspace, &note.id, PathKind::Active, known_active, false)
                .await?;
            if !self.store.mark_synced(&note.id, &fingerprint)? {
                tracing::debug!(id = %note.id, "note changed during reconcile; left dirty");
            }
            return Ok(PushOutcome::Uploaded);
        }

        let remote_current = snapshot.get(&note.id).and_then(|s| s.current());
        match remote_current {
            Some((kind, remote_fp)) if is_conflict(note, remote_fp) => {
                self.fork_conflict(note, kind, remote_fp).await?;
                Ok(PushOutcome::Forked)
            }
            _ => {
                let body = codec::serialize(note)?;
                let fingerprint = self
                    .upload(
                        workspace,
                        &note.id,
                        PathKind::Active,
                        &body,
                        note.remote_fingerprint.as_deref(),
                    )
                    .await?;
                let known_trash = snapshot.get(&note.id).and_then(|s| s.trash.as_deref());
                self.clear_counterpart(workspace, &note.id, PathKind::Trash, known_trash, false)
                    .await?;
                if !self.store.mark_synced(&note.id, &fingerprint)? {
                    tracing::debug!(id = %note.id, "note changed during reconcile; left dirty");
                }
                Ok(PushOutcome::Uploaded)
            }
        }
    }

    /// Preserve a conflicting local edit in a fork, then snap the original
    /// id to the remote winner.
    async fn fork_conflict(&mut self, note: &Note, kind: PathKind, remote_fp: &str) -> Result<()> {
        let now = Utc::now().timestamp_millis();
        let mut fork = note.clone();
        fork.id = id::conflict_fork(&note.id, now);
        fork.created_at = now;
        fork.updated_at = now;
        fork.deleted = false;
        fork.deleted_at = None;
        if !fork.tags.iter().any(|tag| tag == CONFLICT_TAG) {
            fork.tags.push(CONFLICT_TAG.to_string());
            fork.tags.sort();
        }
        fork.remote_fingerprint = None;
        fork.sync_status = SyncStatus::Pending;
        fork.error_message = None;
        self.store.upsert_note(&fork)?;
        tracing::info!(original = %note.id, fork = %fork.id, "conflicting local edit preserved in fork");

        // Eagerly fetch the winning revision so `synced` keeps meaning
        // "content matches the fingerprint". On failure, adopt the
        // fingerprint anyway: leaving the note dirty would re-detect the
        // same conflict next cycle and fork again.
        let fingerprints = vec![remote_fp.to_string()];
        match self.remote.fetch_blobs(&note.workspace, &fingerprints).await {
            Ok(blobs) => match blobs.get(remote_fp) {
                Some(text) => {
                    self.apply_remote_blob(&note.workspace, &note.id, kind, remote_fp, text)?;
                }
                None => {
                    self.store.adopt_remote_fingerprint(&note.id, remote_fp)?;
                }
            },
            Err(RemoteError::Unauthorized) => return Err(RemoteError::Unauthorized.into()),
            Err(err) => {
                tracing::warn!(id = %note.id, error = %err, "winning revision fetch failed; adopting fingerprint only");
                self.store.adopt_remote_fingerprint(&note.id, remote_fp)?;
            }
        }
        Ok(())
    }

    /// Upsert a downloaded blob. The path it was found under outranks its
    /// header for the tombstone flag.
    fn apply_remote_blob(
        &mut self,
        workspace: &str,
        note_id: &str,
        kind: PathKind,
        fingerprint: &str,
        text: &str,
    ) -> Result<()> {
        let mut note = codec::deserialize(text, note_id);
        note.workspace = workspace.to_string();
        match kind {
            PathKind::Trash => {
                note.deleted = true;
                if note.deleted_at.is_none() {
                    note.deleted_at = Some(note.updated_at);
                }
            }
            PathKind::Active => {
                note.deleted = false;
                note.deleted_at = None;
            }
        }
        note.sync_status = SyncStatus::Synced;
        note.remote_fingerprint = Some(fingerprint.to_string());
        note.error_message = None;
        self.store.upsert_note(&note)?;
        Ok(())
    }
}
