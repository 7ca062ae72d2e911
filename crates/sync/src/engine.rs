// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Bramble Authors

//! The sync engine: local store + remote store + shared upload helpers.
//!
//! The fast path (`push.rs`) and the slow path (`reconcile.rs`) are impl
//! blocks on [`SyncEngine`]; this module holds the struct and the two
//! remote helpers both paths share. Active and trash uploads differ only in
//! parameters, never in code paths.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bramble_core::codec::{self, PathKind};

use crate::error::{Error, Result};
use crate::remote::{RemoteError, RemoteResult, RemoteStore};
use crate::store::LocalStore;

/// Synchronizes a [`LocalStore`] against a [`RemoteStore`].
pub struct SyncEngine<R: RemoteStore> {
    pub(crate) store: LocalStore,
    pub(crate) remote: R,
    cancel: Arc<AtomicBool>,
}

impl<R: RemoteStore> SyncEngine<R> {
    pub fn new(store: LocalStore, remote: R) -> Self {
        SyncEngine {
            store,
            remote,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut LocalStore {
        &mut self.store
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Handle for requesting cooperative cancellation of an in-flight full
    /// sync. Checked at phase boundaries; the current note's write is
    /// allowed to complete.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub(crate) fn reset_cancel(&self) {
        self.cancel.store(false, Ordering::Relaxed);
    }

    pub(crate) fn ensure_not_cancelled(&self) -> Result<()> {
        if self.cancel.load(Ordering::Relaxed) {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Create-or-update the note file under `kind`.
    ///
    /// `expected` is the caller's last-known fingerprint for that path. On
    /// `Conflict` the current fingerprint is fetched and the write retried
    /// as an update; on `NotFound` (the expected fingerprint referred to a
    /// path that no longer exists, e.g. a restore whose last sync landed in
    /// trash) the write is retried as a create.
    pub(crate) async fn upload(
        &self,
        workspace: &str,
        note_id: &str,
        kind: PathKind,
        body: &str,
        expected: Option<&str>,
    ) -> RemoteResult<String> {
        let path = codec::remote_path(note_id, kind);
        match self.remote.put_file(workspace, &path, body, expected).await {
            Ok(fingerprint) => Ok(fingerprint),
            Err(RemoteError::Conflict) => {
                let current = self.remote.file_fingerprint(workspace, &path).await?;
                self.remote
                    .put_file(workspace, &path, body, current.as_deref())
                    .await
            }
            Err(RemoteError::NotFound) => self.remote.put_file(workspace, &path, body, None).await,
            Err(err) => Err(err),
        }
    }

    /// Best-effort removal of the note's copy under `kind`, so a note never
    /// survives a sync at both paths.
    ///
    /// `known` is a fingerprint recorded earlier (the note row, or the
    /// slow path's snapshot); with `stat_fallback` the path is probed when
    /// nothing is known. "Already gone" is the desired state, so `NotFound`
    /// is swallowed, and a stale fingerprint is refreshed once.
    pub(crate) async fn clear_counterpart(
        &self,
        workspace: &str,
        note_id: &str,
        kind: PathKind,
        known: Option<&str>,
        stat_fallback: bool,
    ) -> RemoteResult<()> {
        let path = codec::remote_path(note_id, kind);
        let fingerprint = match known {
            Some(fp) => Some(fp.to_string()),
            None if stat_fallback => self.remote.file_fingerprint(workspace, &path).await?,
            None => None,
        };
        let Some(fingerprint) = fingerprint else {
            return Ok(());
        };
        match self.remote.delete_file(workspace, &path, &fingerprint).await {
            Ok(()) | Err(RemoteError::NotFound) => Ok(()),
            Err(RemoteError::Conflict) => {
                match self.remote.file_fingerprint(workspace, &path).await? {
                    None => Ok(()),
                    Some(fresh) => match self.remote.delete_file(workspace, &path, &fresh).await {
                        Ok(()) | Err(RemoteError::NotFound) => Ok(()),
                        Err(err) => Err(err),
                    },
                }
            }
            Err(err) => Err(err),
        }
    }
}
