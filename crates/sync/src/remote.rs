// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Bramble Authors

//! Remote store abstraction.
//!
//! The hosted backend (an authenticated contents API plus a batched
//! tree/blob query API) is an external collaborator; this module defines
//! the trait the engine consumes and the closed error taxonomy it branches
//! on. Reconciliation logic must never inspect error message text; every
//! condition it reacts to is a variant of [`RemoteError`].
//!
//! Transport concerns (authentication, base64 content encoding, HTTP
//! retries) belong to implementations and are invisible here. Tests run
//! against an in-memory implementation, see `test_helpers`.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

/// Error taxonomy of the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The path (or the whole workspace, for listings) does not exist.
    #[error("remote path not found")]
    NotFound,

    /// The expected prior fingerprint does not match current remote state.
    #[error("remote fingerprint mismatch")]
    Conflict,

    /// The session is no longer valid. Never retried by the engine.
    #[error("unauthorized: session is no longer valid")]
    Unauthorized,

    /// Anything else: network failures, rate limits, server errors.
    #[error("remote store error: {0}")]
    Other(String),
}

/// Result type for remote operations.
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Boxed future returned by [`RemoteStore`] methods.
pub type RemoteFuture<'a, T> = Pin<Box<dyn Future<Output = RemoteResult<T>> + Send + 'a>>;

/// One entry of a workspace listing: a raw path and its content-address.
///
/// Path-to-note mapping is the codec's job; the transport reports paths
/// verbatim and the engine ignores paths it does not own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub path: String,
    pub fingerprint: String,
}

/// A full snapshot of the workspace tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteListing {
    /// Content-address of the root tree at listing time.
    pub root_fingerprint: String,
    /// Every file in the workspace, active and trash folders included.
    pub files: Vec<RemoteFile>,
}

/// The remote store the engine syncs against.
pub trait RemoteStore: Send + Sync {
    /// Content-address of the workspace root tree.
    ///
    /// One cheap call, used for change detection. `None` when the workspace
    /// does not exist or has no content yet.
    fn root_fingerprint<'a>(&'a self, workspace: &'a str) -> RemoteFuture<'a, Option<String>>;

    /// Full listing of the workspace tree in one batched query.
    ///
    /// Fails with [`RemoteError::NotFound`] when the workspace itself is
    /// gone, a destructive external event the reconciler must not paper
    /// over.
    fn list_entries<'a>(&'a self, workspace: &'a str) -> RemoteFuture<'a, RemoteListing>;

    /// Batched blob fetch by content-address.
    ///
    /// Unknown fingerprints are simply absent from the returned map.
    fn fetch_blobs<'a>(
        &'a self,
        workspace: &'a str,
        fingerprints: &'a [String],
    ) -> RemoteFuture<'a, HashMap<String, String>>;

    /// Create or update a file, returning its new fingerprint.
    ///
    /// `expected` carries the caller's last-known fingerprint: `None` means
    /// "create"; any mismatch with current remote state (including a blind
    /// create over an existing file) fails with [`RemoteError::Conflict`],
    /// and updating a missing path fails with [`RemoteError::NotFound`].
    fn put_file<'a>(
        &'a self,
        workspace: &'a str,
        path: &'a str,
        content: &'a str,
        expected: Option<&'a str>,
    ) -> RemoteFuture<'a, String>;

    /// Delete a file whose current fingerprint is `expected`.
    fn delete_file<'a>(
        &'a self,
        workspace: &'a str,
        path: &'a str,
        expected: &'a str,
    ) -> RemoteFuture<'a, ()>;

    /// Current fingerprint at a single path, `None` when absent.
    ///
    /// Used by the fast path to resolve create-vs-update without paying for
    /// a full listing.
    fn file_fingerprint<'a>(
        &'a self,
        workspace: &'a str,
        path: &'a str,
    ) -> RemoteFuture<'a, Option<String>>;
}
