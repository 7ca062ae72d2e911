// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Bramble Authors

use bramble_core::note::SyncStatus;
use thiserror::Error;

use crate::remote::RemoteError;

/// All possible errors that can occur in the sync engine.
#[derive(Debug, Error)]
pub enum Error {
    #[error("note not found: {0}")]
    NoteNotFound(String),

    #[error("note {id} is not in an error state (status: {status})")]
    NotRetryable { id: String, status: SyncStatus },

    #[error("conflict on note {id}: run a full sync to resolve")]
    Conflict { id: String },

    #[error("workspace deleted remotely: {0}")]
    WorkspaceDeleted(String),

    #[error("a sync for this workspace is already in flight")]
    SyncInProgress,

    #[error("sync cancelled")]
    Cancelled,

    #[error("{0}")]
    Core(#[from] bramble_core::Error),

    #[error("local store error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("tag encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Remote(#[from] RemoteError),
}

/// A specialized Result type for sync operations.
pub type Result<T> = std::result::Result<T, Error>;
