// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Bramble Authors

use thiserror::Error;

/// Errors produced by the core data model.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid sync status: '{0}'")]
    InvalidSyncStatus(String),

    #[error("note header serialization failed: {0}")]
    Header(#[from] serde_yaml::Error),
}

/// A specialized Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;
