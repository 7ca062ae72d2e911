// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Bramble Authors

//! bramble-sync: Synchronization engine for the Bramble note store.
//!
//! Reconciles the indexed on-device store with a per-user remote Git-backed
//! workspace (one markdown file per note, plus a trash folder for
//! soft-deletes).
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐    ┌─────────────┐    ┌──────────────┐
//! │ LocalStore │◄──►│  SyncEngine │───►│ RemoteStore  │
//! │ (rusqlite) │    │ fast + slow │◄───│   (trait)    │
//! └────────────┘    └─────────────┘    └──────────────┘
//!                          ▲
//!                          │
//!                   ┌────────────┐
//!                   │  AutoSync  │  (when to sync, never how)
//!                   └────────────┘
//! ```
//!
//! The fast path ([`SyncEngine::push_note`]) uploads a single note right
//! after a local mutation. The slow path ([`SyncEngine::sync_workspace`])
//! snapshots the remote tree, pulls, prunes, pushes, and forks conflicts.
//! [`AutoSync`] decides when the slow path runs.

pub mod engine;
pub mod error;
pub mod push;
pub mod reconcile;
pub mod remote;
pub mod scheduler;
pub mod store;

pub use engine::SyncEngine;
pub use error::{Error, Result};
pub use push::push_in_background;
pub use reconcile::SyncReport;
pub use remote::{RemoteError, RemoteFile, RemoteFuture, RemoteListing, RemoteResult, RemoteStore};
pub use scheduler::{AutoSync, SchedulerConfig, SessionState, SweepOutcome, SyncTrigger};
pub use store::{ListOptions, LocalStore, WorkspaceRecord};

#[cfg(test)]
mod test_helpers;

#[cfg(test)]
mod remote_tests;
