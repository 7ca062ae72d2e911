// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Bramble Authors

//! Shared test helpers: an in-memory remote store and engine factories.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use sha2::{Digest, Sha256};

use bramble_core::codec::{self, PathKind};
use bramble_core::Note;

use crate::engine::SyncEngine;
use crate::remote::{RemoteError, RemoteFile, RemoteFuture, RemoteListing, RemoteStore};
use crate::store::LocalStore;

/// Content-address a blob the way the mock remote does.
pub fn blob_fingerprint(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Per-method call counters, for idempotence and cheap-skip assertions.
#[derive(Debug, Default, Clone)]
pub struct CallCounts {
    pub root: usize,
    pub list: usize,
    pub fetch: usize,
    pub put: usize,
    pub delete: usize,
    pub stat: usize,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        self.root + self.list + self.fetch + self.put + self.delete + self.stat
    }
}

#[derive(Default)]
struct MockState {
    /// workspace -> path -> content
    workspaces: HashMap<String, BTreeMap<String, String>>,
    unauthorized: bool,
    failing_paths: HashMap<String, RemoteError>,
    calls: CallCounts,
}

/// In-memory, content-addressed stand-in for the hosted remote store.
///
/// Cloning shares state, so a test can hold a handle while the engine owns
/// another, and two engines ("devices") can share one remote.
#[derive(Clone, Default)]
pub struct MockRemote {
    inner: Arc<Mutex<MockState>>,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_workspace(&self, workspace: &str) {
        self.lock().workspaces.entry(workspace.to_string()).or_default();
    }

    pub fn remove_workspace(&self, workspace: &str) {
        self.lock().workspaces.remove(workspace);
    }

    /// Write a note file directly, as another device would. Returns its
    /// fingerprint.
    pub fn seed_note(&self, workspace: &str, note_id: &str, kind: PathKind, content: &str) -> String {
        self.write_raw(workspace, &codec::remote_path(note_id, kind), content)
    }

    pub fn write_raw(&self, workspace: &str, path: &str, content: &str) -> String {
        let mut state = self.lock();
        state
            .workspaces
            .entry(workspace.to_string())
            .or_default()
            .insert(path.to_string(), content.to_string());
        blob_fingerprint(content)
    }

    pub fn delete_raw(&self, workspace: &str, path: &str) {
        let mut state = self.lock();
        if let Some(files) = state.workspaces.get_mut(workspace) {
            files.remove(path);
        }
    }

    pub fn contents(&self, workspace: &str, path: &str) -> Option<String> {
        self.lock().workspaces.get(workspace)?.get(path).cloned()
    }

    pub fn note_at(&self, workspace: &str, note_id: &str, kind: PathKind) -> Option<String> {
        self.contents(workspace, &codec::remote_path(note_id, kind))
    }

    pub fn paths(&self, workspace: &str) -> Vec<String> {
        self.lock()
            .workspaces
            .get(workspace)
            .map(|files| files.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn calls(&self) -> CallCounts {
        self.lock().calls.clone()
    }

    pub fn set_unauthorized(&self, value: bool) {
        self.lock().unauthorized = value;
    }

    /// Make every write to `path` fail with the given error.
    pub fn fail_writes_to(&self, path: &str, error: RemoteError) {
        self.lock().failing_paths.insert(path.to_string(), error);
    }

    pub fn clear_failures(&self) {
        self.lock().failing_paths.clear();
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn root_of(files: &BTreeMap<String, String>) -> String {
        let mut tree = String::new();
        for (path, content) in files {
            tree.push_str(path);
            tree.push(' ');
            tree.push_str(&blob_fingerprint(content));
            tree.push('\n');
        }
        hex::encode(Sha256::digest(tree.as_bytes()))
    }
}

impl RemoteStore for MockRemote {
    fn root_fingerprint<'a>(&'a self, workspace: &'a str) -> RemoteFuture<'a, Option<String>> {
        Box::pin(async move {
            let mut state = self.lock();
            state.calls.root += 1;
            if state.unauthorized {
                return Err(RemoteError::Unauthorized);
            }
            Ok(state.workspaces.get(workspace).map(MockRemote::root_of))
        })
    }

    fn list_entries<'a>(&'a self, workspace: &'a str) -> RemoteFuture<'a, RemoteListing> {
        Box::pin(async move {
            let mut state = self.lock();
            state.calls.list += 1;
            if state.unauthorized {
                return Err(RemoteError::Unauthorized);
            }
            let files_map = state.workspaces.get(workspace).ok_or(RemoteError::NotFound)?;
            let files = files_map
                .iter()
                .map(|(path, content)| RemoteFile {
                    path: path.clone(),
                    fingerprint: blob_fingerprint(content),
                })
                .collect();
            Ok(RemoteListing {
                root_fingerprint: MockRemote::root_of(files_map),
                files,
            })
        })
    }

    fn fetch_blobs<'a>(
        &'a self,
        workspace: &'a str,
        fingerprints: &'a [String],
    ) -> RemoteFuture<'a, HashMap<String, String>> {
        Box::pin(async move {
            let mut state = self.lock();
            state.calls.fetch += 1;
            if state.unauthorized {
                return Err(RemoteError::Unauthorized);
            }
            let files = state.workspaces.get(workspace).ok_or(RemoteError::NotFound)?;
            let mut by_fingerprint: HashMap<String, String> = HashMap::new();
            for content in files.values() {
                by_fingerprint.insert(blob_fingerprint(content), content.clone());
            }
            Ok(fingerprints
                .iter()
                .filter_map(|fp| by_fingerprint.get(fp).map(|content| (fp.clone(), content.clone())))
                .collect())
        })
    }

    fn put_file<'a>(
        &'a self,
        workspace: &'a str,
        path: &'a str,
        content: &'a str,
        expected: Option<&'a str>,
    ) -> RemoteFuture<'a, String> {
        Box::pin(async move {
            let mut state = self.lock();
            state.calls.put += 1;
            if state.unauthorized {
                return Err(RemoteError::Unauthorized);
            }
            if let Some(err) = state.failing_paths.get(path) {
                return Err(err.clone());
            }
            let files = state.workspaces.entry(workspace.to_string()).or_default();
            match (files.get(path).cloned(), expected) {
                (None, None) => {
                    files.insert(path.to_string(), content.to_string());
                    Ok(blob_fingerprint(content))
                }
                (None, Some(_)) => Err(RemoteError::NotFound),
                (Some(_), None) => Err(RemoteError::Conflict),
                (Some(current), Some(expected_fp)) => {
                    if blob_fingerprint(&current) == expected_fp {
                        files.insert(path.to_string(), content.to_string());
                        Ok(blob_fingerprint(content))
                    } else {
                        Err(RemoteError::Conflict)
                    }
                }
            }
        })
    }

    fn delete_file<'a>(
        &'a self,
        workspace: &'a str,
        path: &'a str,
        expected: &'a str,
    ) -> RemoteFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.lock();
            state.calls.delete += 1;
            if state.unauthorized {
                return Err(RemoteError::Unauthorized);
            }
            let files = state
                .workspaces
                .get_mut(workspace)
                .ok_or(RemoteError::NotFound)?;
            let current = files.get(path).ok_or(RemoteError::NotFound)?;
            if blob_fingerprint(current) != expected {
                return Err(RemoteError::Conflict);
            }
            files.remove(path);
            Ok(())
        })
    }

    fn file_fingerprint<'a>(
        &'a self,
        workspace: &'a str,
        path: &'a str,
    ) -> RemoteFuture<'a, Option<String>> {
        Box::pin(async move {
            let mut state = self.lock();
            state.calls.stat += 1;
            if state.unauthorized {
                return Err(RemoteError::Unauthorized);
            }
            Ok(state
                .workspaces
                .get(workspace)
                .and_then(|files| files.get(path))
                .map(|content| blob_fingerprint(content)))
        })
    }
}

/// An engine over a fresh in-memory store, plus a handle to its remote.
pub fn engine_with_mock() -> (SyncEngine<MockRemote>, MockRemote) {
    let store = LocalStore::open_in_memory().unwrap();
    let remote = MockRemote::new();
    (SyncEngine::new(store, remote.clone()), remote)
}

/// Serialize a note body the way a peer device would upload it.
pub fn note_body(note_id: &str, content: &str, deleted: bool) -> String {
    let mut note = Note::new(
        note_id.to_string(),
        "ws".to_string(),
        content.to_string(),
        1_700_000_000_000,
    );
    note.deleted = deleted;
    if deleted {
        note.deleted_at = Some(1_700_000_000_500);
    }
    codec::serialize(&note).unwrap()
}
