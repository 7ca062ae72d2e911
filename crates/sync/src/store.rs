// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Bramble Authors

//! SQLite-backed local note store.
//!
//! The [`LocalStore`] owns all on-device state: the notes table (tags
//! mirrored as a JSON column, indexed separately for tag queries) and the
//! workspace registry that persists each workspace's last-known remote root
//! fingerprint between sync cycles. It has no network knowledge.
//!
//! Sync bookkeeping writes are field-level patches rather than whole-row
//! overwrites, so a status update racing a content edit can never clobber
//! it. Storage failures propagate uninterpreted; the engine never retries
//! them.

use std::path::Path;
use std::str::FromStr;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use bramble_core::note::{Note, SyncStatus};
use bramble_core::{id, Error as CoreError};

use crate::error::{Error, Result};

/// SQL schema for the note store.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS notes (
    id TEXT PRIMARY KEY,
    workspace TEXT NOT NULL,
    content TEXT NOT NULL,
    tags TEXT NOT NULL DEFAULT '[]',
    title TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    deleted INTEGER NOT NULL DEFAULT 0,
    deleted_at INTEGER,
    is_template INTEGER NOT NULL DEFAULT 0,
    remote_fingerprint TEXT,
    sync_status TEXT NOT NULL DEFAULT 'pending',
    error_message TEXT
);

CREATE INDEX IF NOT EXISTS idx_notes_workspace_updated ON notes(workspace, updated_at);
CREATE INDEX IF NOT EXISTS idx_notes_workspace_status ON notes(workspace, sync_status);

-- Secondary index table for tag queries
CREATE TABLE IF NOT EXISTS note_tags (
    note_id TEXT NOT NULL,
    tag TEXT NOT NULL,
    PRIMARY KEY (note_id, tag)
);

CREATE INDEX IF NOT EXISTS idx_note_tags_tag ON note_tags(tag);

CREATE TABLE IF NOT EXISTS workspaces (
    id TEXT PRIMARY KEY,
    created_at INTEGER NOT NULL,
    last_root_fingerprint TEXT
);
"#;

const NOTE_COLUMNS: &str = "id, workspace, content, tags, title, created_at, updated_at, \
                            deleted, deleted_at, is_template, remote_fingerprint, sync_status, \
                            error_message";

/// Local registry row for a remote workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkspaceRecord {
    pub id: String,
    pub created_at: i64,
    /// Remote root fingerprint after the last completed reconciliation.
    pub last_root_fingerprint: Option<String>,
}

/// Filters for workspace listings. Defaults exclude trashed notes and
/// templates, with no time bounds.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Inclusive lower bound on `updated_at`.
    pub since: Option<i64>,
    /// Inclusive upper bound on `updated_at`.
    pub until: Option<i64>,
    pub include_deleted: bool,
    pub include_templates: bool,
}

/// The on-device document store.
pub struct LocalStore {
    conn: Connection,
}

fn conversion_error(index: usize, err: CoreError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, Box::new(err))
}

fn row_to_note(row: &rusqlite::Row<'_>) -> rusqlite::Result<Note> {
    let tags_json: String = row.get(3)?;
    let tags: Vec<String> = serde_json::from_str(&tags_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let status_str: String = row.get(11)?;
    let sync_status = SyncStatus::from_str(&status_str).map_err(|e| conversion_error(11, e))?;
    Ok(Note {
        id: row.get(0)?,
        workspace: row.get(1)?,
        content: row.get(2)?,
        tags,
        title: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
        deleted: row.get(7)?,
        deleted_at: row.get(8)?,
        is_template: row.get(9)?,
        remote_fingerprint: row.get(10)?,
        sync_status,
        error_message: row.get(12)?,
    })
}

impl LocalStore {
    /// Open (creating if needed) a store at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Open an in-memory store, used in tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(LocalStore { conn })
    }

    // --- application-facing mutations -----------------------------------

    /// Create a note in the given workspace and derive its metadata.
    pub fn create_note(&mut self, workspace: &str, content: &str) -> Result<Note> {
        self.ensure_workspace(workspace)?;
        let now = Utc::now().timestamp_millis();
        let note_id = id::generate_unique(now, content, |candidate| {
            self.note_exists(candidate).unwrap_or(false)
        });
        let note = Note::new(note_id, workspace.to_string(), content.to_string(), now);
        self.upsert_note(&note)?;
        Ok(note)
    }

    /// Replace a note's content, re-deriving title and tags.
    pub fn update_content(&mut self, note_id: &str, content: &str) -> Result<Note> {
        let mut note = self.require_note(note_id)?;
        note.content = content.to_string();
        note.updated_at = Utc::now().timestamp_millis();
        note.refresh_derived();
        note.sync_status = note.dirty_status();
        note.error_message = None;
        self.upsert_note(&note)?;
        Ok(note)
    }

    /// Set the tombstone. The note keeps its id and content.
    pub fn soft_delete(&mut self, note_id: &str) -> Result<Note> {
        let mut note = self.require_note(note_id)?;
        let now = Utc::now().timestamp_millis();
        note.deleted = true;
        note.deleted_at = Some(now);
        note.updated_at = now;
        note.sync_status = note.dirty_status();
        note.error_message = None;
        self.upsert_note(&note)?;
        Ok(note)
    }

    /// Clear the tombstone.
    pub fn restore(&mut self, note_id: &str) -> Result<Note> {
        let mut note = self.require_note(note_id)?;
        note.deleted = false;
        note.deleted_at = None;
        note.updated_at = Utc::now().timestamp_millis();
        note.sync_status = note.dirty_status();
        note.error_message = None;
        self.upsert_note(&note)?;
        Ok(note)
    }

    /// Permanently remove a note. Returns whether a row was deleted.
    pub fn delete_note(&mut self, note_id: &str) -> Result<bool> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM note_tags WHERE note_id = ?1", params![note_id])?;
        let removed = tx.execute("DELETE FROM notes WHERE id = ?1", params![note_id])?;
        tx.commit()?;
        Ok(removed > 0)
    }

    /// Remove a workspace and every note tagged with it, atomically.
    /// Returns the number of notes removed.
    pub fn delete_workspace(&mut self, workspace: &str) -> Result<usize> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM note_tags WHERE note_id IN (SELECT id FROM notes WHERE workspace = ?1)",
            params![workspace],
        )?;
        let removed = tx.execute("DELETE FROM notes WHERE workspace = ?1", params![workspace])?;
        tx.execute("DELETE FROM workspaces WHERE id = ?1", params![workspace])?;
        tx.commit()?;
        Ok(removed)
    }

    /// Insert or fully replace a note row and its tag index entries.
    pub fn upsert_note(&mut self, note: &Note) -> Result<()> {
        let tags_json = serde_json::to_string(&note.tags)?;
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO notes (id, workspace, content, tags, title, created_at, updated_at, \
                                deleted, deleted_at, is_template, remote_fingerprint, \
                                sync_status, error_message)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
             ON CONFLICT(id) DO UPDATE SET
                 workspace = excluded.workspace,
                 content = excluded.content,
                 tags = excluded.tags,
                 title = excluded.title,
                 created_at = excluded.created_at,
                 updated_at = excluded.updated_at,
                 deleted = excluded.deleted,
                 deleted_at = excluded.deleted_at,
                 is_template = excluded.is_template,
                 remote_fingerprint = excluded.remote_fingerprint,
                 sync_status = excluded.sync_status,
                 error_message = excluded.error_message",
            params![
                note.id,
                note.workspace,
                note.content,
                tags_json,
                note.title,
                note.created_at,
                note.updated_at,
                note.deleted,
                note.deleted_at,
                note.is_template,
                note.remote_fingerprint,
                note.sync_status.as_str(),
                note.error_message,
            ],
        )?;
        tx.execute("DELETE FROM note_tags WHERE note_id = ?1", params![note.id])?;
        for tag in &note.tags {
            tx.execute(
                "INSERT OR IGNORE INTO note_tags (note_id, tag) VALUES (?1, ?2)",
                params![note.id, tag],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    // --- queries ---------------------------------------------------------

    pub fn get_note(&self, note_id: &str) -> Result<Option<Note>> {
        let sql = format!("SELECT {} FROM notes WHERE id = ?1", NOTE_COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, params![note_id], row_to_note)
            .optional()?)
    }

    fn require_note(&self, note_id: &str) -> Result<Note> {
        self.get_note(note_id)?
            .ok_or_else(|| Error::NoteNotFound(note_id.to_string()))
    }

    fn note_exists(&self, note_id: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM notes WHERE id = ?1",
            params![note_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Notes in a workspace, newest first, filtered per [`ListOptions`].
    pub fn list_notes(&self, workspace: &str, opts: &ListOptions) -> Result<Vec<Note>> {
        let sql = format!(
            "SELECT {} FROM notes
             WHERE workspace = ?1 AND updated_at >= ?2 AND updated_at <= ?3
               AND (?4 OR deleted = 0) AND (?5 OR is_template = 0)
             ORDER BY updated_at DESC",
            NOTE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let notes = stmt
            .query_map(
                params![
                    workspace,
                    opts.since.unwrap_or(i64::MIN),
                    opts.until.unwrap_or(i64::MAX),
                    opts.include_deleted,
                    opts.include_templates,
                ],
                row_to_note,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(notes)
    }

    /// Notes in a workspace whose status is one of `statuses`.
    pub fn list_by_statuses(&self, workspace: &str, statuses: &[SyncStatus]) -> Result<Vec<Note>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; statuses.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM notes WHERE workspace = ? AND sync_status IN ({}) \
             ORDER BY updated_at DESC",
            NOTE_COLUMNS, placeholders
        );
        let status_strs: Vec<&'static str> = statuses.iter().map(SyncStatus::as_str).collect();
        let mut args: Vec<&dyn rusqlite::ToSql> = Vec::with_capacity(status_strs.len() + 1);
        args.push(&workspace);
        for status in &status_strs {
            args.push(status);
        }
        let mut stmt = self.conn.prepare(&sql)?;
        let notes = stmt
            .query_map(args.as_slice(), row_to_note)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(notes)
    }

    /// Every non-synced note of a workspace, oldest mutation first.
    pub fn list_dirty(&self, workspace: &str) -> Result<Vec<Note>> {
        let sql = format!(
            "SELECT {} FROM notes WHERE workspace = ?1 AND sync_status != 'synced' \
             ORDER BY updated_at ASC",
            NOTE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let notes = stmt
            .query_map(params![workspace], row_to_note)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(notes)
    }

    pub fn count_dirty(&self, workspace: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM notes WHERE workspace = ?1 AND sync_status != 'synced'",
            params![workspace],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Notes carrying a tag starting with `prefix`, newest first.
    pub fn notes_with_tag_prefix(&self, prefix: &str) -> Result<Vec<Note>> {
        let sql = format!(
            "SELECT DISTINCT {} FROM notes
             JOIN note_tags ON note_tags.note_id = notes.id
             WHERE note_tags.tag LIKE ?1 || '%'
             ORDER BY notes.updated_at DESC",
            NOTE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let notes = stmt
            .query_map(params![prefix], row_to_note)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(notes)
    }

    // --- sync bookkeeping (field-level patches) --------------------------

    /// Set a note's sync status, clearing any stale error message.
    pub fn set_status(&self, note_id: &str, status: SyncStatus) -> Result<()> {
        self.conn.execute(
            "UPDATE notes SET sync_status = ?1, error_message = NULL WHERE id = ?2",
            params![status.as_str(), note_id],
        )?;
        Ok(())
    }

    /// Record a sync failure on the note row.
    pub fn mark_error(&self, note_id: &str, message: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE notes SET sync_status = 'error', error_message = ?1 WHERE id = ?2",
            params![message, note_id],
        )?;
        Ok(())
    }

    /// Complete an upload: adopt the fingerprint and flip to `synced`.
    ///
    /// Conditional on the row still being `syncing`: a note the user edited
    /// while the upload was in flight stays dirty. Returns whether the row
    /// was updated.
    pub fn mark_synced(&self, note_id: &str, fingerprint: &str) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE notes SET sync_status = 'synced', remote_fingerprint = ?1, \
             error_message = NULL WHERE id = ?2 AND sync_status = 'syncing'",
            params![fingerprint, note_id],
        )?;
        Ok(changed > 0)
    }

    /// Unconditionally snap a note to a remote fingerprint.
    ///
    /// Conflict-fork path only: the original id adopts the remote winner.
    pub fn adopt_remote_fingerprint(&self, note_id: &str, fingerprint: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE notes SET sync_status = 'synced', remote_fingerprint = ?1, \
             error_message = NULL WHERE id = ?2",
            params![fingerprint, note_id],
        )?;
        Ok(())
    }

    // --- workspace registry ----------------------------------------------

    pub fn ensure_workspace(&self, workspace: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO workspaces (id, created_at) VALUES (?1, ?2)",
            params![workspace, Utc::now().timestamp_millis()],
        )?;
        Ok(())
    }

    pub fn workspace_record(&self, workspace: &str) -> Result<Option<WorkspaceRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT id, created_at, last_root_fingerprint FROM workspaces WHERE id = ?1",
                params![workspace],
                |row| {
                    Ok(WorkspaceRecord {
                        id: row.get(0)?,
                        created_at: row.get(1)?,
                        last_root_fingerprint: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    pub fn list_workspaces(&self) -> Result<Vec<WorkspaceRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, created_at, last_root_fingerprint FROM workspaces ORDER BY id",
        )?;
        let records = stmt
            .query_map([], |row| {
                Ok(WorkspaceRecord {
                    id: row.get(0)?,
                    created_at: row.get(1)?,
                    last_root_fingerprint: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Persist the remote root fingerprint observed by the last sync.
    pub fn set_workspace_fingerprint(
        &self,
        workspace: &str,
        fingerprint: Option<&str>,
    ) -> Result<()> {
        self.conn.execute(
            "UPDATE workspaces SET last_root_fingerprint = ?1 WHERE id = ?2",
            params![fingerprint, workspace],
        )?;
        Ok(())
    }
}
