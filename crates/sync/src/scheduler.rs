// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Bramble Authors

//! Auto-sync scheduling: when the slow path runs, never how.
//!
//! [`SessionState`] is the explicit session-scoped object holding what
//! would otherwise be ambient globals: the visibility flag, the last input
//! instant, the process-wide in-flight flag and the per-workspace busy set.
//! It is created at session start and dropped at sign-out.
//!
//! Guard rules:
//! - periodic ticks are skipped while the app is hidden or the user typed
//!   within the debounce window; explicit triggers (focus return, network
//!   online, manual request) bypass both guards
//! - a second sweep while one is running is dropped, not queued
//! - a manual per-workspace sync takes only that workspace's lock, and a
//!   sweep skips busy workspaces for the cycle

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::Mutex as AsyncMutex;
use tokio::time::MissedTickBehavior;

use crate::engine::SyncEngine;
use crate::error::{Error, Result};
use crate::reconcile::SyncReport;
use crate::remote::{RemoteError, RemoteStore};

/// Configuration for the auto-sync scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How often the periodic sweep fires.
    pub interval: Duration,
    /// User input within this window defers a periodic sweep.
    pub idle_debounce: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            interval: Duration::from_secs(60),
            idle_debounce: Duration::from_secs(3),
        }
    }
}

/// What caused a sync to be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    /// The periodic interval fired.
    Interval,
    /// The application window regained focus.
    FocusGained,
    /// Network connectivity returned.
    Online,
    /// The user asked for a sync.
    Manual,
}

impl SyncTrigger {
    /// Explicit triggers bypass the visibility and idle guards.
    pub fn is_explicit(self) -> bool {
        !matches!(self, SyncTrigger::Interval)
    }
}

/// Session-scoped shared state read by the scheduler and UI indicators.
pub struct SessionState {
    visible: AtomicBool,
    syncing: AtomicBool,
    last_activity: Mutex<Option<Instant>>,
    busy_workspaces: Mutex<HashSet<String>>,
}

impl SessionState {
    pub fn new() -> Self {
        SessionState {
            visible: AtomicBool::new(true),
            syncing: AtomicBool::new(false),
            last_activity: Mutex::new(None),
            busy_workspaces: Mutex::new(HashSet::new()),
        }
    }

    pub fn mark_visible(&self) {
        self.visible.store(true, Ordering::Relaxed);
    }

    pub fn mark_hidden(&self) {
        self.visible.store(false, Ordering::Relaxed);
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Relaxed)
    }

    /// Record a keystroke, pointer or touch event.
    pub fn record_activity(&self) {
        *self.lock_activity() = Some(Instant::now());
    }

    /// Whether input was recorded within the given window.
    pub fn active_within(&self, window: Duration) -> bool {
        let guard = self.lock_activity();
        (*guard).map_or(false, |at| at.elapsed() < window)
    }

    /// Claim the process-wide sweep slot. False when a sweep is running.
    pub fn begin_sync(&self) -> bool {
        self.syncing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn end_sync(&self) {
        self.syncing.store(false, Ordering::SeqCst);
    }

    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::SeqCst)
    }

    /// Claim a workspace for reconciliation. False when already claimed.
    pub fn lock_workspace(&self, workspace: &str) -> bool {
        self.lock_busy().insert(workspace.to_string())
    }

    pub fn release_workspace(&self, workspace: &str) {
        self.lock_busy().remove(workspace);
    }

    pub fn workspace_busy(&self, workspace: &str) -> bool {
        self.lock_busy().contains(workspace)
    }

    fn lock_activity(&self) -> MutexGuard<'_, Option<Instant>> {
        self.last_activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_busy(&self) -> MutexGuard<'_, HashSet<String>> {
        self.busy_workspaces
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of one sweep attempt.
#[derive(Debug, Default)]
pub struct SweepOutcome {
    /// False when the trigger was dropped by a guard or the sweep mutex.
    pub ran: bool,
    /// Per-workspace reports for the workspaces that synced.
    pub reports: Vec<(String, SyncReport)>,
}

/// Drives the slow path on a schedule.
pub struct AutoSync<R: RemoteStore> {
    engine: Arc<AsyncMutex<SyncEngine<R>>>,
    session: Arc<SessionState>,
    config: SchedulerConfig,
}

impl<R: RemoteStore> AutoSync<R> {
    pub fn new(engine: Arc<AsyncMutex<SyncEngine<R>>>, config: SchedulerConfig) -> Self {
        AutoSync {
            engine,
            session: Arc::new(SessionState::new()),
            config,
        }
    }

    /// The shared session state, for UI hooks (visibility, input, status).
    pub fn session(&self) -> Arc<SessionState> {
        Arc::clone(&self.session)
    }

    pub fn engine(&self) -> Arc<AsyncMutex<SyncEngine<R>>> {
        Arc::clone(&self.engine)
    }

    /// Drive the periodic sweep until `shutdown` is set.
    pub async fn run(&self, shutdown: Arc<AtomicBool>) {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // the first tick completes immediately; consume it
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if shutdown.load(Ordering::Relaxed) {
                break;
            }
            if let Err(err) = self.tick().await {
                tracing::warn!(error = %err, "periodic sweep failed");
            }
        }
    }

    /// One periodic trigger, subject to the visibility and idle guards.
    pub async fn tick(&self) -> Result<SweepOutcome> {
        if !self.session.is_visible() {
            tracing::debug!("app hidden; periodic sweep skipped");
            return Ok(SweepOutcome::default());
        }
        if self.session.active_within(self.config.idle_debounce) {
            tracing::debug!("recent user input; periodic sweep deferred");
            return Ok(SweepOutcome::default());
        }
        self.sweep(SyncTrigger::Interval).await
    }

    /// Request a sweep for the given trigger. Explicit triggers are never
    /// guard-skipped; they still respect the sweep mutex.
    pub async fn trigger(&self, trigger: SyncTrigger) -> Result<SweepOutcome> {
        if trigger.is_explicit() {
            self.sweep(trigger).await
        } else {
            self.tick().await
        }
    }

    /// Manual "sync now" for a single workspace.
    ///
    /// Takes only that workspace's busy lock, so it can interleave with a
    /// sweep; a sweep reaching the same workspace skips it for the cycle.
    pub async fn sync_now(&self, workspace: &str) -> Result<SyncReport> {
        if !self.session.lock_workspace(workspace) {
            return Err(Error::SyncInProgress);
        }
        let result = self.sync_one(workspace).await;
        self.session.release_workspace(workspace);
        result
    }

    async fn sync_one(&self, workspace: &str) -> Result<SyncReport> {
        let mut engine = self.engine.lock().await;
        let known = engine
            .store()
            .workspace_record(workspace)?
            .and_then(|record| record.last_root_fingerprint);
        engine.sync_workspace(workspace, known.as_deref()).await
    }

    async fn sweep(&self, trigger: SyncTrigger) -> Result<SweepOutcome> {
        if !self.session.begin_sync() {
            tracing::debug!(?trigger, "sync already in flight; trigger dropped");
            return Ok(SweepOutcome::default());
        }
        let outcome = self.sweep_workspaces(trigger).await;
        self.session.end_sync();
        outcome
    }

    async fn sweep_workspaces(&self, trigger: SyncTrigger) -> Result<SweepOutcome> {
        let records = { self.engine.lock().await.store().list_workspaces()? };
        let mut outcome = SweepOutcome {
            ran: true,
            reports: Vec::new(),
        };
        for record in records {
            if !self.session.lock_workspace(&record.id) {
                tracing::debug!(workspace = %record.id, "workspace busy; skipped this cycle");
                continue;
            }
            let result = {
                let mut engine = self.engine.lock().await;
                engine
                    .sync_workspace(&record.id, record.last_root_fingerprint.as_deref())
                    .await
            };
            self.session.release_workspace(&record.id);
            match result {
                Ok(report) => {
                    tracing::info!(workspace = %record.id, ?trigger, %report, "workspace sync finished");
                    outcome.reports.push((record.id, report));
                }
                Err(Error::WorkspaceDeleted(workspace)) => {
                    tracing::warn!(workspace = %workspace, "workspace removed remotely during sweep");
                }
                Err(err @ Error::Remote(RemoteError::Unauthorized)) => {
                    // halt; local edits keep queuing while signed out
                    return Err(err);
                }
                Err(err) => {
                    tracing::warn!(workspace = %record.id, error = %err, "workspace sync failed");
                }
            }
        }
        Ok(outcome)
    }
}
