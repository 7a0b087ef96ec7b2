// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Purge Scheduler
//!
//! Background task that permanently removes files marked for deletion.
//!
//! ## Strategy
//!
//! Every `interval` (default 60 s) the scheduler:
//! 1. Lists the ids in the pending-delete index.
//! 2. Purges each file in its own write transaction: the row is re-read and
//!    skipped unless it is still marked, the object is removed from the
//!    object store (an already missing object counts as removed), then the
//!    row, its index entries and its category rows are deleted.
//! 3. Deletes uploaded objects never claimed by a file before their claim
//!    deadline, together with their pending records.
//! 4. Drops expired upload grants.
//!
//! Each step runs on the blocking pool under a timeout. A failed or timed-out
//! item is logged and left for the next sweep; it never stops the sweep.
//!
//! A timed-out step is not cancelled: its blocking task keeps running and may
//! still commit. Such steps are counted as `timed_out`, not `failed`, and the
//! next sweep re-reads every row before acting on it.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::drive::{Drive, DriveError, DriveResult};
use crate::storage::{BlobError, StoreRead};

/// Why a bounded step produced no result.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    /// The step outlived the timeout; it may still complete in the background
    #[error("purge step exceeded {0:?}")]
    TimedOut(Duration),

    #[error(transparent)]
    Failed(#[from] DriveError),
}

/// Default interval between sweeps.
pub const DEFAULT_PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Default bound on a single purge step.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(10);

/// What happened to one pending file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurgeOutcome {
    /// Object and metadata are gone
    Purged,
    /// The item was restored, claimed or already removed since it was listed
    Skipped,
}

/// Counters for one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub purged: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Steps that hit the timeout; their outcome is unknown
    pub timed_out: usize,
    pub abandoned_uploads: usize,
    pub expired_grants: usize,
}

/// Permanently remove one file if it is still marked for deletion.
///
/// Runs in a single write transaction: if the object cannot be removed the
/// transaction is dropped and the row survives for the next sweep.
pub fn purge_file(drive: &Drive, file_id: &str) -> DriveResult<PurgeOutcome> {
    let tx = drive.db().write()?;
    let Some(file) = tx.file(file_id)? else {
        return Ok(PurgeOutcome::Skipped);
    };
    if !file.should_delete {
        return Ok(PurgeOutcome::Skipped);
    }

    match drive.blobs().delete(&file.storage_id) {
        Ok(()) | Err(BlobError::NotFound(_)) => {}
        Err(e) => return Err(DriveError::Upstream(e.to_string())),
    }

    tx.remove_file(file_id)?;
    tx.commit()?;
    Ok(PurgeOutcome::Purged)
}

/// Delete an uploaded object whose claim deadline passed without a file
/// referencing it.
///
/// The pending record is re-read and removed in the same write transaction as
/// the object delete, so an upload claimed in the meantime is left alone.
pub fn purge_abandoned_upload(drive: &Drive, storage_id: &str) -> DriveResult<PurgeOutcome> {
    let tx = drive.db().write()?;
    let Some(upload) = tx.pending_upload(storage_id)? else {
        return Ok(PurgeOutcome::Skipped);
    };
    if !upload.is_abandoned(Utc::now()) {
        return Ok(PurgeOutcome::Skipped);
    }

    match drive.blobs().delete(storage_id) {
        Ok(()) | Err(BlobError::NotFound(_)) => {}
        Err(e) => return Err(DriveError::Upstream(e.to_string())),
    }

    tx.take_pending_upload(storage_id)?;
    tx.commit()?;
    Ok(PurgeOutcome::Purged)
}

/// Periodic sweep over the pending-delete index and unclaimed uploads.
pub struct PurgeScheduler {
    drive: Arc<Drive>,
    interval: Duration,
    step_timeout: Duration,
}

impl PurgeScheduler {
    pub fn new(drive: Arc<Drive>) -> Self {
        Self {
            drive,
            interval: DEFAULT_PURGE_INTERVAL,
            step_timeout: DEFAULT_STEP_TIMEOUT,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_step_timeout(mut self, step_timeout: Duration) -> Self {
        self.step_timeout = step_timeout;
        self
    }

    /// Run the sweep loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(scheduler.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            step_timeout_secs = self.step_timeout.as_secs(),
            "Purge scheduler starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Purge scheduler shutting down");
                return;
            }

            self.sweep().await;

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Purge scheduler shutting down");
                    return;
                }
            }
        }
    }

    /// Execute one sweep over every file marked for deletion and every
    /// abandoned upload.
    pub async fn sweep(&self) -> PurgeReport {
        let mut report = PurgeReport::default();

        let drive = Arc::clone(&self.drive);
        let listed = self
            .bounded(move || -> DriveResult<Vec<String>> {
                Ok(drive.db().read()?.pending_delete_ids()?)
            })
            .await;
        match listed {
            Ok(pending_ids) => self.purge_files(pending_ids, &mut report).await,
            Err(e) => warn!(error = %e, "Purge: failed to list pending files"),
        }

        let drive = Arc::clone(&self.drive);
        let listed = self
            .bounded(move || -> DriveResult<Vec<String>> {
                Ok(drive.db().read()?.abandoned_upload_ids(Utc::now())?)
            })
            .await;
        match listed {
            Ok(storage_ids) => self.purge_uploads(storage_ids, &mut report).await,
            Err(e) => warn!(error = %e, "Purge: failed to list abandoned uploads"),
        }

        let drive = Arc::clone(&self.drive);
        let expired = self
            .bounded(move || -> DriveResult<usize> {
                let tx = drive.db().write()?;
                let removed = tx.remove_expired_grants(Utc::now())?;
                tx.commit()?;
                Ok(removed)
            })
            .await;
        match expired {
            Ok(n) => report.expired_grants = n,
            Err(e) => warn!(error = %e, "Purge: failed to drop expired upload grants"),
        }

        if report.purged > 0
            || report.abandoned_uploads > 0
            || report.failed > 0
            || report.timed_out > 0
        {
            info!(
                purged = report.purged,
                abandoned_uploads = report.abandoned_uploads,
                skipped = report.skipped,
                failed = report.failed,
                timed_out = report.timed_out,
                "Purge sweep finished"
            );
        }
        report
    }

    async fn purge_files(&self, file_ids: Vec<String>, report: &mut PurgeReport) {
        if !file_ids.is_empty() {
            info!(count = file_ids.len(), "Purge: sweeping pending files");
        }

        for file_id in file_ids {
            let drive = Arc::clone(&self.drive);
            let id = file_id.clone();
            match self.bounded(move || purge_file(&drive, &id)).await {
                Ok(PurgeOutcome::Purged) => {
                    report.purged += 1;
                    info!(file_id = %file_id, "Purge: file removed");
                }
                Ok(PurgeOutcome::Skipped) => report.skipped += 1,
                Err(e) => {
                    report.record_error(&e);
                    warn!(file_id = %file_id, error = %e, "Purge: failed to remove file");
                }
            }
        }
    }

    async fn purge_uploads(&self, storage_ids: Vec<String>, report: &mut PurgeReport) {
        for storage_id in storage_ids {
            let drive = Arc::clone(&self.drive);
            let id = storage_id.clone();
            match self.bounded(move || purge_abandoned_upload(&drive, &id)).await {
                Ok(PurgeOutcome::Purged) => {
                    report.abandoned_uploads += 1;
                    info!(storage_id = %storage_id, "Purge: abandoned upload removed");
                }
                Ok(PurgeOutcome::Skipped) => report.skipped += 1,
                Err(e) => {
                    report.record_error(&e);
                    warn!(
                        storage_id = %storage_id,
                        error = %e,
                        "Purge: failed to remove abandoned upload"
                    );
                }
            }
        }
    }

    /// Run blocking work on the blocking pool, bounded by the step timeout.
    ///
    /// On timeout the work is detached, not aborted, and may still commit.
    async fn bounded<T, F>(&self, work: F) -> Result<T, StepError>
    where
        T: Send + 'static,
        F: FnOnce() -> DriveResult<T> + Send + 'static,
    {
        let task = tokio::task::spawn_blocking(work);
        match tokio::time::timeout(self.step_timeout, task).await {
            Ok(Ok(result)) => Ok(result?),
            Ok(Err(join)) => Err(DriveError::Upstream(format!("purge task failed: {join}")).into()),
            Err(_) => Err(StepError::TimedOut(self.step_timeout)),
        }
    }
}

impl PurgeReport {
    fn record_error(&mut self, error: &StepError) {
        match error {
            StepError::TimedOut(_) => self.timed_out += 1,
            StepError::Failed(_) => self.failed += 1,
        }
    }
}
