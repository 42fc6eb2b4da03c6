//! Push/pull of history records between the local store and a remote.
//!
//! A push pass takes up to `batch_size` unsynced records, oldest first, and
//! for each one:
//!
//! 1. Remote has no copy, or an identical one: push and mark `Synced`.
//! 2. Remote copy differs: apply the configured [`ConflictResolution`].
//!
//! | Strategy     | Local row afterwards                   | Remote afterwards        |
//! |--------------|----------------------------------------|--------------------------|
//! | `ServerWins` | replaced by remote copy, `Synced`      | unchanged                |
//! | `ClientWins` | unchanged, `Synced`                    | overwritten by local     |
//! | `MostRecent` | later timestamp wins (ties go local)   | later timestamp wins     |
//! | `KeepBoth`   | remote copy under the old id, local copy re-keyed, both `Synced` | both present |
//! | `AskUser`    | marked `Conflict`                      | unchanged                |
//!
//! A remote failure aborts the pass; records already handled keep their
//! new status and the rest stay unsynced for the next pass.

use std::collections::HashSet;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use moodcolor_core::config::SyncConfig;
use moodcolor_core::emotion::ConflictResolution;
use moodcolor_core::{EmotionHistoryRecord, RecordId, SyncStatus, UserId};

use crate::database::DatabaseService;
use crate::error::Result;
use crate::remote::RemoteStore;

/// Outcome of one push pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Records written to the remote.
    pub pushed: usize,
    /// Records whose local copy was replaced by the remote one.
    pub kept_remote: usize,
    /// Records duplicated under a fresh id (`KeepBoth`).
    pub duplicated: usize,
    /// Records left in `Conflict` for the user.
    pub conflicts: usize,
}

/// Drives sync between a [`DatabaseService`] and a [`RemoteStore`].
#[derive(Debug)]
pub struct SyncCoordinator<D, R> {
    db: D,
    remote: R,
    resolution: ConflictResolution,
    batch_size: usize,
}

impl<D: DatabaseService, R: RemoteStore> SyncCoordinator<D, R> {
    /// Create a coordinator with the given sync settings.
    #[must_use]
    pub fn new(db: D, remote: R, config: &SyncConfig) -> Self {
        Self {
            db,
            remote,
            resolution: config.conflict_resolution,
            batch_size: config.batch_size.max(1),
        }
    }

    /// The local store.
    #[must_use]
    pub fn db(&self) -> &D {
        &self.db
    }

    /// The remote store.
    #[must_use]
    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Push one batch of unsynced records.
    ///
    /// # Errors
    ///
    /// Returns the first storage or remote error; see the module docs for
    /// what has been applied by then.
    pub async fn push_unsynced(&self, user: &UserId) -> Result<SyncReport> {
        let start = Instant::now();
        let pending = self
            .db
            .get_unsynced_emotion_records(user, Some(self.batch_size))
            .await?;
        let mut report = SyncReport::default();

        for local in pending {
            match self.remote.fetch(user, local.id).await? {
                None => self.push_and_mark(user, &local, &mut report).await?,
                Some(remote) if same_content(&local, &remote) => {
                    self.db
                        .update_emotion_sync_status(user, local.id, SyncStatus::Synced)
                        .await?;
                    report.pushed += 1;
                }
                Some(remote) => self.resolve(user, local, remote, &mut report).await?,
            }
        }

        info!(
            user = %user,
            pushed = report.pushed,
            kept_remote = report.kept_remote,
            duplicated = report.duplicated,
            conflicts = report.conflicts,
            elapsed_us = start.elapsed().as_micros(),
            "Sync pass complete"
        );
        Ok(report)
    }

    /// Store remote records missing locally as `Synced`. Returns how many
    /// were added.
    ///
    /// # Errors
    ///
    /// Returns the first storage or remote error.
    pub async fn pull_remote(&self, user: &UserId) -> Result<usize> {
        let known: HashSet<RecordId> = self
            .db
            .get_emotion_records(user, None, None)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();
        let missing: Vec<EmotionHistoryRecord> = self
            .remote
            .fetch_all(user)
            .await?
            .into_iter()
            .filter(|r| !known.contains(&r.id))
            .map(|mut r| {
                r.sync_status = SyncStatus::Synced;
                r
            })
            .collect();
        if missing.is_empty() {
            return Ok(0);
        }
        let added = self.db.add_emotion_history_batch(user, missing).await?;
        debug!(user = %user, added, "Pulled remote records");
        Ok(added)
    }

    async fn push_and_mark(
        &self,
        user: &UserId,
        record: &EmotionHistoryRecord,
        report: &mut SyncReport,
    ) -> Result<()> {
        self.remote.push(user, record).await?;
        self.db
            .update_emotion_sync_status(user, record.id, SyncStatus::Synced)
            .await?;
        report.pushed += 1;
        Ok(())
    }

    async fn keep_remote(
        &self,
        user: &UserId,
        mut remote: EmotionHistoryRecord,
        report: &mut SyncReport,
    ) -> Result<()> {
        remote.sync_status = SyncStatus::Synced;
        self.db.add_emotion_history_record(user, remote).await?;
        report.kept_remote += 1;
        Ok(())
    }

    async fn resolve(
        &self,
        user: &UserId,
        local: EmotionHistoryRecord,
        remote: EmotionHistoryRecord,
        report: &mut SyncReport,
    ) -> Result<()> {
        debug!(
            user = %user,
            record = %local.id,
            strategy = ?self.resolution,
            "Resolving sync conflict"
        );
        match self.resolution {
            ConflictResolution::ServerWins => self.keep_remote(user, remote, report).await,
            ConflictResolution::ClientWins => self.push_and_mark(user, &local, report).await,
            ConflictResolution::MostRecent => {
                if local.timestamp >= remote.timestamp {
                    self.push_and_mark(user, &local, report).await
                } else {
                    self.keep_remote(user, remote, report).await
                }
            }
            ConflictResolution::KeepBoth => {
                let mut copy = local;
                copy.id = RecordId::new();
                self.remote.push(user, &copy).await?;
                self.keep_remote(user, remote, report).await?;
                copy.sync_status = SyncStatus::Synced;
                self.db.add_emotion_history_record(user, copy).await?;
                report.pushed += 1;
                report.duplicated += 1;
                Ok(())
            }
            ConflictResolution::AskUser => {
                warn!(user = %user, record = %local.id, "Sync conflict left for the user");
                self.db
                    .update_emotion_sync_status(user, local.id, SyncStatus::Conflict)
                    .await?;
                report.conflicts += 1;
                Ok(())
            }
        }
    }
}

/// Equal apart from sync bookkeeping.
fn same_content(a: &EmotionHistoryRecord, b: &EmotionHistoryRecord) -> bool {
    let mut b = b.clone();
    b.sync_status = a.sync_status;
    *a == b
}
