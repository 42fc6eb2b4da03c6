//! Async persistence boundary.
//!
//! [`DatabaseService`] is the storage seam used by the app layer and the
//! [`SyncCoordinator`](crate::sync::SyncCoordinator). The SQLite
//! implementation serialises access to one connection and runs every query
//! on tokio's blocking pool so async callers never stall the executor.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::debug;

use moodcolor_core::config::PersistenceConfig;
use moodcolor_core::persistence::EmotionStatistics;
use moodcolor_core::{EmotionData, EmotionHistoryRecord, EmotionStore, RecordId, SyncStatus, UserId};

use crate::error::{Result, SyncError};

/// Async storage operations for one or more users.
#[async_trait]
pub trait DatabaseService: Send + Sync {
    /// Upsert a user's live emotion table.
    async fn save_user_emotions(&self, user: &UserId, emotions: Vec<EmotionData>) -> Result<()>;

    /// Load a user's live emotion table.
    async fn get_user_emotions(&self, user: &UserId) -> Result<Vec<EmotionData>>;

    /// Insert or replace one history record.
    async fn add_emotion_history_record(&self, user: &UserId, record: EmotionHistoryRecord) -> Result<()>;

    /// Insert records atomically; returns how many were written.
    async fn add_emotion_history_batch(
        &self,
        user: &UserId,
        records: Vec<EmotionHistoryRecord>,
    ) -> Result<usize>;

    /// Records not yet synced, oldest first, at most `limit`.
    async fn get_unsynced_emotion_records(
        &self,
        user: &UserId,
        limit: Option<usize>,
    ) -> Result<Vec<EmotionHistoryRecord>>;

    /// Set a record's sync status.
    async fn update_emotion_sync_status(&self, user: &UserId, id: RecordId, status: SyncStatus) -> Result<()>;

    /// Records in `[start, end]`, ordered by timestamp.
    async fn get_emotion_records(
        &self,
        user: &UserId,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<EmotionHistoryRecord>>;

    /// Remove a record; `true` if it existed.
    async fn delete_emotion_record(&self, user: &UserId, id: RecordId) -> Result<bool>;

    /// Aggregate statistics over `[start, end]`.
    async fn get_emotion_statistics(
        &self,
        user: &UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<EmotionStatistics>;
}

/// [`DatabaseService`] over a local [`EmotionStore`].
#[derive(Debug, Clone)]
pub struct SqliteDatabaseService {
    store: Arc<Mutex<EmotionStore>>,
}

impl SqliteDatabaseService {
    /// Open a file-backed store.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Storage`] if the database cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P, config: &PersistenceConfig) -> Result<Self> {
        Ok(Self::from_store(EmotionStore::open(path, config)?))
    }

    /// Open an in-memory store.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Storage`] if SQLite fails to initialise.
    pub fn in_memory(config: &PersistenceConfig) -> Result<Self> {
        Ok(Self::from_store(EmotionStore::open_in_memory(config)?))
    }

    /// Wrap an already configured store (e.g. one with a cipher attached).
    #[must_use]
    pub fn from_store(store: EmotionStore) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }

    /// Run `f` against the store on the blocking pool.
    async fn with_store<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&EmotionStore) -> moodcolor_core::Result<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(&store.lock()))
            .await
            .map_err(|e| SyncError::Task(e.to_string()))?
            .map_err(SyncError::from)
    }
}

#[async_trait]
impl DatabaseService for SqliteDatabaseService {
    async fn save_user_emotions(&self, user: &UserId, emotions: Vec<EmotionData>) -> Result<()> {
        let user = user.clone();
        self.with_store(move |s| s.save_user_emotions(&user, &emotions)).await
    }

    async fn get_user_emotions(&self, user: &UserId) -> Result<Vec<EmotionData>> {
        let user = user.clone();
        self.with_store(move |s| s.get_user_emotions(&user)).await
    }

    async fn add_emotion_history_record(&self, user: &UserId, record: EmotionHistoryRecord) -> Result<()> {
        let user = user.clone();
        self.with_store(move |s| s.add_history_record(&user, &record)).await
    }

    async fn add_emotion_history_batch(
        &self,
        user: &UserId,
        records: Vec<EmotionHistoryRecord>,
    ) -> Result<usize> {
        let user = user.clone();
        let written = self
            .with_store(move |s| s.add_history_batch(&user, &records))
            .await?;
        debug!(records = written, "History batch stored");
        Ok(written)
    }

    async fn get_unsynced_emotion_records(
        &self,
        user: &UserId,
        limit: Option<usize>,
    ) -> Result<Vec<EmotionHistoryRecord>> {
        let user = user.clone();
        self.with_store(move |s| s.get_unsynced_records(&user, limit)).await
    }

    async fn update_emotion_sync_status(&self, user: &UserId, id: RecordId, status: SyncStatus) -> Result<()> {
        let user = user.clone();
        self.with_store(move |s| s.update_sync_status(&user, id, status)).await
    }

    async fn get_emotion_records(
        &self,
        user: &UserId,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<EmotionHistoryRecord>> {
        let user = user.clone();
        self.with_store(move |s| s.get_records(&user, start, end)).await
    }

    async fn delete_emotion_record(&self, user: &UserId, id: RecordId) -> Result<bool> {
        let user = user.clone();
        self.with_store(move |s| s.delete_record(&user, id)).await
    }

    async fn get_emotion_statistics(
        &self,
        user: &UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<EmotionStatistics> {
        let user = user.clone();
        self.with_store(move |s| s.get_statistics(&user, start, end)).await
    }
}
