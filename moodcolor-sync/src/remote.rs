//! Remote record store abstraction.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use moodcolor_core::{EmotionHistoryRecord, RecordId, SyncStatus, UserId};

use crate::error::{Result, SyncError};

/// A remote copy of users' history records, keyed by user and record id.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch one record, `None` if the remote has no copy.
    async fn fetch(&self, user: &UserId, id: RecordId) -> Result<Option<EmotionHistoryRecord>>;

    /// Every record the remote holds for a user.
    async fn fetch_all(&self, user: &UserId) -> Result<Vec<EmotionHistoryRecord>>;

    /// Create or overwrite a record.
    async fn push(&self, user: &UserId, record: &EmotionHistoryRecord) -> Result<()>;
}

/// In-process [`RemoteStore`] for tests and offline use.
///
/// [`fail_next`](Self::fail_next) makes the next call fail with the given
/// message, which is how connectivity errors are simulated.
#[derive(Debug, Default)]
pub struct InMemoryRemoteStore {
    records: Mutex<HashMap<(UserId, RecordId), EmotionHistoryRecord>>,
    failure: Mutex<Option<String>>,
}

impl InMemoryRemoteStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next operation fail with `message`.
    pub fn fail_next(&self, message: impl Into<String>) {
        *self.failure.lock() = Some(message.into());
    }

    /// Insert a record directly, bypassing failure injection.
    pub fn insert(&self, user: &UserId, record: EmotionHistoryRecord) {
        self.records.lock().insert((user.clone(), record.id), record);
    }

    /// Number of records held for `user`.
    #[must_use]
    pub fn len_for(&self, user: &UserId) -> usize {
        self.records.lock().keys().filter(|(u, _)| u == user).count()
    }

    fn check_failure(&self) -> Result<()> {
        match self.failure.lock().take() {
            Some(message) => Err(SyncError::Remote(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemoteStore {
    async fn fetch(&self, user: &UserId, id: RecordId) -> Result<Option<EmotionHistoryRecord>> {
        self.check_failure()?;
        Ok(self.records.lock().get(&(user.clone(), id)).cloned())
    }

    async fn fetch_all(&self, user: &UserId) -> Result<Vec<EmotionHistoryRecord>> {
        self.check_failure()?;
        let mut records: Vec<_> = self
            .records
            .lock()
            .iter()
            .filter(|((u, _), _)| u == user)
            .map(|(_, r)| r.clone())
            .collect();
        records.sort_by_key(|r| r.timestamp);
        Ok(records)
    }

    async fn push(&self, user: &UserId, record: &EmotionHistoryRecord) -> Result<()> {
        self.check_failure()?;
        let mut stored = record.clone();
        stored.sync_status = SyncStatus::Synced;
        debug!(user = %user, record = %record.id, "Remote record stored");
        self.records.lock().insert((user.clone(), record.id), stored);
        Ok(())
    }
}
