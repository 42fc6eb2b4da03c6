//! SQLite persistence for emotion tables and history records.
//!
//! Schema:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS user_emotions (
//!     user_id      TEXT NOT NULL,
//!     emotion_type TEXT NOT NULL,
//!     data         TEXT NOT NULL,
//!     updated_at   TEXT NOT NULL,
//!     PRIMARY KEY (user_id, emotion_type)
//! );
//! CREATE TABLE IF NOT EXISTS emotion_records (
//!     id           TEXT PRIMARY KEY,
//!     user_id      TEXT NOT NULL,
//!     emotion_type TEXT NOT NULL,
//!     timestamp    TEXT NOT NULL,
//!     sync_status  TEXT NOT NULL,
//!     payload      TEXT NOT NULL
//! );
//! ```
//!
//! Record payloads use the compression wire format
//! ([`PayloadCodec`]) and, when a cipher is attached, are encrypted on top.
//! Indexed columns (`timestamp`, `sync_status`) stay in clear text so range
//! and unsynced queries never decode payloads they do not return.
//! Timestamps are fixed-width RFC 3339 (`...T12:00:00.000000Z`) so text
//! comparison matches time order.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::codec::{DataEncryptionService, PayloadCodec};
use crate::config::PersistenceConfig;
use crate::emotion::{EmotionData, EmotionHistoryRecord, SyncStatus};
use crate::error::{MoodError, Result};
use crate::metrics::MoodCounters;
use crate::types::{EmotionType, RecordId, UserId};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS user_emotions (
        user_id      TEXT NOT NULL,
        emotion_type TEXT NOT NULL,
        data         TEXT NOT NULL,
        updated_at   TEXT NOT NULL,
        PRIMARY KEY (user_id, emotion_type)
    );
    CREATE TABLE IF NOT EXISTS emotion_records (
        id           TEXT PRIMARY KEY,
        user_id      TEXT NOT NULL,
        emotion_type TEXT NOT NULL,
        timestamp    TEXT NOT NULL,
        sync_status  TEXT NOT NULL,
        payload      TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_records_user_sync ON emotion_records (user_id, sync_status);
    CREATE INDEX IF NOT EXISTS idx_records_user_time ON emotion_records (user_id, timestamp);
";

/// Aggregate statistics over a user's records in a time window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmotionStatistics {
    /// Records in the window.
    pub total_entries: usize,
    /// Records per emotion type (unknown type names are skipped).
    pub emotion_counts: BTreeMap<EmotionType, usize>,
    /// Mean intensity per emotion type.
    pub average_intensity: BTreeMap<EmotionType, f32>,
    /// Emotion with the most records (lowest type wins ties).
    pub most_frequent: Option<EmotionType>,
    /// Records in the window not yet synced.
    pub unsynced_entries: usize,
}

/// Handle to an open SQLite database holding emotion state.
pub struct EmotionStore {
    conn: Connection,
    config: PersistenceConfig,
    codec: PayloadCodec,
    cipher: Option<DataEncryptionService>,
    counters: Arc<MoodCounters>,
    db_path: PathBuf,
}

impl std::fmt::Debug for EmotionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmotionStore")
            .field("db_path", &self.db_path)
            .field("config", &self.config)
            .field("encrypted", &self.cipher.is_some())
            .finish_non_exhaustive()
    }
}

impl EmotionStore {
    /// Open (or create) a database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`MoodError::Database`] on SQLite failures.
    pub fn open<P: AsRef<Path>>(path: P, config: &PersistenceConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&db_path, flags)?;

        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;

        info!(
            path = %db_path.display(),
            wal = config.wal_mode,
            "Emotion store opened"
        );
        Ok(Self::from_connection(conn, config, db_path))
    }

    /// Open an in-memory database (useful for tests).
    ///
    /// # Errors
    ///
    /// Returns [`MoodError::Database`] on SQLite failures.
    pub fn open_in_memory(config: &PersistenceConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self::from_connection(conn, config, PathBuf::from(":memory:")))
    }

    fn from_connection(conn: Connection, config: &PersistenceConfig, db_path: PathBuf) -> Self {
        Self {
            conn,
            config: config.clone(),
            codec: PayloadCodec::new(config.compression_threshold),
            cipher: None,
            counters: Arc::new(MoodCounters::new()),
            db_path,
        }
    }

    /// Encrypt record payloads with `cipher` from now on. Payloads written
    /// earlier without a cipher (or with another key) will fail to decode
    /// and be skipped with a warning.
    #[must_use]
    pub fn with_cipher(mut self, cipher: DataEncryptionService) -> Self {
        self.cipher = Some(cipher);
        self
    }

    /// Share counters with the rest of the application.
    #[must_use]
    pub fn with_counters(mut self, counters: Arc<MoodCounters>) -> Self {
        self.counters = counters;
        self
    }

    // ------------------------------------------------------------------
    // Live emotion table
    // ------------------------------------------------------------------

    /// Upsert a user's live emotion table in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`MoodError::Serialization`] or [`MoodError::Database`].
    pub fn save_user_emotions(&self, user: &UserId, emotions: &[EmotionData]) -> Result<()> {
        let now = timestamp_text(Utc::now());
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO user_emotions (user_id, emotion_type, data, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_id, emotion_type) DO UPDATE SET
                    data = excluded.data,
                    updated_at = excluded.updated_at",
            )?;
            for data in emotions {
                let json = serde_json::to_string(data)?;
                stmt.execute(params![user.as_str(), data.emotion_type.as_str(), json, now])?;
            }
        }
        tx.commit()?;
        debug!(user = %user, emotions = emotions.len(), "Saved user emotions");
        Ok(())
    }

    /// Load a user's live emotion table. Rows that fail to decode (e.g. an
    /// emotion type this build does not know) are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`MoodError::Database`] on SQLite failures.
    pub fn get_user_emotions(&self, user: &UserId) -> Result<Vec<EmotionData>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT emotion_type, data FROM user_emotions WHERE user_id = ?1 ORDER BY emotion_type",
        )?;
        let rows = stmt.query_map(params![user.as_str()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut emotions = Vec::new();
        for row in rows {
            let (name, json) = row?;
            match serde_json::from_str::<EmotionData>(&json) {
                Ok(data) => emotions.push(data),
                Err(e) => {
                    self.counters.record_decode_failure();
                    warn!(user = %user, emotion = %name, error = %e, "Skipping undecodable emotion row");
                }
            }
        }
        Ok(emotions)
    }

    // ------------------------------------------------------------------
    // History records
    // ------------------------------------------------------------------

    /// Insert or replace a single record.
    ///
    /// # Errors
    ///
    /// Returns codec errors or [`MoodError::Database`].
    pub fn add_history_record(&self, user: &UserId, record: &EmotionHistoryRecord) -> Result<()> {
        let payload = self.encode_payload(record)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO emotion_records
                (id, user_id, emotion_type, timestamp, sync_status, payload)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.id.to_string(),
                user.as_str(),
                record.emotion_type,
                timestamp_text(record.timestamp),
                record.sync_status.as_str(),
                payload
            ],
        )?;
        self.counters.record_saved(1);
        debug!(user = %user, record = %record.id, "Saved history record");
        Ok(())
    }

    /// Insert a batch of records atomically: either all rows are written or
    /// none are. Returns the number of rows written.
    ///
    /// # Errors
    ///
    /// Returns codec errors or [`MoodError::Database`]; on error nothing is
    /// committed.
    pub fn add_history_batch(&self, user: &UserId, records: &[EmotionHistoryRecord]) -> Result<usize> {
        let start = Instant::now();
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO emotion_records
                    (id, user_id, emotion_type, timestamp, sync_status, payload)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for record in records {
                let payload = self.encode_payload(record)?;
                stmt.execute(params![
                    record.id.to_string(),
                    user.as_str(),
                    record.emotion_type,
                    timestamp_text(record.timestamp),
                    record.sync_status.as_str(),
                    payload
                ])?;
            }
        }
        tx.commit()?;
        self.counters.record_saved(records.len() as u64);
        debug!(
            user = %user,
            records = records.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Saved history batch"
        );
        Ok(records.len())
    }

    /// Fetch one record.
    ///
    /// # Errors
    ///
    /// Returns [`MoodError::Database`] on SQLite failures.
    pub fn get_record(&self, user: &UserId, id: RecordId) -> Result<Option<EmotionHistoryRecord>> {
        let row: Option<(String, String)> = self
            .conn
            .prepare_cached(
                "SELECT sync_status, payload FROM emotion_records WHERE user_id = ?1 AND id = ?2",
            )?
            .query_row(params![user.as_str(), id.to_string()], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .optional()?;
        Ok(row.and_then(|(status, payload)| self.decode_row(&status, &payload)))
    }

    /// Records with `start <= timestamp <= end`, ordered by timestamp.
    /// `None` bounds are unbounded.
    ///
    /// # Errors
    ///
    /// Returns [`MoodError::Database`] on SQLite failures.
    pub fn get_records(
        &self,
        user: &UserId,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<EmotionHistoryRecord>> {
        let start = start.map_or_else(String::new, timestamp_text);
        // '~' sorts after every digit, so it bounds any timestamp text.
        let end = end.map_or_else(|| "~".to_string(), timestamp_text);
        self.query_records(
            "SELECT sync_status, payload FROM emotion_records
             WHERE user_id = ?1 AND timestamp >= ?2 AND timestamp <= ?3
             ORDER BY timestamp, id",
            params![user.as_str(), start, end],
        )
    }

    /// Records not yet pushed to the remote store, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`MoodError::Database`] on SQLite failures.
    pub fn get_unsynced_records(
        &self,
        user: &UserId,
        limit: Option<usize>,
    ) -> Result<Vec<EmotionHistoryRecord>> {
        let limit = limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
        self.query_records(
            "SELECT sync_status, payload FROM emotion_records
             WHERE user_id = ?1 AND sync_status = ?2
             ORDER BY timestamp, id
             LIMIT ?3",
            params![user.as_str(), SyncStatus::Unsynced.as_str(), limit],
        )
    }

    /// Set the sync status of a record.
    ///
    /// # Errors
    ///
    /// Returns [`MoodError::RecordNotFound`] if no such record exists for
    /// the user, or [`MoodError::Database`].
    pub fn update_sync_status(&self, user: &UserId, id: RecordId, status: SyncStatus) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE emotion_records SET sync_status = ?1 WHERE user_id = ?2 AND id = ?3",
            params![status.as_str(), user.as_str(), id.to_string()],
        )?;
        if updated == 0 {
            return Err(MoodError::RecordNotFound(id));
        }
        debug!(user = %user, record = %id, status = status.as_str(), "Sync status updated");
        Ok(())
    }

    /// Remove a record. Returns `true` if a row was deleted.
    ///
    /// # Errors
    ///
    /// Returns [`MoodError::Database`] on SQLite failures.
    pub fn delete_record(&self, user: &UserId, id: RecordId) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM emotion_records WHERE user_id = ?1 AND id = ?2",
            params![user.as_str(), id.to_string()],
        )?;
        Ok(deleted > 0)
    }

    /// Aggregate statistics over `[start, end]`.
    ///
    /// # Errors
    ///
    /// Returns [`MoodError::Database`] on SQLite failures.
    pub fn get_statistics(
        &self,
        user: &UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<EmotionStatistics> {
        let records = self.get_records(user, Some(start), Some(end))?;
        let mut stats = EmotionStatistics {
            total_entries: records.len(),
            ..EmotionStatistics::default()
        };
        let mut sums: BTreeMap<EmotionType, f32> = BTreeMap::new();
        for record in &records {
            if record.sync_status == SyncStatus::Unsynced {
                stats.unsynced_entries += 1;
            }
            let Some(t) = record.parsed_emotion_type() else {
                continue;
            };
            *stats.emotion_counts.entry(t).or_default() += 1;
            *sums.entry(t).or_default() += record.intensity;
        }
        stats.average_intensity = sums
            .into_iter()
            .map(|(t, sum)| (t, sum / stats.emotion_counts[&t] as f32))
            .collect();
        stats.most_frequent = stats
            .emotion_counts
            .iter()
            .rev()
            .max_by_key(|(_, c)| **c)
            .map(|(t, _)| *t);
        Ok(stats)
    }

    // ------------------------------------------------------------------
    // Utility
    // ------------------------------------------------------------------

    /// Path to the database file (or `:memory:`).
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Counters updated by this store.
    #[must_use]
    pub fn counters(&self) -> &Arc<MoodCounters> {
        &self.counters
    }

    /// Run SQLite's integrity check.
    ///
    /// # Errors
    ///
    /// Returns [`MoodError::Database`] if the check query itself fails.
    pub fn integrity_check(&self) -> Result<bool> {
        let result: String = self
            .conn
            .query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        Ok(result == "ok")
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn query_records(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<EmotionHistoryRecord>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt.query_map(params, |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut records = Vec::new();
        for row in rows {
            let (status, payload) = row?;
            if let Some(record) = self.decode_row(&status, &payload) {
                records.push(record);
            }
        }
        Ok(records)
    }

    fn encode_payload(&self, record: &EmotionHistoryRecord) -> Result<String> {
        let encoded = self.codec.encode(record)?;
        match &self.cipher {
            Some(cipher) => cipher.encrypt(&encoded),
            None => Ok(encoded),
        }
    }

    /// Decode a payload; the `sync_status` column is authoritative because
    /// status updates do not rewrite the payload.
    fn decode_row(&self, status: &str, payload: &str) -> Option<EmotionHistoryRecord> {
        let text = match &self.cipher {
            Some(cipher) => cipher.decrypt_or_none(payload),
            None => Some(payload.to_string()),
        };
        let record = text.and_then(|t| self.codec.decode_or_none::<EmotionHistoryRecord>(&t));
        match record {
            Some(mut r) => {
                r.sync_status = SyncStatus::parse(status);
                Some(r)
            }
            None => {
                self.counters.record_decode_failure();
                None
            }
        }
    }
}

fn timestamp_text(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::EmotionHistoryEntry;
    use crate::types::EmotionEventType;
    use chrono::{Duration, TimeZone};

    fn store() -> EmotionStore {
        EmotionStore::open_in_memory(&PersistenceConfig::default()).expect("open")
    }

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, day, 12, 0, 0)
            .single()
            .expect("valid date")
    }

    fn record(t: EmotionType, intensity: f32, ts: DateTime<Utc>) -> EmotionHistoryRecord {
        let entry = EmotionHistoryEntry::new(
            EmotionData::new(t, 0.5, intensity, ts),
            EmotionEventType::ValueChanged,
            ts,
        );
        EmotionHistoryRecord::from_entry(&entry)
    }

    #[test]
    fn user_emotions_round_trip() {
        let s = store();
        let user = UserId::new("u1");
        let now = Utc::now();
        let table: Vec<EmotionData> = EmotionType::ALL
            .into_iter()
            .map(|t| EmotionData::new(t, 0.25, 0.5, now))
            .collect();
        s.save_user_emotions(&user, &table).expect("save");
        let mut updated = table[0].clone();
        updated.value = 0.9;
        s.save_user_emotions(&user, &[updated]).expect("upsert");

        let loaded = s.get_user_emotions(&user).expect("load");
        assert_eq!(loaded.len(), EmotionType::COUNT);
        let joy = loaded
            .iter()
            .find(|d| d.emotion_type == EmotionType::Joy)
            .expect("joy");
        assert!((joy.value - 0.9).abs() < f32::EPSILON);
        assert!(s.get_user_emotions(&UserId::new("other")).expect("load").is_empty());
    }

    #[test]
    fn record_round_trip_and_sync_status() {
        let s = store();
        let user = UserId::new("u1");
        let r = record(EmotionType::Joy, 0.4, at(1));
        s.add_history_record(&user, &r).expect("add");

        assert_eq!(s.get_unsynced_records(&user, None).expect("unsynced").len(), 1);
        s.update_sync_status(&user, r.id, SyncStatus::Synced).expect("update");
        assert!(s.get_unsynced_records(&user, None).expect("unsynced").is_empty());

        let loaded = s.get_record(&user, r.id).expect("get").expect("Some");
        assert_eq!(loaded.sync_status, SyncStatus::Synced);
        assert_eq!(loaded.emotion_type, r.emotion_type);
        assert_eq!(loaded.timestamp, r.timestamp);
    }

    #[test]
    fn update_missing_record_is_not_found() {
        let s = store();
        let err = s
            .update_sync_status(&UserId::new("u1"), RecordId::new(), SyncStatus::Synced)
            .expect_err("missing");
        assert!(matches!(err, MoodError::RecordNotFound(_)));
    }

    #[test]
    fn batch_insert_and_range_query() {
        let s = store();
        let user = UserId::new("u1");
        let batch = vec![
            record(EmotionType::Joy, 0.2, at(1)),
            record(EmotionType::Joy, 0.6, at(2)),
            record(EmotionType::Fear, 0.9, at(3)),
            record(EmotionType::Calm, 0.1, at(10)),
        ];
        assert_eq!(s.add_history_batch(&user, &batch).expect("batch"), 4);

        let window = s.get_records(&user, Some(at(2)), Some(at(3))).expect("range");
        assert_eq!(window.len(), 2);
        assert!(window[0].timestamp <= window[1].timestamp);
        assert_eq!(s.get_records(&user, None, None).expect("all").len(), 4);

        let limited = s.get_unsynced_records(&user, Some(2)).expect("unsynced");
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].timestamp, at(1));
    }

    #[test]
    fn statistics_over_window() {
        let s = store();
        let user = UserId::new("u1");
        let batch = vec![
            record(EmotionType::Joy, 0.2, at(1)),
            record(EmotionType::Joy, 0.6, at(1) + Duration::hours(1)),
            record(EmotionType::Fear, 0.9, at(2)),
            record(EmotionType::Calm, 0.1, at(20)),
        ];
        s.add_history_batch(&user, &batch).expect("batch");
        s.update_sync_status(&user, batch[2].id, SyncStatus::Synced).expect("sync");

        let stats = s.get_statistics(&user, at(1), at(5)).expect("stats");
        assert_eq!(stats.total_entries, 3);
        assert_eq!(stats.emotion_counts[&EmotionType::Joy], 2);
        assert!((stats.average_intensity[&EmotionType::Joy] - 0.4).abs() < 1e-6);
        assert_eq!(stats.most_frequent, Some(EmotionType::Joy));
        assert_eq!(stats.unsynced_entries, 2);
    }

    #[test]
    fn large_payloads_are_compressed_at_rest() {
        let s = store();
        let user = UserId::new("u1");
        let mut r = record(EmotionType::Love, 0.5, at(1));
        r.note = Some("a long reflective journal note ".repeat(60));
        s.add_history_record(&user, &r).expect("add");

        let raw: String = s
            .conn
            .query_row("SELECT payload FROM emotion_records", [], |row| row.get(0))
            .expect("raw");
        assert!(raw.starts_with("COMP:"));
        let loaded = s.get_record(&user, r.id).expect("get").expect("Some");
        assert_eq!(loaded.note, r.note);
    }

    #[test]
    fn encrypted_payloads_need_the_key() {
        let user = UserId::new("u1");
        let cipher = DataEncryptionService::with_random_key();
        let s = store().with_cipher(cipher);
        let r = record(EmotionType::Anxiety, 0.7, at(1));
        s.add_history_record(&user, &r).expect("add");
        assert!(s.get_record(&user, r.id).expect("get").is_some());

        let raw: String = s
            .conn
            .query_row("SELECT payload FROM emotion_records", [], |row| row.get(0))
            .expect("raw");
        assert!(!raw.contains("Anxiety"));

        // Swap in another key: the row is skipped, not an error.
        let s = s.with_cipher(DataEncryptionService::with_random_key());
        assert!(s.get_record(&user, r.id).expect("get").is_none());
        assert_eq!(s.counters().snapshot().decode_failures, 1);
    }

    #[test]
    fn file_backed_store_persists() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("moodcolor.db");
        let user = UserId::new("u1");
        let r = record(EmotionType::Trust, 0.3, at(4));
        {
            let s = EmotionStore::open(&path, &PersistenceConfig::default()).expect("open");
            s.add_history_record(&user, &r).expect("add");
            assert!(s.integrity_check().expect("check"));
        }
        let s = EmotionStore::open(&path, &PersistenceConfig::default()).expect("reopen");
        assert_eq!(s.get_records(&user, None, None).expect("all").len(), 1);
    }
}
