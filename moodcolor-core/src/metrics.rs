//! Runtime counters for the emotion core.
//!
//! Lock-free `AtomicU64` counters incremented on the hot path and read on
//! export. Snapshots render in Prometheus text format for dashboards.

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters for emotion-core events.
#[derive(Debug)]
pub struct MoodCounters {
    /// Value and intensity updates applied.
    pub emotions_updated: AtomicU64,
    /// Mix attempts, successful or not.
    pub mixes_attempted: AtomicU64,
    /// Mixes that produced a result.
    pub mixes_succeeded: AtomicU64,
    /// History entries appended (and events published).
    pub events_recorded: AtomicU64,
    /// Unknown emotion/event names or missing table entries.
    pub unknown_inputs: AtomicU64,
    /// Records written to the local store.
    pub records_saved: AtomicU64,
    /// Payloads that failed to decompress or decrypt.
    pub decode_failures: AtomicU64,
}

impl MoodCounters {
    /// Create a new set of zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            emotions_updated: AtomicU64::new(0),
            mixes_attempted: AtomicU64::new(0),
            mixes_succeeded: AtomicU64::new(0),
            events_recorded: AtomicU64::new(0),
            unknown_inputs: AtomicU64::new(0),
            records_saved: AtomicU64::new(0),
            decode_failures: AtomicU64::new(0),
        }
    }

    pub(crate) fn record_update(&self) {
        self.emotions_updated.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_mix_attempt(&self) {
        self.mixes_attempted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_mix_success(&self) {
        self.mixes_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_event(&self) {
        self.events_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_unknown_input(&self) {
        self.unknown_inputs.fetch_add(1, Ordering::Relaxed);
    }

    /// Count records written to storage.
    pub fn record_saved(&self, n: u64) {
        self.records_saved.fetch_add(n, Ordering::Relaxed);
    }

    /// Count a payload decode failure.
    pub fn record_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot all counters for export.
    #[must_use]
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            emotions_updated: self.emotions_updated.load(Ordering::Relaxed),
            mixes_attempted: self.mixes_attempted.load(Ordering::Relaxed),
            mixes_succeeded: self.mixes_succeeded.load(Ordering::Relaxed),
            events_recorded: self.events_recorded.load(Ordering::Relaxed),
            unknown_inputs: self.unknown_inputs.load(Ordering::Relaxed),
            records_saved: self.records_saved.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for MoodCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// A snapshot of counter values at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterSnapshot {
    /// Value and intensity updates applied.
    pub emotions_updated: u64,
    /// Mix attempts.
    pub mixes_attempted: u64,
    /// Successful mixes.
    pub mixes_succeeded: u64,
    /// History entries appended.
    pub events_recorded: u64,
    /// Unknown inputs ignored.
    pub unknown_inputs: u64,
    /// Records saved to the local store.
    pub records_saved: u64,
    /// Payload decode failures.
    pub decode_failures: u64,
}

impl CounterSnapshot {
    /// Format as Prometheus-compatible text.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        let rows = [
            ("emotions_updated", "Emotion value and intensity updates", self.emotions_updated),
            ("mixes_attempted", "Emotion mix attempts", self.mixes_attempted),
            ("mixes_succeeded", "Successful emotion mixes", self.mixes_succeeded),
            ("events_recorded", "History entries recorded", self.events_recorded),
            ("unknown_inputs", "Unknown emotion or event inputs ignored", self.unknown_inputs),
            ("records_saved", "History records saved locally", self.records_saved),
            ("decode_failures", "Payloads that failed to decode", self.decode_failures),
        ];
        let mut out = String::new();
        for (name, help, value) in rows {
            out.push_str(&format!(
                "# HELP moodcolor_{name}_total {help}\n\
                 # TYPE moodcolor_{name}_total counter\n\
                 moodcolor_{name}_total {value}\n"
            ));
        }
        out
    }
}
