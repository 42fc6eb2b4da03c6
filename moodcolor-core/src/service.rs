//! The emotion service: single in-memory source of truth for a user's
//! live emotion table, the append-only history log and derived analytics.
//!
//! ## Failure contract
//!
//! No operation on [`EmotionService`] panics or returns an error because of
//! bad input. Unknown emotion names and missing table entries are logged with
//! `tracing::warn!` and degrade to a default value or a no-op. UI callers can
//! therefore call these methods unconditionally.
//!
//! ## Atomicity
//!
//! Every mutating operation runs update → history append → event publish in
//! that order, synchronously, after all validation has passed. Nothing is
//! recorded when validation fails.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use tracing::{debug, warn};

use crate::config::{EmotionConfig, MoodConfig};
use crate::emotion::{EmotionData, EmotionHistoryEntry};
use crate::events::{EmotionEvent, EventBus, Subscription};
use crate::metrics::MoodCounters;
use crate::policy::{DayOverDayDelta, MixPolicy, RecipeMix, TrendPolicy};
use crate::stats::{self, CombinationStat, FrequencyStat, TimeOfDayStats, TrendStat};
use crate::types::{EmotionEventType, EmotionType, TimeOfDay};

/// Per-user emotion state and history.
pub struct EmotionService {
    emotions: HashMap<EmotionType, EmotionData>,
    history: Vec<EmotionHistoryEntry>,
    config: EmotionConfig,
    offset: FixedOffset,
    mix_policy: Box<dyn MixPolicy>,
    trend_policy: Box<dyn TrendPolicy>,
    events: EventBus,
    counters: Arc<MoodCounters>,
}

impl std::fmt::Debug for EmotionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmotionService")
            .field("emotions", &self.emotions.len())
            .field("history", &self.history.len())
            .field("config", &self.config)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

impl EmotionService {
    /// Create a service with every emotion type initialised to the
    /// configured defaults.
    #[must_use]
    pub fn new(
        config: EmotionConfig,
        mix_policy: Box<dyn MixPolicy>,
        trend_policy: Box<dyn TrendPolicy>,
        events: EventBus,
        counters: Arc<MoodCounters>,
    ) -> Self {
        let now = Utc::now();
        let emotions = EmotionType::ALL
            .into_iter()
            .map(|t| {
                (
                    t,
                    EmotionData::new(t, config.default_value, config.default_intensity, now),
                )
            })
            .collect();
        let offset = config.local_offset();
        Self {
            emotions,
            history: Vec::new(),
            config,
            offset,
            mix_policy,
            trend_policy,
            events,
            counters,
        }
    }

    /// Create a service from the full configuration with the default
    /// policies (recipe mixing, day-over-day trend) and a fresh event bus.
    #[must_use]
    pub fn from_config(config: &MoodConfig) -> Self {
        Self::new(
            config.emotion.clone(),
            Box::new(RecipeMix::from_config(&config.mixing)),
            Box::new(DayOverDayDelta),
            EventBus::new(),
            Arc::new(MoodCounters::new()),
        )
    }

    /// The event bus this service publishes to.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Shorthand for `self.events().subscribe(listener)`.
    #[must_use = "dropping the Subscription immediately unsubscribes"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&EmotionEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(listener)
    }

    /// Counters shared with this service.
    #[must_use]
    pub fn counters(&self) -> &Arc<MoodCounters> {
        &self.counters
    }

    // ------------------------------------------------------------------
    // Live table
    // ------------------------------------------------------------------

    /// Snapshot of the current state of one emotion.
    ///
    /// A missing table entry is a configuration error; it is logged and a
    /// default snapshot is returned.
    #[must_use]
    pub fn get_emotion(&self, emotion_type: EmotionType) -> EmotionData {
        if let Some(data) = self.emotions.get(&emotion_type) {
            data.clone()
        } else {
            self.counters.record_unknown_input();
            warn!(emotion = %emotion_type, "Emotion missing from table, returning default");
            self.default_emotion(emotion_type, Utc::now())
        }
    }

    /// Like [`get_emotion`](Self::get_emotion) for a wire name. Unknown
    /// names log a warning and return `None`.
    #[must_use]
    pub fn get_emotion_by_name(&self, name: &str) -> Option<EmotionData> {
        match EmotionType::parse(name) {
            Some(t) => Some(self.get_emotion(t)),
            None => {
                self.counters.record_unknown_input();
                None
            }
        }
    }

    /// Snapshot of the whole table, ordered by emotion type.
    #[must_use]
    pub fn emotions(&self) -> BTreeMap<EmotionType, EmotionData> {
        self.emotions
            .iter()
            .map(|(t, d)| (*t, d.clone()))
            .collect()
    }

    /// Set the value of an emotion (clamped to `[0, 1]`), log a
    /// `ValueChanged` entry and publish one event.
    pub fn update_emotion_value(&mut self, emotion_type: EmotionType, value: f32) {
        self.update_emotion_value_at(emotion_type, value, Utc::now());
    }

    /// [`update_emotion_value`](Self::update_emotion_value) with an explicit
    /// timestamp (used when replaying or importing events).
    pub fn update_emotion_value_at(
        &mut self,
        emotion_type: EmotionType,
        value: f32,
        now: DateTime<Utc>,
    ) {
        let Some(data) = self.live_entry(emotion_type) else {
            return;
        };
        data.set_value(value, now);
        let snapshot = data.clone();
        self.counters.record_update();
        self.record(
            EmotionHistoryEntry::new(snapshot, EmotionEventType::ValueChanged, now),
        );
    }

    /// Set the intensity of an emotion (clamped to `[0, 1]`), log an
    /// `IntensityChanged` entry and publish one event.
    pub fn update_emotion_intensity(&mut self, emotion_type: EmotionType, intensity: f32) {
        self.update_emotion_intensity_at(emotion_type, intensity, Utc::now());
    }

    /// [`update_emotion_intensity`](Self::update_emotion_intensity) with an
    /// explicit timestamp.
    pub fn update_emotion_intensity_at(
        &mut self,
        emotion_type: EmotionType,
        intensity: f32,
        now: DateTime<Utc>,
    ) {
        let Some(data) = self.live_entry(emotion_type) else {
            return;
        };
        data.set_intensity(intensity, now);
        let snapshot = data.clone();
        self.counters.record_update();
        self.record(
            EmotionHistoryEntry::new(snapshot, EmotionEventType::IntensityChanged, now),
        );
    }

    /// Mix two emotions.
    ///
    /// Returns `false` without recording anything when the sources are the
    /// same type, either source is missing or has no value, or the mix policy
    /// refuses the pair. On success the outcome is written to the result
    /// emotion's live entry, one `EmotionMixed` entry is appended and one
    /// event is published.
    pub fn try_mix_emotions(&mut self, first: EmotionType, second: EmotionType) -> bool {
        self.try_mix_emotions_at(first, second, Utc::now())
    }

    /// [`try_mix_emotions`](Self::try_mix_emotions) with an explicit timestamp.
    pub fn try_mix_emotions_at(
        &mut self,
        first: EmotionType,
        second: EmotionType,
        now: DateTime<Utc>,
    ) -> bool {
        self.counters.record_mix_attempt();
        if first == second {
            debug!(emotion = %first, "Cannot mix an emotion with itself");
            return false;
        }
        let (Some(a), Some(b)) = (self.emotions.get(&first), self.emotions.get(&second)) else {
            self.counters.record_unknown_input();
            warn!(first = %first, second = %second, "Mix source missing from table");
            return false;
        };
        if !a.is_present() || !b.is_present() {
            debug!(first = %first, second = %second, "Mix source is empty");
            return false;
        }
        let Some(outcome) = self.mix_policy.mix(a, b) else {
            debug!(first = %first, second = %second, "Mix policy rejected pair");
            return false;
        };
        let Some(result) = self.live_entry(outcome.result) else {
            return false;
        };
        result.set_value(outcome.value, now);
        result.set_intensity(outcome.intensity, now);
        let snapshot = result.clone();
        self.counters.record_mix_success();
        self.record(
            EmotionHistoryEntry::new(snapshot, EmotionEventType::EmotionMixed, now)
                .with_mix(first, second),
        );
        true
    }

    /// Record an interaction (e.g. a jar click) without changing the live
    /// value. Always appends one entry and publishes one event.
    pub fn log_emotion_event(
        &mut self,
        emotion_type: EmotionType,
        event_type: EmotionEventType,
        description: impl Into<String>,
    ) {
        self.log_emotion_event_at(emotion_type, event_type, description, Utc::now());
    }

    /// [`log_emotion_event`](Self::log_emotion_event) with an explicit timestamp.
    pub fn log_emotion_event_at(
        &mut self,
        emotion_type: EmotionType,
        event_type: EmotionEventType,
        description: impl Into<String>,
        now: DateTime<Utc>,
    ) {
        let snapshot = self.get_emotion(emotion_type);
        self.record(
            EmotionHistoryEntry::new(snapshot, event_type, now).with_description(description),
        );
    }

    /// [`log_emotion_event`](Self::log_emotion_event) for wire names, as
    /// received from UI bindings or persisted rows. Unknown names are logged
    /// and ignored.
    pub fn log_emotion_event_named(&mut self, emotion: &str, event: &str, description: &str) {
        let (Some(t), Some(e)) = (EmotionType::parse(emotion), EmotionEventType::parse(event))
        else {
            self.counters.record_unknown_input();
            return;
        };
        self.log_emotion_event(t, e, description);
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    /// Entries with `start <= timestamp <= end`, in log order. `None`
    /// bounds are unbounded; with both omitted the full log is returned.
    ///
    /// Entries are borrowed; clone them if you need to keep or reorder them.
    #[must_use]
    pub fn get_emotion_history(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Vec<&EmotionHistoryEntry> {
        self.history
            .iter()
            .filter(|e| e.is_within(start, end))
            .collect()
    }

    /// A copy of the log sorted by timestamp (stable, so equal timestamps
    /// keep log order). The log itself is untouched.
    #[must_use]
    pub fn history_sorted_by_time(&self) -> Vec<EmotionHistoryEntry> {
        let mut sorted = self.history.clone();
        sorted.sort_by_key(|e| e.timestamp);
        sorted
    }

    /// The full log, in append order.
    #[must_use]
    pub fn history(&self) -> &[EmotionHistoryEntry] {
        &self.history
    }

    /// Number of entries in the log.
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Replace the live table and log with state loaded from storage.
    ///
    /// Emotion types absent from `emotions` are reset to defaults so the
    /// one-entry-per-type invariant holds. No events are published.
    pub fn restore(
        &mut self,
        emotions: impl IntoIterator<Item = EmotionData>,
        history: impl IntoIterator<Item = EmotionHistoryEntry>,
    ) {
        let now = Utc::now();
        let mut loaded: HashMap<EmotionType, EmotionData> = emotions
            .into_iter()
            .map(|d| (d.emotion_type, d))
            .collect();
        for t in EmotionType::ALL {
            loaded
                .entry(t)
                .or_insert_with(|| self.default_emotion(t, now));
        }
        self.emotions = loaded;
        self.history = history.into_iter().collect();
        debug!(
            emotions = self.emotions.len(),
            history = self.history.len(),
            "Emotion state restored"
        );
    }

    // ------------------------------------------------------------------
    // Analytics
    // ------------------------------------------------------------------

    /// Bucket every history entry by local time of day. Only buckets with
    /// at least one entry are present.
    #[must_use]
    pub fn get_emotions_by_time_of_day(&self) -> BTreeMap<TimeOfDay, TimeOfDayStats> {
        stats::by_time_of_day(&self.history, self.offset)
    }

    /// Per-UTC-day logging counts over `[start, end]`, zero days omitted.
    #[must_use]
    pub fn get_logging_frequency(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<FrequencyStat> {
        stats::logging_frequency(&self.history, start, end)
    }

    /// Mixed pairs ranked by combination count, descending.
    #[must_use]
    pub fn get_popular_emotion_combinations(&self) -> Vec<CombinationStat> {
        stats::popular_combinations(&self.history)
    }

    /// Per-UTC-day average intensities and trend over `[start, end]`.
    #[must_use]
    pub fn get_emotion_trends(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<TrendStat> {
        stats::emotion_trends(&self.history, start, end, self.trend_policy.as_ref())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn default_emotion(&self, emotion_type: EmotionType, now: DateTime<Utc>) -> EmotionData {
        EmotionData::new(
            emotion_type,
            self.config.default_value,
            self.config.default_intensity,
            now,
        )
    }

    fn live_entry(&mut self, emotion_type: EmotionType) -> Option<&mut EmotionData> {
        let entry = self.emotions.get_mut(&emotion_type);
        if entry.is_none() {
            self.counters.record_unknown_input();
            warn!(emotion = %emotion_type, "Emotion missing from table, ignoring update");
        }
        entry
    }

    /// Append to the log and publish the matching event.
    fn record(&mut self, entry: EmotionHistoryEntry) {
        let event = EmotionEvent {
            emotion_type: entry.emotion_type(),
            event_type: entry.event_type,
            value: entry.emotion.value,
            intensity: entry.emotion.intensity,
            timestamp: entry.timestamp,
            description: entry.description.clone(),
        };
        debug!(
            emotion = %event.emotion_type,
            event = %event.event_type,
            value = event.value,
            "Emotion event recorded"
        );
        self.history.push(entry);
        self.counters.record_event();
        self.events.publish(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn service() -> EmotionService {
        EmotionService::from_config(&MoodConfig::default())
    }

    #[test]
    fn every_type_has_a_live_entry() {
        let svc = service();
        assert_eq!(svc.emotions().len(), EmotionType::COUNT);
        for t in EmotionType::ALL {
            assert_eq!(svc.get_emotion(t).emotion_type, t);
        }
    }

    #[test]
    fn update_value_appends_one_entry_and_one_event() {
        let mut svc = service();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let _sub = svc.subscribe(move |_| {
            h.fetch_add(1, Ordering::Relaxed);
        });

        svc.update_emotion_value(EmotionType::Joy, 0.7);
        assert!((svc.get_emotion(EmotionType::Joy).value - 0.7).abs() < f32::EPSILON);
        assert_eq!(svc.history_len(), 1);
        assert_eq!(svc.history()[0].event_type, EmotionEventType::ValueChanged);
        assert_eq!(hits.load(Ordering::Relaxed), 1);

        svc.update_emotion_intensity(EmotionType::Joy, 0.9);
        assert_eq!(svc.history_len(), 2);
        assert_eq!(svc.history()[1].event_type, EmotionEventType::IntensityChanged);
        assert_eq!(hits.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn history_snapshot_is_independent_of_live_table() {
        let mut svc = service();
        svc.update_emotion_value(EmotionType::Calm, 0.3);
        svc.update_emotion_value(EmotionType::Calm, 0.8);
        assert!((svc.history()[0].emotion.value - 0.3).abs() < f32::EPSILON);
        assert!((svc.history()[1].emotion.value - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn mix_with_empty_source_is_a_noop() {
        let mut svc = service();
        let (_sub, mut rx) = svc.events().subscribe_channel();
        svc.update_emotion_value(EmotionType::Joy, 0.5);
        let _ = rx.try_recv();

        assert!(!svc.try_mix_emotions(EmotionType::Joy, EmotionType::Trust));
        assert_eq!(svc.history_len(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn mix_same_type_is_rejected() {
        let mut svc = service();
        svc.update_emotion_value(EmotionType::Joy, 0.5);
        assert!(!svc.try_mix_emotions(EmotionType::Joy, EmotionType::Joy));
        assert_eq!(svc.history_len(), 1);
    }

    #[test]
    fn successful_mix_writes_result() {
        let mut svc = service();
        svc.update_emotion_value(EmotionType::Joy, 0.4);
        svc.update_emotion_value(EmotionType::Trust, 0.8);

        assert!(svc.try_mix_emotions(EmotionType::Joy, EmotionType::Trust));
        assert_eq!(svc.history_len(), 3);
        let last = &svc.history()[2];
        assert_eq!(last.event_type, EmotionEventType::EmotionMixed);
        assert_eq!(last.emotion_type(), EmotionType::Love);
        assert!((svc.get_emotion(EmotionType::Love).value - 0.6).abs() < 1e-6);
        assert_eq!(svc.counters().snapshot().mixes_succeeded, 1);
    }

    #[test]
    fn log_event_keeps_live_value() {
        let mut svc = service();
        svc.update_emotion_value(EmotionType::Sadness, 0.2);
        svc.log_emotion_event(EmotionType::Sadness, EmotionEventType::JarClicked, "tap");
        assert!((svc.get_emotion(EmotionType::Sadness).value - 0.2).abs() < f32::EPSILON);
        assert_eq!(svc.history()[1].description.as_deref(), Some("tap"));
    }

    #[test]
    fn unknown_names_degrade() {
        let mut svc = service();
        assert!(svc.get_emotion_by_name("Hunger").is_none());
        svc.log_emotion_event_named("Hunger", "JarClicked", "x");
        svc.log_emotion_event_named("Joy", "Exploded", "x");
        assert_eq!(svc.history_len(), 0);
        assert_eq!(svc.counters().snapshot().unknown_inputs, 3);
    }

    #[test]
    fn restore_fills_missing_types() {
        let mut svc = service();
        let now = Utc::now();
        svc.restore(vec![EmotionData::new(EmotionType::Fear, 0.9, 0.1, now)], Vec::new());
        assert_eq!(svc.emotions().len(), EmotionType::COUNT);
        assert!((svc.get_emotion(EmotionType::Fear).value - 0.9).abs() < f32::EPSILON);
        assert!((svc.get_emotion(EmotionType::Joy).intensity - 0.5).abs() < f32::EPSILON);
    }
}
