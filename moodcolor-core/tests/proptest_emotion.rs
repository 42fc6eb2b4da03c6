//! Property-based tests for the emotion core.
//!
//! Uses `proptest` to check the service invariants under random inputs:
//! clamping, one entry and one event per mutation, history window bounds,
//! and achievement progress.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use moodcolor_core::achievements::{AchievementCondition, EmotionSpectrumCondition};
use moodcolor_core::config::MoodConfig;
use moodcolor_core::emotion::EmotionData;
use moodcolor_core::points::PlayerData;
use moodcolor_core::{EmotionService, EmotionType};

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

fn arb_emotion() -> impl Strategy<Value = EmotionType> {
    (0..EmotionType::COUNT).prop_map(|i| EmotionType::ALL[i])
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
        .single()
        .expect("valid date")
}

// ---------------------------------------------------------------------------
// Property: values are clamped to [0, 1] and read back
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn update_value_then_get(t in arb_emotion(), v in -10.0..10.0f32) {
        let mut service = EmotionService::from_config(&MoodConfig::default());
        service.update_emotion_value(t, v);
        let got = service.get_emotion(t).value;
        prop_assert!((0.0..=1.0).contains(&got));
        prop_assert!((got - v.clamp(0.0, 1.0)).abs() < f32::EPSILON);
    }

    #[test]
    fn intensity_always_clamped(t in arb_emotion(), i in -10.0..10.0f32) {
        let mut service = EmotionService::from_config(&MoodConfig::default());
        service.update_emotion_intensity(t, i);
        let got = service.get_emotion(t).intensity;
        prop_assert!((0.0..=1.0).contains(&got));
    }

    #[test]
    fn emotion_data_new_clamps(v in proptest::num::f32::ANY, i in proptest::num::f32::ANY) {
        let d = EmotionData::new(EmotionType::Joy, v, i, base_time());
        prop_assert!((0.0..=1.0).contains(&d.value));
        prop_assert!((0.0..=1.0).contains(&d.intensity));
    }
}

// ---------------------------------------------------------------------------
// Property: every update appends one entry and publishes one event
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn one_entry_and_one_event_per_update(
        updates in prop::collection::vec((arb_emotion(), 0.0..1.0f32, any::<bool>()), 0..50)
    ) {
        let mut service = EmotionService::from_config(&MoodConfig::default());
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let _sub = service.subscribe(move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        });

        for (t, x, is_value) in &updates {
            if *is_value {
                service.update_emotion_value(*t, *x);
            } else {
                service.update_emotion_intensity(*t, *x);
            }
        }
        prop_assert_eq!(service.history_len(), updates.len());
        prop_assert_eq!(seen.load(Ordering::Relaxed), updates.len());
    }
}

// ---------------------------------------------------------------------------
// Property: history windows are closed intervals
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn history_filter_respects_bounds(
        offsets in prop::collection::vec(0i64..10_000, 1..40),
        a in 0i64..10_000,
        b in 0i64..10_000,
    ) {
        let base = base_time();
        let mut service = EmotionService::from_config(&MoodConfig::default());
        for m in &offsets {
            service.update_emotion_value_at(EmotionType::Calm, 0.5, base + Duration::minutes(*m));
        }
        let (lo, hi) = (a.min(b), a.max(b));
        let start = base + Duration::minutes(lo);
        let end = base + Duration::minutes(hi);

        let window = service.get_emotion_history(Some(start), Some(end));
        for e in &window {
            prop_assert!(e.timestamp >= start && e.timestamp <= end);
        }
        let expected = offsets.iter().filter(|m| (lo..=hi).contains(*m)).count();
        prop_assert_eq!(window.len(), expected);
        prop_assert_eq!(service.get_emotion_history(None, None).len(), offsets.len());
    }

    #[test]
    fn sorted_history_is_monotonic(offsets in prop::collection::vec(0i64..10_000, 0..40)) {
        let base = base_time();
        let mut service = EmotionService::from_config(&MoodConfig::default());
        for m in &offsets {
            service.update_emotion_value_at(EmotionType::Joy, 0.2, base + Duration::minutes(*m));
        }
        let sorted = service.history_sorted_by_time();
        prop_assert_eq!(sorted.len(), offsets.len());
        for pair in sorted.windows(2) {
            prop_assert!(pair[0].timestamp <= pair[1].timestamp);
        }
    }
}

// ---------------------------------------------------------------------------
// Property: spectrum progress is k / N
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn spectrum_progress_is_fraction_experienced(
        present in prop::collection::btree_set(arb_emotion(), 0..=EmotionType::COUNT)
    ) {
        let mut player = PlayerData::new();
        for t in EmotionType::ALL {
            let value = if present.contains(&t) { 0.5 } else { 0.0 };
            player.emotion_data.insert(t, EmotionData::new(t, value, 0.5, base_time()));
        }
        let cond = EmotionSpectrumCondition;
        let expected = present.len() as f32 / EmotionType::COUNT as f32;
        prop_assert!((cond.calculate_progress(&player) - expected).abs() < 1e-6);
        prop_assert_eq!(cond.check_condition(&player), present.len() == EmotionType::COUNT);
    }
}
