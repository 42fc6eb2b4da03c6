//! History analytics: time-of-day buckets, logging frequency, popular
//! combinations and intensity trends.
//!
//! Every function here is a pure query over a slice of history entries; the
//! slice is never reordered or mutated.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::emotion::EmotionHistoryEntry;
use crate::policy::TrendPolicy;
use crate::types::{EmotionEventType, EmotionType, TimeOfDay};

/// Aggregate of all entries falling into one [`TimeOfDay`] bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeOfDayStats {
    /// Number of entries in the bucket.
    pub total_entries: usize,
    /// Entries per emotion type.
    pub emotion_counts: BTreeMap<EmotionType, usize>,
    /// Mean intensity of the bucket's entries.
    pub average_intensity: f32,
    /// Emotion with the most entries (lowest type wins ties).
    pub dominant_emotion: Option<EmotionType>,
}

/// Logging activity on one UTC calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyStat {
    /// The day.
    pub date: NaiveDate,
    /// Number of entries logged that day.
    pub entry_count: usize,
    /// Entries per emotion type that day.
    pub emotion_counts: BTreeMap<EmotionType, usize>,
}

/// How often a pair of emotions was mixed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinationStat {
    /// First emotion of the pair (the smaller type).
    pub first: EmotionType,
    /// Second emotion of the pair.
    pub second: EmotionType,
    /// Number of successful mixes of this pair.
    pub combination_count: usize,
    /// Result of the most recent mix of this pair.
    pub last_result: EmotionType,
    /// When the pair was last mixed.
    pub last_mixed: DateTime<Utc>,
}

/// Intensity averages and trend for one UTC calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendStat {
    /// The day.
    pub date: NaiveDate,
    /// Mean intensity per emotion type logged that day.
    pub average_intensity: BTreeMap<EmotionType, f32>,
    /// Day-over-day trend; positive means rising intensity.
    pub trend_value: f32,
}

/// Bucket every entry by the time of day of its timestamp at `offset`.
/// Only buckets with at least one entry appear in the result.
#[must_use]
pub fn by_time_of_day(
    entries: &[EmotionHistoryEntry],
    offset: FixedOffset,
) -> BTreeMap<TimeOfDay, TimeOfDayStats> {
    let mut buckets: BTreeMap<TimeOfDay, (TimeOfDayStats, f32)> = BTreeMap::new();
    for entry in entries {
        let (stats, intensity_sum) = buckets
            .entry(TimeOfDay::of(entry.timestamp, offset))
            .or_default();
        stats.total_entries += 1;
        *stats.emotion_counts.entry(entry.emotion_type()).or_default() += 1;
        *intensity_sum += entry.emotion.intensity;
    }

    buckets
        .into_iter()
        .map(|(bucket, (mut stats, intensity_sum))| {
            stats.average_intensity = intensity_sum / stats.total_entries as f32;
            stats.dominant_emotion = dominant(&stats.emotion_counts);
            (bucket, stats)
        })
        .collect()
}

/// One [`FrequencyStat`] per UTC day in `[start, end]` that has entries,
/// ascending by date.
#[must_use]
pub fn logging_frequency(
    entries: &[EmotionHistoryEntry],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<FrequencyStat> {
    let mut days: BTreeMap<NaiveDate, BTreeMap<EmotionType, usize>> = BTreeMap::new();
    for entry in entries.iter().filter(|e| e.is_within(Some(start), Some(end))) {
        *days
            .entry(entry.timestamp.date_naive())
            .or_default()
            .entry(entry.emotion_type())
            .or_default() += 1;
    }

    days.into_iter()
        .map(|(date, emotion_counts)| FrequencyStat {
            date,
            entry_count: emotion_counts.values().sum(),
            emotion_counts,
        })
        .collect()
}

/// Mixed pairs ranked by how often they were combined (descending).
/// Ties are broken by pair order so the ranking is deterministic.
#[must_use]
pub fn popular_combinations(entries: &[EmotionHistoryEntry]) -> Vec<CombinationStat> {
    let mut pairs: HashMap<(EmotionType, EmotionType), CombinationStat> = HashMap::new();
    for entry in entries
        .iter()
        .filter(|e| e.event_type == EmotionEventType::EmotionMixed)
    {
        let Some(sources) = entry.mix else {
            continue;
        };
        let (first, second) = sources.normalized();
        let stat = pairs.entry((first, second)).or_insert(CombinationStat {
            first,
            second,
            combination_count: 0,
            last_result: entry.emotion_type(),
            last_mixed: entry.timestamp,
        });
        stat.combination_count += 1;
        if entry.timestamp >= stat.last_mixed {
            stat.last_mixed = entry.timestamp;
            stat.last_result = entry.emotion_type();
        }
    }

    let mut ranked: Vec<CombinationStat> = pairs.into_values().collect();
    ranked.sort_by(|a, b| {
        b.combination_count
            .cmp(&a.combination_count)
            .then_with(|| (a.first, a.second).cmp(&(b.first, b.second)))
    });
    ranked
}

/// Per-day average intensity per emotion type over `[start, end]`, with the
/// trend value supplied by `policy`. Days without entries are omitted.
#[must_use]
pub fn emotion_trends(
    entries: &[EmotionHistoryEntry],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    policy: &dyn TrendPolicy,
) -> Vec<TrendStat> {
    let mut days: BTreeMap<NaiveDate, BTreeMap<EmotionType, (f32, usize)>> = BTreeMap::new();
    for entry in entries.iter().filter(|e| e.is_within(Some(start), Some(end))) {
        let (sum, count) = days
            .entry(entry.timestamp.date_naive())
            .or_default()
            .entry(entry.emotion_type())
            .or_default();
        *sum += entry.emotion.intensity;
        *count += 1;
    }

    let mut out: Vec<TrendStat> = Vec::with_capacity(days.len());
    for (date, sums) in days {
        let average_intensity: BTreeMap<EmotionType, f32> = sums
            .into_iter()
            .map(|(t, (sum, count))| (t, sum / count as f32))
            .collect();
        let trend_value =
            policy.trend_value(out.last().map(|p| &p.average_intensity), &average_intensity);
        out.push(TrendStat {
            date,
            average_intensity,
            trend_value,
        });
    }
    out
}

fn dominant(counts: &BTreeMap<EmotionType, usize>) -> Option<EmotionType> {
    // max_by_key returns the last maximum; iterate in reverse so the
    // smallest type wins ties.
    counts
        .iter()
        .rev()
        .max_by_key(|(_, c)| **c)
        .map(|(t, _)| *t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::EmotionData;
    use crate::policy::DayOverDayDelta;
    use chrono::{Duration, TimeZone};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, day, hour, 0, 0)
            .single()
            .expect("valid date")
    }

    fn entry(t: EmotionType, intensity: f32, ts: DateTime<Utc>) -> EmotionHistoryEntry {
        EmotionHistoryEntry::new(
            EmotionData::new(t, 0.5, intensity, ts),
            EmotionEventType::ValueChanged,
            ts,
        )
    }

    fn mixed(a: EmotionType, b: EmotionType, result: EmotionType, ts: DateTime<Utc>) -> EmotionHistoryEntry {
        EmotionHistoryEntry::new(
            EmotionData::new(result, 0.5, 0.5, ts),
            EmotionEventType::EmotionMixed,
            ts,
        )
        .with_mix(a, b)
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).expect("offset")
    }

    #[test]
    fn time_of_day_only_touched_buckets() {
        let entries = vec![
            entry(EmotionType::Joy, 0.2, at(1, 8)),
            entry(EmotionType::Joy, 0.4, at(1, 9)),
            entry(EmotionType::Fear, 0.9, at(1, 23)),
        ];
        let buckets = by_time_of_day(&entries, utc());
        assert_eq!(buckets.len(), 2);
        let morning = &buckets[&TimeOfDay::Morning];
        assert_eq!(morning.total_entries, 2);
        assert!((morning.average_intensity - 0.3).abs() < 1e-6);
        assert_eq!(morning.dominant_emotion, Some(EmotionType::Joy));
        assert_eq!(buckets[&TimeOfDay::Night].total_entries, 1);
        assert!(!buckets.contains_key(&TimeOfDay::Afternoon));
    }

    #[test]
    fn frequency_groups_by_utc_day() {
        let entries = vec![
            entry(EmotionType::Joy, 0.2, at(2, 1)),
            entry(EmotionType::Calm, 0.2, at(2, 23)),
            entry(EmotionType::Joy, 0.2, at(4, 12)),
        ];
        let freq = logging_frequency(&entries, at(1, 0), at(30, 0));
        assert_eq!(freq.len(), 2, "day 3 has no entries and is omitted");
        assert_eq!(freq[0].entry_count, 2);
        assert_eq!(freq[0].emotion_counts[&EmotionType::Calm], 1);
        assert_eq!(freq[1].date, at(4, 0).date_naive());
    }

    #[test]
    fn frequency_respects_window() {
        let entries = vec![
            entry(EmotionType::Joy, 0.2, at(2, 1)),
            entry(EmotionType::Joy, 0.2, at(5, 1)),
        ];
        let freq = logging_frequency(&entries, at(3, 0), at(5, 1));
        assert_eq!(freq.len(), 1);
        assert_eq!(freq[0].date, at(5, 0).date_naive());
    }

    #[test]
    fn combinations_ranked_descending() {
        let t = at(1, 12);
        let entries = vec![
            mixed(EmotionType::Joy, EmotionType::Trust, EmotionType::Love, t),
            mixed(EmotionType::Fear, EmotionType::Anticipation, EmotionType::Anxiety, t),
            mixed(EmotionType::Trust, EmotionType::Joy, EmotionType::Love, t + Duration::hours(1)),
            entry(EmotionType::Joy, 0.2, t),
        ];
        let ranked = popular_combinations(&entries);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].combination_count, 2);
        assert_eq!((ranked[0].first, ranked[0].second), (EmotionType::Joy, EmotionType::Trust));
        assert_eq!(ranked[0].last_mixed, t + Duration::hours(1));
        assert_eq!(ranked[1].combination_count, 1);
    }

    #[test]
    fn trends_rise_with_intensity() {
        let entries = vec![
            entry(EmotionType::Joy, 0.2, at(1, 10)),
            entry(EmotionType::Joy, 0.4, at(1, 11)),
            entry(EmotionType::Joy, 0.8, at(2, 10)),
        ];
        let trends = emotion_trends(&entries, at(1, 0), at(3, 0), &DayOverDayDelta);
        assert_eq!(trends.len(), 2);
        assert!((trends[0].average_intensity[&EmotionType::Joy] - 0.3).abs() < 1e-6);
        assert!(trends[0].trend_value.abs() < f32::EPSILON);
        assert!(trends[1].trend_value > 0.0);
    }
}
