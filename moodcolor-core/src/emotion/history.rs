//! History log entries: "what happened to my mood".
//!
//! Entries are immutable once created. The snapshot they carry is an owned
//! copy of the live [`EmotionData`] at the moment of the event, so later
//! updates to the live table never change past entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::emotion::EmotionData;
use crate::types::{EmotionEventType, EmotionType};

/// The two source emotions of an `EmotionMixed` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MixSources {
    /// First source emotion.
    pub first: EmotionType,
    /// Second source emotion.
    pub second: EmotionType,
}

impl MixSources {
    /// Order-independent key for the pair (smaller type first).
    #[must_use]
    pub fn normalized(self) -> (EmotionType, EmotionType) {
        if self.first <= self.second {
            (self.first, self.second)
        } else {
            (self.second, self.first)
        }
    }
}

/// A single entry in the append-only emotion history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionHistoryEntry {
    /// When the event happened (UTC).
    pub timestamp: DateTime<Utc>,
    /// Owned snapshot of the emotion after the event.
    pub emotion: EmotionData,
    /// What kind of event this was.
    pub event_type: EmotionEventType,
    /// Free-form description supplied by the caller.
    pub description: Option<String>,
    /// Source emotions, for `EmotionMixed` entries.
    pub mix: Option<MixSources>,
}

impl EmotionHistoryEntry {
    /// Create an entry from a snapshot of the live emotion.
    #[must_use]
    pub fn new(
        emotion: EmotionData,
        event_type: EmotionEventType,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            timestamp,
            emotion,
            event_type,
            description: None,
            mix: None,
        }
    }

    /// Attach a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attach the source emotions of a mix.
    #[must_use]
    pub fn with_mix(mut self, first: EmotionType, second: EmotionType) -> Self {
        self.mix = Some(MixSources { first, second });
        self
    }

    /// The emotion type this entry is about.
    #[must_use]
    pub fn emotion_type(&self) -> EmotionType {
        self.emotion.emotion_type
    }

    /// Whether `timestamp` lies in the closed interval `[start, end]`.
    /// `None` bounds are unbounded.
    #[must_use]
    pub fn is_within(&self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> bool {
        start.is_none_or(|s| self.timestamp >= s) && end.is_none_or(|e| self.timestamp <= e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn mix_sources_normalize_order() {
        let a = MixSources {
            first: EmotionType::Trust,
            second: EmotionType::Joy,
        };
        let b = MixSources {
            first: EmotionType::Joy,
            second: EmotionType::Trust,
        };
        assert_eq!(a.normalized(), b.normalized());
    }

    #[test]
    fn interval_is_closed() {
        let now = Utc::now();
        let entry = EmotionHistoryEntry::new(
            EmotionData::empty(EmotionType::Calm, now),
            EmotionEventType::JarClicked,
            now,
        );
        assert!(entry.is_within(Some(now), Some(now)));
        assert!(entry.is_within(None, None));
        assert!(!entry.is_within(Some(now + Duration::seconds(1)), None));
        assert!(!entry.is_within(None, Some(now - Duration::seconds(1))));
    }
}
