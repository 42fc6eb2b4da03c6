//! Core type definitions for the MoodColor emotion model.
//!
//! All types are serializable; enum names are the stable wire names used by
//! persisted records.

use std::fmt;

use chrono::{DateTime, FixedOffset, Timelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

/// Identifier of the user owning an emotion table (the auth provider's UID).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    /// Wrap a raw user identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for a persisted history record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub Uuid);

impl RecordId {
    /// Create a new random record ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Emotion Types
// ---------------------------------------------------------------------------

/// The fixed set of mood categories a user can log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EmotionType {
    /// Happiness, delight.
    Joy,
    /// Sorrow, low mood.
    Sadness,
    /// Irritation, rage.
    Anger,
    /// Fright, dread.
    Fear,
    /// Aversion.
    Disgust,
    /// Astonishment.
    Surprise,
    /// Confidence in others.
    Trust,
    /// Looking forward to something.
    Anticipation,
    /// Affection.
    Love,
    /// Worry, unease.
    Anxiety,
    /// Peace, relaxation.
    Calm,
}

impl EmotionType {
    /// Every defined emotion type, in declaration order.
    pub const ALL: [Self; 11] = [
        Self::Joy,
        Self::Sadness,
        Self::Anger,
        Self::Fear,
        Self::Disgust,
        Self::Surprise,
        Self::Trust,
        Self::Anticipation,
        Self::Love,
        Self::Anxiety,
        Self::Calm,
    ];

    /// Number of defined emotion types.
    pub const COUNT: usize = Self::ALL.len();

    /// Stable wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Joy => "Joy",
            Self::Sadness => "Sadness",
            Self::Anger => "Anger",
            Self::Fear => "Fear",
            Self::Disgust => "Disgust",
            Self::Surprise => "Surprise",
            Self::Trust => "Trust",
            Self::Anticipation => "Anticipation",
            Self::Love => "Love",
            Self::Anxiety => "Anxiety",
            Self::Calm => "Calm",
        }
    }

    /// Default jar colour shown for this emotion (`#RRGGBB`).
    #[must_use]
    pub fn default_color_hex(self) -> &'static str {
        match self {
            Self::Joy => "#FFD93B",
            Self::Sadness => "#4A6FA5",
            Self::Anger => "#E63946",
            Self::Fear => "#6A4C93",
            Self::Disgust => "#6B8E23",
            Self::Surprise => "#FF9F1C",
            Self::Trust => "#2A9D8F",
            Self::Anticipation => "#F4A261",
            Self::Love => "#FF6F91",
            Self::Anxiety => "#8D99AE",
            Self::Calm => "#A8DADC",
        }
    }

    /// Parse a wire name, case-insensitively.
    ///
    /// Unknown names are not an error: a warning is logged and `None` is
    /// returned so callers can degrade to a no-op.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let trimmed = name.trim();
        let found = Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(trimmed));
        if found.is_none() {
            warn!(name = %name, "Unknown emotion type");
        }
        found
    }
}

impl fmt::Display for EmotionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Event Types
// ---------------------------------------------------------------------------

/// What kind of interaction produced a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EmotionEventType {
    /// The live value of an emotion was set.
    ValueChanged,
    /// The live intensity of an emotion was set.
    IntensityChanged,
    /// Two emotions were combined into a derived one.
    EmotionMixed,
    /// The user tapped an emotion jar.
    JarClicked,
    /// An emotion jar reached capacity.
    JarFilled,
    /// The user attached a note to an emotion.
    NoteAdded,
}

impl EmotionEventType {
    /// Every defined event type.
    pub const ALL: [Self; 6] = [
        Self::ValueChanged,
        Self::IntensityChanged,
        Self::EmotionMixed,
        Self::JarClicked,
        Self::JarFilled,
        Self::NoteAdded,
    ];

    /// Stable wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ValueChanged => "ValueChanged",
            Self::IntensityChanged => "IntensityChanged",
            Self::EmotionMixed => "EmotionMixed",
            Self::JarClicked => "JarClicked",
            Self::JarFilled => "JarFilled",
            Self::NoteAdded => "NoteAdded",
        }
    }

    /// Parse a wire name; unknown names log a warning and yield `None`.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let trimmed = name.trim();
        let found = Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(trimmed));
        if found.is_none() {
            warn!(name = %name, "Unknown emotion event type");
        }
        found
    }
}

impl fmt::Display for EmotionEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Time of Day
// ---------------------------------------------------------------------------

/// Coarse partition of a 24-hour day used for aggregate statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TimeOfDay {
    /// 05:00–11:59.
    Morning,
    /// 12:00–16:59.
    Afternoon,
    /// 17:00–21:59.
    Evening,
    /// 22:00–04:59.
    Night,
}

impl TimeOfDay {
    /// Bucket for an hour of the day (0–23).
    #[must_use]
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => Self::Morning,
            12..=16 => Self::Afternoon,
            17..=21 => Self::Evening,
            _ => Self::Night,
        }
    }

    /// Bucket for a UTC instant viewed at the given local offset.
    #[must_use]
    pub fn of(timestamp: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self::from_hour(timestamp.with_timezone(&offset).hour())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(EmotionType::parse("joy"), Some(EmotionType::Joy));
        assert_eq!(EmotionType::parse(" ANXIETY "), Some(EmotionType::Anxiety));
        assert_eq!(
            EmotionEventType::parse("jarclicked"),
            Some(EmotionEventType::JarClicked)
        );
    }

    #[test]
    fn unknown_names_degrade_to_none() {
        assert_eq!(EmotionType::parse("Boredom"), None);
        assert_eq!(EmotionEventType::parse(""), None);
    }

    #[test]
    fn wire_names_round_trip() {
        for t in EmotionType::ALL {
            assert_eq!(EmotionType::parse(t.as_str()), Some(t));
        }
        for e in EmotionEventType::ALL {
            assert_eq!(EmotionEventType::parse(e.as_str()), Some(e));
        }
    }

    #[test]
    fn time_of_day_boundaries() {
        assert_eq!(TimeOfDay::from_hour(4), TimeOfDay::Night);
        assert_eq!(TimeOfDay::from_hour(5), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_hour(11), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_hour(12), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::from_hour(17), TimeOfDay::Evening);
        assert_eq!(TimeOfDay::from_hour(22), TimeOfDay::Night);
        assert_eq!(TimeOfDay::from_hour(0), TimeOfDay::Night);
    }

    #[test]
    fn time_of_day_uses_offset() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 1, 23, 30, 0).single().expect("valid date");
        let utc = FixedOffset::east_opt(0).expect("offset");
        let tokyo = FixedOffset::east_opt(9 * 3600).expect("offset");
        assert_eq!(TimeOfDay::of(ts, utc), TimeOfDay::Night);
        // 08:30 local.
        assert_eq!(TimeOfDay::of(ts, tokyo), TimeOfDay::Morning);
    }
}
