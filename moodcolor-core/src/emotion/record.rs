//! Persistence-facing projection of history entries.
//!
//! Records carry emotion and event types as strings so rows written by a
//! newer client (with emotion types this build does not know) still load;
//! unknown names surface as a logged warning when converting back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::emotion::{EmotionData, EmotionHistoryEntry, MixSources};
use crate::types::{EmotionEventType, EmotionType, RecordId};

/// Whether a locally created record has reached the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SyncStatus {
    /// Created locally, not yet pushed.
    #[default]
    Unsynced,
    /// Pushed and acknowledged by the remote store.
    Synced,
    /// The remote copy disagrees and needs a decision.
    Conflict,
}

impl SyncStatus {
    /// Stable wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unsynced => "Unsynced",
            Self::Synced => "Synced",
            Self::Conflict => "Conflict",
        }
    }

    /// Parse a wire name; unknown names are treated as `Unsynced` so the
    /// record gets pushed again rather than silently dropped.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name {
            "Synced" => Self::Synced,
            "Conflict" => Self::Conflict,
            "Unsynced" => Self::Unsynced,
            other => {
                warn!(status = %other, "Unknown sync status, treating as Unsynced");
                Self::Unsynced
            }
        }
    }
}

/// How to settle a disagreement between the local and the remote copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConflictResolution {
    /// Keep the remote copy.
    ServerWins,
    /// Overwrite the remote copy with the local one.
    ClientWins,
    /// Keep whichever copy has the later timestamp.
    #[default]
    MostRecent,
    /// Keep both; the local copy is re-keyed under a fresh ID.
    KeepBoth,
    /// Leave the record in `Conflict` for the user to decide.
    AskUser,
}

/// Optional geo-coordinates attached to a record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

/// A history entry as stored locally and remotely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionHistoryRecord {
    /// Record identifier (remote key).
    pub id: RecordId,
    /// Emotion type wire name.
    pub emotion_type: String,
    /// Emotion value at the time of the event.
    pub value: f32,
    /// Emotion intensity at the time of the event.
    pub intensity: f32,
    /// When the event happened.
    pub timestamp: DateTime<Utc>,
    /// Event type wire name.
    pub event_type: String,
    /// Sync state.
    #[serde(default)]
    pub sync_status: SyncStatus,
    /// Display colour at the time of the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_hex: Option<String>,
    /// User note / event description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Region the user was in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_id: Option<String>,
    /// Device-local identifier, kept to de-duplicate re-uploads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_id: Option<String>,
    /// Where the user was.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    /// Free-form tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Source emotions of an `EmotionMixed` record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mix: Option<MixSources>,
}

impl EmotionHistoryRecord {
    /// Project a history entry into a fresh, unsynced record.
    #[must_use]
    pub fn from_entry(entry: &EmotionHistoryEntry) -> Self {
        Self {
            id: RecordId::new(),
            emotion_type: entry.emotion.emotion_type.as_str().to_string(),
            value: entry.emotion.value,
            intensity: entry.emotion.intensity,
            timestamp: entry.timestamp,
            event_type: entry.event_type.as_str().to_string(),
            sync_status: SyncStatus::Unsynced,
            color_hex: Some(entry.emotion.color_hex.clone()),
            note: entry.description.clone(),
            region_id: None,
            local_id: None,
            location: None,
            tags: Vec::new(),
            mix: entry.mix,
        }
    }

    /// Parsed emotion type, or `None` (with a warning) if unknown.
    #[must_use]
    pub fn parsed_emotion_type(&self) -> Option<EmotionType> {
        EmotionType::parse(&self.emotion_type)
    }

    /// Convert back into a history entry.
    ///
    /// Returns `None` (with a warning) when either the emotion or the event
    /// type name is unknown to this build.
    #[must_use]
    pub fn to_entry(&self) -> Option<EmotionHistoryEntry> {
        let emotion_type = self.parsed_emotion_type()?;
        let event_type = EmotionEventType::parse(&self.event_type)?;
        let mut emotion = EmotionData::new(emotion_type, self.value, self.intensity, self.timestamp);
        if let Some(color) = &self.color_hex {
            emotion.color_hex.clone_from(color);
        }
        Some(EmotionHistoryEntry {
            timestamp: self.timestamp,
            emotion,
            event_type,
            description: self.note.clone(),
            mix: self.mix,
        })
    }
}

impl From<&EmotionHistoryEntry> for EmotionHistoryRecord {
    fn from(entry: &EmotionHistoryEntry) -> Self {
        Self::from_entry(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> EmotionHistoryEntry {
        let now = Utc::now();
        EmotionHistoryEntry::new(
            EmotionData::new(EmotionType::Love, 0.6, 0.4, now),
            EmotionEventType::ValueChanged,
            now,
        )
        .with_description("first date")
    }

    #[test]
    fn record_projection_keeps_fields() {
        let e = entry();
        let r = EmotionHistoryRecord::from(&e);
        assert_eq!(r.emotion_type, "Love");
        assert_eq!(r.event_type, "ValueChanged");
        assert_eq!(r.sync_status, SyncStatus::Unsynced);
        assert_eq!(r.note.as_deref(), Some("first date"));

        let back = r.to_entry().expect("known types");
        assert_eq!(back.emotion, e.emotion);
        assert_eq!(back.event_type, e.event_type);
    }

    #[test]
    fn unknown_type_does_not_convert() {
        let mut r = EmotionHistoryRecord::from(&entry());
        r.emotion_type = "Nostalgia".to_string();
        assert!(r.to_entry().is_none());
    }

    #[test]
    fn unknown_sync_status_is_unsynced() {
        assert_eq!(SyncStatus::parse("Pending"), SyncStatus::Unsynced);
        assert_eq!(SyncStatus::parse("Synced"), SyncStatus::Synced);
    }
}
