//! Emotion value objects and the history log types.
//!
//! - [`EmotionData`]: the live snapshot of one emotion.
//! - [`EmotionHistoryEntry`]: an immutable entry in the append-only log.
//! - [`EmotionHistoryRecord`]: the persistence-facing projection of an entry.

pub mod data;
pub mod history;
pub mod record;

pub use data::EmotionData;
pub use history::{EmotionHistoryEntry, MixSources};
pub use record::{ConflictResolution, EmotionHistoryRecord, GeoPoint, SyncStatus};
