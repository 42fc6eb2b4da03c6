//! Configuration for the MoodColor core.
//!
//! Maps directly to `moodcolor.toml`. Every field has a default, so an empty
//! file (or no file at all) yields a working configuration.

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::emotion::ConflictResolution;
use crate::types::EmotionType;

/// Top-level configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MoodConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Live emotion table behaviour.
    #[serde(default)]
    pub emotion: EmotionConfig,
    /// Emotion mixing recipes.
    #[serde(default)]
    pub mixing: MixingConfig,
    /// Points awarded per action.
    #[serde(default)]
    pub points: PointsConfig,
    /// Achievement thresholds.
    #[serde(default)]
    pub achievements: AchievementConfig,
    /// Local store settings.
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// Remote sync settings.
    #[serde(default)]
    pub sync: SyncConfig,
}

impl MoodConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `MoodError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        toml::from_str(toml_str).map_err(|e| crate::MoodError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Live emotion table configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionConfig {
    /// Value every emotion starts with.
    #[serde(default)]
    pub default_value: f32,
    /// Intensity every emotion starts with.
    #[serde(default = "default_intensity")]
    pub default_intensity: f32,
    /// Offset of the user's local time from UTC, in minutes. Used for
    /// time-of-day buckets.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl Default for EmotionConfig {
    fn default() -> Self {
        Self {
            default_value: 0.0,
            default_intensity: default_intensity(),
            utc_offset_minutes: 0,
        }
    }
}

impl EmotionConfig {
    /// The configured local offset; out-of-range values fall back to UTC.
    #[must_use]
    pub fn local_offset(&self) -> FixedOffset {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix())
    }
}

/// One mixing recipe: an unordered pair of sources producing a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixRecipe {
    /// First source.
    pub first: EmotionType,
    /// Second source.
    pub second: EmotionType,
    /// Derived emotion.
    pub result: EmotionType,
}

/// Emotion mixing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixingConfig {
    /// Recipes consulted before the dominant-source fallback.
    #[serde(default = "default_recipes")]
    pub recipes: Vec<MixRecipe>,
}

impl Default for MixingConfig {
    fn default() -> Self {
        Self {
            recipes: default_recipes(),
        }
    }
}

/// Points awarded per action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsConfig {
    /// Points for marking (logging) an emotion.
    #[serde(default = "default_10")]
    pub emotion_marked: i64,
    /// Points for a successful mix.
    #[serde(default = "default_15")]
    pub emotion_mixed: i64,
    /// Points for tapping a jar.
    #[serde(default = "default_1")]
    pub jar_clicked: i64,
    /// Bonus for the first emotion marked on a calendar day.
    #[serde(default = "default_25")]
    pub daily_bonus: i64,
}

impl Default for PointsConfig {
    fn default() -> Self {
        Self {
            emotion_marked: 10,
            emotion_mixed: 15,
            jar_clicked: 1,
            daily_bonus: 25,
        }
    }
}

/// Achievement thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AchievementConfig {
    /// Consecutive days of logging required for "Daily Mindfulness".
    #[serde(default = "default_7")]
    pub daily_mindfulness_days: u32,
    /// Points granted when an achievement unlocks.
    #[serde(default = "default_100")]
    pub unlock_reward: i64,
}

impl Default for AchievementConfig {
    fn default() -> Self {
        Self {
            daily_mindfulness_days: 7,
            unlock_reward: 100,
        }
    }
}

/// Local store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Enable SQLite WAL journaling.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
    /// JSON payloads at or above this many bytes are compressed.
    #[serde(default = "default_compression_threshold")]
    pub compression_threshold: usize,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            wal_mode: true,
            compression_threshold: default_compression_threshold(),
        }
    }
}

/// Remote sync configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// How to settle local/remote disagreements.
    #[serde(default)]
    pub conflict_resolution: ConflictResolution,
    /// Maximum records pushed per sync pass.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            conflict_resolution: ConflictResolution::default(),
            batch_size: default_batch_size(),
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_log_level() -> String {
    "info".to_string()
}
fn default_intensity() -> f32 {
    0.5
}
fn default_true() -> bool {
    true
}
fn default_1() -> i64 {
    1
}
fn default_10() -> i64 {
    10
}
fn default_15() -> i64 {
    15
}
fn default_25() -> i64 {
    25
}
fn default_100() -> i64 {
    100
}
fn default_7() -> u32 {
    7
}
fn default_compression_threshold() -> usize {
    crate::codec::compression::DEFAULT_THRESHOLD
}
fn default_batch_size() -> usize {
    100
}

fn default_recipes() -> Vec<MixRecipe> {
    use EmotionType::{Anger, Anticipation, Anxiety, Calm, Disgust, Fear, Joy, Love, Sadness, Surprise, Trust};
    let r = |first, second, result| MixRecipe {
        first,
        second,
        result,
    };
    vec![
        r(Joy, Trust, Love),
        r(Fear, Anticipation, Anxiety),
        r(Joy, Surprise, Anticipation),
        r(Sadness, Trust, Calm),
        r(Anger, Disgust, Fear),
        r(Sadness, Anger, Disgust),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let cfg = MoodConfig::from_toml("").expect("parse");
        assert_eq!(cfg.points.emotion_marked, 10);
        assert_eq!(cfg.achievements.daily_mindfulness_days, 7);
        assert_eq!(cfg.persistence.compression_threshold, 1024);
        assert_eq!(cfg.sync.conflict_resolution, ConflictResolution::MostRecent);
        assert!(!cfg.mixing.recipes.is_empty());
    }

    #[test]
    fn partial_toml_overrides() {
        let cfg = MoodConfig::from_toml(
            r#"
            [emotion]
            utc_offset_minutes = 120

            [sync]
            conflict_resolution = "AskUser"

            [[mixing.recipes]]
            first = "Joy"
            second = "Calm"
            result = "Love"
            "#,
        )
        .expect("parse");
        assert_eq!(cfg.emotion.local_offset().local_minus_utc(), 7200);
        assert_eq!(cfg.sync.conflict_resolution, ConflictResolution::AskUser);
        assert_eq!(cfg.mixing.recipes.len(), 1);
        assert_eq!(cfg.mixing.recipes[0].result, EmotionType::Love);
        assert!((cfg.emotion.default_intensity - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let err = MoodConfig::from_toml("[points\nemotion_marked = ").expect_err("invalid");
        assert!(matches!(err, crate::MoodError::Config(_)));
    }

    #[test]
    fn out_of_range_offset_falls_back_to_utc() {
        let cfg = EmotionConfig {
            utc_offset_minutes: 100_000,
            ..EmotionConfig::default()
        };
        assert_eq!(cfg.local_offset().local_minus_utc(), 0);
    }
}
