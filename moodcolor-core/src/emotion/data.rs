//! Live emotion snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::EmotionType;

/// Current value and intensity of a single emotion.
///
/// One live instance exists per emotion type per user. Both `value` and
/// `intensity` are kept in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionData {
    /// Which emotion this is.
    pub emotion_type: EmotionType,
    /// How much of the emotion is present (0.0 to 1.0).
    pub value: f32,
    /// Modifier describing how strongly it is felt (0.0 to 1.0).
    pub intensity: f32,
    /// When the value or intensity last changed.
    pub last_update: DateTime<Utc>,
    /// Display colour (`#RRGGBB`).
    pub color_hex: String,
}

impl EmotionData {
    /// Create an emotion snapshot, clamping value and intensity to `[0, 1]`.
    #[must_use]
    pub fn new(emotion_type: EmotionType, value: f32, intensity: f32, now: DateTime<Utc>) -> Self {
        Self {
            emotion_type,
            value: clamp_unit(value),
            intensity: clamp_unit(intensity),
            last_update: now,
            color_hex: emotion_type.default_color_hex().to_string(),
        }
    }

    /// An empty emotion (value 0, intensity 0) stamped at `now`.
    #[must_use]
    pub fn empty(emotion_type: EmotionType, now: DateTime<Utc>) -> Self {
        Self::new(emotion_type, 0.0, 0.0, now)
    }

    /// Whether any of this emotion has been logged.
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.value > 0.0
    }

    /// Set the value (clamped) and touch `last_update`.
    pub fn set_value(&mut self, value: f32, now: DateTime<Utc>) {
        self.value = clamp_unit(value);
        self.last_update = now;
    }

    /// Set the intensity (clamped) and touch `last_update`.
    pub fn set_intensity(&mut self, intensity: f32, now: DateTime<Utc>) {
        self.intensity = clamp_unit(intensity);
        self.last_update = now;
    }
}

/// Clamp to `[0, 1]`; NaN becomes 0.
#[must_use]
pub fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}
