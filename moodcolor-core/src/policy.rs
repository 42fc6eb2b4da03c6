//! Pluggable mixing and trend policies.
//!
//! The blend rule for [`EmotionService::try_mix_emotions`] and the day-over-day
//! trend formula for [`EmotionService::get_emotion_trends`] are product
//! decisions, so both are traits the service is constructed with.
//!
//! [`EmotionService::try_mix_emotions`]: crate::service::EmotionService::try_mix_emotions
//! [`EmotionService::get_emotion_trends`]: crate::service::EmotionService::get_emotion_trends

use std::collections::{BTreeMap, HashMap};

use crate::config::{MixRecipe, MixingConfig};
use crate::emotion::EmotionData;
use crate::types::EmotionType;

// ---------------------------------------------------------------------------
// Mixing
// ---------------------------------------------------------------------------

/// The derived effect of mixing two emotions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixOutcome {
    /// Emotion whose live entry receives the result.
    pub result: EmotionType,
    /// New value for the result emotion.
    pub value: f32,
    /// New intensity for the result emotion.
    pub intensity: f32,
}

/// Decides what mixing two (valid, non-empty) emotions produces.
pub trait MixPolicy: Send + Sync {
    /// Return the outcome, or `None` if these two cannot be mixed.
    fn mix(&self, first: &EmotionData, second: &EmotionData) -> Option<MixOutcome>;
}

/// Recipe-table mixing with a dominant-source fallback.
///
/// Known pairs produce their configured result; any other pair feeds the
/// source with the higher value (first source on ties). The result value is
/// the mean of the two source values and the intensity the larger of the two.
#[derive(Debug, Clone, Default)]
pub struct RecipeMix {
    recipes: HashMap<(EmotionType, EmotionType), EmotionType>,
}

impl RecipeMix {
    /// Build from a list of recipes. Later recipes override earlier ones
    /// for the same pair.
    #[must_use]
    pub fn new(recipes: &[MixRecipe]) -> Self {
        let recipes = recipes
            .iter()
            .map(|r| (pair_key(r.first, r.second), r.result))
            .collect();
        Self { recipes }
    }

    /// Build from the `[mixing]` config section.
    #[must_use]
    pub fn from_config(config: &MixingConfig) -> Self {
        Self::new(&config.recipes)
    }

    /// Configured result for a pair, regardless of order.
    #[must_use]
    pub fn recipe_for(&self, a: EmotionType, b: EmotionType) -> Option<EmotionType> {
        self.recipes.get(&pair_key(a, b)).copied()
    }
}

impl MixPolicy for RecipeMix {
    fn mix(&self, first: &EmotionData, second: &EmotionData) -> Option<MixOutcome> {
        let result = self
            .recipe_for(first.emotion_type, second.emotion_type)
            .unwrap_or(if second.value > first.value {
                second.emotion_type
            } else {
                first.emotion_type
            });
        Some(MixOutcome {
            result,
            value: (first.value + second.value) / 2.0,
            intensity: first.intensity.max(second.intensity),
        })
    }
}

fn pair_key(a: EmotionType, b: EmotionType) -> (EmotionType, EmotionType) {
    if a <= b { (a, b) } else { (b, a) }
}

// ---------------------------------------------------------------------------
// Trends
// ---------------------------------------------------------------------------

/// Computes the scalar trend value of a day given the previous day's averages.
pub trait TrendPolicy: Send + Sync {
    /// `previous` is `None` for the first day in the window.
    fn trend_value(
        &self,
        previous: Option<&BTreeMap<EmotionType, f32>>,
        current: &BTreeMap<EmotionType, f32>,
    ) -> f32;
}

/// Difference between the mean intensity of a day and the mean of the
/// previous logged day. The first day of a window has trend 0; a positive
/// value means intensity is rising.
#[derive(Debug, Clone, Copy, Default)]
pub struct DayOverDayDelta;

impl TrendPolicy for DayOverDayDelta {
    fn trend_value(
        &self,
        previous: Option<&BTreeMap<EmotionType, f32>>,
        current: &BTreeMap<EmotionType, f32>,
    ) -> f32 {
        match previous {
            Some(prev) => mean(current) - mean(prev),
            None => 0.0,
        }
    }
}

fn mean(values: &BTreeMap<EmotionType, f32>) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.values().sum::<f32>() / values.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn data(t: EmotionType, value: f32, intensity: f32) -> EmotionData {
        EmotionData::new(t, value, intensity, Utc::now())
    }

    #[test]
    fn recipe_is_order_independent() {
        let policy = RecipeMix::from_config(&MixingConfig::default());
        let a = policy
            .mix(&data(EmotionType::Joy, 0.4, 0.2), &data(EmotionType::Trust, 0.8, 0.6))
            .expect("mix");
        let b = policy
            .mix(&data(EmotionType::Trust, 0.8, 0.6), &data(EmotionType::Joy, 0.4, 0.2))
            .expect("mix");
        assert_eq!(a.result, EmotionType::Love);
        assert_eq!(a, b);
        assert!((a.value - 0.6).abs() < 1e-6);
        assert!((a.intensity - 0.6).abs() < 1e-6);
    }

    #[test]
    fn unknown_pair_feeds_dominant_source() {
        let policy = RecipeMix::new(&[]);
        let out = policy
            .mix(&data(EmotionType::Calm, 0.2, 0.1), &data(EmotionType::Fear, 0.9, 0.3))
            .expect("mix");
        assert_eq!(out.result, EmotionType::Fear);
    }

    #[test]
    fn trend_is_day_over_day_mean_delta() {
        let policy = DayOverDayDelta;
        let day1 = BTreeMap::from([(EmotionType::Joy, 0.2), (EmotionType::Fear, 0.4)]);
        let day2 = BTreeMap::from([(EmotionType::Joy, 0.6)]);
        assert!(policy.trend_value(None, &day1).abs() < f32::EPSILON);
        let t = policy.trend_value(Some(&day1), &day2);
        assert!((t - 0.3).abs() < 1e-6);
    }
}
