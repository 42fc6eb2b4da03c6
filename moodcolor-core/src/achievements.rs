//! Achievement conditions and tracking.
//!
//! Conditions are pure functions of [`PlayerData`]. Missing player data is
//! handled by [`Achievement::is_met`] / [`Achievement::progress`], which
//! treat `None` as "not met, no progress" instead of failing.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::info;

use crate::config::AchievementConfig;
use crate::points::{PlayerData, PointsService, PointsSource, PointsTransaction};
use crate::types::EmotionType;

/// Unlock criterion evaluated against a player's progress.
pub trait AchievementCondition: Send + Sync {
    /// Whether the criterion is satisfied.
    fn check_condition(&self, player: &PlayerData) -> bool;

    /// Progress towards the criterion in `[0, 1]`.
    fn calculate_progress(&self, player: &PlayerData) -> f32;
}

// ---------------------------------------------------------------------------
// Daily Mindfulness
// ---------------------------------------------------------------------------

/// Log an emotion on `required_days` consecutive calendar days.
///
/// The streak is the run of consecutive UTC dates (with at least one
/// `EmotionMarked` transaction) ending at the most recent such date.
#[derive(Debug, Clone, Copy)]
pub struct DailyMindfulnessCondition {
    /// Consecutive days needed.
    pub required_days: u32,
}

impl Default for DailyMindfulnessCondition {
    fn default() -> Self {
        Self { required_days: 7 }
    }
}

impl DailyMindfulnessCondition {
    /// Length of the current streak.
    #[must_use]
    pub fn streak_length(player: &PlayerData) -> u32 {
        let dates: BTreeSet<NaiveDate> = player
            .transactions_from(PointsSource::EmotionMarked)
            .map(|t| t.timestamp.date_naive())
            .collect();

        let mut streak = 0;
        let mut expected: Option<NaiveDate> = None;
        for date in dates.into_iter().rev() {
            match expected {
                Some(e) if date != e => break,
                _ => {}
            }
            streak += 1;
            expected = date.checked_sub_signed(Duration::days(1));
            if expected.is_none() {
                break;
            }
        }
        streak
    }
}

impl AchievementCondition for DailyMindfulnessCondition {
    fn check_condition(&self, player: &PlayerData) -> bool {
        Self::streak_length(player) >= self.required_days
    }

    fn calculate_progress(&self, player: &PlayerData) -> f32 {
        if self.required_days == 0 {
            return 1.0;
        }
        (Self::streak_length(player) as f32 / self.required_days as f32).min(1.0)
    }
}

// ---------------------------------------------------------------------------
// Emotion Spectrum
// ---------------------------------------------------------------------------

/// Experience every defined emotion at least once (value > 0).
#[derive(Debug, Clone, Copy, Default)]
pub struct EmotionSpectrumCondition;

impl EmotionSpectrumCondition {
    /// Emotion types with a logged value above zero.
    #[must_use]
    pub fn experienced(player: &PlayerData) -> BTreeSet<EmotionType> {
        player
            .emotion_data
            .iter()
            .filter(|(_, d)| d.is_present())
            .map(|(t, _)| *t)
            .collect()
    }
}

impl AchievementCondition for EmotionSpectrumCondition {
    fn check_condition(&self, player: &PlayerData) -> bool {
        let experienced = Self::experienced(player);
        EmotionType::ALL.iter().all(|t| experienced.contains(t))
    }

    fn calculate_progress(&self, player: &PlayerData) -> f32 {
        let experienced = Self::experienced(player);
        let k = EmotionType::ALL
            .iter()
            .filter(|t| experienced.contains(t))
            .count();
        k as f32 / EmotionType::COUNT as f32
    }
}

// ---------------------------------------------------------------------------
// Catalogue & tracker
// ---------------------------------------------------------------------------

/// A named achievement with its unlock condition.
pub struct Achievement {
    /// Stable identifier.
    pub id: &'static str,
    /// Display title.
    pub title: &'static str,
    /// Display description.
    pub description: &'static str,
    /// Points granted on unlock.
    pub points_reward: i64,
    /// Unlock criterion.
    pub condition: Box<dyn AchievementCondition>,
}

impl std::fmt::Debug for Achievement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Achievement")
            .field("id", &self.id)
            .field("points_reward", &self.points_reward)
            .finish_non_exhaustive()
    }
}

impl Achievement {
    /// Whether the condition holds; `None` player data is never met.
    #[must_use]
    pub fn is_met(&self, player: Option<&PlayerData>) -> bool {
        player.is_some_and(|p| self.condition.check_condition(p))
    }

    /// Progress in `[0, 1]`; `None` player data has no progress.
    #[must_use]
    pub fn progress(&self, player: Option<&PlayerData>) -> f32 {
        player.map_or(0.0, |p| self.condition.calculate_progress(p).clamp(0.0, 1.0))
    }
}

/// Identifier of the consecutive-days achievement.
pub const DAILY_MINDFULNESS: &str = "daily_mindfulness";
/// Identifier of the all-emotions achievement.
pub const EMOTION_SPECTRUM: &str = "emotion_spectrum";

/// The built-in achievement catalogue.
#[must_use]
pub fn default_catalogue(config: &AchievementConfig) -> Vec<Achievement> {
    vec![
        Achievement {
            id: DAILY_MINDFULNESS,
            title: "Daily Mindfulness",
            description: "Log your emotions on consecutive days.",
            points_reward: config.unlock_reward,
            condition: Box::new(DailyMindfulnessCondition {
                required_days: config.daily_mindfulness_days,
            }),
        },
        Achievement {
            id: EMOTION_SPECTRUM,
            title: "Emotion Spectrum",
            description: "Experience every emotion at least once.",
            points_reward: config.unlock_reward,
            condition: Box::new(EmotionSpectrumCondition),
        },
    ]
}

/// Evaluates a catalogue and unlocks achievements exactly once.
#[derive(Debug)]
pub struct AchievementTracker {
    catalogue: Vec<Achievement>,
    points: PointsService,
}

/// One newly unlocked achievement.
#[derive(Debug, Clone, PartialEq)]
pub struct Unlock {
    /// Achievement identifier.
    pub id: &'static str,
    /// Reward transaction, if the reward was non-zero.
    pub reward: Option<PointsTransaction>,
}

impl AchievementTracker {
    /// Tracker over an explicit catalogue.
    #[must_use]
    pub fn new(catalogue: Vec<Achievement>, points: PointsService) -> Self {
        Self { catalogue, points }
    }

    /// The catalogue being tracked.
    #[must_use]
    pub fn catalogue(&self) -> &[Achievement] {
        &self.catalogue
    }

    /// Progress of every achievement, in catalogue order.
    #[must_use]
    pub fn progress(&self, player: Option<&PlayerData>) -> Vec<(&'static str, f32)> {
        self.catalogue
            .iter()
            .map(|a| (a.id, a.progress(player)))
            .collect()
    }

    /// Unlock every achievement whose condition now holds and that was not
    /// unlocked before, awarding its reward.
    pub fn evaluate(&self, player: &mut PlayerData, now: DateTime<Utc>) -> Vec<Unlock> {
        let mut unlocked = Vec::new();
        for achievement in &self.catalogue {
            if player.unlocked_achievements.contains(achievement.id)
                || !achievement.is_met(Some(&*player))
            {
                continue;
            }
            player.unlocked_achievements.insert(achievement.id.to_string());
            let reward = (achievement.points_reward != 0).then(|| {
                self.points.award(
                    player,
                    PointsSource::Achievement,
                    achievement.points_reward,
                    achievement.title,
                    now,
                )
            });
            info!(achievement = achievement.id, "Achievement unlocked");
            unlocked.push(Unlock {
                id: achievement.id,
                reward,
            });
        }
        unlocked
    }
}
