//! Points ledger and player progress.
//!
//! [`PlayerData`] is the read model consumed by achievement conditions. The
//! [`PointsService`] is the only writer of its transaction list.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::PointsConfig;
use crate::emotion::EmotionData;
use crate::events::EmotionEvent;
use crate::types::{EmotionEventType, EmotionType};

/// Why points were awarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointsSource {
    /// The user logged an emotion.
    EmotionMarked,
    /// The user mixed two emotions.
    EmotionMixed,
    /// The user tapped a jar.
    JarClicked,
    /// First emotion logged on a calendar day.
    DailyBonus,
    /// An achievement unlocked.
    Achievement,
}

/// One entry in the points ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointsTransaction {
    /// Why the points were awarded.
    pub source: PointsSource,
    /// When they were awarded.
    pub timestamp: DateTime<Utc>,
    /// How many points (may be negative for corrections).
    pub amount: i64,
    /// Human-readable reason.
    #[serde(default)]
    pub description: String,
}

/// Per-user progress read by achievement conditions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerData {
    /// Ordered points ledger (append order).
    #[serde(default)]
    pub points_transactions: Vec<PointsTransaction>,
    /// Latest known state of each emotion.
    #[serde(default)]
    pub emotion_data: HashMap<EmotionType, EmotionData>,
    /// IDs of achievements already unlocked.
    #[serde(default)]
    pub unlocked_achievements: BTreeSet<String>,
}

impl PlayerData {
    /// Create empty player data.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of all transaction amounts.
    #[must_use]
    pub fn total_points(&self) -> i64 {
        self.points_transactions.iter().map(|t| t.amount).sum()
    }

    /// Transactions from one source, in ledger order.
    pub fn transactions_from(&self, source: PointsSource) -> impl Iterator<Item = &PointsTransaction> {
        self.points_transactions
            .iter()
            .filter(move |t| t.source == source)
    }

    /// Copy the live emotion table into the read model.
    pub fn sync_emotions<'a>(&mut self, emotions: impl IntoIterator<Item = &'a EmotionData>) {
        for data in emotions {
            self.emotion_data.insert(data.emotion_type, data.clone());
        }
    }
}

/// Awards points according to [`PointsConfig`].
#[derive(Debug, Clone, Default)]
pub struct PointsService {
    config: PointsConfig,
}

impl PointsService {
    /// Create a service with the given point values.
    #[must_use]
    pub fn new(config: PointsConfig) -> Self {
        Self { config }
    }

    /// Configured amount for a source.
    #[must_use]
    pub fn amount_for(&self, source: PointsSource) -> i64 {
        match source {
            PointsSource::EmotionMarked => self.config.emotion_marked,
            PointsSource::EmotionMixed => self.config.emotion_mixed,
            PointsSource::JarClicked => self.config.jar_clicked,
            PointsSource::DailyBonus => self.config.daily_bonus,
            PointsSource::Achievement => 0,
        }
    }

    /// Append a transaction with an explicit amount.
    pub fn award(
        &self,
        player: &mut PlayerData,
        source: PointsSource,
        amount: i64,
        description: impl Into<String>,
        now: DateTime<Utc>,
    ) -> PointsTransaction {
        let tx = PointsTransaction {
            source,
            timestamp: now,
            amount,
            description: description.into(),
        };
        debug!(source = ?source, amount, total = player.total_points() + amount, "Points awarded");
        player.points_transactions.push(tx.clone());
        tx
    }

    /// Award points for logging an emotion, plus the daily bonus if this is
    /// the first emotion marked on `now`'s UTC date.
    pub fn award_emotion_marked(
        &self,
        player: &mut PlayerData,
        emotion_type: EmotionType,
        now: DateTime<Utc>,
    ) -> Vec<PointsTransaction> {
        let today = now.date_naive();
        let first_today = !player
            .transactions_from(PointsSource::EmotionMarked)
            .any(|t| t.timestamp.date_naive() == today);

        let mut awarded = vec![self.award(
            player,
            PointsSource::EmotionMarked,
            self.config.emotion_marked,
            format!("Marked {emotion_type}"),
            now,
        )];
        if first_today {
            awarded.push(self.award(
                player,
                PointsSource::DailyBonus,
                self.config.daily_bonus,
                "First emotion of the day",
                now,
            ));
        }
        awarded
    }

    /// Map an emotion event to its award. Events that earn nothing return
    /// an empty vector.
    pub fn award_for_event(&self, player: &mut PlayerData, event: &EmotionEvent) -> Vec<PointsTransaction> {
        match event.event_type {
            EmotionEventType::ValueChanged => {
                self.award_emotion_marked(player, event.emotion_type, event.timestamp)
            }
            EmotionEventType::EmotionMixed => vec![self.award(
                player,
                PointsSource::EmotionMixed,
                self.config.emotion_mixed,
                format!("Mixed into {}", event.emotion_type),
                event.timestamp,
            )],
            EmotionEventType::JarClicked => vec![self.award(
                player,
                PointsSource::JarClicked,
                self.config.jar_clicked,
                format!("Tapped {} jar", event.emotion_type),
                event.timestamp,
            )],
            EmotionEventType::IntensityChanged
            | EmotionEventType::JarFilled
            | EmotionEventType::NoteAdded => Vec::new(),
        }
    }
}
