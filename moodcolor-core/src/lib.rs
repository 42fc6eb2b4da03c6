//! # MoodColor Core Library
//!
//! Emotion tracking for a journaling app where every feeling is a coloured
//! jar. The crate owns:
//!
//! - **Live state**: one [`EmotionData`] per [`EmotionType`], held by the
//!   [`EmotionService`]
//! - **History**: an append-only log of [`EmotionHistoryEntry`] values, one
//!   per state change or interaction
//! - **Events**: an [`EventBus`] notified synchronously on every change
//! - **Analytics**: time-of-day buckets, logging frequency, popular mixes
//!   and day-over-day trends
//! - **Gamification**: a points ledger and achievement conditions
//! - **Storage**: a SQLite store with compressed, optionally encrypted
//!   history payloads
//!
//! ## Failure contract
//!
//! UI-facing operations never panic and never surface errors for bad input:
//! unknown names are logged and ignored. Only storage and codec operations
//! return [`Result`].

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

pub mod achievements;
pub mod codec;
pub mod config;
pub mod emotion;
pub mod error;
pub mod events;
pub mod metrics;
pub mod persistence;
pub mod points;
pub mod policy;
pub mod service;
pub mod stats;
pub mod types;

pub use config::MoodConfig;
pub use emotion::{EmotionData, EmotionHistoryEntry, EmotionHistoryRecord, SyncStatus};
pub use error::{MoodError, Result};
pub use events::{EmotionEvent, EventBus, Subscription};
pub use persistence::EmotionStore;
pub use service::EmotionService;
pub use types::*;
