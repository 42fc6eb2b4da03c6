//! # moodcolor-sync: persistence boundary and remote sync
//!
//! The app layer talks to storage through the async [`DatabaseService`]
//! trait. [`SqliteDatabaseService`] implements it over the core
//! [`EmotionStore`](moodcolor_core::EmotionStore), and [`SyncCoordinator`]
//! pushes unsynced history records to any [`RemoteStore`], settling
//! disagreements with the configured
//! [`ConflictResolution`](moodcolor_core::emotion::ConflictResolution).
//!
//! Failures surface as [`SyncError`]; [`SyncError::friendly_message`] maps
//! them to text fit for the UI.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod database;
pub mod error;
pub mod remote;
pub mod sync;

pub use database::{DatabaseService, SqliteDatabaseService};
pub use error::{ErrorKind, SyncError};
pub use remote::{InMemoryRemoteStore, RemoteStore};
pub use sync::{SyncCoordinator, SyncReport};
