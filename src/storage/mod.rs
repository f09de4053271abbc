//! Storage module for database and configuration.

pub mod achievement_store;
pub mod config;
pub mod database;
pub mod location_store;
pub mod progress_store;
pub mod ranking_store;
pub mod schema;

pub use achievement_store::{AchievementStore, UnlockOutcome};
pub use config::{AppConfig, ConfigError};
pub use database::{Database, DatabaseError};
pub use location_store::LocationStore;
pub use progress_store::{SqliteProfileStore, SqliteProgressStore};
pub use ranking_store::RankingStore;
