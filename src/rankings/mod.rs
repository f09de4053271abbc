//! Rankings module
//!
//! Computes and serves the national, regional and local leaderboards.

pub mod calculator;
pub mod reader;
pub mod types;

// Re-export commonly used types
pub use calculator::RankingCalculator;
pub use reader::RankingReader;
pub use types::{
    Period, RankedPlayer, RankingEntry, RankingScope, RankingType, RecomputeSummary,
    TierStanding, UserStanding,
};

use thiserror::Error;

use crate::storage::DatabaseError;

/// Ranking errors.
#[derive(Debug, Error)]
pub enum RankingError {
    #[error("Failed to read {what}: {cause}")]
    DependencyRead { what: &'static str, cause: String },

    #[error("Ranking write rolled back: {0}")]
    WriteFailed(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<DatabaseError> for RankingError {
    fn from(err: DatabaseError) -> Self {
        RankingError::Database(err.to_string())
    }
}
