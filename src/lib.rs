//! Podium - Geographic Ranking and Achievement Engine
//!
//! Aggregates per-user point totals into national, regional and local
//! leaderboards for Brazil, derives each user's region from GPS or manual
//! input, and unlocks region-scoped achievements from point and position
//! thresholds.

pub mod achievements;
pub mod clock;
pub mod engine;
pub mod geo;
pub mod progress;
pub mod rankings;
pub mod storage;

// Re-export commonly used types
pub use achievements::AchievementEvaluator;
pub use engine::{EngineError, RankingEngine, RecomputeReport};
pub use geo::{LocationInput, LocationResolver, MacroRegion, StateCode};
pub use rankings::{RankingCalculator, RankingReader, RankingScope};
pub use storage::config::AppConfig;
