//! Ranking data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::geo::{MacroRegion, StateCode};
use crate::progress::LevelProgress;

/// Leaderboard tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankingType {
    National,
    Regional,
    Local,
}

impl RankingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RankingType::National => "national",
            RankingType::Regional => "regional",
            RankingType::Local => "local",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "national" => Some(RankingType::National),
            "regional" => Some(RankingType::Regional),
            "local" => Some(RankingType::Local),
            _ => None,
        }
    }
}

impl fmt::Display for RankingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One leaderboard partition.
///
/// Regional partitions are keyed by macro-region, local partitions by state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RankingScope {
    National,
    Regional(MacroRegion),
    Local(StateCode),
}

impl RankingScope {
    pub fn ranking_type(&self) -> RankingType {
        match self {
            RankingScope::National => RankingType::National,
            RankingScope::Regional(_) => RankingType::Regional,
            RankingScope::Local(_) => RankingType::Local,
        }
    }

    /// Value of the `region` column for this scope.
    pub fn region_key(&self) -> Option<&str> {
        match self {
            RankingScope::National => None,
            RankingScope::Regional(region) => Some(region.as_str()),
            RankingScope::Local(state) => Some(state.as_str()),
        }
    }

    /// Rebuild a scope from its stored columns.
    pub fn from_columns(ranking_type: RankingType, region: Option<&str>) -> Option<Self> {
        match ranking_type {
            RankingType::National => Some(RankingScope::National),
            RankingType::Regional => region.map(|r| RankingScope::Regional(MacroRegion::from_name(r))),
            RankingType::Local => region.and_then(StateCode::parse).map(RankingScope::Local),
        }
    }

    /// Label shown next to an entry of this scope.
    pub fn location_label(&self) -> String {
        match self {
            RankingScope::National => "Brasil".to_string(),
            RankingScope::Regional(region) => region.to_string(),
            RankingScope::Local(state) => state.to_string(),
        }
    }
}

impl fmt::Display for RankingScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.region_key() {
            Some(key) => write!(f, "{}:{}", self.ranking_type(), key),
            None => write!(f, "{}", self.ranking_type()),
        }
    }
}

/// Ranking period. Only the all-time period exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    #[default]
    AllTime,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::AllTime => "all_time",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "all_time" => Some(Period::AllTime),
            _ => None,
        }
    }
}

/// One stored leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub user_id: Uuid,
    pub scope: RankingScope,
    pub period: Period,
    /// 1-based position within the partition
    pub position: u32,
    /// Point total at recompute time
    pub total_points: u32,
    pub calculated_at: DateTime<Utc>,
}

/// Outcome of a full recompute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecomputeSummary {
    pub national_entries: usize,
    pub regional_entries: usize,
    pub local_entries: usize,
    pub partitions: usize,
    pub calculated_at: DateTime<Utc>,
}

impl RecomputeSummary {
    pub fn total_entries(&self) -> usize {
        self.national_entries + self.regional_entries + self.local_entries
    }
}

/// Leaderboard row enriched for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedPlayer {
    pub user_id: Uuid,
    pub position: u32,
    pub display_name: String,
    pub avatar_url: Option<String>,
    /// Live total from the progress store
    pub points: u32,
    /// Total at the time positions were computed
    pub ranked_points: u32,
    pub location: String,
}

/// A user's place within one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierStanding {
    pub position: u32,
    /// Number of users in the partition
    pub partition_size: u32,
}

/// A user's place across all tiers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserStanding {
    pub user_id: Uuid,
    pub national: Option<TierStanding>,
    pub regional: Option<TierStanding>,
    pub local: Option<TierStanding>,
    pub total_points: u32,
    pub level: LevelProgress,
    pub region: Option<MacroRegion>,
    pub state: Option<StateCode>,
    pub city: Option<String>,
}
