//! Region-scoped achievements.
//!
//! Provides the achievement catalogue, unlock records and the evaluator that
//! checks point and position thresholds after a recompute.

pub mod definitions;
pub mod evaluator;

pub use evaluator::AchievementEvaluator;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::geo::{MacroRegion, StateCode};
use crate::progress::StoreError;
use crate::rankings::RankingScope;
use crate::storage::DatabaseError;

/// Name of the country-wide scope.
pub const COUNTRY_SCOPE: &str = "Brasil";

/// Where an achievement applies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AchievementScope {
    Country,
    Region(MacroRegion),
    State(StateCode),
}

impl AchievementScope {
    /// Parse the stored scope: "Brasil", a macro-region name, or a state code.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case(COUNTRY_SCOPE) {
            return Some(AchievementScope::Country);
        }
        if let Some(region) = MacroRegion::parse_known(raw) {
            return Some(AchievementScope::Region(region));
        }
        StateCode::parse(raw).map(AchievementScope::State)
    }

    pub fn as_string(&self) -> String {
        match self {
            AchievementScope::Country => COUNTRY_SCOPE.to_string(),
            AchievementScope::Region(region) => region.as_str().to_string(),
            AchievementScope::State(state) => state.as_str().to_string(),
        }
    }

    /// The ranking partition whose position counts for this scope.
    pub fn ranking_scope(&self) -> RankingScope {
        match self {
            AchievementScope::Country => RankingScope::National,
            AchievementScope::Region(region) => RankingScope::Regional(*region),
            AchievementScope::State(state) => RankingScope::Local(state.clone()),
        }
    }

    /// Whether a user located in (`region`, `state`) can earn this achievement.
    pub fn applies_to(&self, region: Option<MacroRegion>, state: Option<&StateCode>) -> bool {
        match self {
            AchievementScope::Country => true,
            AchievementScope::Region(scope) => {
                scope.is_known() && region.is_some_and(|r| r == *scope)
            }
            AchievementScope::State(scope) => state.is_some_and(|s| s == scope),
        }
    }
}

impl fmt::Display for AchievementScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}

/// Threshold kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequirementType {
    /// Total points at least the requirement value
    Points,
    /// Position at most the requirement value
    Position,
}

impl RequirementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequirementType::Points => "points",
            RequirementType::Position => "position",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "points" => Some(RequirementType::Points),
            "position" => Some(RequirementType::Position),
            _ => None,
        }
    }
}

/// Achievement rarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Rare => "rare",
            Rarity::Epic => "epic",
            Rarity::Legendary => "legendary",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "common" => Some(Rarity::Common),
            "rare" => Some(Rarity::Rare),
            "epic" => Some(Rarity::Epic),
            "legendary" => Some(Rarity::Legendary),
            _ => None,
        }
    }
}

/// Achievement definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionalAchievement {
    pub id: String,
    pub name: String,
    pub description: String,
    pub scope: AchievementScope,
    pub requirement_type: RequirementType,
    pub requirement_value: u32,
    pub points_reward: u32,
    pub icon: String,
    pub rarity: Rarity,
}

impl RegionalAchievement {
    /// Whether the given points and scope position meet the requirement.
    pub fn is_met(&self, total_points: u32, scope_position: Option<u32>) -> bool {
        match self.requirement_type {
            RequirementType::Points => total_points >= self.requirement_value,
            RequirementType::Position => {
                scope_position.is_some_and(|position| position <= self.requirement_value)
            }
        }
    }
}

/// Record of an unlocked achievement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRegionalAchievement {
    pub user_id: Uuid,
    pub achievement: RegionalAchievement,
    pub unlocked_at: DateTime<Utc>,
}

/// Achievement errors.
#[derive(Debug, Error)]
pub enum AchievementError {
    #[error("Failed to read {what}: {cause}")]
    DependencyRead { what: &'static str, cause: String },

    #[error("Database error: {0}")]
    Database(String),
}

impl From<DatabaseError> for AchievementError {
    fn from(err: DatabaseError) -> Self {
        AchievementError::Database(err.to_string())
    }
}

impl AchievementError {
    pub(crate) fn progress(err: StoreError) -> Self {
        AchievementError::DependencyRead {
            what: "progress",
            cause: err.to_string(),
        }
    }
}
