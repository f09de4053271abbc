//! Persistence for the achievement catalogue and unlock records.

use chrono::{DateTime, Utc};
use rusqlite::params;
use std::sync::Arc;
use uuid::Uuid;

use crate::achievements::{
    AchievementScope, Rarity, RegionalAchievement, RequirementType, UserRegionalAchievement,
};
use crate::storage::database::{Database, DatabaseError};
use crate::storage::location_store::parse_timestamp;

const ACHIEVEMENT_COLUMNS: &str =
    "a.id, a.name, a.description, a.scope, a.requirement_type, a.requirement_value, a.points_reward, a.icon, a.rarity";

/// Result of an unlock attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockOutcome {
    /// A new row was written
    Unlocked,
    /// The pair already existed
    AlreadyUnlocked,
}

/// Store for `regional_achievements` and `user_regional_achievements`.
#[derive(Clone)]
pub struct AchievementStore {
    db: Arc<Database>,
}

impl AchievementStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert definitions that are not present yet. Returns how many were added.
    pub fn seed(
        &self,
        achievements: &[RegionalAchievement],
        now: DateTime<Utc>,
    ) -> Result<usize, DatabaseError> {
        self.db.with_transaction(|tx| {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO regional_achievements
                 (id, name, description, scope, requirement_type, requirement_value, points_reward, icon, rarity, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;

            let mut added = 0;
            for achievement in achievements {
                added += stmt.execute(params![
                    achievement.id,
                    achievement.name,
                    achievement.description,
                    achievement.scope.as_string(),
                    achievement.requirement_type.as_str(),
                    achievement.requirement_value,
                    achievement.points_reward,
                    achievement.icon,
                    achievement.rarity.as_str(),
                    now.to_rfc3339(),
                ])?;
            }
            Ok(added)
        })
    }

    /// Every definition, most common first.
    pub fn all(&self) -> Result<Vec<RegionalAchievement>, DatabaseError> {
        let mut achievements = self.db.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ACHIEVEMENT_COLUMNS} FROM regional_achievements a ORDER BY a.id"
            ))?;
            let rows = stmt.query_map([], AchievementRow::from_row)?;

            let mut achievements = Vec::new();
            for row in rows {
                if let Some(achievement) = row?.into_achievement() {
                    achievements.push(achievement);
                }
            }
            Ok(achievements)
        })?;

        achievements.sort_by_key(|a| a.rarity);
        Ok(achievements)
    }

    /// Ids of achievements a user has unlocked.
    pub fn unlocked_ids(&self, user_id: Uuid) -> Result<Vec<String>, DatabaseError> {
        self.db.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT achievement_id FROM user_regional_achievements WHERE user_id = ?1",
            )?;
            let rows = stmt.query_map(params![user_id.to_string()], |row| row.get(0))?;

            let mut ids = Vec::new();
            for row in rows {
                ids.push(row?);
            }
            Ok(ids)
        })
    }

    /// Record an unlock. A second attempt for the same pair is a no-op.
    pub fn unlock(
        &self,
        user_id: Uuid,
        achievement_id: &str,
        now: DateTime<Utc>,
    ) -> Result<UnlockOutcome, DatabaseError> {
        let inserted = self.db.with_connection(|conn| {
            Ok(conn.execute(
                "INSERT INTO user_regional_achievements (user_id, achievement_id, unlocked_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id, achievement_id) DO NOTHING",
                params![user_id.to_string(), achievement_id, now.to_rfc3339()],
            )?)
        })?;

        Ok(if inserted == 1 {
            UnlockOutcome::Unlocked
        } else {
            UnlockOutcome::AlreadyUnlocked
        })
    }

    /// A user's unlocked achievements, newest first.
    pub fn unlocked_for(&self, user_id: Uuid) -> Result<Vec<UserRegionalAchievement>, DatabaseError> {
        self.db.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ACHIEVEMENT_COLUMNS}, u.unlocked_at
                 FROM user_regional_achievements u
                 JOIN regional_achievements a ON a.id = u.achievement_id
                 WHERE u.user_id = ?1
                 ORDER BY u.unlocked_at DESC, u.id DESC"
            ))?;

            let rows = stmt.query_map(params![user_id.to_string()], |row| {
                Ok((AchievementRow::from_row(row)?, row.get::<_, String>(9)?))
            })?;

            let mut unlocked = Vec::new();
            for row in rows {
                let (achievement, unlocked_at) = row?;
                if let Some(achievement) = achievement.into_achievement() {
                    unlocked.push(UserRegionalAchievement {
                        user_id,
                        achievement,
                        unlocked_at: parse_timestamp(&unlocked_at)?,
                    });
                }
            }
            Ok(unlocked)
        })
    }
}

struct AchievementRow {
    id: String,
    name: String,
    description: String,
    scope: String,
    requirement_type: String,
    requirement_value: u32,
    points_reward: u32,
    icon: String,
    rarity: String,
}

impl AchievementRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            scope: row.get(3)?,
            requirement_type: row.get(4)?,
            requirement_value: row.get(5)?,
            points_reward: row.get(6)?,
            icon: row.get(7)?,
            rarity: row.get(8)?,
        })
    }

    /// Rows with an unreadable scope or requirement are skipped, not fatal.
    fn into_achievement(self) -> Option<RegionalAchievement> {
        let (Some(scope), Some(requirement_type)) = (
            AchievementScope::parse(&self.scope),
            RequirementType::from_str(&self.requirement_type),
        ) else {
            tracing::warn!(id = %self.id, scope = %self.scope, "Skipping malformed achievement");
            return None;
        };

        Some(RegionalAchievement {
            id: self.id,
            name: self.name,
            description: self.description,
            scope,
            requirement_type,
            requirement_value: self.requirement_value,
            points_reward: self.points_reward,
            icon: self.icon,
            rarity: Rarity::from_str(&self.rarity).unwrap_or(Rarity::Common),
        })
    }
}
