//! Achievement checking and unlocking.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

use super::definitions::default_achievements;
use super::{AchievementError, RegionalAchievement, UserRegionalAchievement};
use crate::clock::{Clock, SystemClock};
use crate::progress::ProgressStore;
use crate::rankings::{Period, RankingScope};
use crate::storage::{AchievementStore, LocationStore, RankingStore, UnlockOutcome};

/// Unlocks regional achievements from fresh ranking positions.
pub struct AchievementEvaluator<P, C = SystemClock> {
    achievements: AchievementStore,
    rankings: RankingStore,
    locations: LocationStore,
    progress: Arc<P>,
    clock: C,
}

impl<P: ProgressStore> AchievementEvaluator<P, SystemClock> {
    pub fn new(
        achievements: AchievementStore,
        rankings: RankingStore,
        locations: LocationStore,
        progress: Arc<P>,
    ) -> Self {
        Self::with_clock(achievements, rankings, locations, progress, SystemClock)
    }
}

impl<P: ProgressStore, C: Clock> AchievementEvaluator<P, C> {
    pub fn with_clock(
        achievements: AchievementStore,
        rankings: RankingStore,
        locations: LocationStore,
        progress: Arc<P>,
        clock: C,
    ) -> Self {
        Self {
            achievements,
            rankings,
            locations,
            progress,
            clock,
        }
    }

    /// Insert the built-in catalogue. Existing definitions are left alone.
    pub fn seed_defaults(&self) -> Result<usize, AchievementError> {
        let added = self
            .achievements
            .seed(&default_achievements(), self.clock.now())?;
        if added > 0 {
            tracing::info!("Seeded {} regional achievements", added);
        }
        Ok(added)
    }

    /// Every definition, most common first.
    pub fn catalog(&self) -> Result<Vec<RegionalAchievement>, AchievementError> {
        Ok(self.achievements.all()?)
    }

    /// A user's unlocked achievements, newest first.
    pub fn unlocked_for(&self, user_id: Uuid) -> Result<Vec<UserRegionalAchievement>, AchievementError> {
        Ok(self.achievements.unlocked_for(user_id)?)
    }

    /// Check a user against every achievement they can still earn.
    ///
    /// Returns only the achievements unlocked by this call. Each new unlock
    /// awards its reward once; positions are not recomputed afterwards.
    pub async fn evaluate_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<UserRegionalAchievement>, AchievementError> {
        let location = self.locations.get(user_id)?;
        let region = location.as_ref().map(|l| l.region);
        let state = location.as_ref().map(|l| &l.state);

        // Existence pre-check; the insert below still guards against concurrent runs
        let unlocked: HashSet<String> = self.achievements.unlocked_ids(user_id)?.into_iter().collect();
        let candidates: Vec<RegionalAchievement> = self
            .achievements
            .all()?
            .into_iter()
            .filter(|a| !unlocked.contains(&a.id) && a.scope.applies_to(region, state))
            .collect();

        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let total_points = self
            .progress
            .points_for(user_id)
            .await
            .map_err(AchievementError::progress)?
            .map(|record| record.total_points)
            .unwrap_or(0);

        let positions: HashMap<RankingScope, u32> = self
            .rankings
            .entries_for_user(user_id, Period::AllTime)?
            .into_iter()
            .map(|entry| (entry.scope, entry.position))
            .collect();

        let mut newly_unlocked = Vec::new();

        for achievement in candidates {
            let position = positions.get(&achievement.scope.ranking_scope()).copied();
            if !achievement.is_met(total_points, position) {
                continue;
            }

            if let Some(earned) = self.unlock(user_id, achievement).await? {
                newly_unlocked.push(earned);
            }
        }

        Ok(newly_unlocked)
    }

    /// Evaluate many users. A failure for one user is logged and skipped.
    pub async fn evaluate_all(&self, user_ids: &[Uuid]) -> Vec<UserRegionalAchievement> {
        let mut unlocked = Vec::new();
        for &user_id in user_ids {
            match self.evaluate_user(user_id).await {
                Ok(earned) => unlocked.extend(earned),
                Err(e) => tracing::warn!(%user_id, "Achievement evaluation failed: {}", e),
            }
        }
        unlocked
    }

    async fn unlock(
        &self,
        user_id: Uuid,
        achievement: RegionalAchievement,
    ) -> Result<Option<UserRegionalAchievement>, AchievementError> {
        let now = self.clock.now();
        match self.achievements.unlock(user_id, &achievement.id, now)? {
            UnlockOutcome::AlreadyUnlocked => {
                tracing::debug!(%user_id, achievement = %achievement.id, "Unlock raced, ignoring");
                Ok(None)
            }
            UnlockOutcome::Unlocked => {
                tracing::info!(%user_id, achievement = %achievement.id, "Achievement unlocked");

                if achievement.points_reward > 0 {
                    // The unlock row stays even if the reward cannot be paid
                    if let Err(e) = self
                        .progress
                        .add_points(user_id, achievement.points_reward)
                        .await
                    {
                        tracing::warn!(
                            %user_id,
                            achievement = %achievement.id,
                            "Failed to award {} points: {}",
                            achievement.points_reward,
                            e
                        );
                    }
                }

                Ok(Some(UserRegionalAchievement {
                    user_id,
                    achievement,
                    unlocked_at: now,
                }))
            }
        }
    }
}
