//! Read path for leaderboards and personal standings.

use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::{
    Period, RankedPlayer, RankingCalculator, RankingEntry, RankingError, RankingScope,
    TierStanding, UserStanding,
};
use crate::clock::{Clock, SystemClock};
use crate::progress::{LevelProgress, Profile, ProfileStore, ProgressStore};
use crate::storage::{LocationStore, RankingStore};

/// Default number of entries served per leaderboard.
pub const DEFAULT_TOP_K: usize = 50;

/// Name shown for users without a profile.
const PLACEHOLDER_NAME: &str = "Jogador";

/// Serves enriched leaderboard slices.
///
/// Live point totals come from `P`; standings and lazy recomputes go through
/// the calculator's own progress store `Q`, which may be a cached view of `P`.
pub struct RankingReader<P, F, Q = P, C = SystemClock> {
    rankings: RankingStore,
    locations: LocationStore,
    live: Arc<P>,
    profiles: Arc<F>,
    calculator: Arc<RankingCalculator<Q, C>>,
    top_k: usize,
}

impl<P, F, Q, C> RankingReader<P, F, Q, C>
where
    P: ProgressStore,
    F: ProfileStore,
    Q: ProgressStore,
    C: Clock,
{
    pub fn new(
        rankings: RankingStore,
        locations: LocationStore,
        live: Arc<P>,
        profiles: Arc<F>,
        calculator: Arc<RankingCalculator<Q, C>>,
    ) -> Self {
        Self {
            rankings,
            locations,
            live,
            profiles,
            calculator,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Top entries of one partition, ordered by position.
    ///
    /// An empty partition triggers one recompute and one re-read. If it is
    /// still empty after that, an empty list is returned.
    pub async fn fetch_ranking(&self, scope: &RankingScope) -> Result<Vec<RankedPlayer>, RankingError> {
        let mut entries = self.rankings.partition(scope, Period::AllTime, self.top_k)?;

        if entries.is_empty() {
            tracing::info!(%scope, "Ranking partition empty, recomputing");
            self.calculator.recompute().await?;
            entries = self.rankings.partition(scope, Period::AllTime, self.top_k)?;
        }

        Ok(self.enrich(scope, entries).await)
    }

    /// A user's position in each tier plus points, level and location.
    ///
    /// Points come through the progress cache and may lag the store by up to
    /// its TTL, unlike leaderboard rows which read live points.
    pub async fn user_standing(&self, user_id: Uuid) -> Result<UserStanding, RankingError> {
        if self.rankings.count()? == 0 {
            tracing::info!("No rankings stored, recomputing");
            self.calculator.recompute().await?;
        }

        let entries = self.rankings.entries_for_user(user_id, Period::AllTime)?;
        let location = self.locations.get(user_id)?;

        let mut national = None;
        let mut regional = None;
        let mut local = None;
        for entry in &entries {
            let standing = TierStanding {
                position: entry.position,
                partition_size: self.rankings.partition_size(&entry.scope, entry.period)?,
            };
            match entry.scope {
                RankingScope::National => national = Some(standing),
                RankingScope::Regional(_) => regional = Some(standing),
                RankingScope::Local(_) => local = Some(standing),
            }
        }

        let record = self
            .calculator
            .progress()
            .points_for(user_id)
            .await
            .map_err(|e| RankingError::DependencyRead {
                what: "points",
                cause: e.to_string(),
            })?;
        let (total_points, level) = match record {
            Some(record) => (record.total_points, record.level_progress()),
            None => (0, LevelProgress::from_points(0)),
        };

        Ok(UserStanding {
            user_id,
            national,
            regional,
            local,
            total_points,
            level,
            region: location.as_ref().map(|l| l.region),
            state: location.as_ref().map(|l| l.state.clone()),
            city: location.and_then(|l| l.city_approximate),
        })
    }

    /// Attach names, avatars and live points. Failures here degrade the
    /// display data but never fail the read.
    async fn enrich(&self, scope: &RankingScope, entries: Vec<RankingEntry>) -> Vec<RankedPlayer> {
        let user_ids: Vec<Uuid> = entries.iter().map(|e| e.user_id).collect();

        let profiles: HashMap<Uuid, Profile> = match self.profiles.profiles_for(&user_ids).await {
            Ok(profiles) => profiles.into_iter().map(|p| (p.user_id, p)).collect(),
            Err(e) => {
                tracing::warn!(%scope, "Profile lookup failed: {}", e);
                HashMap::new()
            }
        };

        let live_points: HashMap<Uuid, u32> = match self.live.points_for_many(&user_ids).await {
            Ok(records) => records
                .into_iter()
                .map(|r| (r.user_id, r.total_points))
                .collect(),
            Err(e) => {
                tracing::warn!(%scope, "Live points lookup failed: {}", e);
                HashMap::new()
            }
        };

        let location = scope.location_label();

        entries
            .into_iter()
            .map(|entry| {
                let profile = profiles.get(&entry.user_id);
                let display_name = profile
                    .and_then(|p| p.display_name.clone())
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or_else(|| format!("{} #{}", PLACEHOLDER_NAME, entry.position));

                RankedPlayer {
                    user_id: entry.user_id,
                    position: entry.position,
                    display_name,
                    avatar_url: profile.and_then(|p| p.avatar_url.clone()),
                    points: live_points
                        .get(&entry.user_id)
                        .copied()
                        .unwrap_or(entry.total_points),
                    ranked_points: entry.total_points,
                    location: location.clone(),
                }
            })
            .collect()
    }
}
