//! Full leaderboard recompute.
//!
//! Every run reads all point totals and locations, rebuilds the national,
//! regional and local partitions from scratch and swaps them in atomically.
//!
//! Ordering is by total points descending, ties broken by user id ascending,
//! so the same input always yields the same positions.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{Period, RankingEntry, RankingError, RankingScope, RecomputeSummary};
use crate::clock::{Clock, SystemClock};
use crate::geo::{MacroRegion, StateCode, UserLocation};
use crate::progress::{PointsRecord, ProgressStore};
use crate::storage::{LocationStore, RankingStore};

/// Default rows per insert batch.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Rebuilds every ranking partition.
pub struct RankingCalculator<P, C = SystemClock> {
    progress: Arc<P>,
    locations: LocationStore,
    rankings: RankingStore,
    clock: C,
    batch_size: usize,
    // Single writer: concurrent triggers queue up instead of interleaving
    recompute_lock: Mutex<()>,
}

impl<P: ProgressStore> RankingCalculator<P, SystemClock> {
    pub fn new(progress: Arc<P>, locations: LocationStore, rankings: RankingStore) -> Self {
        Self::with_clock(progress, locations, rankings, SystemClock)
    }
}

impl<P: ProgressStore, C: Clock> RankingCalculator<P, C> {
    pub fn with_clock(
        progress: Arc<P>,
        locations: LocationStore,
        rankings: RankingStore,
        clock: C,
    ) -> Self {
        Self {
            progress,
            locations,
            rankings,
            clock,
            batch_size: DEFAULT_BATCH_SIZE,
            recompute_lock: Mutex::new(()),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// The progress store positions are computed from.
    pub fn progress(&self) -> &Arc<P> {
        &self.progress
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Recompute and replace every partition.
    ///
    /// Both reads happen before anything is written; a read failure leaves the
    /// stored rankings untouched.
    pub async fn recompute(&self) -> Result<RecomputeSummary, RankingError> {
        let _guard = self.recompute_lock.lock().await;

        let points = self
            .progress
            .all_points()
            .await
            .map_err(|e| RankingError::DependencyRead {
                what: "points",
                cause: e.to_string(),
            })?;

        let locations = self
            .locations
            .all()
            .map_err(|e| RankingError::DependencyRead {
                what: "locations",
                cause: e.to_string(),
            })?;

        let calculated_at = self.clock.now();
        let entries = compute_entries(&points, &locations, calculated_at);
        let summary = summarize(&entries, calculated_at);

        self.rankings
            .replace_all(&entries, self.batch_size)
            .map_err(|e| RankingError::WriteFailed(e.to_string()))?;

        tracing::info!(
            "Recomputed rankings: {} national, {} regional, {} local across {} partitions",
            summary.national_entries,
            summary.regional_entries,
            summary.local_entries,
            summary.partitions
        );

        Ok(summary)
    }
}

/// Leaderboard order: more points first, then lower user id.
pub fn rank_order(a: &PointsRecord, b: &PointsRecord) -> Ordering {
    b.total_points
        .cmp(&a.total_points)
        .then_with(|| a.user_id.cmp(&b.user_id))
}

/// Build every ranking entry from point totals and locations.
///
/// Users without a location only get a national entry.
pub fn compute_entries(
    points: &[PointsRecord],
    locations: &[UserLocation],
    calculated_at: DateTime<Utc>,
) -> Vec<RankingEntry> {
    let mut ordered: Vec<&PointsRecord> = points.iter().collect();
    ordered.sort_by(|a, b| rank_order(a, b));

    let by_user: HashMap<Uuid, &UserLocation> =
        locations.iter().map(|loc| (loc.user_id, loc)).collect();

    // Groups inherit rank order from `ordered`
    let mut by_region: BTreeMap<MacroRegion, Vec<&PointsRecord>> = BTreeMap::new();
    let mut by_state: BTreeMap<StateCode, Vec<&PointsRecord>> = BTreeMap::new();
    for record in &ordered {
        if let Some(location) = by_user.get(&record.user_id) {
            by_region.entry(location.region).or_default().push(record);
            by_state
                .entry(location.state.clone())
                .or_default()
                .push(record);
        }
    }

    let mut entries = Vec::with_capacity(ordered.len() * 3);
    push_partition(&mut entries, RankingScope::National, &ordered, calculated_at);
    for (region, members) in by_region {
        push_partition(&mut entries, RankingScope::Regional(region), &members, calculated_at);
    }
    for (state, members) in by_state {
        push_partition(&mut entries, RankingScope::Local(state), &members, calculated_at);
    }

    entries
}

fn push_partition(
    entries: &mut Vec<RankingEntry>,
    scope: RankingScope,
    members: &[&PointsRecord],
    calculated_at: DateTime<Utc>,
) {
    entries.extend(members.iter().enumerate().map(|(index, record)| RankingEntry {
        user_id: record.user_id,
        scope: scope.clone(),
        period: Period::AllTime,
        position: index as u32 + 1,
        total_points: record.total_points,
        calculated_at,
    }));
}

fn summarize(entries: &[RankingEntry], calculated_at: DateTime<Utc>) -> RecomputeSummary {
    let mut national_entries = 0;
    let mut regional_entries = 0;
    let mut local_entries = 0;
    let mut partitions = 0;

    for entry in entries {
        match entry.scope {
            RankingScope::National => national_entries += 1,
            RankingScope::Regional(_) => regional_entries += 1,
            RankingScope::Local(_) => local_entries += 1,
        }
        if entry.position == 1 {
            partitions += 1;
        }
    }

    RecomputeSummary {
        national_entries,
        regional_entries,
        local_entries,
        partitions,
        calculated_at,
    }
}
