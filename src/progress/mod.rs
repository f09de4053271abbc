//! Progress and profile collaborators.
//!
//! Point-earning rules live outside this crate. The engine only sees point
//! totals through [`ProgressStore`] and display data through [`ProfileStore`].

pub mod cache;

pub use cache::CachedProgressStore;

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::storage::DatabaseError;

/// Points earned per level.
pub const POINTS_PER_LEVEL: u32 = 100;

/// A user's point total as owned by the Progress Store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsRecord {
    pub user_id: Uuid,
    pub total_points: u32,
    pub current_level: u32,
}

impl PointsRecord {
    /// Build a record whose level matches its points.
    pub fn new(user_id: Uuid, total_points: u32) -> Self {
        Self {
            user_id,
            total_points,
            current_level: level_for_points(total_points),
        }
    }

    pub fn level_progress(&self) -> LevelProgress {
        LevelProgress::from_points(self.total_points)
    }
}

/// Display data for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Level derived from a point total.
pub fn level_for_points(total_points: u32) -> u32 {
    total_points / POINTS_PER_LEVEL + 1
}

/// Where a user sits inside their current level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelProgress {
    pub level: u32,
    /// Points still needed to reach the next level
    pub points_to_next: u32,
    /// Percent of the current level completed (0-100)
    pub percent: f32,
}

impl LevelProgress {
    pub fn from_points(total_points: u32) -> Self {
        let level = level_for_points(total_points);
        let into_level = total_points % POINTS_PER_LEVEL;
        Self {
            level,
            points_to_next: POINTS_PER_LEVEL - into_level,
            percent: into_level as f32 * 100.0 / POINTS_PER_LEVEL as f32,
        }
    }
}

/// Read/write access to point totals.
pub trait ProgressStore: Send + Sync {
    /// Every points record.
    fn all_points(&self) -> impl Future<Output = Result<Vec<PointsRecord>, StoreError>> + Send;

    /// One user's record, if the user has earned anything yet.
    fn points_for(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = Result<Option<PointsRecord>, StoreError>> + Send;

    /// Records for the given users; users without a record are omitted.
    fn points_for_many(
        &self,
        user_ids: &[Uuid],
    ) -> impl Future<Output = Result<Vec<PointsRecord>, StoreError>> + Send;

    /// Add `delta` points to a user and return the updated record.
    fn add_points(
        &self,
        user_id: Uuid,
        delta: u32,
    ) -> impl Future<Output = Result<PointsRecord, StoreError>> + Send;
}

/// Read-only access to display data.
pub trait ProfileStore: Send + Sync {
    /// Profiles for the given users; missing users are omitted.
    fn profiles_for(
        &self,
        user_ids: &[Uuid],
    ) -> impl Future<Output = Result<Vec<Profile>, StoreError>> + Send;
}

impl<S: ProgressStore + ?Sized> ProgressStore for Arc<S> {
    fn all_points(&self) -> impl Future<Output = Result<Vec<PointsRecord>, StoreError>> + Send {
        (**self).all_points()
    }

    fn points_for(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = Result<Option<PointsRecord>, StoreError>> + Send {
        (**self).points_for(user_id)
    }

    fn points_for_many(
        &self,
        user_ids: &[Uuid],
    ) -> impl Future<Output = Result<Vec<PointsRecord>, StoreError>> + Send {
        (**self).points_for_many(user_ids)
    }

    fn add_points(
        &self,
        user_id: Uuid,
        delta: u32,
    ) -> impl Future<Output = Result<PointsRecord, StoreError>> + Send {
        (**self).add_points(user_id, delta)
    }
}

impl<S: ProfileStore + ?Sized> ProfileStore for Arc<S> {
    fn profiles_for(
        &self,
        user_ids: &[Uuid],
    ) -> impl Future<Output = Result<Vec<Profile>, StoreError>> + Send {
        (**self).profiles_for(user_ids)
    }
}

/// Collaborator store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("No progress record for user {0}")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<DatabaseError> for StoreError {
    fn from(err: DatabaseError) -> Self {
        StoreError::Database(err.to_string())
    }
}
