//! SQLite-backed progress and profile stores.
//!
//! Used by the command line tool and tests; production deployments may plug
//! in any other [`ProgressStore`] / [`ProfileStore`].

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use std::sync::Arc;
use uuid::Uuid;

use crate::progress::{level_for_points, PointsRecord, Profile, ProfileStore, ProgressStore, StoreError};
use crate::storage::database::{Database, DatabaseError};
use crate::storage::location_store::parse_uuid;

/// Progress store over the `user_progress` table.
#[derive(Clone)]
pub struct SqliteProgressStore {
    db: Arc<Database>,
}

impl SqliteProgressStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Set a user's total, creating the record if needed.
    pub fn set_points(&self, user_id: Uuid, total_points: u32) -> Result<PointsRecord, DatabaseError> {
        let record = PointsRecord::new(user_id, total_points);
        self.db.with_connection(|conn| {
            conn.execute(
                "INSERT INTO user_progress (user_id, total_points, current_level, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_id) DO UPDATE SET
                    total_points = excluded.total_points,
                    current_level = excluded.current_level,
                    updated_at = excluded.updated_at",
                params![
                    user_id.to_string(),
                    record.total_points,
                    record.current_level,
                    Utc::now().to_rfc3339()
                ],
            )?;
            Ok(record)
        })
    }

    fn read_all(&self) -> Result<Vec<PointsRecord>, DatabaseError> {
        self.db.with_connection(|conn| {
            let mut stmt =
                conn.prepare("SELECT user_id, total_points, current_level FROM user_progress")?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, u32>(1)?,
                    row.get::<_, u32>(2)?,
                ))
            })?;

            let mut records = Vec::new();
            for row in rows {
                let (user_id, total_points, current_level) = row?;
                records.push(PointsRecord {
                    user_id: parse_uuid(&user_id)?,
                    total_points,
                    current_level,
                });
            }
            Ok(records)
        })
    }

    fn read_one(&self, user_id: Uuid) -> Result<Option<PointsRecord>, DatabaseError> {
        self.db.with_connection(|conn| {
            let row = conn
                .query_row(
                    "SELECT total_points, current_level FROM user_progress WHERE user_id = ?1",
                    params![user_id.to_string()],
                    |row| Ok((row.get::<_, u32>(0)?, row.get::<_, u32>(1)?)),
                )
                .optional()?;

            Ok(row.map(|(total_points, current_level)| PointsRecord {
                user_id,
                total_points,
                current_level,
            }))
        })
    }

    fn add(&self, user_id: Uuid, delta: u32) -> Result<Option<PointsRecord>, DatabaseError> {
        let updated = self.db.with_transaction(|tx| {
            let current: Option<u32> = tx
                .query_row(
                    "SELECT total_points FROM user_progress WHERE user_id = ?1",
                    params![user_id.to_string()],
                    |row| row.get(0),
                )
                .optional()?;

            let Some(current) = current else {
                return Ok(None);
            };

            let total_points = current.saturating_add(delta);
            tx.execute(
                "UPDATE user_progress SET total_points = ?2, current_level = ?3, updated_at = ?4
                 WHERE user_id = ?1",
                params![
                    user_id.to_string(),
                    total_points,
                    level_for_points(total_points),
                    Utc::now().to_rfc3339()
                ],
            )?;
            Ok(Some(PointsRecord::new(user_id, total_points)))
        })?;

        Ok(updated)
    }
}

impl ProgressStore for SqliteProgressStore {
    async fn all_points(&self) -> Result<Vec<PointsRecord>, StoreError> {
        Ok(self.read_all()?)
    }

    async fn points_for(&self, user_id: Uuid) -> Result<Option<PointsRecord>, StoreError> {
        Ok(self.read_one(user_id)?)
    }

    async fn points_for_many(&self, user_ids: &[Uuid]) -> Result<Vec<PointsRecord>, StoreError> {
        let mut records = Vec::with_capacity(user_ids.len());
        for &user_id in user_ids {
            if let Some(record) = self.read_one(user_id)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    async fn add_points(&self, user_id: Uuid, delta: u32) -> Result<PointsRecord, StoreError> {
        self.add(user_id, delta)?.ok_or(StoreError::NotFound(user_id))
    }
}

/// Profile store over the `profiles` table.
#[derive(Clone)]
pub struct SqliteProfileStore {
    db: Arc<Database>,
}

impl SqliteProfileStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert or replace a profile.
    pub fn upsert(&self, profile: &Profile) -> Result<(), DatabaseError> {
        self.db.with_connection(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO profiles (user_id, display_name, avatar_url) VALUES (?1, ?2, ?3)",
                params![
                    profile.user_id.to_string(),
                    profile.display_name,
                    profile.avatar_url
                ],
            )?;
            Ok(())
        })
    }

    fn read_one(&self, user_id: Uuid) -> Result<Option<Profile>, DatabaseError> {
        self.db.with_connection(|conn| {
            Ok(conn
                .query_row(
                    "SELECT display_name, avatar_url FROM profiles WHERE user_id = ?1",
                    params![user_id.to_string()],
                    |row| {
                        Ok(Profile {
                            user_id,
                            display_name: row.get(0)?,
                            avatar_url: row.get(1)?,
                        })
                    },
                )
                .optional()?)
        })
    }
}

impl ProfileStore for SqliteProfileStore {
    async fn profiles_for(&self, user_ids: &[Uuid]) -> Result<Vec<Profile>, StoreError> {
        let mut profiles = Vec::with_capacity(user_ids.len());
        for &user_id in user_ids {
            if let Some(profile) = self.read_one(user_id)? {
                profiles.push(profile);
            }
        }
        Ok(profiles)
    }
}
