//! Persistence for user locations.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use std::sync::Arc;
use uuid::Uuid;

use crate::geo::{MacroRegion, ResolvedLocation, StateCode, UserLocation};
use crate::storage::database::{Database, DatabaseError};

/// Store for the `user_locations` table.
#[derive(Clone)]
pub struct LocationStore {
    db: Arc<Database>,
}

impl LocationStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert or update the single location row of a user.
    ///
    /// `created_at` is set on the first call and kept afterwards.
    pub fn upsert(
        &self,
        user_id: Uuid,
        location: &ResolvedLocation,
        now: DateTime<Utc>,
    ) -> Result<UserLocation, DatabaseError> {
        self.db.with_connection(|conn| {
            conn.execute(
                "INSERT INTO user_locations (user_id, state, region, city_approximate, postal_prefix,
                 latitude_approximate, longitude_approximate, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
                 ON CONFLICT(user_id) DO UPDATE SET
                    state = excluded.state,
                    region = excluded.region,
                    city_approximate = excluded.city_approximate,
                    postal_prefix = excluded.postal_prefix,
                    latitude_approximate = excluded.latitude_approximate,
                    longitude_approximate = excluded.longitude_approximate,
                    updated_at = excluded.updated_at",
                params![
                    user_id.to_string(),
                    location.state.as_str(),
                    location.region.as_str(),
                    location.city,
                    location.postal_prefix,
                    location.latitude,
                    location.longitude,
                    now.to_rfc3339(),
                ],
            )?;
            Ok(())
        })?;

        self.get(user_id)?.ok_or_else(|| {
            DatabaseError::QueryFailed(format!("location for {user_id} missing after upsert"))
        })
    }

    /// Get a user's location.
    pub fn get(&self, user_id: Uuid) -> Result<Option<UserLocation>, DatabaseError> {
        self.db.with_connection(|conn| {
            let row = conn
                .query_row(
                    "SELECT user_id, state, region, city_approximate, postal_prefix,
                     latitude_approximate, longitude_approximate, created_at, updated_at
                     FROM user_locations WHERE user_id = ?1",
                    params![user_id.to_string()],
                    LocationRow::from_row,
                )
                .optional()?;

            row.map(LocationRow::into_location).transpose()
        })
    }

    /// All stored locations.
    pub fn all(&self) -> Result<Vec<UserLocation>, DatabaseError> {
        self.db.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, state, region, city_approximate, postal_prefix,
                 latitude_approximate, longitude_approximate, created_at, updated_at
                 FROM user_locations",
            )?;

            let rows = stmt.query_map([], LocationRow::from_row)?;

            let mut locations = Vec::new();
            for row in rows {
                locations.push(row?.into_location()?);
            }
            Ok(locations)
        })
    }
}

struct LocationRow {
    user_id: String,
    state: String,
    region: String,
    city_approximate: Option<String>,
    postal_prefix: Option<String>,
    latitude_approximate: Option<f64>,
    longitude_approximate: Option<f64>,
    created_at: String,
    updated_at: String,
}

impl LocationRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            user_id: row.get(0)?,
            state: row.get(1)?,
            region: row.get(2)?,
            city_approximate: row.get(3)?,
            postal_prefix: row.get(4)?,
            latitude_approximate: row.get(5)?,
            longitude_approximate: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    fn into_location(self) -> Result<UserLocation, DatabaseError> {
        let state = StateCode::parse(&self.state)
            .ok_or_else(|| DatabaseError::QueryFailed(format!("empty state for {}", self.user_id)))?;

        // Re-derive rather than trust the stored column
        let region = state.region();
        if region != MacroRegion::from_name(&self.region) {
            tracing::warn!(
                user_id = %self.user_id,
                stored = %self.region,
                derived = %region,
                "Stored region disagrees with state table"
            );
        }

        Ok(UserLocation {
            user_id: parse_uuid(&self.user_id)?,
            state,
            region,
            city_approximate: self.city_approximate,
            postal_prefix: self.postal_prefix,
            latitude_approximate: self.latitude_approximate,
            longitude_approximate: self.longitude_approximate,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

pub(crate) fn parse_uuid(value: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(value).map_err(|e| DatabaseError::SerializationError(e.to_string()))
}

pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::SerializationError(e.to_string()))
}
