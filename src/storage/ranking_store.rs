//! Persistence for computed leaderboard rows.

use rusqlite::params;
use std::sync::Arc;
use uuid::Uuid;

use crate::rankings::{Period, RankingEntry, RankingScope, RankingType};
use crate::storage::database::{Database, DatabaseError};
use crate::storage::location_store::{parse_timestamp, parse_uuid};

const ENTRY_COLUMNS: &str =
    "user_id, ranking_type, region, position, total_points, period, calculated_at";

/// Store for the `rankings` table.
#[derive(Clone)]
pub struct RankingStore {
    db: Arc<Database>,
}

impl RankingStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Replace every stored row with `entries`.
    ///
    /// Deletion and all insert batches run in one transaction: readers see
    /// either the previous set or the new one, never a mix.
    pub fn replace_all(
        &self,
        entries: &[RankingEntry],
        batch_size: usize,
    ) -> Result<(), DatabaseError> {
        let batch_size = batch_size.max(1);
        let batches = entries.len().div_ceil(batch_size);

        self.db.with_transaction(|tx| {
            let deleted = tx.execute("DELETE FROM rankings", [])?;
            tracing::debug!("Cleared {} ranking rows", deleted);

            let mut stmt = tx.prepare(&format!(
                "INSERT INTO rankings ({ENTRY_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
            ))?;

            for (index, batch) in entries.chunks(batch_size).enumerate() {
                for entry in batch {
                    stmt.execute(params![
                        entry.user_id.to_string(),
                        entry.scope.ranking_type().as_str(),
                        entry.scope.region_key(),
                        entry.position,
                        entry.total_points,
                        entry.period.as_str(),
                        entry.calculated_at.to_rfc3339(),
                    ])
                    .map_err(|e| {
                        DatabaseError::TransactionFailed(format!(
                            "batch {}/{}: {}",
                            index + 1,
                            batches,
                            e
                        ))
                    })?;
                }
                tracing::debug!("Inserted ranking batch {}/{}", index + 1, batches);
            }

            Ok(())
        })
    }

    /// Delete every stored row.
    pub fn clear(&self) -> Result<usize, DatabaseError> {
        self.db
            .with_connection(|conn| Ok(conn.execute("DELETE FROM rankings", [])?))
    }

    /// Number of stored rows across all partitions.
    pub fn count(&self) -> Result<u32, DatabaseError> {
        self.db.with_connection(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM rankings", [], |row| row.get(0))?)
        })
    }

    /// Top `limit` entries of a partition ordered by position.
    pub fn partition(
        &self,
        scope: &RankingScope,
        period: Period,
        limit: usize,
    ) -> Result<Vec<RankingEntry>, DatabaseError> {
        self.db.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ENTRY_COLUMNS} FROM rankings
                 WHERE ranking_type = ?1 AND region IS ?2 AND period = ?3
                 ORDER BY position ASC
                 LIMIT ?4"
            ))?;

            let rows = stmt.query_map(
                params![
                    scope.ranking_type().as_str(),
                    scope.region_key(),
                    period.as_str(),
                    limit as i64
                ],
                EntryRow::from_row,
            )?;

            let mut entries = Vec::new();
            for row in rows {
                entries.push(row?.into_entry()?);
            }
            Ok(entries)
        })
    }

    /// Number of users in a partition.
    pub fn partition_size(&self, scope: &RankingScope, period: Period) -> Result<u32, DatabaseError> {
        self.db.with_connection(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM rankings WHERE ranking_type = ?1 AND region IS ?2 AND period = ?3",
                params![scope.ranking_type().as_str(), scope.region_key(), period.as_str()],
                |row| row.get(0),
            )?)
        })
    }

    /// Every entry of a user, one per tier at most.
    pub fn entries_for_user(
        &self,
        user_id: Uuid,
        period: Period,
    ) -> Result<Vec<RankingEntry>, DatabaseError> {
        self.db.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ENTRY_COLUMNS} FROM rankings WHERE user_id = ?1 AND period = ?2"
            ))?;

            let rows = stmt.query_map(
                params![user_id.to_string(), period.as_str()],
                EntryRow::from_row,
            )?;

            let mut entries = Vec::new();
            for row in rows {
                entries.push(row?.into_entry()?);
            }
            Ok(entries)
        })
    }

    /// Users with a national entry, in national order.
    pub fn ranked_users(&self, period: Period) -> Result<Vec<Uuid>, DatabaseError> {
        self.db.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id FROM rankings
                 WHERE ranking_type = 'national' AND period = ?1
                 ORDER BY position",
            )?;
            let rows = stmt.query_map(params![period.as_str()], |row| row.get::<_, String>(0))?;

            let mut users = Vec::new();
            for row in rows {
                users.push(parse_uuid(&row?)?);
            }
            Ok(users)
        })
    }

    /// Every stored entry, ordered by tier, partition and position.
    pub fn all(&self) -> Result<Vec<RankingEntry>, DatabaseError> {
        self.db.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ENTRY_COLUMNS} FROM rankings
                 ORDER BY ranking_type, region, position"
            ))?;

            let rows = stmt.query_map([], EntryRow::from_row)?;

            let mut entries = Vec::new();
            for row in rows {
                entries.push(row?.into_entry()?);
            }
            Ok(entries)
        })
    }
}

struct EntryRow {
    user_id: String,
    ranking_type: String,
    region: Option<String>,
    position: u32,
    total_points: u32,
    period: String,
    calculated_at: String,
}

impl EntryRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            user_id: row.get(0)?,
            ranking_type: row.get(1)?,
            region: row.get(2)?,
            position: row.get(3)?,
            total_points: row.get(4)?,
            period: row.get(5)?,
            calculated_at: row.get(6)?,
        })
    }

    fn into_entry(self) -> Result<RankingEntry, DatabaseError> {
        let ranking_type = RankingType::from_str(&self.ranking_type).ok_or_else(|| {
            DatabaseError::SerializationError(format!("unknown ranking type {}", self.ranking_type))
        })?;
        let scope = RankingScope::from_columns(ranking_type, self.region.as_deref()).ok_or_else(
            || DatabaseError::SerializationError(format!("{} entry without region", ranking_type)),
        )?;
        let period = Period::from_str(&self.period).ok_or_else(|| {
            DatabaseError::SerializationError(format!("unknown period {}", self.period))
        })?;

        Ok(RankingEntry {
            user_id: parse_uuid(&self.user_id)?,
            scope,
            period,
            position: self.position,
            total_points: self.total_points,
            calculated_at: parse_timestamp(&self.calculated_at)?,
        })
    }
}
