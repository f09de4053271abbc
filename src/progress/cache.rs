//! Read-through cache over a [`ProgressStore`].
//!
//! Entries expire against an injected [`Clock`], so freshness is decided by
//! the caller's notion of time rather than process-global state. Writes made
//! through the cache drop the affected entry.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use super::{PointsRecord, ProgressStore, StoreError};
use crate::clock::{Clock, SystemClock};

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    record: PointsRecord,
    fetched_at: DateTime<Utc>,
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Progress store wrapper that memoizes per-user point totals.
pub struct CachedProgressStore<S, C = SystemClock> {
    inner: S,
    clock: C,
    ttl: Duration,
    entries: Mutex<HashMap<Uuid, CacheEntry>>,
    counters: Mutex<(u64, u64)>,
}

impl<S: ProgressStore> CachedProgressStore<S, SystemClock> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self::with_clock(inner, ttl, SystemClock)
    }
}

impl<S: ProgressStore, C: Clock> CachedProgressStore<S, C> {
    pub fn with_clock(inner: S, ttl: Duration, clock: C) -> Self {
        Self {
            inner,
            clock,
            ttl,
            entries: Mutex::new(HashMap::new()),
            counters: Mutex::new((0, 0)),
        }
    }

    /// Drop one user's entry.
    pub fn invalidate(&self, user_id: Uuid) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(&user_id);
        }
    }

    /// Drop every entry.
    pub fn invalidate_all(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    pub fn stats(&self) -> CacheStats {
        let (hits, misses) = self.counters.lock().map(|c| *c).unwrap_or((0, 0));
        let entries = self.entries.lock().map(|e| e.len()).unwrap_or(0);
        CacheStats {
            hits,
            misses,
            entries,
        }
    }

    fn lookup(&self, user_id: Uuid) -> Option<PointsRecord> {
        let now = self.clock.now();
        let entries = self.entries.lock().ok()?;
        entries
            .get(&user_id)
            .filter(|entry| now - entry.fetched_at < self.ttl)
            .map(|entry| entry.record)
    }

    fn remember(&self, records: &[PointsRecord]) {
        let fetched_at = self.clock.now();
        if let Ok(mut entries) = self.entries.lock() {
            for record in records {
                entries.insert(record.user_id, CacheEntry { record: *record, fetched_at });
            }
        }
    }

    fn count(&self, hits: u64, misses: u64) {
        if let Ok(mut counters) = self.counters.lock() {
            counters.0 += hits;
            counters.1 += misses;
        }
    }
}

impl<S: ProgressStore, C: Clock> ProgressStore for CachedProgressStore<S, C> {
    async fn all_points(&self) -> Result<Vec<PointsRecord>, StoreError> {
        let records = self.inner.all_points().await?;
        self.remember(&records);
        Ok(records)
    }

    async fn points_for(&self, user_id: Uuid) -> Result<Option<PointsRecord>, StoreError> {
        if let Some(record) = self.lookup(user_id) {
            self.count(1, 0);
            return Ok(Some(record));
        }

        self.count(0, 1);
        let record = self.inner.points_for(user_id).await?;
        if let Some(record) = record {
            self.remember(&[record]);
        }
        Ok(record)
    }

    async fn points_for_many(&self, user_ids: &[Uuid]) -> Result<Vec<PointsRecord>, StoreError> {
        let mut found = Vec::with_capacity(user_ids.len());
        let mut missing = Vec::new();

        for &user_id in user_ids {
            match self.lookup(user_id) {
                Some(record) => found.push(record),
                None => missing.push(user_id),
            }
        }
        self.count(found.len() as u64, missing.len() as u64);

        if !missing.is_empty() {
            let fetched = self.inner.points_for_many(&missing).await?;
            self.remember(&fetched);
            found.extend(fetched);
        }

        Ok(found)
    }

    async fn add_points(&self, user_id: Uuid, delta: u32) -> Result<PointsRecord, StoreError> {
        let result = self.inner.add_points(user_id, delta).await;
        self.invalidate(user_id);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// In-memory store that counts reads.
    #[derive(Default)]
    struct CountingStore {
        points: Mutex<HashMap<Uuid, u32>>,
        reads: AtomicUsize,
    }

    impl ProgressStore for CountingStore {
        async fn all_points(&self) -> Result<Vec<PointsRecord>, StoreError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            let points = self.points.lock().unwrap();
            Ok(points.iter().map(|(id, p)| PointsRecord::new(*id, *p)).collect())
        }

        async fn points_for(&self, user_id: Uuid) -> Result<Option<PointsRecord>, StoreError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            let points = self.points.lock().unwrap();
            Ok(points.get(&user_id).map(|p| PointsRecord::new(user_id, *p)))
        }

        async fn points_for_many(
            &self,
            user_ids: &[Uuid],
        ) -> Result<Vec<PointsRecord>, StoreError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            let points = self.points.lock().unwrap();
            Ok(user_ids
                .iter()
                .filter_map(|id| points.get(id).map(|p| PointsRecord::new(*id, *p)))
                .collect())
        }

        async fn add_points(&self, user_id: Uuid, delta: u32) -> Result<PointsRecord, StoreError> {
            let mut points = self.points.lock().unwrap();
            let total = points.entry(user_id).or_insert(0);
            *total += delta;
            Ok(PointsRecord::new(user_id, *total))
        }
    }

    fn setup() -> (CachedProgressStore<Arc<CountingStore>, Arc<ManualClock>>, Arc<CountingStore>, Arc<ManualClock>, Uuid) {
        let store = Arc::new(CountingStore::default());
        let user = Uuid::new_v4();
        store.points.lock().unwrap().insert(user, 120);

        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 1, 20, 8, 0, 0).unwrap(),
        ));
        let cache = CachedProgressStore::with_clock(store.clone(), Duration::seconds(30), clock.clone());
        (cache, store, clock, user)
    }

    #[tokio::test]
    async fn test_hit_within_ttl() {
        let (cache, store, clock, user) = setup();

        assert_eq!(cache.points_for(user).await.unwrap().unwrap().total_points, 120);
        clock.advance(Duration::seconds(29));
        assert_eq!(cache.points_for(user).await.unwrap().unwrap().total_points, 120);

        assert_eq!(store.reads.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[tokio::test]
    async fn test_expires_by_clock() {
        let (cache, store, clock, user) = setup();

        cache.points_for(user).await.unwrap();
        store.points.lock().unwrap().insert(user, 500);
        clock.advance(Duration::seconds(30));

        assert_eq!(cache.points_for(user).await.unwrap().unwrap().total_points, 500);
        assert_eq!(store.reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_write_invalidates() {
        let (cache, _store, _clock, user) = setup();

        cache.points_for(user).await.unwrap();
        cache.add_points(user, 80).await.unwrap();

        let progress = cache.points_for(user).await.unwrap().unwrap().level_progress();
        assert_eq!(progress.level, 3);
        assert_eq!(progress.points_to_next, 100);
    }

    #[tokio::test]
    async fn test_many_only_fetches_misses() {
        let (cache, store, _clock, user) = setup();
        let other = Uuid::new_v4();
        store.points.lock().unwrap().insert(other, 40);

        cache.points_for(user).await.unwrap();
        let records = cache.points_for_many(&[user, other]).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(store.reads.load(Ordering::SeqCst), 2);
        assert_eq!(cache.stats().entries, 2);
    }
}
