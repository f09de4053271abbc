//! Ranking invariants over a generated population.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use podium::clock::{Clock, ManualClock};
use podium::geo::ResolvedLocation;
use podium::rankings::{RankingEntry, RankingScope};
use podium::storage::{Database, LocationStore, RankingStore, SqliteProgressStore};
use podium::{RankingCalculator, StateCode};
use uuid::Uuid;

const STATES: [&str; 8] = ["SP", "RJ", "BA", "RS", "AM", "DF", "PE", "XX"];

/// Small deterministic generator so failures reproduce.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 33
    }
}

struct Population {
    calculator: RankingCalculator<SqliteProgressStore, Arc<ManualClock>>,
    rankings: RankingStore,
    clock: Arc<ManualClock>,
    located: Vec<Uuid>,
    unlocated: Vec<Uuid>,
}

fn population(users: usize) -> Population {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let progress = Arc::new(SqliteProgressStore::new(db.clone()));
    let locations = LocationStore::new(db.clone());
    let rankings = RankingStore::new(db);
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap()));

    let mut rng = Lcg(42);
    let mut located = Vec::new();
    let mut unlocated = Vec::new();

    for i in 0..users {
        let user = Uuid::from_u128(rng.next() as u128 * 1_000 + i as u128);
        // Narrow range so ties are common
        progress.set_points(user, (rng.next() % 40) as u32 * 25).unwrap();

        if i % 7 == 0 {
            unlocated.push(user);
            continue;
        }

        let state = StateCode::parse(STATES[rng.next() as usize % STATES.len()]).unwrap();
        let location = ResolvedLocation {
            region: state.region(),
            state,
            city: None,
            postal_prefix: None,
            latitude: None,
            longitude: None,
        };
        locations.upsert(user, &location, clock.now()).unwrap();
        located.push(user);
    }

    let calculator = RankingCalculator::with_clock(progress, locations, rankings.clone(), clock.clone())
        .with_batch_size(17);

    Population {
        calculator,
        rankings,
        clock,
        located,
        unlocated,
    }
}

fn partitions(entries: &[RankingEntry]) -> BTreeMap<String, Vec<&RankingEntry>> {
    let mut grouped: BTreeMap<String, Vec<&RankingEntry>> = BTreeMap::new();
    for entry in entries {
        grouped.entry(entry.scope.to_string()).or_default().push(entry);
    }
    for members in grouped.values_mut() {
        members.sort_by_key(|e| e.position);
    }
    grouped
}

#[tokio::test]
async fn test_every_partition_is_dense_and_ordered() {
    let pop = population(250);
    let summary = pop.calculator.recompute().await.unwrap();
    let entries = pop.rankings.all().unwrap();

    assert_eq!(summary.total_entries(), entries.len());
    assert_eq!(summary.national_entries, 250);

    let grouped = partitions(&entries);
    assert_eq!(grouped.len(), summary.partitions);

    for (scope, members) in grouped {
        let positions: Vec<u32> = members.iter().map(|e| e.position).collect();
        let expected: Vec<u32> = (1..=members.len() as u32).collect();
        assert_eq!(positions, expected, "positions of {scope}");

        for pair in members.windows(2) {
            let (hi, lo) = (pair[0], pair[1]);
            assert!(hi.total_points >= lo.total_points, "points order in {scope}");
            if hi.total_points == lo.total_points {
                assert!(hi.user_id < lo.user_id, "tie-break in {scope}");
            }
        }
    }
}

#[tokio::test]
async fn test_unlocated_users_are_national_only() {
    let pop = population(120);
    pop.calculator.recompute().await.unwrap();
    let entries = pop.rankings.all().unwrap();

    for user in &pop.unlocated {
        let scopes: Vec<&RankingScope> = entries
            .iter()
            .filter(|e| e.user_id == *user)
            .map(|e| &e.scope)
            .collect();
        assert_eq!(scopes, vec![&RankingScope::National]);
    }

    for user in &pop.located {
        assert_eq!(entries.iter().filter(|e| e.user_id == *user).count(), 3);
    }
}

#[tokio::test]
async fn test_recompute_is_idempotent() {
    let pop = population(90);

    pop.calculator.recompute().await.unwrap();
    let first = pop.rankings.all().unwrap();

    pop.clock.advance(Duration::minutes(5));
    pop.calculator.recompute().await.unwrap();
    let second = pop.rankings.all().unwrap();

    assert_eq!(first.len(), second.len());
    assert!(first[0].calculated_at < second[0].calculated_at);

    let strip = |entries: &[RankingEntry]| -> Vec<(Uuid, String, u32, u32)> {
        entries
            .iter()
            .map(|e| (e.user_id, e.scope.to_string(), e.position, e.total_points))
            .collect()
    };
    assert_eq!(strip(&first), strip(&second));

    // One cycle per table: every row shares the same timestamp
    assert!(second.iter().all(|e| e.calculated_at == second[0].calculated_at));
}
