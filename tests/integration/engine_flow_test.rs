//! End-to-end flows through the engine facade.

use podium::geo::{GpsReading, LocationError};
use podium::progress::Profile;
use podium::rankings::{RankingError, TierStanding};
use podium::{EngineError, LocationInput, MacroRegion, RankingScope, StateCode};
use uuid::Uuid;

use crate::common::{harness, StaticGeocoder};

fn manual(state: &str) -> LocationInput {
    LocationInput::Manual {
        state: state.to_string(),
        city: None,
        postal_code: None,
    }
}

#[tokio::test]
async fn test_tied_leaders_and_top_three() {
    let h = harness(StaticGeocoder(Some("BR-MG")));
    let (a, b, c) = (Uuid::from_u128(1), Uuid::from_u128(2), Uuid::from_u128(3));
    h.progress.set_points(a, 300);
    h.progress.set_points(b, 300);
    h.progress.set_points(c, 100);

    h.engine.recompute_all_rankings().await.unwrap();

    let national = h.engine.get_ranking(&RankingScope::National).await.unwrap();
    let order: Vec<(Uuid, u32)> = national.iter().map(|p| (p.user_id, p.position)).collect();
    assert_eq!(order, vec![(a, 1), (b, 2), (c, 3)]);
    assert!(national.iter().all(|p| p.location == "Brasil"));

    for user in [a, b, c] {
        let unlocked = h.engine.user_achievements(user).unwrap();
        assert!(unlocked.iter().any(|u| u.achievement.id == "top_3_brasil"));
    }
}

#[tokio::test]
async fn test_gps_location_feeds_regional_and_local_tiers() {
    let h = harness(StaticGeocoder(Some("BR-MG")));
    let user = Uuid::new_v4();
    h.progress.set_points(user, 80);

    let location = h
        .engine
        .resolve_and_save_location(
            user,
            &LocationInput::Gps(GpsReading::Fix {
                latitude: -19.9167,
                longitude: -43.9345,
            }),
        )
        .await
        .unwrap();
    assert_eq!(location.state.as_str(), "MG");
    assert_eq!(location.region, MacroRegion::Sudeste);
    assert_eq!(location.postal_prefix.as_deref(), Some("30130"));

    let standing = h.engine.get_user_standing(user).await.unwrap();
    assert_eq!(standing.national, Some(TierStanding { position: 1, partition_size: 1 }));
    assert_eq!(standing.regional, Some(TierStanding { position: 1, partition_size: 1 }));
    assert_eq!(standing.local, Some(TierStanding { position: 1, partition_size: 1 }));
    assert_eq!(standing.city.as_deref(), Some("Belo Horizonte"));
}

#[tokio::test]
async fn test_unknown_state_stays_out_of_real_regions() {
    let h = harness(StaticGeocoder(None));
    let user = Uuid::new_v4();
    h.progress.set_points(user, 20);

    let saved = h.engine.resolve_and_save_location(user, &manual("xx")).await.unwrap();
    assert_eq!(saved.region, MacroRegion::Unknown);

    let report = h.engine.recompute_all_rankings().await.unwrap();
    assert!(report
        .unlocked
        .iter()
        .all(|u| u.achievement.id.ends_with("_brasil")));

    let unknown = h
        .engine
        .get_ranking(&RankingScope::Regional(MacroRegion::Unknown))
        .await
        .unwrap();
    assert_eq!(unknown.len(), 1);
    assert_eq!(unknown[0].location, "Desconhecida");
}

#[tokio::test]
async fn test_empty_subdivision_code_writes_nothing() {
    let h = harness(StaticGeocoder(Some("")));
    let user = Uuid::new_v4();

    let err = h
        .engine
        .resolve_and_save_location(
            user,
            &LocationInput::Gps(GpsReading::Fix {
                latitude: -10.0,
                longitude: -50.0,
            }),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::Location(LocationError::MissingSubdivision)
    ));
    assert!(h.engine.location_for(user).unwrap().is_none());
}

#[tokio::test]
async fn test_permission_denied_is_reported() {
    let h = harness(StaticGeocoder(Some("BR-SP")));

    let err = h
        .engine
        .resolve_and_save_location(Uuid::new_v4(), &LocationInput::Gps(GpsReading::PermissionDenied))
        .await
        .unwrap_err();

    let EngineError::Location(location_err) = err else {
        panic!("expected a location error");
    };
    assert!(location_err.is_unavailable());
    assert!(location_err.user_message().contains("denied"));
}

#[tokio::test]
async fn test_user_without_location_is_national_only() {
    let h = harness(StaticGeocoder(Some("BR-SP")));
    let (located, roaming) = (Uuid::new_v4(), Uuid::new_v4());
    h.progress.set_points(located, 500);
    h.progress.set_points(roaming, 900);
    h.engine.resolve_and_save_location(located, &manual("SP")).await.unwrap();

    h.engine.recompute_all_rankings().await.unwrap();

    let standing = h.engine.get_user_standing(roaming).await.unwrap();
    assert_eq!(standing.national, Some(TierStanding { position: 1, partition_size: 2 }));
    assert_eq!(standing.regional, None);
    assert_eq!(standing.local, None);
    assert_eq!(standing.region, None);

    let local = h
        .engine
        .get_ranking(&RankingScope::Local(StateCode::parse("SP").unwrap()))
        .await
        .unwrap();
    assert_eq!(local.len(), 1);
    assert_eq!(local[0].user_id, located);
}

#[tokio::test]
async fn test_repeated_recompute_awards_once() {
    let h = harness(StaticGeocoder(None));
    let user = Uuid::new_v4();
    h.progress.set_points(user, 10);

    h.engine.recompute_all_rankings().await.unwrap();
    let after_first = h.engine.get_user_standing(user).await.unwrap().total_points;

    let second = h.engine.recompute_all_rankings().await.unwrap();
    assert!(second.unlocked.is_empty());

    let after_second = h.engine.get_user_standing(user).await.unwrap().total_points;
    assert_eq!(after_first, after_second);
    // 10 + top_3_brasil + top_10_brasil
    assert_eq!(after_second, 710);
    assert_eq!(h.engine.user_achievements(user).unwrap().len(), 2);
}

#[tokio::test]
async fn test_failed_points_read_keeps_previous_rankings() {
    let h = harness(StaticGeocoder(None));
    let user = Uuid::new_v4();
    h.progress.set_points(user, 40);
    h.profiles
        .upsert(&Profile {
            user_id: user,
            display_name: Some("Duda".to_string()),
            avatar_url: None,
        })
        .unwrap();

    let first = h.engine.recompute_all_rankings().await.unwrap();
    assert_eq!(first.summary.national_entries, 1);

    h.progress.set_points(Uuid::new_v4(), 999);
    h.progress.fail(true);

    let err = h.engine.recompute_all_rankings().await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Ranking(RankingError::DependencyRead { what: "points", .. })
    ));

    // Live points are unavailable, so the snapshot is shown
    let national = h.engine.get_ranking(&RankingScope::National).await.unwrap();
    assert_eq!(national.len(), 1);
    assert_eq!(national[0].display_name, "Duda");
    assert_eq!(national[0].points, national[0].ranked_points);
}

#[tokio::test]
async fn test_first_read_recomputes_lazily() {
    let h = harness(StaticGeocoder(None));
    let user = Uuid::new_v4();
    h.progress.set_points(user, 5);
    h.engine.resolve_and_save_location(user, &manual("AP")).await.unwrap();

    let players = h
        .engine
        .get_ranking(&RankingScope::Regional(MacroRegion::Norte))
        .await
        .unwrap();

    assert_eq!(players.len(), 1);
    assert_eq!(players[0].display_name, "Jogador #1");
    assert_eq!(players[0].location, "Norte");
}

#[tokio::test]
async fn test_clear_rankings() {
    let h = harness(StaticGeocoder(None));
    h.progress.set_points(Uuid::new_v4(), 5);
    h.progress.set_points(Uuid::new_v4(), 6);

    h.engine.recompute_all_rankings().await.unwrap();
    assert_eq!(h.engine.clear_rankings().unwrap(), 2);
    assert_eq!(h.engine.clear_rankings().unwrap(), 0);
}

#[test]
fn test_catalog_is_sorted_by_rarity() {
    let h = harness(StaticGeocoder(None));
    let catalog = h.engine.achievement_catalog().unwrap();

    assert!(catalog.len() > 30);
    assert!(catalog.windows(2).all(|w| w[0].rarity <= w[1].rarity));
}
