//! Nominatim client against a local stub server.

use std::sync::Arc;
use std::time::Duration;

use podium::geo::{GeocodingError, GeocodingProvider, LocationError, NominatimGeocoder};
use podium::storage::{Database, LocationStore};
use podium::{LocationResolver, MacroRegion};
use uuid::Uuid;

use crate::common::serve;

fn geocoder(base_url: &str) -> NominatimGeocoder {
    NominatimGeocoder::with_base_url(base_url, "podium-tests", Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_reverse_reads_address_fields() {
    let (base_url, requests) = serve(
        200,
        r#"{"address":{"state":"São Paulo","ISO3166-2-lvl4":"BR-SP","city":"São Paulo","postcode":"01310-100"}}"#,
    )
    .await;

    let result = geocoder(&base_url).reverse(-23.55, -46.63).await.unwrap();
    assert_eq!(result.subdivision_code.as_deref(), Some("BR-SP"));
    assert_eq!(result.locality.as_deref(), Some("São Paulo"));

    let request_line = requests.lock().unwrap()[0].clone();
    assert!(request_line.starts_with("GET /reverse?"));
    assert!(request_line.contains("format=jsonv2"));
    assert!(request_line.contains("lat=-23.55"));
    assert!(request_line.contains("lon=-46.63"));
}

#[tokio::test]
async fn test_resolver_over_http() {
    let (base_url, _) = serve(
        200,
        r#"{"address":{"state":"Rio Grande do Sul","ISO3166-2-lvl4":"BR-RS","town":"Gramado","postcode":"95670-000"}}"#,
    )
    .await;

    let store = LocationStore::new(Arc::new(Database::open_in_memory().unwrap()));
    let resolver = LocationResolver::new(geocoder(&base_url), store);

    let location = resolver.resolve_from_coordinates(-29.3789, -50.8739).await.unwrap();
    assert_eq!(location.state.as_str(), "RS");
    assert_eq!(location.region, MacroRegion::Sul);
    assert_eq!(location.city.as_deref(), Some("Gramado"));
    assert_eq!(location.postal_prefix.as_deref(), Some("95670"));
    assert_eq!(location.latitude, Some(-29.38));
}

#[tokio::test]
async fn test_empty_iso_code_is_unavailable() {
    let (base_url, _) = serve(200, r#"{"address":{"state":"","ISO3166-2-lvl4":""}}"#).await;

    let store = LocationStore::new(Arc::new(Database::open_in_memory().unwrap()));
    let resolver = LocationResolver::new(geocoder(&base_url), store.clone());
    let user = Uuid::new_v4();

    let err = resolver
        .resolve_and_save(
            user,
            &podium::LocationInput::Gps(podium::geo::GpsReading::Fix {
                latitude: -3.1,
                longitude: -60.0,
            }),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, LocationError::MissingSubdivision));
    assert!(store.get(user).unwrap().is_none());
}

#[tokio::test]
async fn test_server_error_status() {
    let (base_url, _) = serve(500, r#"{"message":"overloaded"}"#).await;

    let err = geocoder(&base_url).reverse(-15.79, -47.88).await.unwrap_err();
    assert!(matches!(err, GeocodingError::Status(500)));
}

#[tokio::test]
async fn test_provider_error_body() {
    let (base_url, _) = serve(200, r#"{"error":"Unable to geocode"}"#).await;

    let err = geocoder(&base_url).reverse(0.0, 0.0).await.unwrap_err();
    assert!(matches!(err, GeocodingError::Provider(ref msg) if msg == "Unable to geocode"));
}
