//! Reverse geocoding provider.
//!
//! Talks to a Nominatim-compatible `/reverse` endpoint.

use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use crate::storage::config::GeocodingSettings;

/// Subdivision data for a coordinate pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeocodeResult {
    pub subdivision_name: Option<String>,
    /// ISO 3166-2 code as returned by the provider, e.g. `BR-SP`
    pub subdivision_code: Option<String>,
    pub locality: Option<String>,
    pub postal_code: Option<String>,
}

/// Trait for reverse geocoding providers.
pub trait GeocodingProvider: Send + Sync {
    /// Resolve coordinates to subdivision data.
    fn reverse(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> impl Future<Output = Result<GeocodeResult, GeocodingError>> + Send;
}

impl<G: GeocodingProvider + ?Sized> GeocodingProvider for std::sync::Arc<G> {
    fn reverse(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> impl Future<Output = Result<GeocodeResult, GeocodingError>> + Send {
        (**self).reverse(latitude, longitude)
    }
}

/// Geocoding errors.
#[derive(Debug, Error)]
pub enum GeocodingError {
    #[error("HTTP client error: {0}")]
    Client(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Provider returned status {0}")]
    Status(u16),

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Provider error: {0}")]
    Provider(String),
}

/// Nominatim reverse response (the parts we read).
#[derive(Debug, Deserialize)]
struct NominatimResponse {
    #[serde(default)]
    address: Option<NominatimAddress>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct NominatimAddress {
    state: Option<String>,
    #[serde(rename = "ISO3166-2-lvl4")]
    iso_lvl4: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    postcode: Option<String>,
}

impl From<NominatimAddress> for GeocodeResult {
    fn from(address: NominatimAddress) -> Self {
        let locality = address
            .city
            .or(address.town)
            .or(address.village)
            .or(address.municipality);

        GeocodeResult {
            subdivision_name: address.state,
            subdivision_code: address.iso_lvl4,
            locality,
            postal_code: address.postcode,
        }
    }
}

/// Geocoding provider backed by Nominatim.
pub struct NominatimGeocoder {
    http: reqwest::Client,
    base_url: String,
}

impl NominatimGeocoder {
    /// Create a provider from configuration.
    pub fn new(settings: &GeocodingSettings) -> Result<Self, GeocodingError> {
        Self::with_base_url(&settings.base_url, &settings.user_agent, settings.timeout())
    }

    /// Create a provider against a custom endpoint.
    pub fn with_base_url(
        base_url: &str,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self, GeocodingError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| GeocodingError::Client(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn build_url(&self) -> String {
        format!("{}/reverse", self.base_url)
    }
}

impl GeocodingProvider for NominatimGeocoder {
    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<GeocodeResult, GeocodingError> {
        tracing::debug!(latitude, longitude, "Reverse geocoding");

        let response = self
            .http
            .get(self.build_url())
            .query(&[
                ("format", "jsonv2".to_string()),
                ("addressdetails", "1".to_string()),
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
            ])
            .send()
            .await
            .map_err(|e| GeocodingError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodingError::Status(status.as_u16()));
        }

        let body: NominatimResponse = response
            .json()
            .await
            .map_err(|e| GeocodingError::Decode(e.to_string()))?;

        if let Some(error) = body.error {
            return Err(GeocodingError::Provider(error));
        }

        Ok(body.address.unwrap_or_default().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_mapping_prefers_city() {
        let body: NominatimResponse = serde_json::from_str(
            r#"{"address":{"state":"São Paulo","ISO3166-2-lvl4":"BR-SP","town":"Itu","city":"Campinas","postcode":"13010-000"}}"#,
        )
        .unwrap();

        let result: GeocodeResult = body.address.unwrap().into();
        assert_eq!(result.subdivision_code.as_deref(), Some("BR-SP"));
        assert_eq!(result.subdivision_name.as_deref(), Some("São Paulo"));
        assert_eq!(result.locality.as_deref(), Some("Campinas"));
        assert_eq!(result.postal_code.as_deref(), Some("13010-000"));
    }

    #[test]
    fn test_address_falls_back_to_village() {
        let body: NominatimResponse =
            serde_json::from_str(r#"{"address":{"village":"Lençóis"}}"#).unwrap();

        let result: GeocodeResult = body.address.unwrap().into();
        assert_eq!(result.locality.as_deref(), Some("Lençóis"));
        assert!(result.subdivision_code.is_none());
    }

    #[test]
    fn test_build_url_trims_slash() {
        let geocoder =
            NominatimGeocoder::with_base_url("http://localhost:8080/", "podium-test", Duration::from_secs(1))
                .unwrap();
        assert_eq!(geocoder.build_url(), "http://localhost:8080/reverse");
    }
}
