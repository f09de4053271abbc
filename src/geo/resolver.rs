//! Location resolution and persistence.

use uuid::Uuid;

use super::geocoding::{GeocodeResult, GeocodingProvider};
use super::{GpsReading, LocationError, LocationInput, ResolvedLocation, StateCode, UserLocation};
use crate::clock::{Clock, SystemClock};
use crate::storage::LocationStore;

/// Digits kept from a postal code.
const POSTAL_PREFIX_LEN: usize = 5;

/// Decimal places kept from coordinates (about 1 km).
const COORDINATE_DECIMALS: i32 = 2;

/// ISO 3166-1 prefix of subdivision codes we accept.
const COUNTRY_CODE: &str = "BR";

/// Resolves user input into a canonical location and stores it.
pub struct LocationResolver<G, C = SystemClock> {
    geocoder: G,
    store: LocationStore,
    clock: C,
}

impl<G: GeocodingProvider> LocationResolver<G, SystemClock> {
    pub fn new(geocoder: G, store: LocationStore) -> Self {
        Self::with_clock(geocoder, store, SystemClock)
    }
}

impl<G: GeocodingProvider, C: Clock> LocationResolver<G, C> {
    pub fn with_clock(geocoder: G, store: LocationStore, clock: C) -> Self {
        Self {
            geocoder,
            store,
            clock,
        }
    }

    /// Resolve coordinates through the geocoding provider.
    pub async fn resolve_from_coordinates(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<ResolvedLocation, LocationError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(LocationError::InvalidCoordinates {
                latitude,
                longitude,
            });
        }

        let result = self
            .geocoder
            .reverse(latitude, longitude)
            .await
            .map_err(|e| LocationError::ProviderFailed(e.to_string()))?;

        let state = state_from_subdivision(&result)?;

        Ok(ResolvedLocation {
            region: state.region(),
            state,
            city: clean(result.locality),
            postal_prefix: result.postal_code.as_deref().and_then(postal_prefix),
            latitude: Some(approximate(latitude)),
            longitude: Some(approximate(longitude)),
        })
    }

    /// Resolve manual input from the state table alone.
    pub fn resolve_from_manual_input(
        &self,
        state: &str,
        city: Option<&str>,
        postal_code: Option<&str>,
    ) -> Result<ResolvedLocation, LocationError> {
        let state = StateCode::parse(state).ok_or(LocationError::EmptyState)?;

        Ok(ResolvedLocation {
            region: state.region(),
            state,
            city: clean(city.map(str::to_string)),
            postal_prefix: postal_code.and_then(postal_prefix),
            latitude: None,
            longitude: None,
        })
    }

    /// Resolve any kind of input.
    pub async fn resolve(&self, input: &LocationInput) -> Result<ResolvedLocation, LocationError> {
        match input {
            LocationInput::Gps(GpsReading::Fix {
                latitude,
                longitude,
            }) => self.resolve_from_coordinates(*latitude, *longitude).await,
            LocationInput::Gps(GpsReading::PermissionDenied) => Err(LocationError::PermissionDenied),
            LocationInput::Gps(GpsReading::PositionUnavailable) => {
                Err(LocationError::SignalUnavailable)
            }
            LocationInput::Gps(GpsReading::Timeout) => Err(LocationError::Timeout),
            LocationInput::Manual {
                state,
                city,
                postal_code,
            } => self.resolve_from_manual_input(state, city.as_deref(), postal_code.as_deref()),
        }
    }

    /// Store a resolved location as the user's single location row.
    pub fn save(
        &self,
        user_id: Uuid,
        location: &ResolvedLocation,
    ) -> Result<UserLocation, LocationError> {
        let saved = self.store.upsert(user_id, location, self.clock.now())?;
        tracing::info!(
            %user_id,
            state = %saved.state,
            region = %saved.region,
            "Saved user location"
        );
        Ok(saved)
    }

    /// Resolve input and store it. Nothing is written if resolution fails.
    pub async fn resolve_and_save(
        &self,
        user_id: Uuid,
        input: &LocationInput,
    ) -> Result<UserLocation, LocationError> {
        let resolved = match self.resolve(input).await {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::warn!(%user_id, "Location unavailable: {}", e);
                return Err(e);
            }
        };
        self.save(user_id, &resolved)
    }

    /// The stored location of a user.
    pub fn location_for(&self, user_id: Uuid) -> Result<Option<UserLocation>, LocationError> {
        Ok(self.store.get(user_id)?)
    }
}

/// Extract a known state from an ISO 3166-2 code such as `BR-SP`.
/// A prefix other than `BR` is rejected even when its suffix matches a state.
fn state_from_subdivision(result: &GeocodeResult) -> Result<StateCode, LocationError> {
    let raw = result
        .subdivision_code
        .as_deref()
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .ok_or(LocationError::MissingSubdivision)?;

    let suffix = match raw.split_once('-') {
        Some((country, subdivision)) if country.trim().eq_ignore_ascii_case(COUNTRY_CODE) => {
            subdivision
        }
        Some(_) => return Err(LocationError::UnrecognizedState(raw.to_string())),
        None => raw,
    };
    let state = StateCode::parse(suffix).ok_or(LocationError::MissingSubdivision)?;

    if !state.is_known() {
        return Err(LocationError::UnrecognizedState(raw.to_string()));
    }

    Ok(state)
}

fn postal_prefix(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() >= POSTAL_PREFIX_LEN {
        Some(digits[..POSTAL_PREFIX_LEN].to_string())
    } else {
        None
    }
}

fn approximate(coordinate: f64) -> f64 {
    let factor = 10f64.powi(COORDINATE_DECIMALS);
    (coordinate * factor).round() / factor
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
