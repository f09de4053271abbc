//! Geographic scope for rankings.
//!
//! Turns GPS readings or manual input into a canonical (state, macro-region)
//! pair and persists it per user.

pub mod geocoding;
pub mod regions;
pub mod resolver;

pub use geocoding::{GeocodeResult, GeocodingError, GeocodingProvider, NominatimGeocoder};
pub use regions::{region_for_state, MacroRegion, StateCode};
pub use resolver::LocationResolver;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::storage::DatabaseError;

/// Stored location of a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserLocation {
    pub user_id: Uuid,
    pub state: StateCode,
    /// Always derived from `state`
    pub region: MacroRegion,
    pub city_approximate: Option<String>,
    pub postal_prefix: Option<String>,
    pub latitude_approximate: Option<f64>,
    pub longitude_approximate: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Canonical location produced by the resolver, not yet bound to a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub state: StateCode,
    pub region: MacroRegion,
    pub city: Option<String>,
    pub postal_prefix: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// What the device reported when asked for a position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GpsReading {
    Fix { latitude: f64, longitude: f64 },
    PermissionDenied,
    PositionUnavailable,
    Timeout,
}

/// Location input from the user.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationInput {
    Gps(GpsReading),
    Manual {
        state: String,
        city: Option<String>,
        postal_code: Option<String>,
    },
}

/// Location errors. Everything except `Database` means the location is
/// unavailable and the user may retry or switch to manual entry.
#[derive(Debug, Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location signal unavailable")]
    SignalUnavailable,

    #[error("Location request timed out")]
    Timeout,

    #[error("Coordinates out of range: {latitude}, {longitude}")]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    #[error("Geocoding provider failed: {0}")]
    ProviderFailed(String),

    #[error("Geocoding result has no subdivision code")]
    MissingSubdivision,

    #[error("Unrecognized state code: {0}")]
    UnrecognizedState(String),

    #[error("State is required")]
    EmptyState,

    #[error("Database error: {0}")]
    Database(String),
}

impl LocationError {
    /// Whether this is a "location unavailable" condition rather than a storage fault.
    pub fn is_unavailable(&self) -> bool {
        !matches!(self, LocationError::Database(_))
    }

    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            LocationError::PermissionDenied => {
                "Location access was denied. Allow location access or enter your state manually."
            }
            LocationError::SignalUnavailable => {
                "Your position could not be determined. Check your GPS signal or enter your state manually."
            }
            LocationError::Timeout => {
                "Getting your position took too long. Try again or enter your state manually."
            }
            LocationError::InvalidCoordinates { .. }
            | LocationError::ProviderFailed(_)
            | LocationError::MissingSubdivision
            | LocationError::UnrecognizedState(_) => {
                "We could not identify your state from your position. Enter it manually."
            }
            LocationError::EmptyState => "Select your state.",
            LocationError::Database(_) => "Your location could not be saved. Try again later.",
        }
    }
}

impl From<DatabaseError> for LocationError {
    fn from(err: DatabaseError) -> Self {
        LocationError::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_failures_have_distinct_messages() {
        let denied = LocationError::PermissionDenied.user_message();
        let signal = LocationError::SignalUnavailable.user_message();
        let timeout = LocationError::Timeout.user_message();

        assert_ne!(denied, signal);
        assert_ne!(signal, timeout);
        assert_ne!(denied, timeout);
    }

    #[test]
    fn test_database_is_not_unavailable() {
        assert!(LocationError::MissingSubdivision.is_unavailable());
        assert!(!LocationError::Database("locked".into()).is_unavailable());
    }
}
