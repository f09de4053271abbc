//! Brazilian states and the five macro-regions used for the regional tier.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro-region grouping of states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MacroRegion {
    Norte,
    Nordeste,
    CentroOeste,
    Sudeste,
    Sul,
    /// Sentinel for state codes outside the known table.
    Unknown,
}

impl MacroRegion {
    /// The five real macro-regions.
    pub const ALL: [MacroRegion; 5] = [
        MacroRegion::Norte,
        MacroRegion::Nordeste,
        MacroRegion::CentroOeste,
        MacroRegion::Sudeste,
        MacroRegion::Sul,
    ];

    /// Stored and displayed name.
    pub fn as_str(&self) -> &'static str {
        match self {
            MacroRegion::Norte => "Norte",
            MacroRegion::Nordeste => "Nordeste",
            MacroRegion::CentroOeste => "Centro-Oeste",
            MacroRegion::Sudeste => "Sudeste",
            MacroRegion::Sul => "Sul",
            MacroRegion::Unknown => "Desconhecida",
        }
    }

    /// Parse a stored name. Anything unrecognised is `Unknown`.
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "Norte" => MacroRegion::Norte,
            "Nordeste" => MacroRegion::Nordeste,
            "Centro-Oeste" => MacroRegion::CentroOeste,
            "Sudeste" => MacroRegion::Sudeste,
            "Sul" => MacroRegion::Sul,
            _ => MacroRegion::Unknown,
        }
    }

    /// Parse a name only if it is one of the five real regions.
    pub fn parse_known(name: &str) -> Option<Self> {
        match Self::from_name(name) {
            MacroRegion::Unknown => None,
            region => Some(region),
        }
    }

    pub fn is_known(&self) -> bool {
        *self != MacroRegion::Unknown
    }
}

impl fmt::Display for MacroRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalised state code (trimmed, upper-case).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateCode(String);

impl StateCode {
    /// Normalise raw input. Returns `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let code = raw.trim().to_ascii_uppercase();
        if code.is_empty() {
            None
        } else {
            Some(Self(code))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Macro-region this state belongs to; never fails.
    pub fn region(&self) -> MacroRegion {
        region_for_state(&self.0)
    }

    /// Whether the code is one of the 27 known states.
    pub fn is_known(&self) -> bool {
        self.region().is_known()
    }
}

impl fmt::Display for StateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// State code to macro-region table.
pub const STATE_REGIONS: [(&str, MacroRegion); 27] = [
    ("AC", MacroRegion::Norte),
    ("AP", MacroRegion::Norte),
    ("AM", MacroRegion::Norte),
    ("PA", MacroRegion::Norte),
    ("RO", MacroRegion::Norte),
    ("RR", MacroRegion::Norte),
    ("TO", MacroRegion::Norte),
    ("AL", MacroRegion::Nordeste),
    ("BA", MacroRegion::Nordeste),
    ("CE", MacroRegion::Nordeste),
    ("MA", MacroRegion::Nordeste),
    ("PB", MacroRegion::Nordeste),
    ("PE", MacroRegion::Nordeste),
    ("PI", MacroRegion::Nordeste),
    ("RN", MacroRegion::Nordeste),
    ("SE", MacroRegion::Nordeste),
    ("GO", MacroRegion::CentroOeste),
    ("MT", MacroRegion::CentroOeste),
    ("MS", MacroRegion::CentroOeste),
    ("DF", MacroRegion::CentroOeste),
    ("ES", MacroRegion::Sudeste),
    ("MG", MacroRegion::Sudeste),
    ("RJ", MacroRegion::Sudeste),
    ("SP", MacroRegion::Sudeste),
    ("PR", MacroRegion::Sul),
    ("RS", MacroRegion::Sul),
    ("SC", MacroRegion::Sul),
];

/// Look up the macro-region for a state code. Unmapped codes are `Unknown`.
pub fn region_for_state(code: &str) -> MacroRegion {
    let code = code.trim();
    STATE_REGIONS
        .iter()
        .find(|(state, _)| state.eq_ignore_ascii_case(code))
        .map(|(_, region)| *region)
        .unwrap_or(MacroRegion::Unknown)
}
