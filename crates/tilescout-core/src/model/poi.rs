use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::coordinate::Coordinate;

/// How a free-text query was turned into a coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    /// The normalized query is a key of the fallback table.
    Exact,
    /// The query scored above the fuzzy threshold against a fallback key.
    Fuzzy,
    /// The live geocoding service answered.
    Live,
}

impl fmt::Display for ResolutionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Exact => "exact",
            Self::Fuzzy => "fuzzy",
            Self::Live => "live",
        };
        f.write_str(name)
    }
}

/// A resolved point of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poi {
    pub name: String,

    #[serde(flatten)]
    pub coordinate: Coordinate,

    pub method: ResolutionMethod,
}

impl Poi {
    #[must_use]
    pub fn new(name: impl Into<String>, coordinate: Coordinate, method: ResolutionMethod) -> Self {
        Self {
            name: name.into(),
            coordinate,
            method,
        }
    }
}
