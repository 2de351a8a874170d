use serde::{Deserialize, Serialize};

use crate::model::coordinate::Coordinate;

/// An embedding record whose footprint contains a queried point.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub id: String,

    /// Raw embedding as stored; not normalized.
    pub embedding: Vec<f32>,

    /// Centroid of the tile footprint.
    pub coordinate: Coordinate,
}

/// One ranked neighbour of a seed tile.
///
/// Serialized with the wire names consumed by the map front end:
/// `chips_id`, `similarity`, `lon`, `lat`, `thumbnail`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    #[serde(rename = "chips_id")]
    pub tile_id: String,

    pub similarity: f64,

    #[serde(flatten)]
    pub coordinate: Coordinate,

    /// Thumbnail URL; empty until the presentation layer attaches one.
    #[serde(default)]
    pub thumbnail: String,
}

impl Match {
    #[must_use]
    pub fn new(tile_id: impl Into<String>, similarity: f64, coordinate: Coordinate) -> Self {
        Self {
            tile_id: tile_id.into(),
            similarity,
            coordinate,
            thumbnail: String::new(),
        }
    }

    #[must_use]
    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = thumbnail.into();
        self
    }
}

/// Centroid lookup result for a single chip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChipMetadata {
    pub chips_id: String,

    #[serde(flatten)]
    pub coordinate: Coordinate,
}
