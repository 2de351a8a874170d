//! Core domain model for tilescout.
//!
//! This crate defines the value types that flow through the similarity
//! pipeline (coordinates, points of interest, tiles, matches), the
//! embedding vector math, polygon containment helpers, and the SQLite
//! schema backing the local embedding store.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod error;
pub mod geometry;
pub mod model;
pub mod schema;
pub mod vector;

pub use error::{Error, Result};
pub use model::{
    ChipMetadata, Coordinate, CoordinateKey, Match, Poi, ResolutionMethod, SimilarityResult,
    TextSimilarityResult, Tile,
};
