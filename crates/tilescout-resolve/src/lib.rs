//! Anchor resolution pipeline for tilescout.
//!
//! Turns a free-text query or a map point into the tile that contains it
//! and a ranked list of visually similar tiles. Every expensive step sits
//! behind a single-flight [`ResultCache`].

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod cache;
pub mod config;
pub mod error;
pub mod geocode;
pub mod locate;
pub mod pipeline;
pub mod similarity;
pub mod store;

pub use cache::{CacheStats, ResultCache};
pub use config::Config;
pub use error::{ResolveError, ResolveResult};
pub use geocode::{GeocodeResolver, GeocodeService, NominatimClient};
pub use locate::TileLocator;
pub use pipeline::{PipelineCacheStats, PipelineCoordinator, WarmupReport, DEFAULT_WARMUP_PHRASES};
pub use similarity::{SimilarityEngine, POINT_MATCH_COUNT, RAW_MATCH_COUNT};
pub use store::{SqliteTileStore, TileStore};
