pub mod coordinate;
pub mod poi;
pub mod result;
pub mod tile;

pub use coordinate::{Coordinate, CoordinateKey};
pub use poi::{Poi, ResolutionMethod};
pub use result::{SimilarityResult, TextSimilarityResult};
pub use tile::{ChipMetadata, Match, Tile};
