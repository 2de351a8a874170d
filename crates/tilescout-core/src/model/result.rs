use serde::{Deserialize, Serialize};

use crate::model::poi::Poi;
use crate::model::tile::Match;

/// Similarity ranking anchored on a seed chip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    pub seed_chip: String,
    pub results: Vec<Match>,
}

/// Similarity ranking reached through a free-text query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSimilarityResult {
    pub query: String,
    pub poi: Poi,

    #[serde(flatten)]
    pub similarity: SimilarityResult,
}
