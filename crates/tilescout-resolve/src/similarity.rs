//! Seed vector to ranked neighbours.

use std::sync::Arc;

use tilescout_core::vector;
use tilescout_core::Match;

use crate::error::ResolveResult;
use crate::store::TileStore;

/// Matches returned for a point or text anchor.
pub const POINT_MATCH_COUNT: usize = 8;

/// Default matches returned for a raw vector lookup.
pub const RAW_MATCH_COUNT: usize = 12;

/// Thumbnail URL for a tile id under `base`.
pub fn thumbnail_url(base: &str, tile_id: &str) -> String {
    format!("{}/{}_native.jpeg", base.trim_end_matches('/'), tile_id)
}

/// Ranks stored tiles by cosine similarity to a seed vector.
#[derive(Clone)]
pub struct SimilarityEngine {
    store: Arc<dyn TileStore>,
}

impl std::fmt::Debug for SimilarityEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimilarityEngine").finish_non_exhaustive()
    }
}

impl SimilarityEngine {
    pub fn new(store: Arc<dyn TileStore>) -> Self {
        Self { store }
    }

    /// Top `k` tiles most similar to `seed`, best first.
    ///
    /// The seed is validated and scaled to unit length before the store
    /// sees it. The store's order is returned as is.
    ///
    /// # Errors
    /// [`ResolveError::InvalidVector`](crate::ResolveError::InvalidVector)
    /// for a wrong-length or zero vector; an upstream error when the store
    /// fails.
    pub async fn top_similar(&self, seed: &[f32], k: usize) -> ResolveResult<Vec<Match>> {
        let unit = vector::normalize(seed)?;
        let mut matches = self.store.top_k_similar(unit, k).await?;
        matches.truncate(k);
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tilescout_core::vector::EMBEDDING_DIM;
    use tilescout_core::{ChipMetadata, Coordinate, Tile};

    use super::*;
    use crate::error::ResolveError;

    /// Records the seed it receives and returns a fixed, deliberately
    /// unsorted list.
    #[derive(Default)]
    struct RecordingStore {
        seeds: Mutex<Vec<Vec<f32>>>,
    }

    #[async_trait]
    impl TileStore for RecordingStore {
        async fn find_containing_tile(&self, _: Coordinate) -> ResolveResult<Option<Tile>> {
            Ok(None)
        }

        async fn top_k_similar(&self, seed: Vec<f32>, k: usize) -> ResolveResult<Vec<Match>> {
            self.seeds.lock().unwrap().push(seed);
            let origin = Coordinate::new(0.0, 0.0);
            Ok(vec![
                Match::new("b", 0.2, origin),
                Match::new("a", 0.9, origin),
                Match::new("c", 0.5, origin),
            ]
            .into_iter()
            .take(k)
            .collect())
        }

        async fn chip_metadata(&self, _: &str) -> ResolveResult<Option<ChipMetadata>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_seed_is_normalized_before_query() {
        let store = Arc::new(RecordingStore::default());
        let engine = SimilarityEngine::new(store.clone());

        let seed = vec![3.0; EMBEDDING_DIM];
        engine.top_similar(&seed, 3).await.unwrap();

        let seeds = store.seeds.lock().unwrap();
        assert_eq!(seeds.len(), 1);
        assert!((vector::l2_norm(&seeds[0]) - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_store_order_is_preserved() {
        let engine = SimilarityEngine::new(Arc::new(RecordingStore::default()));
        let ids: Vec<String> = engine
            .top_similar(&vec![1.0; EMBEDDING_DIM], 3)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.tile_id)
            .collect();
        assert_eq!(ids, ["b", "a", "c"]);
    }

    #[tokio::test]
    async fn test_defective_seeds_never_reach_store() {
        let store = Arc::new(RecordingStore::default());
        let engine = SimilarityEngine::new(store.clone());

        let short = engine.top_similar(&[1.0; 3], 8).await.unwrap_err();
        assert!(short.is_client_error());
        assert!(short.to_string().contains("got 3"));

        let zero = engine
            .top_similar(&vec![0.0; EMBEDDING_DIM], 8)
            .await
            .unwrap_err();
        assert!(matches!(zero, ResolveError::InvalidVector { .. }));

        assert!(store.seeds.lock().unwrap().is_empty());
    }

    #[test]
    fn test_thumbnail_url() {
        assert_eq!(
            thumbnail_url("https://thumbs.example.com/", "chip_7"),
            "https://thumbs.example.com/chip_7_native.jpeg"
        );
    }
}
