//! Point to containing tile.

use std::sync::Arc;

use tilescout_core::{Coordinate, Tile};

use crate::error::{ResolveError, ResolveResult};
use crate::store::TileStore;

/// Finds the tile whose footprint contains a point.
#[derive(Clone)]
pub struct TileLocator {
    store: Arc<dyn TileStore>,
}

impl std::fmt::Debug for TileLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileLocator").finish_non_exhaustive()
    }
}

impl TileLocator {
    pub fn new(store: Arc<dyn TileStore>) -> Self {
        Self { store }
    }

    /// Locate the tile containing `point`.
    ///
    /// When footprints overlap, the store's first row wins.
    ///
    /// # Errors
    /// [`ResolveError::NotFound`] when the point is out of range or no
    /// footprint contains it; [`ResolveError::Upstream`] when the store
    /// fails.
    pub async fn locate(&self, point: Coordinate) -> ResolveResult<Tile> {
        if !point.is_valid() {
            return Err(ResolveError::not_found("tile", point.to_string()));
        }
        self.store
            .find_containing_tile(point)
            .await?
            .ok_or_else(|| ResolveError::not_found("tile", point.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tilescout_core::geometry::Footprint;
    use tilescout_core::schema::{ChipRecord, Database};
    use tilescout_core::vector::EMBEDDING_DIM;
    use tilescout_core::{ChipMetadata, Match};

    use super::*;
    use crate::store::SqliteTileStore;

    fn square_chip(id: &str, lon: f64, lat: f64, size: f64) -> ChipRecord {
        ChipRecord {
            chips_id: id.to_string(),
            embedding: vec![0.5; EMBEDDING_DIM],
            footprint: Footprint(vec![
                [lon, lat],
                [lon + size, lat],
                [lon + size, lat + size],
                [lon, lat + size],
            ]),
        }
    }

    fn locator(chips: &[ChipRecord]) -> TileLocator {
        let mut db = Database::open_in_memory().unwrap();
        db.upsert_chips(chips).unwrap();
        TileLocator::new(Arc::new(SqliteTileStore::new(db)))
    }

    #[tokio::test]
    async fn test_locate_airport_tile() {
        let locator = locator(&[square_chip("sfo", -122.395, 37.61, 0.01)]);
        let tile = locator
            .locate(Coordinate::new(-122.3899, 37.6152))
            .await
            .unwrap();
        assert_eq!(tile.id, "sfo");
        assert_eq!(tile.embedding.len(), EMBEDDING_DIM);
    }

    #[tokio::test]
    async fn test_origin_is_not_found() {
        let locator = locator(&[square_chip("sfo", -122.395, 37.61, 0.01)]);
        let err = locator.locate(Coordinate::new(0.0, 0.0)).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_overlap_takes_first_row() {
        let locator = locator(&[
            square_chip("first", 0.0, 0.0, 1.0),
            square_chip("second", 0.5, 0.5, 1.0),
        ]);
        let tile = locator.locate(Coordinate::new(0.75, 0.75)).await.unwrap();
        assert_eq!(tile.id, "first");
    }

    struct CountingStore(AtomicUsize);

    #[async_trait]
    impl TileStore for CountingStore {
        async fn find_containing_tile(&self, _: Coordinate) -> ResolveResult<Option<Tile>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }

        async fn top_k_similar(&self, _: Vec<f32>, _: usize) -> ResolveResult<Vec<Match>> {
            Ok(Vec::new())
        }

        async fn chip_metadata(&self, _: &str) -> ResolveResult<Option<ChipMetadata>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_out_of_range_point_skips_store() {
        let store = Arc::new(CountingStore(AtomicUsize::new(0)));
        let locator = TileLocator::new(store.clone());

        let err = locator
            .locate(Coordinate::new(200.0, 95.0))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.0.load(Ordering::SeqCst), 0);

        assert!(locator
            .locate(Coordinate::new(f64::NAN, 0.0))
            .await
            .is_err());
    }
}
