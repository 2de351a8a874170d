//! Async access to the embedding store.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use async_trait::async_trait;
use tilescout_core::schema::Database;
use tilescout_core::{ChipMetadata, Coordinate, Match, Tile};

use crate::error::{ResolveError, ResolveResult};

const SOURCE_NAME: &str = "embedding store";

/// The vector and spatial datastore behind the pipeline.
///
/// `find_containing_tile` returns the first containing tile in the store's
/// natural order. `top_k_similar` receives a unit-length seed and returns
/// at most `k` matches, best first.
#[async_trait]
pub trait TileStore: Send + Sync {
    async fn find_containing_tile(&self, point: Coordinate) -> ResolveResult<Option<Tile>>;

    async fn top_k_similar(&self, seed: Vec<f32>, k: usize) -> ResolveResult<Vec<Match>>;

    async fn chip_metadata(&self, chips_id: &str) -> ResolveResult<Option<ChipMetadata>>;
}

/// [`TileStore`] over the local SQLite [`Database`].
///
/// SQLite calls block, so each one runs on tokio's blocking pool.
#[derive(Debug, Clone)]
pub struct SqliteTileStore {
    db: Arc<Mutex<Database>>,
}

impl SqliteTileStore {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    /// Run `f` against the database on the blocking pool.
    async fn with_db<T, F>(&self, op: &'static str, f: F) -> ResolveResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> tilescout_core::Result<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        let started = Instant::now();
        let result = tokio::task::spawn_blocking(move || {
            let guard = db.lock().unwrap_or_else(PoisonError::into_inner);
            f(&guard)
        })
        .await
        .map_err(|e| ResolveError::upstream(SOURCE_NAME, format!("{op} task failed: {e}")))?;

        log::debug!(
            "{} finished in {:.3}s",
            op,
            started.elapsed().as_secs_f64()
        );
        result.map_err(|e| {
            log::error!("{} failed: {}", op, e);
            ResolveError::from(e)
        })
    }
}

#[async_trait]
impl TileStore for SqliteTileStore {
    async fn find_containing_tile(&self, point: Coordinate) -> ResolveResult<Option<Tile>> {
        self.with_db("containment query", move |db| db.find_containing_tile(point))
            .await
    }

    async fn top_k_similar(&self, seed: Vec<f32>, k: usize) -> ResolveResult<Vec<Match>> {
        self.with_db("similarity query", move |db| db.top_k_similar(&seed, k))
            .await
    }

    async fn chip_metadata(&self, chips_id: &str) -> ResolveResult<Option<ChipMetadata>> {
        let chips_id = chips_id.to_string();
        self.with_db("metadata query", move |db| db.chip_metadata(&chips_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use tilescout_core::geometry::Footprint;
    use tilescout_core::schema::ChipRecord;
    use tilescout_core::vector::EMBEDDING_DIM;

    use super::*;

    fn chip(id: &str, lon: f64, lat: f64, hot: usize) -> ChipRecord {
        let mut embedding = vec![0.0; EMBEDDING_DIM];
        embedding[hot] = 1.0;
        ChipRecord {
            chips_id: id.to_string(),
            embedding,
            footprint: Footprint(vec![
                [lon, lat],
                [lon + 0.01, lat],
                [lon + 0.01, lat + 0.01],
                [lon, lat + 0.01],
                [lon, lat],
            ]),
        }
    }

    fn store() -> SqliteTileStore {
        let mut db = Database::open_in_memory().unwrap();
        db.upsert_chips(&[chip("a", 0.0, 0.0, 0), chip("b", 1.0, 1.0, 1)])
            .unwrap();
        SqliteTileStore::new(db)
    }

    #[tokio::test]
    async fn test_containment_through_blocking_pool() {
        let store = store();
        let tile = store
            .find_containing_tile(Coordinate::new(1.005, 1.005))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tile.id, "b");
        assert!(store
            .find_containing_tile(Coordinate::new(5.0, 5.0))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_similarity_and_metadata() {
        let store = store();
        let mut seed = vec![0.0; EMBEDDING_DIM];
        seed[1] = 1.0;

        let matches = store.top_k_similar(seed, 2).await.unwrap();
        assert_eq!(matches[0].tile_id, "b");
        assert!((matches[0].similarity - 1.0).abs() < 1e-9);

        let meta = store.chip_metadata("a").await.unwrap().unwrap();
        assert!((meta.coordinate.lon - 0.005).abs() < 1e-9);
        assert!(store.chip_metadata("zzz").await.unwrap().is_none());
    }
}
