//! Text or point anchor to ranked similar tiles.
//!
//! ```text
//! text ─► [geocode cache] ─► Poi ─┐
//!                                 ▼
//! point ──────────────► [tile cache] ─► Tile ─► [similarity cache] ─► matches ─► + thumbnails
//! ```
//!
//! Each bracketed step is a [`ResultCache`], so concurrent identical
//! requests share one geocoder call, one containment query and one
//! similarity scan.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use serde::Serialize;
use tilescout_core::schema::Database;
use tilescout_core::{
    ChipMetadata, Coordinate, CoordinateKey, Match, Poi, SimilarityResult, TextSimilarityResult,
    Tile,
};

use crate::cache::{CacheStats, ResultCache};
use crate::config::Config;
use crate::error::{ResolveError, ResolveResult};
use crate::geocode::{normalize_query, GeocodeResolver, NominatimClient};
use crate::locate::TileLocator;
use crate::similarity::{thumbnail_url, SimilarityEngine, POINT_MATCH_COUNT};
use crate::store::{SqliteTileStore, TileStore};

/// Phrases resolved by [`PipelineCoordinator::warmup`] at startup.
pub const DEFAULT_WARMUP_PHRASES: &[&str] =
    &["airport", "marina", "parking lot", "downtown", "bridge"];

/// Outcome of a warmup run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WarmupReport {
    pub succeeded: usize,
    pub failed: usize,
}

/// Counters for the three pipeline caches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineCacheStats {
    pub geocode: CacheStats,
    pub tile: CacheStats,
    pub similarity: CacheStats,
}

/// Wires geocoding, tile location and similarity search behind
/// single-flight caches.
pub struct PipelineCoordinator {
    geocoder: Arc<GeocodeResolver>,
    locator: Arc<TileLocator>,
    engine: Arc<SimilarityEngine>,
    store: Arc<dyn TileStore>,
    thumbnail_base: String,
    geocodes: ResultCache<String, Poi>,
    tiles: ResultCache<CoordinateKey, Tile>,
    similarities: ResultCache<String, Vec<Match>>,
}

impl std::fmt::Debug for PipelineCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineCoordinator")
            .field("geocoder", &self.geocoder)
            .field("thumbnail_base", &self.thumbnail_base)
            .field("geocodes", &self.geocodes)
            .field("tiles", &self.tiles)
            .field("similarities", &self.similarities)
            .finish_non_exhaustive()
    }
}

impl PipelineCoordinator {
    pub fn new(
        geocoder: GeocodeResolver,
        store: Arc<dyn TileStore>,
        thumbnail_base: impl Into<String>,
    ) -> Self {
        Self {
            geocoder: Arc::new(geocoder),
            locator: Arc::new(TileLocator::new(Arc::clone(&store))),
            engine: Arc::new(SimilarityEngine::new(Arc::clone(&store))),
            store,
            thumbnail_base: thumbnail_base.into(),
            geocodes: ResultCache::new("geocode"),
            tiles: ResultCache::new("tile"),
            similarities: ResultCache::new("similarity"),
        }
    }

    /// Build a coordinator over the configured SQLite store and Nominatim.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or the HTTP
    /// client cannot be created.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let db = Database::open(&config.database_path).with_context(|| {
            format!(
                "Failed to open embedding store at {}",
                config.database_path.display()
            )
        })?;
        let live = NominatimClient::new(config.geocoder_url.clone(), config.geocoder_timeout())
            .context("Failed to create geocoder client")?;

        Ok(Self::new(
            GeocodeResolver::new(Arc::new(live)),
            Arc::new(SqliteTileStore::new(db)),
            config.thumbnail_base.clone(),
        ))
    }

    /// Rank tiles similar to the tile containing `point`.
    ///
    /// # Errors
    /// [`ResolveError::NotFound`] when no tile contains the point;
    /// [`ResolveError::Upstream`] when the store fails.
    pub async fn resolve_by_point(&self, point: Coordinate) -> ResolveResult<SimilarityResult> {
        let started = Instant::now();
        log::info!("Resolving point {}", point);

        let locator = Arc::clone(&self.locator);
        let tile = self
            .tiles
            .get_or_compute(point.cache_key(), move || async move {
                locator.locate(point).await
            })
            .await
            .inspect_err(|e| log::warn!("No seed tile for {}: {}", point, e))?;

        let engine = Arc::clone(&self.engine);
        let seed = tile.embedding.clone();
        let matches = self
            .similarities
            .get_or_compute(tile.id.clone(), move || async move {
                let scan = Instant::now();
                let matches = engine.top_similar(&seed, POINT_MATCH_COUNT).await?;
                log::info!(
                    "Vector search returned {} results in {:.3}s",
                    matches.len(),
                    scan.elapsed().as_secs_f64()
                );
                Ok(matches)
            })
            .await?;

        let results = matches
            .into_iter()
            .map(|m| {
                let url = thumbnail_url(&self.thumbnail_base, &m.tile_id);
                m.with_thumbnail(url)
            })
            .collect();

        log::info!(
            "Point {} resolved to seed {} in {:.3}s",
            point,
            tile.id,
            started.elapsed().as_secs_f64()
        );

        Ok(SimilarityResult {
            seed_chip: tile.id,
            results,
        })
    }

    /// Geocode `text`, then rank tiles similar to the tile at that spot.
    ///
    /// # Errors
    /// [`ResolveError::NotFound`] when the text cannot be geocoded or no
    /// tile contains the result; [`ResolveError::Upstream`] when the
    /// store fails.
    pub async fn resolve_by_text(&self, text: &str) -> ResolveResult<TextSimilarityResult> {
        let started = Instant::now();
        log::info!("Resolving text {:?}", text);

        let geocoder = Arc::clone(&self.geocoder);
        let query = text.to_string();
        let poi = self
            .geocodes
            .get_or_compute(normalize_query(text), move || async move {
                geocoder.resolve(&query).await
            })
            .await?;

        log::info!(
            "{:?} resolved to {:?} at {} ({})",
            text,
            poi.name,
            poi.coordinate,
            poi.method
        );

        let similarity = self.resolve_by_point(poi.coordinate).await?;

        log::info!(
            "Text {:?} pipeline finished in {:.3}s",
            text,
            started.elapsed().as_secs_f64()
        );

        Ok(TextSimilarityResult {
            query: text.to_string(),
            poi,
            similarity,
        })
    }

    /// Run the text pipeline once per phrase, in order, to fill the caches.
    ///
    /// A failing phrase is logged and skipped.
    pub async fn warmup(&self, phrases: &[&str]) -> WarmupReport {
        let started = Instant::now();
        let mut report = WarmupReport::default();

        for phrase in phrases {
            match self.resolve_by_text(phrase).await {
                Ok(result) => {
                    report.succeeded += 1;
                    log::info!(
                        "Warmup {:?} cached (seed {})",
                        phrase,
                        result.similarity.seed_chip
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    log::warn!("Warmup {:?} failed: {}", phrase, e);
                }
            }
        }

        log::info!(
            "Warmup finished: {} ok, {} failed in {:.3}s",
            report.succeeded,
            report.failed,
            started.elapsed().as_secs_f64()
        );
        report
    }

    /// Rank tiles similar to a caller-supplied vector. Not cached.
    ///
    /// # Errors
    /// [`ResolveError::InvalidVector`] for a wrong-length or zero vector;
    /// [`ResolveError::Upstream`] when the store fails.
    pub async fn similar_to_vector(&self, vector: &[f32], k: usize) -> ResolveResult<Vec<Match>> {
        let matches = self.engine.top_similar(vector, k).await?;
        Ok(matches
            .into_iter()
            .map(|m| {
                let url = thumbnail_url(&self.thumbnail_base, &m.tile_id);
                m.with_thumbnail(url)
            })
            .collect())
    }

    /// Centroid of a chip by id.
    ///
    /// # Errors
    /// [`ResolveError::NotFound`] for an unknown id.
    pub async fn chip_metadata(&self, chips_id: &str) -> ResolveResult<ChipMetadata> {
        self.store
            .chip_metadata(chips_id)
            .await?
            .ok_or_else(|| ResolveError::not_found("chip", chips_id))
    }

    pub fn cache_stats(&self) -> PipelineCacheStats {
        PipelineCacheStats {
            geocode: self.geocodes.stats(),
            tile: self.tiles.stats(),
            similarity: self.similarities.stats(),
        }
    }

    /// Drop every ready cache entry.
    pub fn clear_caches(&self) {
        self.geocodes.clear();
        self.tiles.clear();
        self.similarities.clear();
    }
}
