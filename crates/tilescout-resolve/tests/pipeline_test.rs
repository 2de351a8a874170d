//! Integration tests for the text and point pipelines over a real
//! on-disk SQLite store.
//!
//! The live geocoder is replaced by a counting stub so no network access
//! is needed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;
use tilescout_core::geometry::Footprint;
use tilescout_core::schema::{ChipRecord, Database};
use tilescout_core::vector::EMBEDDING_DIM;
use tilescout_core::{Coordinate, ResolutionMethod};
use tilescout_resolve::geocode::GeocodeHit;
use tilescout_resolve::{
    GeocodeResolver, GeocodeService, PipelineCoordinator, ResolveResult, SqliteTileStore,
    POINT_MATCH_COUNT,
};

#[derive(Default)]
struct StubGeocoder {
    calls: AtomicUsize,
}

#[async_trait]
impl GeocodeService for StubGeocoder {
    async fn search(&self, query: &str) -> ResolveResult<Vec<GeocodeHit>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if query.to_lowercase().starts_with("ferry building") {
            Ok(vec![GeocodeHit {
                display_name: "Ferry Building, San Francisco".to_string(),
                coordinate: Coordinate::new(-122.3935, 37.7955),
            }])
        } else {
            Ok(Vec::new())
        }
    }
}

/// A 0.01 degree square chip whose embedding leans on `axis`.
fn chip(id: &str, lon: f64, lat: f64, axis: usize, weight: f32) -> ChipRecord {
    let mut embedding = vec![0.01; EMBEDDING_DIM];
    embedding[axis] = weight;
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

fn seeded_store(dir: &TempDir) -> Database {
    let mut db = Database::open(dir.path().join("embeddings.db")).expect("open store");
    let mut chips = vec![
        // Contains the airport fallback coordinate.
        chip("sfo_0001", -122.395, 37.61, 0, 1.0),
        // Contains the ferry building.
        chip("ferry_0001", -122.40, 37.79, 1, 1.0),
    ];
    // Ten more tiles far from both anchors, graded by similarity to sfo.
    for i in 0..10u8 {
        chips.push(chip(
            &format!("far_{i:02}"),
            10.0 + f64::from(i),
            10.0,
            0,
            f32::from(i) / 10.0,
        ));
    }
    db.upsert_chips(&chips).expect("seed store");
    db
}

fn coordinator(dir: &TempDir, live: Arc<StubGeocoder>) -> PipelineCoordinator {
    PipelineCoordinator::new(
        GeocodeResolver::new(live),
        Arc::new(SqliteTileStore::new(seeded_store(dir))),
        "https://thumbs.test",
    )
}

#[tokio::test]
async fn test_airport_text_returns_ranked_neighbours() {
    let dir = TempDir::new().unwrap();
    let live = Arc::new(StubGeocoder::default());
    let coordinator = coordinator(&dir, live.clone());

    let result = coordinator.resolve_by_text("Airport").await.unwrap();

    assert_eq!(result.poi.method, ResolutionMethod::Exact);
    assert_eq!(result.similarity.seed_chip, "sfo_0001");
    assert_eq!(result.similarity.results.len(), POINT_MATCH_COUNT);
    assert_eq!(result.similarity.results[0].tile_id, "sfo_0001");
    assert_eq!(result.similarity.results[1].tile_id, "far_09");

    let scores: Vec<f64> = result
        .similarity
        .results
        .iter()
        .map(|m| m.similarity)
        .collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    assert_eq!(live.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_live_geocoder_path() {
    let dir = TempDir::new().unwrap();
    let live = Arc::new(StubGeocoder::default());
    let coordinator = coordinator(&dir, live.clone());

    let result = coordinator.resolve_by_text("Ferry Building").await.unwrap();
    assert_eq!(result.poi.method, ResolutionMethod::Live);
    assert_eq!(result.similarity.seed_chip, "ferry_0001");

    // Same normalized text: served from the geocode cache.
    coordinator.resolve_by_text("  ferry building").await.unwrap();
    assert_eq!(live.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unknown_text_and_empty_point() {
    let dir = TempDir::new().unwrap();
    let live = Arc::new(StubGeocoder::default());
    let coordinator = coordinator(&dir, live.clone());

    let err = coordinator.resolve_by_text("xyzzy qwv").await.unwrap_err();
    assert!(err.is_not_found());

    let err = coordinator
        .resolve_by_point(Coordinate::new(0.0, 0.0))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_concurrent_point_requests_share_work() {
    let dir = TempDir::new().unwrap();
    let live = Arc::new(StubGeocoder::default());
    let coordinator = Arc::new(coordinator(&dir, live));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let coordinator = Arc::clone(&coordinator);
        handles.push(tokio::spawn(async move {
            coordinator
                .resolve_by_point(Coordinate::new(-122.3899, 37.6152))
                .await
        }));
    }

    let mut seeds = Vec::new();
    for handle in handles {
        seeds.push(handle.await.unwrap().unwrap().seed_chip);
    }
    assert!(seeds.iter().all(|s| s == "sfo_0001"));

    let stats = coordinator.cache_stats();
    assert_eq!(stats.tile.computations, 1);
    assert_eq!(stats.similarity.computations, 1);
}

#[tokio::test]
async fn test_warmup_then_metadata() {
    let dir = TempDir::new().unwrap();
    let live = Arc::new(StubGeocoder::default());
    let coordinator = coordinator(&dir, live);

    let report = coordinator.warmup(&["airport", "bridge"]).await;
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);

    let meta = coordinator.chip_metadata("sfo_0001").await.unwrap();
    assert!((meta.coordinate.lon - -122.39).abs() < 1e-9);
    assert!((meta.coordinate.lat - 37.615).abs() < 1e-9);
}
