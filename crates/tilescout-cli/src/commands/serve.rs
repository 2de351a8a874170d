//! HTTP transport over the similarity pipeline.

use anyhow::{Context, Result};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tilescout_core::Coordinate;
use tilescout_resolve::{
    Config, PipelineCoordinator, ResolveError, DEFAULT_WARMUP_PHRASES, RAW_MATCH_COUNT,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

type Pipeline = Arc<PipelineCoordinator>;

#[derive(Debug, Deserialize)]
pub struct TextQuery {
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct PointQuery {
    pub lon: f64,
    pub lat: f64,
}

#[derive(Debug, Deserialize)]
pub struct VectorRequest {
    pub vector: Vec<f32>,
    #[serde(default = "default_k")]
    pub k: usize,
}

const fn default_k() -> usize {
    RAW_MATCH_COUNT
}

pub async fn run_serve(config: &Config) -> Result<()> {
    let pipeline = Arc::new(PipelineCoordinator::from_config(config)?);

    if config.warmup {
        log::info!("Warming caches...");
        pipeline.warmup(DEFAULT_WARMUP_PHRASES).await;
    }

    let app = router(pipeline);

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;
    log::info!("Listening on http://{}", config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("Shutting down");
            }
        })
        .await
        .context("HTTP server failed")?;

    Ok(())
}

pub fn router(pipeline: Pipeline) -> Router {
    Router::new()
        .route("/similarity/text", get(similarity_by_text))
        .route("/similarity/point", get(similarity_by_point))
        .route("/similarity/vector", post(similarity_by_vector))
        .route("/chips/:chips_id", get(chip_metadata))
        .route("/stats", get(cache_stats))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(pipeline)
}

fn status_for(err: &ResolveError) -> StatusCode {
    match err {
        ResolveError::NotFound { .. } => StatusCode::NOT_FOUND,
        ResolveError::InvalidVector { .. } => StatusCode::BAD_REQUEST,
        ResolveError::Upstream { .. } => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn message_for(err: &ResolveError) -> String {
    match err {
        ResolveError::NotFound { entity: "geocode result", .. } => {
            "No OSM result for query".to_string()
        }
        ResolveError::NotFound { entity: "tile", .. } => {
            "No chip found at that location".to_string()
        }
        other => other.to_string(),
    }
}

/// JSON error body: `{"error": ...}` merged with `context`.
fn error_response(err: &ResolveError, context: Value) -> Response {
    let mut body = json!({ "error": message_for(err) });
    if let (Some(body), Value::Object(extra)) = (body.as_object_mut(), context) {
        body.extend(extra);
    }
    (status_for(err), Json(body)).into_response()
}

fn bad_request(message: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

async fn similarity_by_text(
    State(pipeline): State<Pipeline>,
    query: Result<Query<TextQuery>, QueryRejection>,
) -> Response {
    let Query(TextQuery { q }) = match query {
        Ok(query) => query,
        Err(rejection) => return bad_request(rejection.body_text()),
    };
    match pipeline.resolve_by_text(&q).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => error_response(&e, json!({ "query": q })),
    }
}

async fn similarity_by_point(
    State(pipeline): State<Pipeline>,
    query: Result<Query<PointQuery>, QueryRejection>,
) -> Response {
    let Query(PointQuery { lon, lat }) = match query {
        Ok(query) => query,
        Err(rejection) => return bad_request(rejection.body_text()),
    };
    match pipeline.resolve_by_point(Coordinate::new(lon, lat)).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => error_response(&e, json!({ "lon": lon, "lat": lat })),
    }
}

async fn similarity_by_vector(
    State(pipeline): State<Pipeline>,
    body: Result<Json<VectorRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_request(rejection.body_text()),
    };
    match pipeline.similar_to_vector(&request.vector, request.k).await {
        Ok(results) => Json(json!({ "results": results })).into_response(),
        Err(e) => error_response(&e, json!({})),
    }
}

async fn chip_metadata(State(pipeline): State<Pipeline>, Path(chips_id): Path<String>) -> Response {
    match pipeline.chip_metadata(&chips_id).await {
        Ok(meta) => Json(meta).into_response(),
        Err(e) => error_response(&e, json!({ "chips_id": chips_id })),
    }
}

async fn cache_stats(State(pipeline): State<Pipeline>) -> Response {
    Json(pipeline.cache_stats()).into_response()
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
