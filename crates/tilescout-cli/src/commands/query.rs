use anyhow::{Context, Result};
use serde::Serialize;
use tilescout_core::Coordinate;
use tilescout_resolve::{Config, PipelineCoordinator};

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to render result")?;
    println!("{}", text);
    Ok(())
}

pub async fn run_text(config: &Config, query: &str) -> Result<()> {
    let pipeline = PipelineCoordinator::from_config(config)?;
    let result = pipeline
        .resolve_by_text(query)
        .await
        .with_context(|| format!("No similar tiles for {query:?}"))?;

    eprintln!(
        "✓ {} ({}) → seed {}",
        result.poi.name, result.poi.method, result.similarity.seed_chip
    );
    print_json(&result)
}

pub async fn run_point(config: &Config, lon: f64, lat: f64) -> Result<()> {
    let pipeline = PipelineCoordinator::from_config(config)?;
    let point = Coordinate::new(lon, lat);
    let result = pipeline
        .resolve_by_point(point)
        .await
        .with_context(|| format!("No similar tiles for {point}"))?;

    eprintln!("✓ seed {}", result.seed_chip);
    print_json(&result)
}

pub async fn run_chip(config: &Config, chips_id: &str) -> Result<()> {
    let pipeline = PipelineCoordinator::from_config(config)?;
    let meta = pipeline
        .chip_metadata(chips_id)
        .await
        .with_context(|| format!("Failed to look up chip {chips_id}"))?;
    print_json(&meta)
}
