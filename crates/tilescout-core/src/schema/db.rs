use rusqlite::{Connection, OptionalExtension};
use serde::Deserialize;
use std::cmp::Ordering;
use std::path::Path;

use crate::error::{Error, Result};
use crate::geometry::Footprint;
use crate::model::{ChipMetadata, Coordinate, Match, Tile};
use crate::vector::{self, EMBEDDING_DIM};

use super::migrations::MIGRATIONS;

/// One chip as supplied for import: id, raw embedding, footprint ring.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChipRecord {
    pub chips_id: String,
    #[serde(rename = "vec")]
    pub embedding: Vec<f32>,
    #[serde(rename = "polygon")]
    pub footprint: Footprint,
}

/// A database connection over the `embeddings` table.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) a database at the given path and apply migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.apply_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.apply_migrations()?;
        Ok(db)
    }

    /// Get a reference to the underlying connection (for advanced queries).
    #[must_use]
    pub const fn conn(&self) -> &Connection {
        &self.conn
    }

    fn apply_migrations(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            [],
        )?;

        let mut stmt = self
            .conn
            .prepare("SELECT version FROM schema_migrations ORDER BY version")?;
        let applied: Vec<u32> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for migration in MIGRATIONS {
            if !applied.contains(&migration.version) {
                log::info!(
                    "Applying migration {} ({})",
                    migration.version,
                    migration.name
                );
                self.conn.execute_batch(migration.sql)?;
                self.conn.execute(
                    "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
                    rusqlite::params![migration.version, migration.name],
                )?;
            }
        }

        Ok(())
    }
}

// Chip writes
impl Database {
    /// Insert a chip, or update it in place when the id already exists.
    ///
    /// Updating keeps the original `rowid`, so containment tie-break order
    /// is stable across re-imports.
    pub fn upsert_chip(&self, chip: &ChipRecord) -> Result<()> {
        upsert_chip_on(&self.conn, chip)
    }

    /// Insert many chips in one transaction. Returns the number written.
    pub fn upsert_chips(&mut self, chips: &[ChipRecord]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        for chip in chips {
            upsert_chip_on(&tx, chip)?;
        }
        tx.commit()?;
        Ok(chips.len())
    }
}

fn upsert_chip_on(conn: &Connection, chip: &ChipRecord) -> Result<()> {
    if chip.embedding.len() != EMBEDDING_DIM {
        return Err(Error::EmbeddingDimension {
            chips_id: chip.chips_id.clone(),
            len: chip.embedding.len(),
            expected: EMBEDDING_DIM,
        });
    }
    chip.footprint
        .validate()
        .map_err(|reason| Error::InvalidGeometry {
            chips_id: chip.chips_id.clone(),
            reason,
        })?;

    let bbox = chip.footprint.bounding_box();
    let centroid = chip.footprint.centroid();
    conn.execute(
        "INSERT INTO embeddings (
            chips_id, vec, polygon, min_lon, min_lat, max_lon, max_lat,
            centroid_lon, centroid_lat
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(chips_id) DO UPDATE SET
            vec = excluded.vec, polygon = excluded.polygon,
            min_lon = excluded.min_lon, min_lat = excluded.min_lat,
            max_lon = excluded.max_lon, max_lat = excluded.max_lat,
            centroid_lon = excluded.centroid_lon,
            centroid_lat = excluded.centroid_lat",
        rusqlite::params![
            chip.chips_id,
            vector::to_blob(&chip.embedding),
            serde_json::to_string(&chip.footprint)?,
            bbox.min_lon,
            bbox.min_lat,
            bbox.max_lon,
            bbox.max_lat,
            centroid.lon,
            centroid.lat,
        ],
    )?;
    Ok(())
}

// Chip reads
impl Database {
    /// Number of chips in the store.
    pub fn chip_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM embeddings", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// The first chip, in `rowid` order, whose footprint contains `point`.
    ///
    /// Overlapping footprints are resolved by taking the earliest inserted
    /// chip. Candidates are prefiltered by bounding box in SQL and then
    /// tested exactly against the ring.
    pub fn find_containing_tile(&self, point: Coordinate) -> Result<Option<Tile>> {
        let mut stmt = self.conn.prepare(
            "SELECT chips_id, vec, polygon, centroid_lon, centroid_lat
             FROM embeddings
             WHERE min_lon <= ?1 AND max_lon >= ?1
               AND min_lat <= ?2 AND max_lat >= ?2
             ORDER BY rowid",
        )?;
        let mut rows = stmt.query(rusqlite::params![point.lon, point.lat])?;

        while let Some(row) = rows.next()? {
            let polygon: String = row.get(2)?;
            let footprint: Footprint = serde_json::from_str(&polygon)?;
            if !footprint.contains(point) {
                continue;
            }

            let chips_id: String = row.get(0)?;
            let blob: Vec<u8> = row.get(1)?;
            let embedding = vector::from_blob(&blob).ok_or_else(|| {
                Error::InvalidData(format!("embedding blob for {chips_id} is truncated"))
            })?;
            return Ok(Some(Tile {
                id: chips_id,
                embedding,
                coordinate: Coordinate::new(row.get(3)?, row.get(4)?),
            }));
        }

        Ok(None)
    }

    /// Full-scan cosine ranking against `seed`, best first, at most `k` rows.
    ///
    /// Equal scores keep `rowid` order. Rows whose stored vector has the
    /// wrong dimension are skipped with a warning.
    pub fn top_k_similar(&self, seed: &[f32], k: usize) -> Result<Vec<Match>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut stmt = self.conn.prepare(
            "SELECT chips_id, vec, centroid_lon, centroid_lat
             FROM embeddings
             ORDER BY rowid",
        )?;
        let mut rows = stmt.query([])?;

        let mut scored = Vec::new();
        while let Some(row) = rows.next()? {
            let chips_id: String = row.get(0)?;
            let blob: Vec<u8> = row.get(1)?;
            let Some(embedding) = vector::from_blob(&blob).filter(|v| v.len() == seed.len())
            else {
                log::warn!("Skipping chip {} with malformed embedding", chips_id);
                continue;
            };
            let similarity = vector::cosine_similarity(seed, &embedding);
            scored.push(Match::new(
                chips_id,
                similarity,
                Coordinate::new(row.get(2)?, row.get(3)?),
            ));
        }

        // `sort_by` is stable, so ties stay in rowid order.
        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
        });
        scored.truncate(k);
        Ok(scored)
    }

    /// Centroid of a chip by id.
    pub fn chip_metadata(&self, chips_id: &str) -> Result<Option<ChipMetadata>> {
        let meta = self
            .conn
            .query_row(
                "SELECT chips_id, centroid_lon, centroid_lat
                 FROM embeddings WHERE chips_id = ?1 LIMIT 1",
                [chips_id],
                |row| {
                    Ok(ChipMetadata {
                        chips_id: row.get(0)?,
                        coordinate: Coordinate::new(row.get(1)?, row.get(2)?),
                    })
                },
            )
            .optional()?;
        Ok(meta)
    }
}
