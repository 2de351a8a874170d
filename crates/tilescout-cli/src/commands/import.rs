use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Instant;
use tilescout_core::schema::{ChipRecord, Database};

/// Chips written per transaction.
const BATCH_SIZE: usize = 500;

/// Counts from one import run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub written: usize,
    pub skipped: usize,
}

pub fn run_import(path: &Path, db_path: &Path) -> Result<()> {
    let started = Instant::now();
    log::info!("Importing chips from {}", path.display());

    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut db = Database::open(db_path)
        .with_context(|| format!("Failed to open embedding store at {}", db_path.display()))?;

    let summary = import_records(&mut db, BufReader::new(file))?;

    println!(
        "\n✓ Imported {} chips ({} skipped) in {:.1}s",
        summary.written,
        summary.skipped,
        started.elapsed().as_secs_f64()
    );
    println!("  Store now holds {} chips", db.chip_count()?);
    Ok(())
}

/// Read NDJSON chip records and upsert them in batches.
///
/// Blank lines are ignored. Lines that do not parse, or chips the store
/// rejects, are logged and skipped.
pub fn import_records(db: &mut Database, reader: impl BufRead) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();
    let mut batch: Vec<(usize, ChipRecord)> = Vec::with_capacity(BATCH_SIZE);

    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line.with_context(|| format!("Failed to read line {line_no}"))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ChipRecord>(&line) {
            Ok(record) => batch.push((line_no, record)),
            Err(e) => {
                log::warn!("Line {}: not a chip record: {}", line_no, e);
                summary.skipped += 1;
            }
        }
        if batch.len() >= BATCH_SIZE {
            flush(db, &mut batch, &mut summary)?;
        }
    }
    flush(db, &mut batch, &mut summary)?;

    Ok(summary)
}

fn flush(
    db: &mut Database,
    batch: &mut Vec<(usize, ChipRecord)>,
    summary: &mut ImportSummary,
) -> Result<()> {
    if batch.is_empty() {
        return Ok(());
    }
    let records: Vec<ChipRecord> = batch.iter().map(|(_, r)| r.clone()).collect();
    match db.upsert_chips(&records) {
        Ok(written) => summary.written += written,
        Err(batch_err) => {
            // One bad chip rolls back the batch; retry one by one to keep the rest.
            log::warn!("Batch rejected ({}), retrying chip by chip", batch_err);
            for (line_no, record) in batch.iter() {
                match db.upsert_chip(record) {
                    Ok(()) => summary.written += 1,
                    Err(e) => {
                        log::warn!("Line {}: chip {} rejected: {}", line_no, record.chips_id, e);
                        summary.skipped += 1;
                    }
                }
            }
        }
    }
    batch.clear();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tilescout_core::vector::EMBEDDING_DIM;
    use tilescout_core::Coordinate;

    fn line(id: &str, dim: usize, lon: f64, lat: f64) -> String {
        serde_json::json!({
            "chips_id": id,
            "vec": vec![0.25_f32; dim],
            "polygon": [[lon, lat], [lon + 0.01, lat], [lon + 0.01, lat + 0.01], [lon, lat + 0.01], [lon, lat]],
        })
        .to_string()
    }

    #[test]
    fn test_import_skips_bad_lines_and_chips() {
        let mut db = Database::open_in_memory().unwrap();
        let input = [
            line("a", EMBEDDING_DIM, 0.0, 0.0),
            String::new(),
            "not json".to_string(),
            line("short", 3, 1.0, 1.0),
            line("b", EMBEDDING_DIM, 2.0, 2.0),
        ]
        .join("\n");

        let summary = import_records(&mut db, Cursor::new(input)).unwrap();

        assert_eq!(
            summary,
            ImportSummary {
                written: 2,
                skipped: 2
            }
        );
        assert_eq!(db.chip_count().unwrap(), 2);
        let tile = db
            .find_containing_tile(Coordinate::new(2.005, 2.005))
            .unwrap()
            .unwrap();
        assert_eq!(tile.id, "b");
    }

    #[test]
    fn test_run_import_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("chips.ndjson");
        let db_path = dir.path().join("embeddings.db");
        std::fs::write(
            &input,
            format!(
                "{}\n{}\n",
                line("a", EMBEDDING_DIM, 0.0, 0.0),
                line("a", EMBEDDING_DIM, 5.0, 5.0)
            ),
        )
        .unwrap();

        run_import(&input, &db_path).unwrap();

        let db = Database::open(&db_path).unwrap();
        // Re-imported id is updated in place.
        assert_eq!(db.chip_count().unwrap(), 1);
        let meta = db.chip_metadata("a").unwrap().unwrap();
        assert!((meta.coordinate.lon - 5.005).abs() < 1e-9);
    }
}
