/// A schema migration.
#[derive(Debug)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

const MIGRATION_001: &str = r#"
-- Embedding chips: one row per imagery tile.
-- vec is 1024 little-endian f32 values; polygon is a JSON ring of [lon, lat].
CREATE TABLE IF NOT EXISTS embeddings (
    chips_id TEXT NOT NULL UNIQUE,
    vec BLOB NOT NULL,
    polygon TEXT NOT NULL,
    min_lon REAL NOT NULL,
    min_lat REAL NOT NULL,
    max_lon REAL NOT NULL,
    max_lat REAL NOT NULL,
    centroid_lon REAL NOT NULL,
    centroid_lat REAL NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_embeddings_bbox
    ON embeddings(min_lon, max_lon, min_lat, max_lat);
"#;

pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "embeddings",
    sql: MIGRATION_001,
}];
