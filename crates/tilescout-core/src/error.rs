use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("chip {chips_id}: embedding has {len} components, expected {expected}")]
    EmbeddingDimension {
        chips_id: String,
        len: usize,
        expected: usize,
    },

    #[error("chip {chips_id}: invalid footprint: {reason}")]
    InvalidGeometry { chips_id: String, reason: String },

    #[error("invalid data: {0}")]
    InvalidData(String),
}

pub type Result<T> = std::result::Result<T, Error>;
