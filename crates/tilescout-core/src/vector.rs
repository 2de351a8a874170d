//! Embedding vector helpers.
//!
//! Embeddings are 1024 `f32` components. They are stored as little-endian
//! blobs and compared by cosine similarity.

/// Dimension of every embedding in the collection.
pub const EMBEDDING_DIM: usize = 1024;

/// Why a vector was refused before a similarity query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorDefect {
    /// Length differs from [`EMBEDDING_DIM`].
    WrongDimension(usize),
    /// L2 norm is zero (or not finite).
    ZeroMagnitude,
}

/// Euclidean norm, accumulated in `f64`.
pub fn l2_norm(v: &[f32]) -> f64 {
    v.iter()
        .map(|&x| f64::from(x) * f64::from(x))
        .sum::<f64>()
        .sqrt()
}

/// Validate dimension and magnitude, then return the unit-length copy.
///
/// # Errors
/// Returns a [`VectorDefect`] when the vector cannot be used as a seed.
#[allow(clippy::cast_possible_truncation)]
pub fn normalize(v: &[f32]) -> Result<Vec<f32>, VectorDefect> {
    if v.len() != EMBEDDING_DIM {
        return Err(VectorDefect::WrongDimension(v.len()));
    }
    let norm = l2_norm(v);
    if norm == 0.0 || !norm.is_finite() {
        return Err(VectorDefect::ZeroMagnitude);
    }
    Ok(v.iter().map(|&x| (f64::from(x) / norm) as f32).collect())
}

/// Cosine similarity. Returns 0.0 when either side has no magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let dot: f64 = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| f64::from(x) * f64::from(y))
        .sum();
    let denom = l2_norm(a) * l2_norm(b);
    if denom == 0.0 {
        0.0
    } else {
        (dot / denom).clamp(-1.0, 1.0)
    }
}

/// Pack an embedding into a little-endian byte blob.
pub fn to_blob(v: &[f32]) -> Vec<u8> {
    v.iter().flat_map(|x| x.to_le_bytes()).collect()
}

/// Unpack a little-endian byte blob. Returns `None` on a ragged length.
pub fn from_blob(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    )
}
