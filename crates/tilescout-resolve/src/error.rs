//! Error types for the resolution pipeline.

use thiserror::Error;
use tilescout_core::vector::{VectorDefect, EMBEDDING_DIM};

/// Errors surfaced by the public pipeline operations.
///
/// The type is `Clone` so one failed computation can be delivered to every
/// caller waiting on the same cache key.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    /// No geocode result, or no tile contains the point.
    #[error("not found: no {entity} for {key}")]
    NotFound { entity: &'static str, key: String },

    /// A seed vector has the wrong dimension or no magnitude.
    #[error("invalid vector: {reason}")]
    InvalidVector { reason: String },

    /// The datastore or the geocoder failed or timed out.
    #[error("upstream error from {source_name}: {message}")]
    Upstream {
        source_name: String,
        message: String,
    },
}

impl ResolveError {
    pub(crate) fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }

    pub(crate) fn upstream(source_name: &str, message: impl Into<String>) -> Self {
        Self::Upstream {
            source_name: source_name.to_string(),
            message: message.into(),
        }
    }

    /// Returns `true` when the request simply has no answer.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` when the caller supplied unusable input.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidVector { .. })
    }
}

impl From<tilescout_core::Error> for ResolveError {
    fn from(err: tilescout_core::Error) -> Self {
        Self::upstream("embedding store", err.to_string())
    }
}

impl From<VectorDefect> for ResolveError {
    fn from(defect: VectorDefect) -> Self {
        let reason = match defect {
            VectorDefect::WrongDimension(len) => {
                format!("expected {EMBEDDING_DIM} components, got {len}")
            }
            VectorDefect::ZeroMagnitude => "vector has zero magnitude".to_string(),
        };
        Self::InvalidVector { reason }
    }
}

/// Convenience alias for pipeline results.
pub type ResolveResult<T> = std::result::Result<T, ResolveError>;
