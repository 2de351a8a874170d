//! Three-tier text resolution: exact phrase, fuzzy phrase, live geocoder.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tilescout_core::{Poi, ResolutionMethod};

use super::fallback::FallbackTable;
use super::fuzzy::{best_match, BlendedSimilarity, StringSimilarity, FUZZY_THRESHOLD};
use super::nominatim::GeocodeService;
use crate::error::{ResolveError, ResolveResult};

/// Appended to every live query to bias the geocoder toward the covered area.
pub const LOCALITY_HINT: &str = " in San Francisco, California, USA";

/// Trim surrounding whitespace and lowercase.
pub fn normalize_query(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Resolves free text to a [`Poi`].
///
/// The fallback table is always consulted first, so well-known phrases
/// never touch the network. Only when neither an exact nor a fuzzy
/// phrase matches is the live geocoder called, exactly once.
pub struct GeocodeResolver {
    table: FallbackTable,
    metric: Box<dyn StringSimilarity>,
    threshold: f64,
    live: Arc<dyn GeocodeService>,
}

impl fmt::Debug for GeocodeResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeocodeResolver")
            .field("table", &self.table)
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}

impl GeocodeResolver {
    /// Resolver with the built-in phrase table and blended similarity.
    pub fn new(live: Arc<dyn GeocodeService>) -> Self {
        Self {
            table: FallbackTable::default(),
            metric: Box::new(BlendedSimilarity),
            threshold: FUZZY_THRESHOLD,
            live,
        }
    }

    #[must_use]
    pub fn with_table(mut self, table: FallbackTable) -> Self {
        self.table = table;
        self
    }

    #[must_use]
    pub fn with_metric(mut self, metric: impl StringSimilarity + 'static, threshold: f64) -> Self {
        self.metric = Box::new(metric);
        self.threshold = threshold;
        self
    }

    /// Resolve `text` to a point of interest.
    ///
    /// Table lookups use the normalized text. The live geocoder and the
    /// exact-hit name see the caller's text, trimmed but otherwise as given.
    ///
    /// # Errors
    /// Returns [`ResolveError::NotFound`] when no tier produces a
    /// coordinate. Live geocoder failures are logged and reported as
    /// not-found too.
    pub async fn resolve(&self, text: &str) -> ResolveResult<Poi> {
        let raw = text.trim();
        let query = normalize_query(raw);
        if query.is_empty() {
            return Err(ResolveError::not_found("geocode result", text));
        }

        if let Some(coordinate) = self.table.get(&query) {
            log::debug!("Exact fallback hit for {:?}", query);
            return Ok(Poi::new(
                format!("Fallback: {raw}"),
                coordinate,
                ResolutionMethod::Exact,
            ));
        }

        if let Some(m) = best_match(&self.table, &query, self.metric.as_ref(), self.threshold) {
            log::info!(
                "Fuzzy fallback {:?} -> {:?} (score {:.2})",
                query,
                m.phrase,
                m.score
            );
            return Ok(Poi::new(
                format!("Fuzzy fallback: {}", m.phrase),
                m.coordinate,
                ResolutionMethod::Fuzzy,
            ));
        }

        let started = Instant::now();
        let hinted = format!("{raw}{LOCALITY_HINT}");
        match self.live.search(&hinted).await {
            Ok(hits) => match hits.into_iter().next() {
                Some(hit) if hit.coordinate.is_valid() => Ok(Poi::new(
                    hit.display_name,
                    hit.coordinate,
                    ResolutionMethod::Live,
                )),
                Some(hit) => {
                    log::warn!(
                        "Geocoder returned out-of-range coordinate {} for {:?}",
                        hit.coordinate,
                        raw
                    );
                    Err(ResolveError::not_found("geocode result", raw))
                }
                None => {
                    log::info!(
                        "Geocoder has no result for {:?} ({:.3}s)",
                        raw,
                        started.elapsed().as_secs_f64()
                    );
                    Err(ResolveError::not_found("geocode result", raw))
                }
            },
            Err(e) => {
                log::warn!(
                    "Geocoder failed for {:?} after {:.3}s: {}",
                    raw,
                    started.elapsed().as_secs_f64(),
                    e
                );
                Err(ResolveError::not_found("geocode result", raw))
            }
        }
    }
}
