//! Free-text to coordinate resolution.
//!
//! Resolution is a three-tier chain: exact fallback phrase, fuzzy fallback
//! phrase, then one live geocoder call. See [`GeocodeResolver`].

pub mod fallback;
pub mod fuzzy;
pub mod nominatim;
pub mod resolver;

pub use fallback::FallbackTable;
pub use fuzzy::{BlendedSimilarity, StringSimilarity, FUZZY_THRESHOLD};
pub use nominatim::{GeocodeHit, GeocodeService, NominatimClient};
pub use resolver::{normalize_query, GeocodeResolver, LOCALITY_HINT};
