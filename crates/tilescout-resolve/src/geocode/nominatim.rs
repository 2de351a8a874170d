//! Live geocoding against OpenStreetMap's Nominatim service.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tilescout_core::Coordinate;

use crate::error::{ResolveError, ResolveResult};

/// Public Nominatim search endpoint.
pub const NOMINATIM_SEARCH_URL: &str = "https://nominatim.openstreetmap.org/search";

const SOURCE_NAME: &str = "Nominatim";

/// One geocoder answer.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeHit {
    pub display_name: String,
    pub coordinate: Coordinate,
}

/// A live text-to-coordinate service.
///
/// Implementations return their hits best first. Transport and parse
/// failures are reported as [`ResolveError::Upstream`]; the resolver
/// decides what they mean to the caller.
#[async_trait]
pub trait GeocodeService: Send + Sync {
    async fn search(&self, query: &str) -> ResolveResult<Vec<GeocodeHit>>;
}

// Nominatim returns coordinates as JSON strings.
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    #[serde(default)]
    display_name: String,
    lat: String,
    lon: String,
}

impl NominatimPlace {
    fn into_hit(self) -> ResolveResult<GeocodeHit> {
        let parse = |field: &str, raw: &str| {
            raw.trim().parse::<f64>().map_err(|e| ResolveError::Upstream {
                source_name: SOURCE_NAME.to_string(),
                message: format!("malformed {field} {raw:?}: {e}"),
            })
        };
        let lat = parse("lat", &self.lat)?;
        let lon = parse("lon", &self.lon)?;
        Ok(GeocodeHit {
            display_name: self.display_name,
            coordinate: Coordinate::new(lon, lat),
        })
    }
}

/// Nominatim API client.
///
/// Asks for a single result per query. The request timeout is fixed at
/// construction; a timeout surfaces as an upstream error like any other
/// transport failure.
#[derive(Debug, Clone)]
pub struct NominatimClient {
    http: Client,
    base_url: String,
}

impl NominatimClient {
    /// Create a client for `base_url` with the given request timeout.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent("tilescout/0.1.0 (https://github.com/tilescout/tilescout)")
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl GeocodeService for NominatimClient {
    async fn search(&self, query: &str) -> ResolveResult<Vec<GeocodeHit>> {
        let started = Instant::now();

        let response = self
            .http
            .get(&self.base_url)
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| ResolveError::Upstream {
                source_name: SOURCE_NAME.to_string(),
                message: if e.is_timeout() {
                    format!("request timed out: {e}")
                } else {
                    e.to_string()
                },
            })?;

        let places: Vec<NominatimPlace> =
            response.json().await.map_err(|e| ResolveError::Upstream {
                source_name: SOURCE_NAME.to_string(),
                message: format!("unreadable response: {e}"),
            })?;

        log::info!(
            "Nominatim answered {:?} with {} result(s) in {:.3}s",
            query,
            places.len(),
            started.elapsed().as_secs_f64()
        );

        places.into_iter().map(NominatimPlace::into_hit).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = NominatimClient::new(NOMINATIM_SEARCH_URL, Duration::from_secs(10));
        assert!(client.is_ok());
        assert_eq!(client.unwrap().base_url(), NOMINATIM_SEARCH_URL);
    }

    #[test]
    fn test_place_parsing() {
        let json = r#"[{"display_name": "Golden Gate Bridge, San Francisco", "lat": "37.8199", "lon": "-122.4783", "importance": 0.8}]"#;
        let places: Vec<NominatimPlace> = serde_json::from_str(json).unwrap();
        let hit = places.into_iter().next().unwrap().into_hit().unwrap();

        assert_eq!(hit.display_name, "Golden Gate Bridge, San Francisco");
        assert_eq!(hit.coordinate, Coordinate::new(-122.4783, 37.8199));
    }

    #[test]
    fn test_malformed_coordinate_is_upstream_error() {
        let place = NominatimPlace {
            display_name: "Nowhere".to_string(),
            lat: "north".to_string(),
            lon: "0".to_string(),
        };
        let err = place.into_hit().unwrap_err();
        assert!(matches!(err, ResolveError::Upstream { .. }));
        assert!(err.to_string().contains("lat"));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_upstream_error() {
        // Port 9 on localhost (discard) is closed on CI machines.
        let client =
            NominatimClient::new("http://127.0.0.1:9/search", Duration::from_millis(500)).unwrap();
        let err = client.search("anything").await.unwrap_err();
        assert!(matches!(err, ResolveError::Upstream { .. }));
    }
}
