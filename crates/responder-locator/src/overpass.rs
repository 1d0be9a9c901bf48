//! Overpass API client for responder facility queries.
//!
//! Builds one Overpass QL query per lookup covering node and way elements
//! for every requested amenity, posts it form-encoded, and maps the
//! elements into [`PoiFeature`]s. Way elements rank by the `center`
//! coordinate the `out center;` output mode attaches.
//!
//! Responses are cached per (rounded origin, radius, kind set) for a short
//! TTL so repeated lookups around the same spot do not hammer the public
//! interpreter.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::{Coordinate, FacilityKind, Footprint, PoiFeature, PoiQuery, ProviderError};

/// Server-side evaluation budget baked into each query, in seconds. The
/// budget caps how long the interpreter keeps evaluating a query whose
/// client has already given up. It sits above the client timeout so the
/// server never aborts a request the client is still waiting on.
const QUERY_TIMEOUT_SEC: u32 = 25;

/// Overpass client configuration.
#[derive(Debug, Clone)]
pub struct OverpassConfig {
    /// Interpreter endpoint.
    pub endpoint: String,
    /// Client-side request timeout in seconds.
    pub timeout_sec: u64,
    /// Cache TTL in seconds; 0 disables caching.
    pub cache_ttl_sec: u64,
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://overpass-api.de/api/interpreter".to_string(),
            timeout_sec: 10,
            cache_ttl_sec: 300,
        }
    }
}

struct CacheEntry {
    features: Vec<PoiFeature>,
    expires_at: Instant,
}

/// Overpass-backed [`PoiQuery`] implementation with a TTL response cache.
pub struct OverpassClient {
    config: OverpassConfig,
    client: reqwest::Client,
    cache: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl OverpassClient {
    pub fn new(config: OverpassConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_sec))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            config,
            client,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Cache key: origin rounded to three decimals (about 110 m) plus the
    /// radius and kind set, so near-identical origins share an entry while
    /// different search parameters never alias.
    fn cache_key(origin: Coordinate, radius_m: u32, kinds: &[FacilityKind]) -> String {
        let tags: Vec<&str> = kinds.iter().map(FacilityKind::amenity_tag).collect();
        format!(
            "{:.3},{:.3}:{}:{}",
            origin.latitude,
            origin.longitude,
            radius_m,
            tags.join("+")
        )
    }

    /// Build the Overpass QL query: a node clause and a way clause per
    /// facility kind, unioned, with `out center;` so ways carry a centroid.
    fn build_query(origin: Coordinate, radius_m: u32, kinds: &[FacilityKind]) -> String {
        let mut clauses = String::new();
        for kind in kinds {
            for shape in ["node", "way"] {
                clauses.push_str(&format!(
                    "  {}[\"amenity\"=\"{}\"](around:{},{},{});\n",
                    shape,
                    kind.amenity_tag(),
                    radius_m,
                    origin.latitude,
                    origin.longitude
                ));
            }
        }
        format!(
            "[out:json][timeout:{}];\n(\n{});\nout center;",
            QUERY_TIMEOUT_SEC, clauses
        )
    }

    async fn fetch(
        &self,
        origin: Coordinate,
        radius_m: u32,
        kinds: &[FacilityKind],
    ) -> Result<Vec<PoiFeature>, ProviderError> {
        let query = Self::build_query(origin, radius_m, kinds);
        let response = self
            .client
            .post(&self.config.endpoint)
            .form(&[("data", query.as_str())])
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status().as_u16()));
        }

        let data: OverpassResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        Ok(data
            .elements
            .into_iter()
            .filter_map(feature_from_element)
            .collect())
    }
}

#[async_trait]
impl PoiQuery for OverpassClient {
    async fn query(
        &self,
        origin: Coordinate,
        radius_m: u32,
        kinds: &[FacilityKind],
    ) -> Result<Vec<PoiFeature>, ProviderError> {
        let key = Self::cache_key(origin, radius_m, kinds);

        if self.config.cache_ttl_sec > 0 {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.get(&key) {
                if entry.expires_at > Instant::now() {
                    debug!("overpass cache hit: {}", key);
                    return Ok(entry.features.clone());
                }
            }
        }

        let features = self.fetch(origin, radius_m, kinds).await?;
        debug!("overpass returned {} usable features", features.len());

        if self.config.cache_ttl_sec > 0 {
            let mut cache = self.cache.write().await;
            cache.insert(
                key,
                CacheEntry {
                    features: features.clone(),
                    expires_at: Instant::now() + Duration::from_secs(self.config.cache_ttl_sec),
                },
            );
        }

        Ok(features)
    }
}

/// Overpass wire shape, reduced to what the ranking reads. Tags stay a
/// plain map because OSM tagging is open-ended.
#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    lat: Option<f64>,
    lon: Option<f64>,
    center: Option<OverpassCenter>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct OverpassCenter {
    lat: f64,
    lon: f64,
}

/// Map one element into a candidate feature. Elements without a recognized
/// amenity tag or without any usable position are dropped individually;
/// one junk element never fails the lookup.
fn feature_from_element(element: OverpassElement) -> Option<PoiFeature> {
    let kind = element
        .tags
        .get("amenity")
        .and_then(|tag| FacilityKind::from_amenity_tag(tag))?;

    let footprint = match (element.center, element.lat, element.lon) {
        (Some(center), _, _) => Footprint::Areal {
            centroid: Coordinate::new(center.lat, center.lon),
        },
        (None, Some(lat), Some(lon)) => Footprint::Point(Coordinate::new(lat, lon)),
        _ => return None,
    };

    Some(PoiFeature {
        name: element.tags.get("name").cloned(),
        kind,
        footprint,
    })
}
