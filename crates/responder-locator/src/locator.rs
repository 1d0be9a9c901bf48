//! Ranked nearest-responder lookup.

use tracing::debug;

use crate::distance::haversine_km;
use crate::{
    Coordinate, FacilityKind, LocatorUnavailable, PoiFeature, PoiQuery, RankedResponder, Result,
    DEFAULT_RADIUS_M, MAX_RESPONDERS,
};

/// Nearest-responder lookup over an injectable geographic provider.
///
/// Stateless per call: every invocation issues one bounded provider query
/// and derives a fresh ranking from whatever it returns. Concurrent calls
/// share nothing but the provider itself.
pub struct ResponderLocator<P> {
    provider: P,
}

impl<P: PoiQuery> ResponderLocator<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Up to [`MAX_RESPONDERS`] facilities within the default radius of the
    /// origin, nearest first.
    pub async fn nearest(&self, origin: Coordinate) -> Result<Vec<RankedResponder>> {
        self.nearest_within(origin, DEFAULT_RADIUS_M).await
    }

    /// Up to [`MAX_RESPONDERS`] facilities within `radius_m` of the origin,
    /// nearest first. Coordinate ranges are a caller precondition.
    ///
    /// Any provider failure surfaces as the single opaque
    /// [`LocatorUnavailable`]; a ranking is never built from partial data.
    /// An empty result is not a failure, just a sparse area.
    pub async fn nearest_within(
        &self,
        origin: Coordinate,
        radius_m: u32,
    ) -> Result<Vec<RankedResponder>> {
        let features = self
            .provider
            .query(origin, radius_m, &FacilityKind::ALL)
            .await
            .map_err(LocatorUnavailable)?;

        debug!(
            "{} candidate features within {} m of ({:.4}, {:.4})",
            features.len(),
            radius_m,
            origin.latitude,
            origin.longitude
        );

        Ok(rank_features(origin, features))
    }
}

/// Rank candidate features by great-circle distance from the origin.
///
/// Areal features rank at their centroid. Distances are rounded to two
/// decimals before the ascending sort, so candidates that round to the
/// same distance keep their provider order; the list is then capped at
/// [`MAX_RESPONDERS`]. Nameless facilities get an "Unnamed <amenity>"
/// label rather than being dropped.
pub fn rank_features(origin: Coordinate, features: Vec<PoiFeature>) -> Vec<RankedResponder> {
    let mut ranked: Vec<RankedResponder> = features
        .into_iter()
        .map(|feature| {
            let location = feature.footprint.representative_point();
            let distance_km = round2(haversine_km(origin, location));
            let name = feature
                .name
                .unwrap_or_else(|| format!("Unnamed {}", feature.kind.amenity_tag()));
            RankedResponder {
                name,
                kind: feature.kind,
                location,
                distance_km,
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        a.distance_km
            .partial_cmp(&b.distance_km)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(MAX_RESPONDERS);
    ranked
}

/// Round to two decimals, the resolution distances are reported at.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
