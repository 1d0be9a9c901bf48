//! Emergency Responder Location
//!
//! Resolves, for an arbitrary coordinate, the nearest physical emergency
//! responders (hospitals, police stations, fire stations) ranked by
//! great-circle distance. Proximity search is delegated per request to an
//! external geographic data provider behind the [`PoiQuery`] seam; nothing
//! is indexed or persisted locally, so results are as fresh as the
//! provider.
//!
//! Callers see exactly one failure mode, [`LocatorUnavailable`]: a ranking
//! is either complete or not produced at all.

pub mod distance;
pub mod locator;
pub mod overpass;

pub use locator::{rank_features, ResponderLocator};
pub use overpass::{OverpassClient, OverpassConfig};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default search radius around the origin, in meters.
pub const DEFAULT_RADIUS_M: u32 = 5_000;

/// Upper bound on the ranked result set.
pub const MAX_RESPONDERS: usize = 10;

/// A WGS84 point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Range check for a caller-supplied latitude.
pub fn is_valid_latitude(lat: f64) -> bool {
    lat.is_finite() && (-90.0..=90.0).contains(&lat)
}

/// Range check for a caller-supplied longitude.
pub fn is_valid_longitude(lon: f64) -> bool {
    lon.is_finite() && (-180.0..=180.0).contains(&lon)
}

/// Kinds of emergency facility the locator understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacilityKind {
    Hospital,
    Police,
    FireStation,
}

impl FacilityKind {
    /// All kinds, in the order they are queried.
    pub const ALL: [FacilityKind; 3] = [Self::Hospital, Self::Police, Self::FireStation];

    /// The provider-side amenity tag for this kind.
    pub fn amenity_tag(&self) -> &'static str {
        match self {
            Self::Hospital => "hospital",
            Self::Police => "police",
            Self::FireStation => "fire_station",
        }
    }

    /// Classify a provider amenity tag. Unknown tags are not responder
    /// facilities and their features are dropped.
    pub fn from_amenity_tag(tag: &str) -> Option<Self> {
        match tag {
            "hospital" => Some(Self::Hospital),
            "police" => Some(Self::Police),
            "fire_station" => Some(Self::FireStation),
            _ => None,
        }
    }
}

/// How the provider located a feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Footprint {
    /// A point feature.
    Point(Coordinate),
    /// An areal feature, stood in for by the provider's centroid.
    Areal { centroid: Coordinate },
}

impl Footprint {
    /// The representative point used for distance computation.
    pub fn representative_point(&self) -> Coordinate {
        match self {
            Self::Point(at) => *at,
            Self::Areal { centroid } => *centroid,
        }
    }
}

/// One candidate facility as returned by the geographic provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoiFeature {
    /// Display name, when the provider carries one.
    pub name: Option<String>,
    pub kind: FacilityKind,
    pub footprint: Footprint,
}

/// One entry in a ranked responder result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResponder {
    pub name: String,
    pub kind: FacilityKind,
    pub location: Coordinate,
    /// Great-circle distance from the query origin in kilometers, rounded
    /// to two decimals.
    pub distance_km: f64,
}

/// Ways the outbound provider call can fail. Collapsed into
/// [`LocatorUnavailable`] before reaching callers; the variant detail is
/// for logs.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Connect or send failure, including the client-side timeout.
    #[error("transport: {0}")]
    Transport(String),
    #[error("provider returned status {0}")]
    Status(u16),
    #[error("malformed provider response: {0}")]
    Malformed(String),
}

/// The single failure callers see: the lookup is unavailable as a whole.
/// Partially fetched or partially parsed candidate lists never surface.
/// The wrapped cause stays private; `source()` exposes it for logging.
#[derive(Debug, Error)]
#[error("emergency services lookup temporarily unavailable")]
pub struct LocatorUnavailable(#[from] ProviderError);

pub type Result<T> = std::result::Result<T, LocatorUnavailable>;

/// Injectable geographic query capability.
///
/// One bounded call per invocation: implementations enforce their own
/// transport timeout and do not retry. Dropping the returned future
/// abandons the outbound request.
#[async_trait]
pub trait PoiQuery: Send + Sync {
    /// Query amenity-tagged features of the given kinds within `radius_m`
    /// meters of `origin`.
    async fn query(
        &self,
        origin: Coordinate,
        radius_m: u32,
        kinds: &[FacilityKind],
    ) -> std::result::Result<Vec<PoiFeature>, ProviderError>;
}
