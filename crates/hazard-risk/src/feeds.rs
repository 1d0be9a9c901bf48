//! Typed clients for the external hazard signal providers.
//!
//! Each fetch is a single bounded HTTP request whose wire shape stays
//! private to this module and is mapped into the crate's payload types.
//! Provider outages are expected operating conditions: callers degrade a
//! failed feed to an absent signal rather than aborting the assessment, so
//! every error here is recoverable by construction.

use std::time::Duration;

use chrono::{TimeZone, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::signals::{SeismicEvent, SkyCondition, WeatherObservation};

/// Angular vicinity for the quake feed filter, in degrees. The global
/// all-day feed is trimmed to events whose flat lat/lon offset from the
/// origin is under this before any severity math sees them.
pub const QUAKE_VICINITY_DEG: f64 = 30.0;

/// Feed client configuration.
#[derive(Debug, Clone)]
pub struct FeedsConfig {
    /// OpenWeatherMap API key.
    pub owm_api_key: String,
    /// Base URL for the OpenWeatherMap endpoints.
    pub owm_base_url: String,
    /// USGS all-day earthquake summary feed.
    pub quake_feed_url: String,
    /// Client-side request timeout in seconds.
    pub timeout_sec: u64,
}

impl FeedsConfig {
    pub fn new(owm_api_key: impl Into<String>) -> Self {
        Self {
            owm_api_key: owm_api_key.into(),
            owm_base_url: "https://api.openweathermap.org/data/2.5".to_string(),
            quake_feed_url:
                "https://earthquake.usgs.gov/earthquakes/feed/v1.0/summary/all_day.geojson"
                    .to_string(),
            timeout_sec: 10,
        }
    }
}

/// Feed failures. Callers are expected to log these and treat the affected
/// signal as absent.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("provider returned status {0}")]
    Status(u16),
    #[error("malformed provider response: {0}")]
    Malformed(String),
}

/// Clients for the weather, air quality and seismic providers.
pub struct HazardFeeds {
    config: FeedsConfig,
    client: reqwest::Client,
}

impl HazardFeeds {
    pub fn new(config: FeedsConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_sec))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Fetch current conditions at a coordinate. Units are left at the
    /// provider default (Kelvin); conversion happens in the normalizer.
    pub async fn fetch_weather(&self, lat: f64, lon: f64) -> Result<WeatherObservation, FeedError> {
        let url = format!(
            "{}/weather?lat={}&lon={}&appid={}",
            self.config.owm_base_url, lat, lon, self.config.owm_api_key
        );
        let data: OwmWeatherResponse = self.get_json(&url).await?;
        Ok(observation_from(data))
    }

    /// Fetch the provider's 1-5 air quality ordinal at a coordinate.
    /// Rescale with [`crate::signals::pollutant_index_from_ordinal`] before
    /// thresholding.
    pub async fn fetch_air_quality_ordinal(&self, lat: f64, lon: f64) -> Result<u8, FeedError> {
        let url = format!(
            "{}/air_pollution?lat={}&lon={}&appid={}",
            self.config.owm_base_url, lat, lon, self.config.owm_api_key
        );
        let data: OwmAirResponse = self.get_json(&url).await?;
        data.list
            .first()
            .map(|entry| entry.main.aqi)
            .ok_or_else(|| FeedError::Malformed("empty air quality list".to_string()))
    }

    /// Fetch the last day of global seismic events and keep those in the
    /// angular vicinity of the origin. Features missing a timestamp or a
    /// usable geometry are dropped individually.
    pub async fn fetch_quakes_near(
        &self,
        lat: f64,
        lon: f64,
    ) -> Result<Vec<SeismicEvent>, FeedError> {
        let data: QuakeFeedResponse = self.get_json(&self.config.quake_feed_url).await?;
        let total = data.features.len();

        let events = events_near(data.features, lat, lon);
        debug!(
            "quake feed: {} events total, {} within {} deg of ({}, {})",
            total,
            events.len(),
            QUAKE_VICINITY_DEG,
            lat,
            lon
        );
        Ok(events)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, FeedError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FeedError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FeedError::Status(response.status().as_u16()));
        }

        response
            .json()
            .await
            .map_err(|e| FeedError::Malformed(e.to_string()))
    }
}

/// OpenWeatherMap current-weather wire shape, reduced to the fields the
/// scoring reads. Everything is optional so sparse responses still map.
#[derive(Debug, Deserialize)]
struct OwmWeatherResponse {
    main: Option<OwmMain>,
    wind: Option<OwmWind>,
    #[serde(default)]
    weather: Vec<OwmConditionTag>,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: Option<f64>,
    humidity: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwmWind {
    speed: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwmConditionTag {
    main: Option<String>,
}

fn observation_from(data: OwmWeatherResponse) -> WeatherObservation {
    WeatherObservation {
        temperature_k: data.main.as_ref().and_then(|m| m.temp),
        humidity_pct: data.main.as_ref().and_then(|m| m.humidity),
        wind_speed_ms: data.wind.as_ref().and_then(|w| w.speed),
        condition: data
            .weather
            .first()
            .and_then(|tag| tag.main.as_deref())
            .map(SkyCondition::from_label),
    }
}

#[derive(Debug, Deserialize)]
struct OwmAirResponse {
    #[serde(default)]
    list: Vec<OwmAirEntry>,
}

#[derive(Debug, Deserialize)]
struct OwmAirEntry {
    main: OwmAirMain,
}

#[derive(Debug, Deserialize)]
struct OwmAirMain {
    aqi: u8,
}

/// USGS GeoJSON summary feed, reduced to the fields the scoring reads.
#[derive(Debug, Deserialize)]
struct QuakeFeedResponse {
    #[serde(default)]
    features: Vec<QuakeFeature>,
}

#[derive(Debug, Deserialize)]
struct QuakeFeature {
    properties: Option<QuakeProperties>,
    geometry: Option<QuakeGeometry>,
}

#[derive(Debug, Deserialize)]
struct QuakeProperties {
    mag: Option<f64>,
    /// Milliseconds since the epoch.
    time: Option<i64>,
    place: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QuakeGeometry {
    /// `[lon, lat, depth_km]`.
    #[serde(default)]
    coordinates: Vec<f64>,
}

fn events_near(features: Vec<QuakeFeature>, lat: f64, lon: f64) -> Vec<SeismicEvent> {
    features
        .into_iter()
        .filter_map(|feature| {
            let props = feature.properties?;
            let coords = feature.geometry?.coordinates;
            if coords.len() < 2 {
                return None;
            }
            let time = Utc.timestamp_millis_opt(props.time?).single()?;
            Some(SeismicEvent {
                magnitude: props.mag,
                time,
                latitude: coords[1],
                longitude: coords[0],
                place: props.place,
            })
        })
        .filter(|event| roughly_within(event.latitude, event.longitude, lat, lon))
        .collect()
}

/// Cheap flat angular distance check used to pre-filter the global feed.
/// Not a great-circle measure and not meant to be one.
fn roughly_within(event_lat: f64, event_lon: f64, lat: f64, lon: f64) -> bool {
    let dlat = event_lat - lat;
    let dlon = event_lon - lon;
    (dlat * dlat + dlon * dlon).sqrt() < QUAKE_VICINITY_DEG
}

#[cfg(test)]
mod tests {
    use super::*;

    const WEATHER_FIXTURE: &str = r#"{
        "coord": {"lon": 139.69, "lat": 35.69},
        "weather": [{"id": 501, "main": "Rain", "description": "moderate rain"}],
        "main": {"temp": 298.48, "feels_like": 298.74, "pressure": 1013, "humidity": 64},
        "wind": {"speed": 3.62, "deg": 349},
        "name": "Tokyo"
    }"#;

    const AIR_FIXTURE: &str = r#"{
        "coord": {"lon": 139.69, "lat": 35.69},
        "list": [{"main": {"aqi": 4}, "components": {"co": 201.94, "no2": 0.77}}]
    }"#;

    const QUAKE_FIXTURE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"mag": 5.2, "place": "near Tokyo", "time": 1748779200000},
                "geometry": {"type": "Point", "coordinates": [139.5, 35.4, 10.0]}
            },
            {
                "type": "Feature",
                "properties": {"mag": 6.8, "place": "far away", "time": 1748779200000},
                "geometry": {"type": "Point", "coordinates": [-70.0, -33.0, 30.0]}
            },
            {
                "type": "Feature",
                "properties": {"mag": 4.9, "place": "no clock", "time": null},
                "geometry": {"type": "Point", "coordinates": [139.0, 35.0, 5.0]}
            },
            {
                "type": "Feature",
                "properties": {"mag": 5.0, "place": "no geometry", "time": 1748779200000},
                "geometry": null
            }
        ]
    }"#;

    #[test]
    fn test_weather_wire_mapping() {
        let data: OwmWeatherResponse = serde_json::from_str(WEATHER_FIXTURE).unwrap();
        let obs = observation_from(data);
        assert_eq!(obs.temperature_k, Some(298.48));
        assert_eq!(obs.humidity_pct, Some(64.0));
        assert_eq!(obs.wind_speed_ms, Some(3.62));
        assert_eq!(obs.condition, Some(SkyCondition::Rain));
    }

    #[test]
    fn test_weather_wire_mapping_tolerates_sparse_response() {
        let data: OwmWeatherResponse = serde_json::from_str(r#"{"name": "Nowhere"}"#).unwrap();
        let obs = observation_from(data);
        assert_eq!(obs.temperature_k, None);
        assert_eq!(obs.humidity_pct, None);
        assert_eq!(obs.wind_speed_ms, None);
        assert_eq!(obs.condition, None);
    }

    #[test]
    fn test_air_wire_shape() {
        let data: OwmAirResponse = serde_json::from_str(AIR_FIXTURE).unwrap();
        assert_eq!(data.list[0].main.aqi, 4);
    }

    #[test]
    fn test_quake_mapping_filters_vicinity_and_drops_partial_features() {
        let data: QuakeFeedResponse = serde_json::from_str(QUAKE_FIXTURE).unwrap();
        assert_eq!(data.features.len(), 4);

        let events = events_near(data.features, 35.69, 139.69);
        // The distant event, the timestamp-less event and the geometry-less
        // event are all gone; only the nearby dated one survives.
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].magnitude, Some(5.2));
        assert_eq!(events[0].place.as_deref(), Some("near Tokyo"));
        assert_eq!(events[0].latitude, 35.4);
        assert_eq!(events[0].longitude, 139.5);
    }

    #[test]
    fn test_vicinity_check_is_flat_angular_distance() {
        assert!(roughly_within(35.0, 139.0, 35.69, 139.69));
        assert!(roughly_within(10.0, 139.0, 35.69, 139.69));
        assert!(!roughly_within(-33.0, -70.0, 35.69, 139.69));
        // 30 degrees away on one axis only is exactly on the open boundary.
        assert!(!roughly_within(65.0, 139.0, 35.0, 139.0));
    }

    #[test]
    fn test_feed_error_messages() {
        assert_eq!(
            FeedError::Status(503).to_string(),
            "provider returned status 503"
        );
        assert!(FeedError::Malformed("empty air quality list".to_string())
            .to_string()
            .contains("empty air quality list"));
    }
}
