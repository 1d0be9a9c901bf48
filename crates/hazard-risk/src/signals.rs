//! Signal payload types and severity normalization.
//!
//! Each `*_severity` function maps one raw provider payload onto the shared
//! 0-10 scale. All of them are pure and total: missing sub-fields fall back
//! to neutral defaults instead of failing, and a wholly absent payload
//! scores 0 at the aggregation layer.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Fallback when the provider omits temperature, in Celsius.
pub const DEFAULT_TEMPERATURE_C: f64 = 20.0;

/// Fallback when the provider omits humidity, in percent. Deliberately not
/// zero: 0% humidity would be an extreme reading, 50% is unremarkable.
pub const DEFAULT_HUMIDITY_PCT: f64 = 50.0;

/// Fallback when the provider omits wind speed, in m/s.
pub const DEFAULT_WIND_MS: f64 = 0.0;

/// Offset between Kelvin and Celsius.
pub const KELVIN_OFFSET: f64 = 273.15;

/// Stretch factor from the provider's 1-5 air quality ordinal onto the
/// pollutant index scale the thresholds are written against.
pub const AQI_ORDINAL_SCALE: f64 = 50.0;

/// Events below this magnitude never contribute to seismic severity.
pub const SEISMIC_MIN_MAGNITUDE: f64 = 4.5;

/// Only events younger than this contribute.
pub const SEISMIC_WINDOW_HOURS: i64 = 24;

/// Dampening applied to the summed per-event contributions so a single
/// moderate event cannot saturate the scale on its own.
pub const SEISMIC_DAMPENING: f64 = 0.8;

/// Coarse sky condition classes the weather scoring distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkyCondition {
    Thunderstorm,
    Rain,
    Other,
}

impl SkyCondition {
    /// Map a provider condition label. Anything that is not a thunderstorm
    /// or rain ("Clear", "Clouds", "Snow", ...) is scored as `Other`.
    pub fn from_label(label: &str) -> Self {
        match label {
            "Thunderstorm" => Self::Thunderstorm,
            "Rain" => Self::Rain,
            _ => Self::Other,
        }
    }
}

/// One current-conditions sample from the weather provider.
///
/// Temperature arrives in absolute units (Kelvin) and is converted before
/// thresholding. Every field is optional so a sparse provider response
/// still scores; missing values take the neutral defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    /// Absolute temperature in Kelvin.
    pub temperature_k: Option<f64>,
    /// Relative humidity, 0-100.
    pub humidity_pct: Option<f64>,
    /// Wind speed in m/s.
    pub wind_speed_ms: Option<f64>,
    /// Condition class derived from the provider's label.
    pub condition: Option<SkyCondition>,
}

/// One event from the seismic feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeismicEvent {
    /// Magnitude; the feed occasionally omits it, which counts as 0.
    pub magnitude: Option<f64>,
    /// Event origin time.
    pub time: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    /// Human-readable locality, e.g. "63 km SW of Ofunato, Japan".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place: Option<String>,
}

/// Pre-computed risk estimate from the news analysis collaborator.
///
/// Only the clamped score feeds the aggregate; the event list is opaque to
/// the scoring and surfaces in display output as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsRisk {
    pub score: f64,
    #[serde(default)]
    pub events: Vec<String>,
}

/// Weather severity: additive contributions from temperature extremity,
/// humidity, wind and sky condition.
///
/// Deliberately not clamped here. A worst-case combination sums past 10 raw;
/// the weighted aggregation is what keeps the final score on the scale.
pub fn weather_severity(obs: &WeatherObservation) -> f64 {
    let temp_c = obs
        .temperature_k
        .map(|k| k - KELVIN_OFFSET)
        .unwrap_or(DEFAULT_TEMPERATURE_C);
    let humidity = obs.humidity_pct.unwrap_or(DEFAULT_HUMIDITY_PCT);
    let wind = obs.wind_speed_ms.unwrap_or(DEFAULT_WIND_MS);

    let mut severity = 0.0;

    if temp_c > 40.0 || temp_c < -10.0 {
        severity += 4.0;
    } else if temp_c > 35.0 || temp_c < 0.0 {
        severity += 2.0;
    }

    if humidity > 90.0 {
        severity += 2.0;
    }

    if wind > 20.0 {
        severity += 3.0;
    } else if wind > 10.0 {
        severity += 1.0;
    }

    match obs.condition {
        Some(SkyCondition::Thunderstorm) => severity += 3.0,
        Some(SkyCondition::Rain) => severity += 1.0,
        _ => {}
    }

    severity
}

/// Seismic severity at an explicit reference time.
///
/// Only significant events (M >= [`SEISMIC_MIN_MAGNITUDE`]) inside the
/// recency window count. Each adds a magnitude-tiered contribution, the sum
/// is dampened, and the result is clamped to the 10 ceiling.
pub fn seismic_severity_at(events: &[SeismicEvent], now: DateTime<Utc>) -> f64 {
    let window = Duration::hours(SEISMIC_WINDOW_HOURS);
    let sum: f64 = events
        .iter()
        .filter(|event| {
            event.magnitude.unwrap_or(0.0) >= SEISMIC_MIN_MAGNITUDE
                && now.signed_duration_since(event.time) < window
        })
        .map(|event| magnitude_contribution(event.magnitude.unwrap_or(0.0)))
        .sum();

    (sum * SEISMIC_DAMPENING).min(10.0)
}

/// [`seismic_severity_at`] against the wall clock.
pub fn seismic_severity(events: &[SeismicEvent]) -> f64 {
    seismic_severity_at(events, Utc::now())
}

/// Tiered contribution of a single significant event. Non-decreasing in
/// magnitude.
fn magnitude_contribution(magnitude: f64) -> f64 {
    if magnitude >= 7.5 {
        8.0
    } else if magnitude >= 7.0 {
        5.0
    } else if magnitude >= 6.5 {
        3.0
    } else if magnitude >= 6.0 {
        2.0
    } else if magnitude >= 5.5 {
        1.0
    } else if magnitude >= 5.0 {
        0.5
    } else if magnitude >= 4.5 {
        0.3
    } else {
        0.0
    }
}

/// Air quality severity: step function over the rescaled pollutant index.
///
/// Thresholds are strict greater-than, so an index of exactly 200 lands in
/// the >150 tier (severity 5), not the >200 tier.
pub fn air_quality_severity(index: f64) -> f64 {
    if index > 300.0 {
        10.0
    } else if index > 200.0 {
        7.0
    } else if index > 150.0 {
        5.0
    } else if index > 100.0 {
        3.0
    } else if index > 50.0 {
        1.0
    } else {
        0.0
    }
}

/// Stretch the provider's 1-5 ordinal onto the pollutant index scale used
/// by [`air_quality_severity`].
pub fn pollutant_index_from_ordinal(ordinal: u8) -> f64 {
    f64::from(ordinal) * AQI_ORDINAL_SCALE
}

/// News severity: the collaborator's score, clamped onto the shared scale.
pub fn news_severity(news: &NewsRisk) -> f64 {
    news.score.clamp(0.0, 10.0)
}
