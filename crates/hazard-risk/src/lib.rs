//! Hazard Risk Scoring
//!
//! Normalizes heterogeneous hazard signals (weather, seismic activity, air
//! quality, and an optional news-derived estimate) onto a shared 0-10
//! severity scale and combines them into a single weighted score with a
//! per-signal breakdown.
//!
//! # Weight model
//!
//! ```text
//! score = w_weather * S_weather + w_seismic * S_seismic
//!       + w_air * S_air + w_news * S_news
//! ```
//!
//! Two fixed weight tables exist, selected by whether a news signal was
//! supplied at all:
//!
//! | Signal      | With news | Without news |
//! |-------------|-----------|--------------|
//! | weather     | 0.32      | 0.40         |
//! | seismic     | 0.32      | 0.40         |
//! | air quality | 0.16      | 0.20         |
//! | news        | 0.20      | 0.00         |
//!
//! The switch is on presence, not value: a news signal with score 0 still
//! selects the four-signal table. Both tables sum to 1.0, so a score can
//! only reach the top of the scale when several signals are severe at once.
//!
//! Scoring is pure and synchronous; the [`feeds`] module holds the async
//! provider clients that produce the input payloads.

pub mod aggregate;
pub mod feeds;
pub mod signals;

pub use aggregate::{assess, assess_at, RiskAssessment, RiskBreakdown};
pub use signals::{NewsRisk, SeismicEvent, SkyCondition, WeatherObservation};

use serde::{Deserialize, Serialize};

/// Weight table applied to the normalized severities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalWeights {
    pub weather: f64,
    pub seismic: f64,
    pub air_quality: f64,
    pub news: f64,
}

/// Weights when a news signal accompanies the physical sensors.
pub const WEIGHTS_WITH_NEWS: SignalWeights = SignalWeights {
    weather: 0.32,
    seismic: 0.32,
    air_quality: 0.16,
    news: 0.20,
};

/// Weights when no news signal was supplied.
pub const WEIGHTS_WITHOUT_NEWS: SignalWeights = SignalWeights {
    weather: 0.40,
    seismic: 0.40,
    air_quality: 0.20,
    news: 0.0,
};

impl SignalWeights {
    /// Select the fixed table for an input set.
    pub fn for_news_presence(news_present: bool) -> Self {
        if news_present {
            WEIGHTS_WITH_NEWS
        } else {
            WEIGHTS_WITHOUT_NEWS
        }
    }

    pub fn sum(&self) -> f64 {
        self.weather + self.seismic + self.air_quality + self.news
    }
}

/// Four-tier classification of an aggregate score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Extreme,
}

impl RiskLevel {
    /// Classify a rounded aggregate score. Boundaries are exclusive on the
    /// lower tier: 3.0 is still `Low`, 3.1 is `Moderate`.
    pub fn from_score(score: f64) -> Self {
        if score > 7.0 {
            Self::Extreme
        } else if score > 5.0 {
            Self::High
        } else if score > 3.0 {
            Self::Moderate
        } else {
            Self::Low
        }
    }

    /// Display color hint for dashboards and terminals.
    pub fn color(&self) -> &'static str {
        match self {
            Self::Low => "green",
            Self::Moderate => "yellow",
            Self::High => "orange",
            Self::Extreme => "red",
        }
    }
}
