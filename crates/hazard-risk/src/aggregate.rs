//! Weighted combination of normalized severities into a risk assessment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::signals::{
    air_quality_severity, news_severity, seismic_severity_at, weather_severity, NewsRisk,
    SeismicEvent, WeatherObservation,
};
use crate::{RiskLevel, SignalWeights};

/// Per-signal severities retained for display and audit, each rounded to
/// one decimal. The news entry is present exactly when a news signal was
/// part of the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskBreakdown {
    pub weather: f64,
    pub seismic: f64,
    pub air_quality: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub news: Option<f64>,
}

/// Aggregated risk for one location at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Weighted score on the 0-10 scale, rounded to one decimal.
    pub score: f64,
    pub level: RiskLevel,
    pub breakdown: RiskBreakdown,
}

/// Assess risk from whatever subset of signals is available, using the wall
/// clock for the seismic recency window.
pub fn assess(
    weather: Option<&WeatherObservation>,
    quakes: &[SeismicEvent],
    air_quality_index: Option<f64>,
    news: Option<&NewsRisk>,
) -> RiskAssessment {
    assess_at(weather, quakes, air_quality_index, news, Utc::now())
}

/// Assess risk against an explicit reference time.
///
/// Absent payloads score 0 for their category; an absent news signal
/// additionally switches the weight table (see the crate docs). The level
/// is classified from the rounded score, so what callers see is always
/// consistent with the tier they are told.
pub fn assess_at(
    weather: Option<&WeatherObservation>,
    quakes: &[SeismicEvent],
    air_quality_index: Option<f64>,
    news: Option<&NewsRisk>,
    now: DateTime<Utc>,
) -> RiskAssessment {
    let weather_sev = weather.map(weather_severity).unwrap_or(0.0);
    let seismic_sev = seismic_severity_at(quakes, now);
    let air_sev = air_quality_index.map(air_quality_severity).unwrap_or(0.0);
    let news_sev = news.map(news_severity);

    let weights = SignalWeights::for_news_presence(news.is_some());
    let raw = weights.weather * weather_sev
        + weights.seismic * seismic_sev
        + weights.air_quality * air_sev
        + weights.news * news_sev.unwrap_or(0.0);

    let score = round1(raw);
    let level = RiskLevel::from_score(score);

    debug!(
        "risk {:.1} ({:?}) from weather={:.1} seismic={:.1} air={:.1} news={:?}",
        score, level, weather_sev, seismic_sev, air_sev, news_sev
    );

    RiskAssessment {
        score,
        level,
        breakdown: RiskBreakdown {
            weather: round1(weather_sev),
            seismic: round1(seismic_sev),
            air_quality: round1(air_sev),
            news: news_sev.map(round1),
        },
    }
}

/// Round to one decimal, the resolution scores are reported at.
fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::signals::KELVIN_OFFSET;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn reference_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn weather_strategy() -> impl Strategy<Value = WeatherObservation> {
        (
            proptest::option::of(-40.0f64..55.0),
            proptest::option::of(0.0f64..100.0),
            proptest::option::of(0.0f64..45.0),
        )
            .prop_map(|(temp_c, humidity, wind)| WeatherObservation {
                temperature_k: temp_c.map(|c| c + KELVIN_OFFSET),
                humidity_pct: humidity,
                wind_speed_ms: wind,
                condition: None,
            })
    }

    fn quakes_strategy() -> impl Strategy<Value = Vec<SeismicEvent>> {
        proptest::collection::vec((0.0f64..10.0, 0i64..48), 0..20).prop_map(|entries| {
            entries
                .into_iter()
                .map(|(magnitude, hours_ago)| SeismicEvent {
                    magnitude: Some(magnitude),
                    time: reference_now() - chrono::Duration::hours(hours_ago),
                    latitude: 0.0,
                    longitude: 0.0,
                    place: None,
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn score_is_finite_and_non_negative(
            weather in weather_strategy(),
            quakes in quakes_strategy(),
            air in proptest::option::of(0.0f64..400.0),
            news_score in proptest::option::of(-5.0f64..15.0),
        ) {
            let news = news_score.map(|score| NewsRisk { score, events: vec![] });
            let assessment = assess_at(
                Some(&weather),
                &quakes,
                air,
                news.as_ref(),
                reference_now(),
            );
            prop_assert!(assessment.score.is_finite());
            prop_assert!(assessment.score >= 0.0);
        }

        #[test]
        fn level_always_matches_reported_score(
            quakes in quakes_strategy(),
            air in proptest::option::of(0.0f64..400.0),
        ) {
            let assessment = assess_at(None, &quakes, air, None, reference_now());
            prop_assert_eq!(assessment.level, RiskLevel::from_score(assessment.score));
        }

        #[test]
        fn score_tracks_weighted_breakdown(
            weather in weather_strategy(),
            quakes in quakes_strategy(),
            air in proptest::option::of(0.0f64..400.0),
        ) {
            // The breakdown entries are rounded independently of the score,
            // so they agree with it only up to rounding slack.
            let assessment =
                assess_at(Some(&weather), &quakes, air, None, reference_now());
            let recombined = 0.4 * assessment.breakdown.weather
                + 0.4 * assessment.breakdown.seismic
                + 0.2 * assessment.breakdown.air_quality;
            prop_assert!((assessment.score - recombined).abs() <= 0.11);
        }

        #[test]
        fn breakdown_news_present_iff_supplied(
            news_score in proptest::option::of(0.0f64..10.0),
        ) {
            let news = news_score.map(|score| NewsRisk { score, events: vec![] });
            let assessment = assess_at(None, &[], None, news.as_ref(), reference_now());
            prop_assert_eq!(assessment.breakdown.news.is_some(), news.is_some());
        }
    }
}
