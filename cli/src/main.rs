//! Hazardwatch CLI
//!
//! Per-request orchestration over the two cores: fetch the live hazard
//! signals and compute a risk assessment for a location, or look up the
//! nearest emergency responders around it.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use hazard_risk::feeds::{FeedsConfig, HazardFeeds};
use hazard_risk::signals::pollutant_index_from_ordinal;
use hazard_risk::{assess, NewsRisk};
use responder_locator::{
    is_valid_latitude, is_valid_longitude, Coordinate, OverpassClient, OverpassConfig,
    RankedResponder, ResponderLocator, DEFAULT_RADIUS_M,
};

#[derive(Parser)]
#[command(
    name = "hazardwatch",
    about = "Hazard risk scoring and emergency responder lookup",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the aggregate hazard risk score for a location
    Risk {
        /// Latitude of the location
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Longitude of the location
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// OpenWeatherMap API key
        #[arg(long, env = "OWM_API_KEY", hide_env_values = true)]
        owm_key: String,

        /// Pre-computed news risk score (0-10) from the news analysis
        /// service; omit when no news signal is available
        #[arg(long)]
        news_score: Option<f64>,

        /// Headline behind the news score; repeatable
        #[arg(long = "news-event", value_name = "HEADLINE", requires = "news_score")]
        news_events: Vec<String>,

        /// Write the assessment JSON to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Find the nearest emergency responders around a location
    Responders {
        /// Latitude of the location
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Longitude of the location
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Search radius in meters
        #[arg(long, default_value_t = DEFAULT_RADIUS_M)]
        radius: u32,

        /// Overpass interpreter endpoint
        #[arg(long, env = "OVERPASS_URL")]
        endpoint: Option<String>,

        /// Emit a GeoJSON FeatureCollection instead of the plain list
        #[arg(long)]
        geojson: bool,

        /// Write the result JSON to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Risk {
            lat,
            lon,
            owm_key,
            news_score,
            news_events,
            output,
        } => run_risk(lat, lon, owm_key, news_score, news_events, output).await,
        Commands::Responders {
            lat,
            lon,
            radius,
            endpoint,
            geojson,
            output,
        } => run_responders(lat, lon, radius, endpoint, geojson, output).await,
    }
}

fn origin_from(lat: f64, lon: f64) -> Result<Coordinate> {
    if !is_valid_latitude(lat) {
        bail!("latitude {} is outside [-90, 90]", lat);
    }
    if !is_valid_longitude(lon) {
        bail!("longitude {} is outside [-180, 180]", lon);
    }
    Ok(Coordinate::new(lat, lon))
}

/// Assemble the optional news signal. The aggregator clamps out-of-range
/// scores but assumes finite input, and the flag parser accepts "NaN" and
/// "inf", so non-finite values are refused here with the coordinate checks.
fn news_from(score: Option<f64>, events: Vec<String>) -> Result<Option<NewsRisk>> {
    match score {
        Some(score) if !score.is_finite() => {
            bail!("news score {} is not a finite number", score)
        }
        Some(score) => Ok(Some(NewsRisk { score, events })),
        None => Ok(None),
    }
}

async fn run_risk(
    lat: f64,
    lon: f64,
    owm_key: String,
    news_score: Option<f64>,
    news_events: Vec<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    origin_from(lat, lon)?;
    let news = news_from(news_score, news_events)?;

    let feeds = HazardFeeds::new(FeedsConfig::new(owm_key));

    info!("Fetching hazard signals for ({:.4}, {:.4})", lat, lon);
    let (weather, air, quakes) = tokio::join!(
        feeds.fetch_weather(lat, lon),
        feeds.fetch_air_quality_ordinal(lat, lon),
        feeds.fetch_quakes_near(lat, lon),
    );

    // A dead feed degrades to an absent signal; the score is computed from
    // whatever arrived.
    let weather = match weather {
        Ok(observation) => Some(observation),
        Err(e) => {
            warn!("weather feed unavailable: {}", e);
            None
        }
    };
    let air_index = match air {
        Ok(ordinal) => Some(pollutant_index_from_ordinal(ordinal)),
        Err(e) => {
            warn!("air quality feed unavailable: {}", e);
            None
        }
    };
    let quakes = match quakes {
        Ok(events) => events,
        Err(e) => {
            warn!("seismic feed unavailable: {}", e);
            Vec::new()
        }
    };

    if let Some(news) = &news {
        info!(
            "News signal supplied: score {:.1}, {} event(s)",
            news.score,
            news.events.len()
        );
    }

    let assessment = assess(weather.as_ref(), &quakes, air_index, news.as_ref());

    info!(
        "Risk {:.1}/10 [{:?}] ({})",
        assessment.score,
        assessment.level,
        assessment.level.color()
    );
    info!("  weather      {:>5.1}", assessment.breakdown.weather);
    info!("  seismic      {:>5.1}", assessment.breakdown.seismic);
    info!("  air quality  {:>5.1}", assessment.breakdown.air_quality);
    if let Some(news_severity) = assessment.breakdown.news {
        info!("  news         {:>5.1}", news_severity);
    }

    write_json(&assessment, output.as_deref())
}

async fn run_responders(
    lat: f64,
    lon: f64,
    radius: u32,
    endpoint: Option<String>,
    geojson: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let origin = origin_from(lat, lon)?;

    let mut config = OverpassConfig::default();
    if let Some(endpoint) = endpoint {
        config.endpoint = endpoint;
    }
    let locator = ResponderLocator::new(OverpassClient::new(config));

    info!(
        "Searching responders within {} m of ({:.4}, {:.4})",
        radius, lat, lon
    );
    let responders = match locator.nearest_within(origin, radius).await {
        Ok(responders) => responders,
        Err(e) => {
            if let Some(detail) = std::error::Error::source(&e) {
                debug!("provider failure: {}", detail);
            }
            bail!("{}", e);
        }
    };

    if responders.is_empty() {
        info!("No responder facilities inside the search radius");
    }
    for responder in &responders {
        info!(
            "  {:>6.2} km  {:<12}  {}",
            responder.distance_km,
            responder.kind.amenity_tag(),
            responder.name
        );
    }

    if geojson {
        let collection = to_geojson(origin, radius, &responders);
        write_json(&collection, output.as_deref())
    } else {
        write_json(&responders, output.as_deref())
    }
}

/// GeoJSON FeatureCollection of a ranked responder set, coordinates in
/// [lon, lat] order per the format.
fn to_geojson(origin: Coordinate, radius_m: u32, responders: &[RankedResponder]) -> serde_json::Value {
    let features: Vec<serde_json::Value> = responders
        .iter()
        .map(|responder| {
            serde_json::json!({
                "type": "Feature",
                "geometry": {
                    "type": "Point",
                    "coordinates": [
                        responder.location.longitude,
                        responder.location.latitude
                    ]
                },
                "properties": {
                    "name": responder.name,
                    "kind": responder.kind.amenity_tag(),
                    "distance_km": responder.distance_km
                }
            })
        })
        .collect();

    serde_json::json!({
        "type": "FeatureCollection",
        "features": features,
        "properties": {
            "origin": [origin.longitude, origin.latitude],
            "radius_m": radius_m,
            "count": responders.len()
        }
    })
}

fn write_json<T: serde::Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            serde_json::to_writer_pretty(BufWriter::new(file), value)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
        None => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use responder_locator::FacilityKind;

    #[test]
    fn test_origin_validation() {
        assert!(origin_from(35.68, 139.69).is_ok());
        assert!(origin_from(-90.0, 180.0).is_ok());
        assert!(origin_from(91.0, 0.0).is_err());
        assert!(origin_from(0.0, -180.5).is_err());
        assert!(origin_from(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_non_finite_news_score_is_rejected_at_the_boundary() {
        // The float parser happily produces NaN from the flag; the boundary
        // check has to refuse it before the aggregator sees it.
        let cli = Cli::try_parse_from([
            "hazardwatch",
            "risk",
            "--lat",
            "35.68",
            "--lon",
            "139.69",
            "--owm-key",
            "test-key",
            "--news-score",
            "NaN",
        ])
        .unwrap();
        match cli.command {
            Commands::Risk {
                news_score,
                news_events,
                ..
            } => {
                let score = news_score.expect("flag value should parse");
                assert!(score.is_nan());
                assert!(news_from(Some(score), news_events).is_err());
            }
            _ => panic!("expected risk subcommand"),
        }

        assert!(news_from(Some(f64::INFINITY), vec![]).is_err());
        assert!(news_from(Some(f64::NEG_INFINITY), vec![]).is_err());
    }

    #[test]
    fn test_news_assembly_passes_finite_scores_through() {
        let news = news_from(Some(4.5), vec!["river levels rising".to_string()])
            .unwrap()
            .unwrap();
        assert_eq!(news.score, 4.5);
        assert_eq!(news.events.len(), 1);

        assert_eq!(news_from(None, vec![]).unwrap(), None);
    }

    #[test]
    fn test_news_event_requires_news_score() {
        let result = Cli::try_parse_from([
            "hazardwatch",
            "risk",
            "--lat",
            "35.68",
            "--lon",
            "139.69",
            "--owm-key",
            "test-key",
            "--news-event",
            "flooding downtown",
        ]);
        assert!(result.is_err(), "headlines without a score should not parse");
    }

    #[test]
    fn test_geojson_shape() {
        let responders = vec![RankedResponder {
            name: "Central Hospital".to_string(),
            kind: FacilityKind::Hospital,
            location: Coordinate::new(35.6895, 139.6917),
            distance_km: 1.48,
        }];
        let collection = to_geojson(Coordinate::new(35.6762, 139.6503), 5000, &responders);

        assert_eq!(collection["type"], "FeatureCollection");
        assert_eq!(collection["properties"]["count"], 1);
        assert_eq!(collection["properties"]["radius_m"], 5000);

        let feature = &collection["features"][0];
        assert_eq!(feature["type"], "Feature");
        assert_eq!(feature["geometry"]["type"], "Point");
        // GeoJSON positions are [lon, lat].
        assert_eq!(feature["geometry"]["coordinates"][0], 139.6917);
        assert_eq!(feature["geometry"]["coordinates"][1], 35.6895);
        assert_eq!(feature["properties"]["kind"], "hospital");
        assert_eq!(feature["properties"]["distance_km"], 1.48);
    }

    #[test]
    fn test_cli_parses_both_subcommands() {
        let cli = Cli::try_parse_from([
            "hazardwatch",
            "risk",
            "--lat",
            "35.68",
            "--lon",
            "139.69",
            "--owm-key",
            "test-key",
            "--news-score",
            "4.5",
            "--news-event",
            "river levels rising",
        ])
        .unwrap();
        match cli.command {
            Commands::Risk {
                lat,
                news_score,
                news_events,
                ..
            } => {
                assert_eq!(lat, 35.68);
                assert_eq!(news_score, Some(4.5));
                assert_eq!(news_events, vec!["river levels rising".to_string()]);
            }
            _ => panic!("expected risk subcommand"),
        }

        let cli = Cli::try_parse_from([
            "hazardwatch",
            "responders",
            "--lat",
            "-33.87",
            "--lon",
            "151.21",
            "--geojson",
        ])
        .unwrap();
        match cli.command {
            Commands::Responders {
                lat,
                lon,
                radius,
                geojson,
                ..
            } => {
                assert_eq!(lat, -33.87);
                assert_eq!(lon, 151.21);
                assert_eq!(radius, DEFAULT_RADIUS_M);
                assert!(geojson);
            }
            _ => panic!("expected responders subcommand"),
        }
    }
}
