//! Observation source backed by NASA POWER style CSV exports
//!
//! Expected columns: `Datetime, Latitude, Longitude, T2M, QV2M, PS, WS10M,
//! PRECTOTCORR, CLRSKY_SFC_SW_DWN`. Extra columns are ignored and empty
//! cells are read as absent readings.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Deserialize;
use shared::{GpsCoordinates, Observation, TimeRange};

use crate::error::{ForecastError, ForecastResult};

/// Degrees within which two coordinates are the same grid cell
pub const DEFAULT_COORDINATE_TOLERANCE: f64 = 0.01;

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Filter applied to fetched observations
#[derive(Debug, Clone, Default)]
pub struct ObservationQuery {
    pub coordinates: Option<GpsCoordinates>,
    pub tolerance: Option<f64>,
    pub time_range: Option<TimeRange>,
}

impl ObservationQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn at(coordinates: GpsCoordinates) -> Self {
        Self {
            coordinates: Some(coordinates),
            ..Self::default()
        }
    }

    pub fn between(mut self, range: TimeRange) -> Self {
        self.time_range = Some(range);
        self
    }

    fn matches(&self, observation: &Observation) -> bool {
        let tolerance = self.tolerance.unwrap_or(DEFAULT_COORDINATE_TOLERANCE);
        let near = self.coordinates.map_or(true, |c| {
            c.is_near(
                &GpsCoordinates::new(observation.latitude, observation.longitude),
                tolerance,
            )
        });
        let in_range = self
            .time_range
            .map_or(true, |r| r.contains(observation.timestamp));
        near && in_range
    }
}

/// Provider of raw hourly records
pub trait ObservationSource: Send + Sync {
    /// Matching observations sorted by timestamp
    fn fetch(&self, query: &ObservationQuery) -> ForecastResult<Vec<Observation>>;
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Datetime")]
    datetime: String,
    #[serde(rename = "Latitude")]
    latitude: f64,
    #[serde(rename = "Longitude")]
    longitude: f64,
    #[serde(rename = "T2M", default)]
    temperature: Option<f64>,
    #[serde(rename = "QV2M", default)]
    specific_humidity: Option<f64>,
    #[serde(rename = "PS", default)]
    surface_pressure: Option<f64>,
    #[serde(rename = "WS10M", default)]
    wind_speed: Option<f64>,
    #[serde(rename = "PRECTOTCORR", default)]
    precipitation: Option<f64>,
    #[serde(rename = "CLRSKY_SFC_SW_DWN", default)]
    clear_sky_radiation: Option<f64>,
}

fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

/// Parse observation rows from any CSV reader
pub fn read_observations<R: Read>(reader: R) -> ForecastResult<Vec<Observation>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut observations = Vec::new();
    for (index, record) in rdr.deserialize::<CsvRow>().enumerate() {
        let row = record?;
        let timestamp = parse_datetime(&row.datetime).ok_or_else(|| {
            ForecastError::ObservationSource(format!(
                "Unparseable Datetime '{}' at row {}",
                row.datetime, index
            ))
        })?;
        observations.push(Observation {
            timestamp,
            latitude: row.latitude,
            longitude: row.longitude,
            temperature: row.temperature,
            specific_humidity: row.specific_humidity,
            surface_pressure: row.surface_pressure,
            wind_speed: row.wind_speed,
            precipitation: row.precipitation,
            clear_sky_radiation: row.clear_sky_radiation,
        });
    }
    Ok(observations)
}

/// Reads one CSV file per fetch
#[derive(Debug, Clone)]
pub struct CsvObservationSource {
    path: PathBuf,
}

impl CsvObservationSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ObservationSource for CsvObservationSource {
    fn fetch(&self, query: &ObservationQuery) -> ForecastResult<Vec<Observation>> {
        let file = std::fs::File::open(&self.path).map_err(|e| {
            ForecastError::ObservationSource(format!("{}: {}", self.path.display(), e))
        })?;
        let mut observations: Vec<Observation> = read_observations(file)?
            .into_iter()
            .filter(|o| query.matches(o))
            .collect();
        observations.sort_by_key(|o| o.timestamp);

        tracing::info!(
            path = %self.path.display(),
            rows = observations.len(),
            "Fetched observations"
        );
        Ok(observations)
    }
}
