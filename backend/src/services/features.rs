//! Feature derivation from raw hourly observations
//!
//! Produces the 19-column feature matrix the scaler was fit on, plus the
//! six physical target columns used by evaluation. Every derived value is
//! computed after the missing-value sentinel has been replaced with zero.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDateTime, Timelike};
use ndarray::{Array2, ArrayView2, Axis};
use shared::{is_daytime_hour, season_for_month, Observation, PhysicalField, UnknownColumn};

use crate::error::{ForecastError, ForecastResult};

pub const FEATURE_WIDTH: usize = 19;
pub const TARGET_WIDTH: usize = 6;

/// Rolling window used by the trend features
pub const TREND_WINDOW: usize = 24;

/// One named column of the feature matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureColumn {
    Latitude,
    Longitude,
    Hour,
    Day,
    Month,
    Season,
    /// A raw physical reading, sentinel substituted
    Raw(PhysicalField),
    SinHour,
    CosHour,
    TemperatureLag,
    PrecipitationLag,
    TemperatureTrend,
    PrecipitationTrend,
    DayNight,
}

impl FeatureColumn {
    /// Column order the shipped scaler was fit with
    pub const CANONICAL: [FeatureColumn; FEATURE_WIDTH] = [
        FeatureColumn::Latitude,
        FeatureColumn::Longitude,
        FeatureColumn::Hour,
        FeatureColumn::Day,
        FeatureColumn::Month,
        FeatureColumn::Season,
        FeatureColumn::Raw(PhysicalField::WindSpeed),
        FeatureColumn::Raw(PhysicalField::SpecificHumidity),
        FeatureColumn::Raw(PhysicalField::SurfacePressure),
        FeatureColumn::Raw(PhysicalField::Precipitation),
        FeatureColumn::Raw(PhysicalField::Temperature),
        FeatureColumn::Raw(PhysicalField::ClearSkyRadiation),
        FeatureColumn::SinHour,
        FeatureColumn::CosHour,
        FeatureColumn::TemperatureLag,
        FeatureColumn::PrecipitationLag,
        FeatureColumn::TemperatureTrend,
        FeatureColumn::PrecipitationTrend,
        FeatureColumn::DayNight,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FeatureColumn::Latitude => "Latitude",
            FeatureColumn::Longitude => "Longitude",
            FeatureColumn::Hour => "hour",
            FeatureColumn::Day => "day",
            FeatureColumn::Month => "month",
            FeatureColumn::Season => "season",
            FeatureColumn::Raw(field) => field.column_name(),
            FeatureColumn::SinHour => "sin_hour",
            FeatureColumn::CosHour => "cos_hour",
            FeatureColumn::TemperatureLag => "T2M_lag1",
            FeatureColumn::PrecipitationLag => "PRECTOTCORR_lag1",
            FeatureColumn::TemperatureTrend => "T2M_trend",
            FeatureColumn::PrecipitationTrend => "PRECTOTCORR_trend",
            FeatureColumn::DayNight => "T2M_day_night",
        }
    }
}

impl fmt::Display for FeatureColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FeatureColumn {
    type Err = UnknownColumn;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeatureColumn::CANONICAL
            .into_iter()
            .find(|column| column.name() == s)
            .ok_or_else(|| UnknownColumn(s.to_string()))
    }
}

/// Engineered features for a sequence of observations
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    pub columns: Vec<FeatureColumn>,
    pub target_columns: Vec<PhysicalField>,
    pub timestamps: Vec<NaiveDateTime>,
    /// (rows, feature columns)
    pub features: Array2<f64>,
    /// (rows, target columns), physical units
    pub targets: Array2<f64>,
}

impl FeatureMatrix {
    pub fn rows(&self) -> usize {
        self.features.nrows()
    }

    /// Values of one feature column, if present
    pub fn column(&self, column: FeatureColumn) -> Option<Vec<f64>> {
        let index = self.columns.iter().position(|c| *c == column)?;
        Some(self.features.column(index).to_vec())
    }
}

/// Derives the feature matrix in a configured column order
#[derive(Debug, Clone)]
pub struct FeatureEngineer {
    columns: Vec<FeatureColumn>,
    target_columns: Vec<PhysicalField>,
}

impl Default for FeatureEngineer {
    fn default() -> Self {
        Self::new(FeatureColumn::CANONICAL.to_vec(), PhysicalField::ALL.to_vec())
    }
}

impl FeatureEngineer {
    pub fn new(columns: Vec<FeatureColumn>, target_columns: Vec<PhysicalField>) -> Self {
        Self {
            columns,
            target_columns,
        }
    }

    pub fn target_columns(&self) -> &[PhysicalField] {
        &self.target_columns
    }

    /// Build one feature row per observation.
    ///
    /// Fails on empty input or when a required reading is absent after
    /// sentinel substitution. Input order is taken as chronological.
    pub fn engineer(&self, observations: &[Observation]) -> ForecastResult<FeatureMatrix> {
        if observations.is_empty() {
            return Err(ForecastError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }

        let series = DerivedSeries::from_observations(observations)?;
        let rows = observations.len();

        let mut features = Array2::zeros((rows, self.columns.len()));
        for (j, column) in self.columns.iter().enumerate() {
            let values = series.feature(*column);
            for (i, value) in values.iter().enumerate() {
                features[[i, j]] = *value;
            }
        }

        let mut targets = Array2::zeros((rows, self.target_columns.len()));
        for (j, field) in self.target_columns.iter().enumerate() {
            for (i, value) in series.physical(*field).iter().enumerate() {
                targets[[i, j]] = *value;
            }
        }

        let names: Vec<&str> = self.columns.iter().map(|c| c.name()).collect();
        log_column_summary("engineered features", &names, features.view());

        Ok(FeatureMatrix {
            columns: self.columns.clone(),
            target_columns: self.target_columns.clone(),
            timestamps: observations.iter().map(|o| o.timestamp).collect(),
            features,
            targets,
        })
    }
}

/// Every derivable column, computed once per call
struct DerivedSeries {
    latitude: Vec<f64>,
    longitude: Vec<f64>,
    hour: Vec<f64>,
    day: Vec<f64>,
    month: Vec<f64>,
    season: Vec<f64>,
    /// Indexed like `PhysicalField::ALL`
    physical: Vec<Vec<f64>>,
    sin_hour: Vec<f64>,
    cos_hour: Vec<f64>,
    temperature_lag: Vec<f64>,
    precipitation_lag: Vec<f64>,
    temperature_trend: Vec<f64>,
    precipitation_trend: Vec<f64>,
    day_night: Vec<f64>,
}

impl DerivedSeries {
    fn from_observations(observations: &[Observation]) -> ForecastResult<Self> {
        let mut physical = Vec::with_capacity(PhysicalField::ALL.len());
        for field in PhysicalField::ALL {
            let mut values = Vec::with_capacity(observations.len());
            for (row, observation) in observations.iter().enumerate() {
                let value = observation.usable_value(field).ok_or_else(|| {
                    ForecastError::MissingField {
                        field: field.column_name().to_string(),
                        row,
                    }
                })?;
                values.push(value);
            }
            physical.push(values);
        }

        let hours: Vec<u32> = observations.iter().map(|o| o.timestamp.hour()).collect();
        let temperature = &physical[physical_index(PhysicalField::Temperature)];
        let precipitation = &physical[physical_index(PhysicalField::Precipitation)];
        let temperature_lag = lag_with_mean_fill(temperature);
        let precipitation_lag = lag_with_mean_fill(precipitation);
        let temperature_trend = rolling_mean_trend(temperature, TREND_WINDOW);
        let precipitation_trend = rolling_mean_trend(precipitation, TREND_WINDOW);

        Ok(Self {
            latitude: observations.iter().map(|o| o.latitude).collect(),
            longitude: observations.iter().map(|o| o.longitude).collect(),
            hour: hours.iter().map(|h| f64::from(*h)).collect(),
            day: observations
                .iter()
                .map(|o| f64::from(o.timestamp.day()))
                .collect(),
            month: observations
                .iter()
                .map(|o| f64::from(o.timestamp.month()))
                .collect(),
            season: observations
                .iter()
                .map(|o| f64::from(season_for_month(o.timestamp.month())))
                .collect(),
            sin_hour: hours
                .iter()
                .map(|h| (2.0 * PI * f64::from(*h) / 24.0).sin())
                .collect(),
            cos_hour: hours
                .iter()
                .map(|h| (2.0 * PI * f64::from(*h) / 24.0).cos())
                .collect(),
            temperature_lag,
            precipitation_lag,
            temperature_trend,
            precipitation_trend,
            day_night: hours
                .iter()
                .map(|h| if is_daytime_hour(*h) { 1.0 } else { 0.0 })
                .collect(),
            physical,
        })
    }

    fn physical(&self, field: PhysicalField) -> &[f64] {
        &self.physical[physical_index(field)]
    }

    fn feature(&self, column: FeatureColumn) -> &[f64] {
        match column {
            FeatureColumn::Latitude => &self.latitude,
            FeatureColumn::Longitude => &self.longitude,
            FeatureColumn::Hour => &self.hour,
            FeatureColumn::Day => &self.day,
            FeatureColumn::Month => &self.month,
            FeatureColumn::Season => &self.season,
            FeatureColumn::Raw(field) => self.physical(field),
            FeatureColumn::SinHour => &self.sin_hour,
            FeatureColumn::CosHour => &self.cos_hour,
            FeatureColumn::TemperatureLag => &self.temperature_lag,
            FeatureColumn::PrecipitationLag => &self.precipitation_lag,
            FeatureColumn::TemperatureTrend => &self.temperature_trend,
            FeatureColumn::PrecipitationTrend => &self.precipitation_trend,
            FeatureColumn::DayNight => &self.day_night,
        }
    }
}

/// Position of a field within `PhysicalField::ALL`
fn physical_index(field: PhysicalField) -> usize {
    match field {
        PhysicalField::ClearSkyRadiation => 0,
        PhysicalField::SurfacePressure => 1,
        PhysicalField::Temperature => 2,
        PhysicalField::SpecificHumidity => 3,
        PhysicalField::WindSpeed => 4,
        PhysicalField::Precipitation => 5,
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Previous row's value; the first row takes the series mean
pub fn lag_with_mean_fill(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let fill = mean(values);
    std::iter::once(fill)
        .chain(values[..values.len() - 1].iter().copied())
        .collect()
}

/// First difference of a trailing rolling mean (minimum one sample).
/// The first value is zero.
pub fn rolling_mean_trend(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let mut rolling = Vec::with_capacity(values.len());
    for i in 0..values.len() {
        let start = (i + 1).saturating_sub(window);
        rolling.push(mean(&values[start..=i]));
    }

    let mut trend = Vec::with_capacity(values.len());
    for i in 0..rolling.len() {
        trend.push(if i == 0 { 0.0 } else { rolling[i] - rolling[i - 1] });
    }
    trend
}

/// Debug-level min/mean/max per column
pub(crate) fn log_column_summary(stage: &str, names: &[&str], values: ArrayView2<'_, f64>) {
    if !tracing::enabled!(tracing::Level::DEBUG) || values.nrows() == 0 {
        return;
    }
    for (name, column) in names.iter().zip(values.axis_iter(Axis(1))) {
        let min = column.iter().copied().fold(f64::INFINITY, f64::min);
        let max = column.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let avg = column.mean().unwrap_or(0.0);
        tracing::debug!(stage, column = *name, min, mean = avg, max, "column summary");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn observations(temps: &[f64]) -> Vec<Observation> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        temps
            .iter()
            .enumerate()
            .map(|(i, t)| Observation {
                timestamp: start + Duration::hours(i as i64),
                latitude: 10.8231,
                longitude: 106.6297,
                temperature: Some(*t),
                specific_humidity: Some(0.016),
                surface_pressure: Some(1009.0),
                wind_speed: Some(3.0),
                precipitation: Some(0.0),
                clear_sky_radiation: Some(0.0),
            })
            .collect()
    }

    #[test]
    fn test_canonical_names_parse_back() {
        for column in FeatureColumn::CANONICAL {
            assert_eq!(column.name().parse::<FeatureColumn>(), Ok(column));
        }
    }

    #[test]
    fn test_lag_first_row_is_mean() {
        let lag = lag_with_mean_fill(&[10.0, 20.0, 30.0]);
        assert_eq!(lag, vec![20.0, 10.0, 20.0]);
    }

    #[test]
    fn test_rolling_trend_first_value_zero() {
        let trend = rolling_mean_trend(&[1.0, 3.0, 5.0], 24);
        assert_eq!(trend[0], 0.0);
        assert!((trend[1] - 1.0).abs() < 1e-12);
        assert!((trend[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_rolling_trend_respects_window() {
        let trend = rolling_mean_trend(&[0.0, 0.0, 6.0], 2);
        assert_eq!(trend, vec![0.0, 0.0, 3.0]);
    }

    #[test]
    fn test_sentinel_reading_feeds_lag_and_trend_as_zero() {
        let matrix = FeatureEngineer::default()
            .engineer(&observations(&[10.0, -999.0, 20.0]))
            .unwrap();
        assert_eq!(
            matrix.column(FeatureColumn::Raw(PhysicalField::Temperature)),
            Some(vec![10.0, 0.0, 20.0])
        );
        assert_eq!(
            matrix.column(FeatureColumn::TemperatureLag),
            Some(vec![10.0, 10.0, 0.0])
        );
        let trend = matrix.column(FeatureColumn::TemperatureTrend).unwrap();
        let expected = [0.0, -5.0, 5.0];
        for (got, want) in trend.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12);
        }
    }

    #[test]
    fn test_empty_input_is_insufficient() {
        let err = FeatureEngineer::default().engineer(&[]).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::InsufficientData {
                required: 1,
                actual: 0
            }
        ));
    }

    #[test]
    fn test_missing_pressure_names_column_and_row() {
        let mut obs = observations(&[25.0, 26.0, 27.0]);
        obs[2].surface_pressure = None;
        let err = FeatureEngineer::default().engineer(&obs).unwrap_err();
        match err {
            ForecastError::MissingField { field, row } => {
                assert_eq!(field, "PS");
                assert_eq!(row, 2);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_matrix_shape_and_calendar() {
        let matrix = FeatureEngineer::default()
            .engineer(&observations(&[25.0; 30]))
            .unwrap();
        assert_eq!(matrix.features.dim(), (30, FEATURE_WIDTH));
        assert_eq!(matrix.targets.dim(), (30, TARGET_WIDTH));
        assert_eq!(matrix.column(FeatureColumn::Season).unwrap()[0], 1.0);
        assert_eq!(matrix.column(FeatureColumn::Hour).unwrap()[25], 1.0);
        assert_eq!(matrix.column(FeatureColumn::DayNight).unwrap()[6], 1.0);
        assert_eq!(matrix.column(FeatureColumn::DayNight).unwrap()[19], 0.0);
    }
}
