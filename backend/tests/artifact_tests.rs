//! File-backed collaborator tests
//!
//! Artifacts and observations are written to a temporary directory and read
//! back through the same code paths the CLI uses.

mod common;

use std::io::Write;

use chrono::Duration;
use common::*;
use ndarray::Array2;
use proptest::prelude::*;
use shared::{GpsCoordinates, TimeRange};
use weather_forecast_backend::config::ArtifactsConfig;
use weather_forecast_backend::external::{
    ArtifactStore, CsvObservationSource, FileArtifactStore, ObservationQuery, ObservationSource,
};
use weather_forecast_backend::services::scaler::{ScalerArtifact, TransformSpec};
use weather_forecast_backend::services::{FittedScaler, ForecastPipeline, Scaler};
use weather_forecast_backend::ForecastError;

fn min_max(width: usize, scale: f64, min: f64) -> TransformSpec {
    TransformSpec::MinMax {
        scale: vec![scale; width],
        min: vec![min; width],
    }
}

fn scaler_json() -> String {
    serde_json::to_string(&ScalerArtifact {
        features: min_max(19, 1.0, 0.0),
        targets: min_max(6, 1.0, 0.0),
    })
    .unwrap()
}

const CSV_HEADER: &str =
    "Datetime,Latitude,Longitude,T2M,QV2M,PS,WS10M,PRECTOTCORR,CLRSKY_SFC_SW_DWN";

fn write_csv(dir: &std::path::Path, rows: usize) -> std::path::PathBuf {
    let path = dir.join("hanoi.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "{}", CSV_HEADER).unwrap();
    // Newest first, to exercise sorting
    for o in hourly_observations(rows).iter().rev() {
        writeln!(
            file,
            "{},{},{},{},{},{},{},{},{}",
            o.timestamp.format("%Y-%m-%d %H:%M:%S"),
            o.latitude,
            o.longitude,
            o.temperature.unwrap(),
            o.specific_humidity.unwrap(),
            o.surface_pressure.unwrap(),
            o.wind_speed.unwrap(),
            o.precipitation.unwrap(),
            o.clear_sky_radiation.unwrap(),
        )
        .unwrap();
    }
    path
}

// ============================================================================
// Artifact Store
// ============================================================================

#[cfg(test)]
mod artifact_store_tests {
    use super::*;

    #[test]
    fn test_file_store_loads_pipeline_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let scaler_path = dir.path().join("scaler.json");
        let model_path = dir.path().join("model.json");
        std::fs::write(&scaler_path, scaler_json()).unwrap();
        std::fs::write(&model_path, persistence_model_json(4, 1)).unwrap();

        let store = FileArtifactStore::from_config(&ArtifactsConfig {
            scaler_path,
            model_path,
        });
        let pipeline = ForecastPipeline::new(
            pipeline_config(4, 1),
            store.load_scaler().unwrap(),
            store.load_model().unwrap(),
        )
        .unwrap();

        assert_eq!(pipeline.model_name(), "Linear Model");
        assert_eq!(pipeline.predict(&hourly_observations(5)).unwrap().len(), 2);
    }

    #[test]
    fn test_missing_scaler_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileArtifactStore::new(dir.path().join("nope.json"), dir.path().join("m.json"));
        let err = store.load_scaler().err().unwrap();
        assert!(matches!(err, ForecastError::ScalerLoad { .. }));
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn test_zero_scale_rejected() {
        let json = serde_json::to_string(&ScalerArtifact {
            features: min_max(19, 0.0, 0.0),
            targets: min_max(6, 1.0, 0.0),
        })
        .unwrap();
        let err = FittedScaler::from_json(&json, "mem").unwrap_err();
        assert!(err.to_string().contains("mem"));
    }

    #[test]
    fn test_corrupt_model_file() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("model.json");
        std::fs::write(&model_path, "{ not json").unwrap();
        let store = FileArtifactStore::new(dir.path().join("s.json"), model_path);
        assert!(matches!(
            store.load_model().err().unwrap(),
            ForecastError::ModelLoad { .. }
        ));
    }
}

// ============================================================================
// Observation Source
// ============================================================================

#[cfg(test)]
mod observation_source_tests {
    use super::*;

    #[test]
    fn test_csv_rows_come_back_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let source = CsvObservationSource::new(write_csv(dir.path(), 10));

        let observations = source.fetch(&ObservationQuery::all()).unwrap();
        assert_eq!(observations.len(), 10);
        assert_eq!(observations[0].timestamp, start());
        assert!(observations
            .windows(2)
            .all(|p| p[0].timestamp < p[1].timestamp));
    }

    #[test]
    fn test_time_range_filter_is_inclusive() {
        let dir = tempfile::tempdir().unwrap();
        let source = CsvObservationSource::new(write_csv(dir.path(), 24));
        let query = ObservationQuery::all().between(TimeRange {
            start: start() + Duration::hours(2),
            end: start() + Duration::hours(5),
        });

        assert_eq!(source.fetch(&query).unwrap().len(), 4);
    }

    #[test]
    fn test_far_coordinates_filtered_out() {
        let dir = tempfile::tempdir().unwrap();
        let source = CsvObservationSource::new(write_csv(dir.path(), 5));
        let query = ObservationQuery::at(GpsCoordinates::new(10.8231, 106.6297));

        assert!(source.fetch(&query).unwrap().is_empty());
    }

    #[test]
    fn test_missing_file_is_source_error() {
        let source = CsvObservationSource::new("/nonexistent/hanoi.csv");
        let err = source.fetch(&ObservationQuery::all()).unwrap_err();
        assert!(matches!(err, ForecastError::ObservationSource(_)));
        assert_eq!(err.status_code(), 502);
    }

    #[test]
    fn test_csv_source_feeds_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let source = CsvObservationSource::new(write_csv(dir.path(), 12));
        let observations = source.fetch(&ObservationQuery::all()).unwrap();

        let predictions = pipeline(4, 1).predict(&observations).unwrap();
        assert_eq!(predictions.len(), 9);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// inverse(transform(y)) == y for any non-zero scale
    #[test]
    fn prop_scaler_round_trip(
        scale in prop_oneof![-5.0f64..-0.01, 0.01f64..5.0],
        shift in -100.0f64..100.0,
        value in -1000.0f64..1000.0,
        standard in any::<bool>(),
    ) {
        let targets = if standard {
            TransformSpec::Standard { mean: vec![shift; 6], scale: vec![scale; 6] }
        } else {
            min_max(6, scale, shift)
        };
        let artifact = ScalerArtifact { features: min_max(19, 1.0, 0.0), targets };
        let scaler = FittedScaler::from_artifact(&artifact, "mem").unwrap();

        let rows = Array2::from_elem((3, 6), value);
        let scaled = scaler.transform_targets(rows.view()).unwrap();
        let back = scaler.inverse_transform(scaled.view()).unwrap();

        for (a, b) in rows.iter().zip(back.iter()) {
            prop_assert!((a - b).abs() <= 1e-6 * a.abs().max(1.0));
        }
    }
}
