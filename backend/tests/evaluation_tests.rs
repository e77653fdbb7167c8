//! Batch evaluation tests

mod common;

use std::sync::Arc;

use common::*;
use shared::PhysicalField;
use weather_forecast_backend::services::evaluation::{COMPARISON_CSV, PREDICTIONS_CSV};
use weather_forecast_backend::services::{FittedScaler, ForecastPipeline};
use weather_forecast_backend::ForecastError;

#[test]
fn test_window_count_excludes_incomplete_truth() {
    let report = pipeline(4, 2).evaluate(&hourly_observations(20)).unwrap();
    // 20 - 4 - 2 + 1
    assert_eq!(report.windows, 15);
    assert_eq!(report.output_steps, 2);
    assert_eq!(report.predictions.len(), 30);
    assert_eq!(report.model, "Linear Model");
}

#[test]
fn test_requires_window_plus_horizon() {
    let err = pipeline(4, 2).evaluate(&hourly_observations(5)).unwrap_err();
    assert!(matches!(
        err,
        ForecastError::InsufficientData {
            required: 6,
            actual: 5
        }
    ));
}

#[test]
fn test_model_steps_must_match_config() {
    let pipeline = ForecastPipeline::new(
        pipeline_config(4, 3),
        Arc::new(FittedScaler::identity()),
        persistence_model(4, 2),
    )
    .unwrap();
    let err = pipeline.evaluate(&hourly_observations(20)).unwrap_err();
    assert!(matches!(err, ForecastError::ShapeMismatch { .. }));
}

#[test]
fn test_all_zero_target_has_no_model_metrics() {
    let report = pipeline(4, 1).evaluate(&hourly_observations(30)).unwrap();
    assert_eq!(report.metrics.len(), 6);

    let rain = report.metrics_for(PhysicalField::Precipitation).unwrap();
    assert_eq!(rain.mae, None);
    assert_eq!(rain.rmse, None);
    assert_eq!(rain.baseline_mae, 0.0);

    let pressure = report.metrics_for(PhysicalField::SurfacePressure).unwrap();
    assert_eq!(pressure.mae, Some(0.0));
}

#[test]
fn test_persistence_beats_mean_on_smooth_temperature() {
    let report = pipeline(4, 1).evaluate(&hourly_observations(30)).unwrap();
    let temperature = report.metrics_for(PhysicalField::Temperature).unwrap();
    let mae = temperature.mae.unwrap();
    assert!(mae < temperature.baseline_mae);
    assert!(temperature.rmse.unwrap() >= mae);
    assert!(report.weighted_huber_loss >= 0.0);
}

#[test]
fn test_csv_files_written() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("eval");
    let report = pipeline(4, 2).evaluate(&hourly_observations(10)).unwrap();
    report.write_csv(&out).unwrap();

    let comparison = std::fs::read_to_string(out.join(COMPARISON_CSV)).unwrap();
    let mut lines = comparison.lines();
    assert_eq!(
        lines.next(),
        Some("target,mae,rmse,baseline_mae,baseline_rmse")
    );
    assert_eq!(lines.count(), 6);

    let predictions = std::fs::read_to_string(out.join(PREDICTIONS_CSV)).unwrap();
    let mut lines = predictions.lines();
    assert_eq!(
        lines.next(),
        Some("window,step,CLRSKY_SFC_SW_DWN,PS,T2M,QV2M,WS10M,PRECTOTCORR")
    );
    // 5 windows x 2 steps
    assert_eq!(lines.count(), 10);
}

#[test]
fn test_report_json_omits_raw_predictions() {
    let report = pipeline(4, 1).evaluate(&hourly_observations(8)).unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert!(json.get("predictions").is_none());
    assert_eq!(json["metrics"][0]["target"], "CLRSKY_SFC_SW_DWN");
}
