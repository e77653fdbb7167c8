//! Deterministic fixtures shared by the integration tests

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use shared::Observation;
use weather_forecast_backend::config::PipelineConfig;
use weather_forecast_backend::services::predictor::model_from_json;
use weather_forecast_backend::services::{FittedScaler, ForecastPipeline, SequenceModel};

pub const LATITUDE: f64 = 21.0285;
pub const LONGITUDE: f64 = 105.8542;

/// Canonical feature positions of each target, in target order
const TARGET_FEATURE_INDEX: [usize; 6] = [11, 8, 10, 7, 6, 9];
const FEATURE_WIDTH: usize = 19;
const TARGET_WIDTH: usize = 6;

pub fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// Mild, dry, calm hour: classifies as fair weather
pub fn observation_at(timestamp: NaiveDateTime, index: usize) -> Observation {
    let hour = index % 24;
    Observation {
        timestamp,
        latitude: LATITUDE,
        longitude: LONGITUDE,
        temperature: Some(25.0 + hour as f64 * 0.1),
        specific_humidity: Some(0.5),
        surface_pressure: Some(1010.0),
        wind_speed: Some(2.0),
        precipitation: Some(0.0),
        clear_sky_radiation: Some(if (6..=18).contains(&hour) { 300.0 } else { 0.0 }),
    }
}

/// `count` consecutive hourly observations from 2024-05-01 00:00
pub fn hourly_observations(count: usize) -> Vec<Observation> {
    (0..count)
        .map(|i| observation_at(start() + Duration::hours(i as i64), i))
        .collect()
}

/// Linear model that repeats the last window row's physical readings for
/// every output step
pub fn persistence_model_json(timesteps: usize, output_steps: usize) -> String {
    let outputs = output_steps * TARGET_WIDTH;
    let inputs = timesteps * FEATURE_WIDTH;
    let last_row = (timesteps - 1) * FEATURE_WIDTH;
    let weights: Vec<Vec<f64>> = (0..outputs)
        .map(|r| {
            let column = last_row + TARGET_FEATURE_INDEX[r % TARGET_WIDTH];
            (0..inputs).map(|c| if c == column { 1.0 } else { 0.0 }).collect()
        })
        .collect();

    serde_json::json!({
        "kind": "linear",
        "timesteps": timesteps,
        "input_width": FEATURE_WIDTH,
        "target_width": TARGET_WIDTH,
        "output_steps": output_steps,
        "weights": weights,
        "bias": vec![0.0; outputs],
    })
    .to_string()
}

pub fn persistence_model(timesteps: usize, output_steps: usize) -> Arc<dyn SequenceModel> {
    model_from_json(&persistence_model_json(timesteps, output_steps), "fixture").unwrap()
}

pub fn pipeline_config(timesteps: usize, output_steps: usize) -> PipelineConfig {
    PipelineConfig {
        timesteps,
        output_steps,
        ..PipelineConfig::default()
    }
}

/// Identity scaler plus persistence model
pub fn pipeline(timesteps: usize, output_steps: usize) -> ForecastPipeline {
    pipeline_with(pipeline_config(timesteps, output_steps))
}

pub fn pipeline_with(config: PipelineConfig) -> ForecastPipeline {
    let model = persistence_model(config.timesteps, config.output_steps);
    ForecastPipeline::new(config, Arc::new(FittedScaler::identity()), model).unwrap()
}
