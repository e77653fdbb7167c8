//! WebAssembly module for the weather forecast pipeline
//!
//! Provides client-side computation for:
//! - Multi-factor condition classification of predicted hours
//! - Radiation-only current condition classification
//! - Grouping predictions into calendar days

use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

/// Classify physical values into label, description, icon and tags (JSON)
#[wasm_bindgen]
pub fn classify_weather_condition(
    temperature: f64,
    precipitation: f64,
    wind_speed: f64,
    humidity_fraction: f64,
    pressure: f64,
) -> String {
    let condition = classify_condition(&ConditionInputs {
        temperature,
        precipitation,
        wind_speed,
        humidity_fraction,
        pressure,
    });
    serde_json::to_string(&condition).unwrap_or_default()
}

/// Clear or Clouds from clear-sky radiation alone (JSON)
#[wasm_bindgen]
pub fn classify_current_condition(clear_sky_radiation: f64) -> String {
    serde_json::to_string(&classify_current(clear_sky_radiation)).unwrap_or_default()
}

/// Season number 1-4 for a month 1-12
#[wasm_bindgen]
pub fn season_for_month(month: u8) -> u8 {
    shared::models::season_for_month(u32::from(month)) as u8
}

/// Group a JSON array of predictions into at most `horizon_days` days
#[wasm_bindgen]
pub fn assemble_forecast(predictions_json: &str, horizon_days: u32) -> Result<String, JsValue> {
    assemble_days(predictions_json, horizon_days).map_err(|e| JsValue::from_str(&e))
}

fn assemble_days(predictions_json: &str, horizon_days: u32) -> Result<String, String> {
    validate_horizon_days(horizon_days)?;
    let predictions: Vec<Prediction> = serde_json::from_str(predictions_json)
        .map_err(|e| format!("Invalid predictions JSON: {}", e))?;
    let days = ForecastAssembler::new(horizon_days).assemble(predictions);
    serde_json::to_string(&days).map_err(|e| e.to_string())
}
