//! Weather Forecast Pipeline - Backend Library
//!
//! Turns hourly NASA POWER observations into engineered features, runs a
//! trained sequence model over sliding windows and assembles the output into
//! classified, day-grouped forecasts.

pub mod config;
pub mod error;
pub mod external;
pub mod services;

pub use config::Config;
pub use error::{ErrorDetail, ErrorResponse, ForecastError, ForecastResult};
