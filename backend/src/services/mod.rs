//! Forecasting services: feature derivation through multi-location runs

pub mod evaluation;
pub mod features;
pub mod pipeline;
pub mod predictor;
pub mod runner;
pub mod scaler;
pub mod windows;

pub use evaluation::EvaluationReport;
pub use features::{FeatureColumn, FeatureEngineer, FeatureMatrix};
pub use pipeline::ForecastPipeline;
pub use predictor::{load_model, SequenceModel, SequencePredictor};
pub use runner::{ForecastRunner, LocationReport, LocationRequest};
pub use scaler::{FittedScaler, Scaler};
pub use windows::WindowBatcher;
