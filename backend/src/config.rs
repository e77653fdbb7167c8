//! Configuration management for the weather forecast pipeline
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with WXF__ prefix

use std::collections::HashSet;
use std::path::PathBuf;
use std::str::FromStr;

use config::{Environment, File};
use serde::Deserialize;
use shared::PhysicalField;
use validator::Validate;

use crate::error::{ForecastError, ForecastResult};
use crate::services::features::{FeatureColumn, FEATURE_WIDTH, TARGET_WIDTH};

pub const DEFAULT_TIMESTEPS: usize = 48;
pub const DEFAULT_BATCH_SIZE: usize = 96;
pub const DEFAULT_OUTPUT_STEPS: usize = 24;
pub const DEFAULT_HORIZON_DAYS: u32 = 7;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Trained artifact locations
    pub artifacts: ArtifactsConfig,

    /// Feature/window/prediction parameters
    pub pipeline: PipelineConfig,

    /// Log output configuration
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ArtifactsConfig {
    /// Serialized feature/target scaler
    pub scaler_path: PathBuf,

    /// Serialized sequence model
    pub model_path: PathBuf,
}

/// How irregular spacing between observations is treated
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GapPolicy {
    /// Windows may span missing hours
    #[default]
    Allow,
    /// Any spacing other than one hour is an error
    Reject,
}

#[derive(Debug, Deserialize, Clone, Validate)]
pub struct PipelineConfig {
    /// Window length fed to the model
    #[validate(range(min = 1))]
    pub timesteps: usize,

    /// Windows per model invocation
    #[validate(range(min = 1))]
    pub batch_size: usize,

    /// Future steps scored by batch evaluation
    #[validate(range(min = 1))]
    pub output_steps: usize,

    /// Calendar days kept in an assembled forecast
    #[validate(range(min = 1, max = 31))]
    pub horizon_days: u32,

    pub gap_policy: GapPolicy,

    /// Feature column order the scaler was fit with
    pub feature_columns: Vec<String>,

    /// Target column order the scaler was fit with
    pub target_columns: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// EnvFilter directive used when RUST_LOG is unset
    pub filter: String,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            timesteps: DEFAULT_TIMESTEPS,
            batch_size: DEFAULT_BATCH_SIZE,
            output_steps: DEFAULT_OUTPUT_STEPS,
            horizon_days: DEFAULT_HORIZON_DAYS,
            gap_policy: GapPolicy::Allow,
            feature_columns: FeatureColumn::CANONICAL
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
            target_columns: PhysicalField::ALL
                .iter()
                .map(|f| f.column_name().to_string())
                .collect(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "wxf=info,weather_forecast_backend=info".to_string(),
            json: false,
        }
    }
}

impl PipelineConfig {
    /// Parse and check the configured feature column order
    pub fn resolved_feature_columns(&self) -> ForecastResult<Vec<FeatureColumn>> {
        let columns = parse_columns::<FeatureColumn>(&self.feature_columns, "feature")?;
        check_width(&columns, FEATURE_WIDTH, "feature")?;
        Ok(columns)
    }

    /// Parse and check the configured target column order
    pub fn resolved_target_columns(&self) -> ForecastResult<Vec<PhysicalField>> {
        let columns = parse_columns::<PhysicalField>(&self.target_columns, "target")?;
        check_width(&columns, TARGET_WIDTH, "target")?;
        Ok(columns)
    }

    /// Range checks plus column list checks
    pub fn check(&self) -> ForecastResult<()> {
        self.validate()
            .map_err(|e| ForecastError::Configuration(e.to_string()))?;
        self.resolved_feature_columns()?;
        self.resolved_target_columns()?;
        Ok(())
    }
}

fn parse_columns<T>(names: &[String], kind: &str) -> ForecastResult<Vec<T>>
where
    T: FromStr + Copy + Eq + std::hash::Hash,
{
    let mut seen = HashSet::new();
    let mut columns = Vec::with_capacity(names.len());
    for name in names {
        let column = name.parse::<T>().map_err(|_| {
            ForecastError::Configuration(format!("Unknown {} column: {}", kind, name))
        })?;
        if !seen.insert(column) {
            return Err(ForecastError::Configuration(format!(
                "Duplicate {} column: {}",
                kind, name
            )));
        }
        columns.push(column);
    }
    Ok(columns)
}

fn check_width<T>(columns: &[T], expected: usize, kind: &str) -> ForecastResult<()> {
    if columns.len() != expected {
        return Err(ForecastError::Configuration(format!(
            "Expected {} {} columns, found {}",
            expected,
            kind,
            columns.len()
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> ForecastResult<Self> {
        let environment = std::env::var("WXF_ENVIRONMENT").unwrap_or_else(|_| "development".into());
        Self::load_with(&environment, env_overrides())
    }

    fn load_with(environment: &str, overrides: Environment) -> ForecastResult<Self> {
        let pipeline = PipelineConfig::default();
        let logging = LoggingConfig::default();

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment)?
            .set_default("artifacts.scaler_path", "models/scaler.json")?
            .set_default("artifacts.model_path", "models/model.json")?
            .set_default("pipeline.timesteps", pipeline.timesteps as i64)?
            .set_default("pipeline.batch_size", pipeline.batch_size as i64)?
            .set_default("pipeline.output_steps", pipeline.output_steps as i64)?
            .set_default("pipeline.horizon_days", i64::from(pipeline.horizon_days))?
            .set_default("pipeline.gap_policy", "allow")?
            .set_default("pipeline.feature_columns", pipeline.feature_columns)?
            .set_default("pipeline.target_columns", pipeline.target_columns)?
            .set_default("logging.filter", logging.filter)?
            .set_default("logging.json", logging.json)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (WXF__ prefix)
            .add_source(overrides)
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.pipeline.check()?;
        Ok(config)
    }
}

/// `WXF__*` variables; column lists are comma separated
fn env_overrides() -> Environment {
    Environment::with_prefix("WXF")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("pipeline.feature_columns")
        .with_list_parse_key("pipeline.target_columns")
        .try_parsing(true)
}
