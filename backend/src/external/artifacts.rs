//! Artifact store for the trained scaler and sequence model

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::ArtifactsConfig;
use crate::error::ForecastResult;
use crate::services::predictor::{load_model, SequenceModel};
use crate::services::scaler::{FittedScaler, Scaler};

/// Loads the immutable artifacts once at startup
pub trait ArtifactStore: Send + Sync {
    fn load_scaler(&self) -> ForecastResult<Arc<dyn Scaler>>;

    fn load_model(&self) -> ForecastResult<Arc<dyn SequenceModel>>;
}

/// JSON artifacts on the local filesystem
#[derive(Debug, Clone)]
pub struct FileArtifactStore {
    scaler_path: PathBuf,
    model_path: PathBuf,
}

impl FileArtifactStore {
    pub fn new(scaler_path: impl Into<PathBuf>, model_path: impl Into<PathBuf>) -> Self {
        Self {
            scaler_path: scaler_path.into(),
            model_path: model_path.into(),
        }
    }

    pub fn from_config(config: &ArtifactsConfig) -> Self {
        Self::new(config.scaler_path.clone(), config.model_path.clone())
    }
}

impl ArtifactStore for FileArtifactStore {
    fn load_scaler(&self) -> ForecastResult<Arc<dyn Scaler>> {
        Ok(Arc::new(FittedScaler::load(&self.scaler_path)?))
    }

    fn load_model(&self) -> ForecastResult<Arc<dyn SequenceModel>> {
        load_model(&self.model_path)
    }
}
