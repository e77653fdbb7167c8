//! Fitted feature/target scaling
//!
//! The scaler artifact holds two independent affine transforms, one for the
//! feature space and one for the target space. It is loaded once and never
//! refit.

use std::path::Path;

use ndarray::{Array1, Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, ForecastResult};
use crate::services::features::{FEATURE_WIDTH, TARGET_WIDTH};

/// Forward and inverse scaling over fixed-width rows
pub trait Scaler: Send + Sync {
    fn input_width(&self) -> usize;

    fn target_width(&self) -> usize;

    /// Scale feature rows
    fn transform(&self, features: ArrayView2<'_, f64>) -> ForecastResult<Array2<f64>>;

    /// Scale physical target rows
    fn transform_targets(&self, targets: ArrayView2<'_, f64>) -> ForecastResult<Array2<f64>>;

    /// Map scaled target rows back to physical units
    fn inverse_transform(&self, scaled: ArrayView2<'_, f64>) -> ForecastResult<Array2<f64>>;
}

/// Serialized form of one transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformSpec {
    /// `x * scale + min`
    MinMax { scale: Vec<f64>, min: Vec<f64> },
    /// `(x - mean) / scale`
    Standard { mean: Vec<f64>, scale: Vec<f64> },
}

/// Serialized scaler artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerArtifact {
    pub features: TransformSpec,
    pub targets: TransformSpec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransformKind {
    MinMax,
    Standard,
}

#[derive(Debug, Clone)]
struct AffineTransform {
    kind: TransformKind,
    scale: Array1<f64>,
    /// `min` for min-max, `mean` for standard
    shift: Array1<f64>,
}

impl AffineTransform {
    fn compile(spec: &TransformSpec, expected_width: usize) -> Result<Self, String> {
        let (kind, scale, shift) = match spec {
            TransformSpec::MinMax { scale, min } => (TransformKind::MinMax, scale, min),
            TransformSpec::Standard { mean, scale } => (TransformKind::Standard, scale, mean),
        };

        if scale.len() != shift.len() {
            return Err(format!(
                "parameter vectors differ in length ({} vs {})",
                scale.len(),
                shift.len()
            ));
        }
        if scale.len() != expected_width {
            return Err(format!(
                "expected width {}, found {}",
                expected_width,
                scale.len()
            ));
        }
        if scale.iter().chain(shift.iter()).any(|v| !v.is_finite()) {
            return Err("parameters must be finite".to_string());
        }
        if scale.iter().any(|v| *v == 0.0) {
            return Err("scale must be non-zero".to_string());
        }

        Ok(Self {
            kind,
            scale: Array1::from(scale.clone()),
            shift: Array1::from(shift.clone()),
        })
    }

    fn width(&self) -> usize {
        self.scale.len()
    }

    fn check_width(&self, values: &ArrayView2<'_, f64>, context: &str) -> ForecastResult<()> {
        if values.ncols() != self.width() {
            return Err(ForecastError::ShapeMismatch {
                context: context.to_string(),
                expected: self.width(),
                actual: values.ncols(),
            });
        }
        Ok(())
    }

    fn forward(&self, values: ArrayView2<'_, f64>) -> Array2<f64> {
        match self.kind {
            TransformKind::MinMax => &values * &self.scale + &self.shift,
            TransformKind::Standard => (&values - &self.shift) / &self.scale,
        }
    }

    fn inverse(&self, values: ArrayView2<'_, f64>) -> Array2<f64> {
        match self.kind {
            TransformKind::MinMax => (&values - &self.shift) / &self.scale,
            TransformKind::Standard => &values * &self.scale + &self.shift,
        }
    }
}

/// Scaler backed by a loaded artifact
#[derive(Debug, Clone)]
pub struct FittedScaler {
    features: AffineTransform,
    targets: AffineTransform,
}

impl FittedScaler {
    /// Validate an artifact against the 19/6 feature/target widths
    pub fn from_artifact(artifact: &ScalerArtifact, source: &str) -> ForecastResult<Self> {
        let load_error = |reason: String| ForecastError::ScalerLoad {
            path: source.to_string(),
            reason,
        };
        let features = AffineTransform::compile(&artifact.features, FEATURE_WIDTH)
            .map_err(|e| load_error(format!("features: {}", e)))?;
        let targets = AffineTransform::compile(&artifact.targets, TARGET_WIDTH)
            .map_err(|e| load_error(format!("targets: {}", e)))?;
        Ok(Self { features, targets })
    }

    pub fn from_json(json: &str, source: &str) -> ForecastResult<Self> {
        let artifact: ScalerArtifact =
            serde_json::from_str(json).map_err(|e| ForecastError::ScalerLoad {
                path: source.to_string(),
                reason: e.to_string(),
            })?;
        Self::from_artifact(&artifact, source)
    }

    pub fn load(path: &Path) -> ForecastResult<Self> {
        let source = path.display().to_string();
        let json = std::fs::read_to_string(path).map_err(|e| ForecastError::ScalerLoad {
            path: source.clone(),
            reason: e.to_string(),
        })?;
        let scaler = Self::from_json(&json, &source)?;
        tracing::info!(path = %source, "Loaded scaler");
        Ok(scaler)
    }

    /// Identity min-max scaler, useful as a fixture
    pub fn identity() -> Self {
        let spec = |width: usize| AffineTransform {
            kind: TransformKind::MinMax,
            scale: Array1::ones(width),
            shift: Array1::zeros(width),
        };
        Self {
            features: spec(FEATURE_WIDTH),
            targets: spec(TARGET_WIDTH),
        }
    }
}

impl Scaler for FittedScaler {
    fn input_width(&self) -> usize {
        self.features.width()
    }

    fn target_width(&self) -> usize {
        self.targets.width()
    }

    fn transform(&self, features: ArrayView2<'_, f64>) -> ForecastResult<Array2<f64>> {
        self.features.check_width(&features, "scaler features")?;
        Ok(self.features.forward(features))
    }

    fn transform_targets(&self, targets: ArrayView2<'_, f64>) -> ForecastResult<Array2<f64>> {
        self.targets.check_width(&targets, "scaler targets")?;
        Ok(self.targets.forward(targets))
    }

    fn inverse_transform(&self, scaled: ArrayView2<'_, f64>) -> ForecastResult<Array2<f64>> {
        self.targets.check_width(&scaled, "scaler inverse targets")?;
        Ok(self.targets.inverse(scaled))
    }
}
