//! Sequence model capability and batched inference
//!
//! A model maps a batch of scaled windows `(batch, timesteps, features)` to
//! scaled multi-step outputs `(batch, output_steps, targets)`. Two artifact
//! kinds ship with the crate: a dense linear map over the flattened window,
//! and a stacked LSTM with a dense head on the last hidden state.

use std::path::Path;
use std::sync::Arc;

use ndarray::{concatenate, s, Array1, Array2, Array3, ArrayView1, ArrayView2, ArrayView3, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, ForecastResult};

/// Pure forward-pass capability of a trained sequence model
pub trait SequenceModel: Send + Sync {
    /// Source tag attached to predictions
    fn name(&self) -> &str;

    fn input_width(&self) -> usize;

    fn target_width(&self) -> usize;

    fn output_steps(&self) -> usize;

    /// Window length the model requires, if fixed
    fn expected_timesteps(&self) -> Option<usize>;

    fn forward(&self, batch: ArrayView3<'_, f64>) -> ForecastResult<Array3<f64>>;
}

// ============================================================================
// Artifacts
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    Linear(LinearArtifact),
    Lstm(LstmArtifact),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearArtifact {
    #[serde(default = "default_linear_name")]
    pub name: String,
    pub timesteps: usize,
    pub input_width: usize,
    pub target_width: usize,
    pub output_steps: usize,
    /// `(output_steps * target_width) x (timesteps * input_width)`
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LstmArtifact {
    #[serde(default = "default_lstm_name")]
    pub name: String,
    pub input_width: usize,
    pub target_width: usize,
    pub output_steps: usize,
    pub layers: Vec<LstmLayerArtifact>,
    pub head: DenseArtifact,
}

/// Gate blocks are stacked in the order input, forget, cell, output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LstmLayerArtifact {
    /// `4H x input`
    pub w_input: Vec<Vec<f64>>,
    /// `4H x H`
    pub w_hidden: Vec<Vec<f64>>,
    /// `4H`
    pub bias: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseArtifact {
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
}

fn default_linear_name() -> String {
    "Linear Model".to_string()
}

fn default_lstm_name() -> String {
    "LSTM Model".to_string()
}

fn matrix(rows: &[Vec<f64>], name: &str) -> Result<Array2<f64>, String> {
    let cols = rows.first().map(Vec::len).unwrap_or(0);
    if rows.is_empty() || cols == 0 {
        return Err(format!("{} is empty", name));
    }
    if rows.iter().any(|r| r.len() != cols) {
        return Err(format!("{} rows differ in length", name));
    }
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    if flat.iter().any(|v| !v.is_finite()) {
        return Err(format!("{} contains non-finite values", name));
    }
    Array2::from_shape_vec((rows.len(), cols), flat).map_err(|e| format!("{}: {}", name, e))
}

fn vector(values: &[f64], expected: usize, name: &str) -> Result<Array1<f64>, String> {
    if values.len() != expected {
        return Err(format!(
            "{} has length {}, expected {}",
            name,
            values.len(),
            expected
        ));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(format!("{} contains non-finite values", name));
    }
    Ok(Array1::from(values.to_vec()))
}

fn expect_shape(
    array: &Array2<f64>,
    rows: usize,
    cols: usize,
    name: &str,
) -> Result<(), String> {
    if array.dim() != (rows, cols) {
        return Err(format!(
            "{} has shape {:?}, expected ({}, {})",
            name,
            array.dim(),
            rows,
            cols
        ));
    }
    Ok(())
}

fn checked_dim(a: usize, b: usize) -> Result<usize, String> {
    a.checked_mul(b)
        .ok_or_else(|| format!("dimensions overflow ({} x {})", a, b))
}

/// Write one flat output vector into `(steps, targets)` of a batch slot
fn scatter_output(output: &mut Array3<f64>, slot: usize, flat: &Array1<f64>, targets: usize) {
    for (idx, value) in flat.iter().enumerate() {
        output[[slot, idx / targets, idx % targets]] = *value;
    }
}

// ============================================================================
// Linear model
// ============================================================================

/// Dense map from a flattened window to every output step at once
#[derive(Debug, Clone)]
pub struct LinearSequenceModel {
    name: String,
    timesteps: usize,
    input_width: usize,
    target_width: usize,
    output_steps: usize,
    weights: Array2<f64>,
    bias: Array1<f64>,
}

impl LinearSequenceModel {
    pub fn from_artifact(artifact: &LinearArtifact) -> Result<Self, String> {
        let outputs = checked_dim(artifact.output_steps, artifact.target_width)?;
        let inputs = checked_dim(artifact.timesteps, artifact.input_width)?;
        if outputs == 0 || inputs == 0 {
            return Err("dimensions must be non-zero".to_string());
        }
        let weights = matrix(&artifact.weights, "weights")?;
        expect_shape(&weights, outputs, inputs, "weights")?;
        let bias = vector(&artifact.bias, outputs, "bias")?;

        Ok(Self {
            name: artifact.name.clone(),
            timesteps: artifact.timesteps,
            input_width: artifact.input_width,
            target_width: artifact.target_width,
            output_steps: artifact.output_steps,
            weights,
            bias,
        })
    }
}

impl SequenceModel for LinearSequenceModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_width(&self) -> usize {
        self.input_width
    }

    fn target_width(&self) -> usize {
        self.target_width
    }

    fn output_steps(&self) -> usize {
        self.output_steps
    }

    fn expected_timesteps(&self) -> Option<usize> {
        Some(self.timesteps)
    }

    fn forward(&self, batch: ArrayView3<'_, f64>) -> ForecastResult<Array3<f64>> {
        let count = batch.dim().0;
        let mut output = Array3::zeros((count, self.output_steps, self.target_width));
        for (slot, window) in batch.axis_iter(Axis(0)).enumerate() {
            let flat: Array1<f64> = window.iter().copied().collect();
            let y = self.weights.dot(&flat) + &self.bias;
            scatter_output(&mut output, slot, &y, self.target_width);
        }
        Ok(output)
    }
}

// ============================================================================
// LSTM model
// ============================================================================

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[derive(Debug, Clone)]
struct LstmLayer {
    hidden: usize,
    w_input: Array2<f64>,
    w_hidden: Array2<f64>,
    bias: Array1<f64>,
}

impl LstmLayer {
    fn from_artifact(artifact: &LstmLayerArtifact, input: usize, index: usize) -> Result<Self, String> {
        let w_hidden = matrix(&artifact.w_hidden, &format!("layers[{}].w_hidden", index))?;
        let hidden = w_hidden.ncols();
        expect_shape(&w_hidden, 4 * hidden, hidden, &format!("layers[{}].w_hidden", index))?;
        let w_input = matrix(&artifact.w_input, &format!("layers[{}].w_input", index))?;
        expect_shape(&w_input, 4 * hidden, input, &format!("layers[{}].w_input", index))?;
        let bias = vector(&artifact.bias, 4 * hidden, &format!("layers[{}].bias", index))?;
        Ok(Self {
            hidden,
            w_input,
            w_hidden,
            bias,
        })
    }

    /// One time step; returns the next hidden and cell states
    fn step(
        &self,
        x: ArrayView1<'_, f64>,
        h_prev: &Array1<f64>,
        c_prev: &Array1<f64>,
    ) -> (Array1<f64>, Array1<f64>) {
        let h = self.hidden;
        let z = self.w_input.dot(&x) + self.w_hidden.dot(h_prev) + &self.bias;

        let i_gate = z.slice(s![0..h]).mapv(sigmoid);
        let f_gate = z.slice(s![h..2 * h]).mapv(sigmoid);
        let g = z.slice(s![2 * h..3 * h]).mapv(f64::tanh);
        let o_gate = z.slice(s![3 * h..4 * h]).mapv(sigmoid);

        let c_next = &f_gate * c_prev + &i_gate * &g;
        let h_next = &o_gate * &c_next.mapv(f64::tanh);
        (h_next, c_next)
    }

    /// Full sequence `(timesteps, input)` to hidden states `(timesteps, H)`
    fn run(&self, sequence: ArrayView2<'_, f64>) -> Array2<f64> {
        let mut h = Array1::zeros(self.hidden);
        let mut c = Array1::zeros(self.hidden);
        let mut states = Array2::zeros((sequence.nrows(), self.hidden));
        for (t, x) in sequence.axis_iter(Axis(0)).enumerate() {
            let (h_next, c_next) = self.step(x, &h, &c);
            states.row_mut(t).assign(&h_next);
            h = h_next;
            c = c_next;
        }
        states
    }
}

/// Stacked LSTM with a dense head over the last hidden state
#[derive(Debug, Clone)]
pub struct LstmSequenceModel {
    name: String,
    input_width: usize,
    target_width: usize,
    output_steps: usize,
    layers: Vec<LstmLayer>,
    head_weights: Array2<f64>,
    head_bias: Array1<f64>,
}

impl LstmSequenceModel {
    pub fn from_artifact(artifact: &LstmArtifact) -> Result<Self, String> {
        if artifact.layers.is_empty() {
            return Err("at least one LSTM layer is required".to_string());
        }
        let outputs = checked_dim(artifact.output_steps, artifact.target_width)?;
        if outputs == 0 || artifact.input_width == 0 {
            return Err("dimensions must be non-zero".to_string());
        }

        let mut layers = Vec::with_capacity(artifact.layers.len());
        let mut width = artifact.input_width;
        for (index, layer) in artifact.layers.iter().enumerate() {
            let layer = LstmLayer::from_artifact(layer, width, index)?;
            width = layer.hidden;
            layers.push(layer);
        }

        let head_weights = matrix(&artifact.head.weights, "head.weights")?;
        expect_shape(&head_weights, outputs, width, "head.weights")?;
        let head_bias = vector(&artifact.head.bias, outputs, "head.bias")?;

        Ok(Self {
            name: artifact.name.clone(),
            input_width: artifact.input_width,
            target_width: artifact.target_width,
            output_steps: artifact.output_steps,
            layers,
            head_weights,
            head_bias,
        })
    }
}

impl SequenceModel for LstmSequenceModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_width(&self) -> usize {
        self.input_width
    }

    fn target_width(&self) -> usize {
        self.target_width
    }

    fn output_steps(&self) -> usize {
        self.output_steps
    }

    fn expected_timesteps(&self) -> Option<usize> {
        None
    }

    fn forward(&self, batch: ArrayView3<'_, f64>) -> ForecastResult<Array3<f64>> {
        let count = batch.dim().0;
        let mut output = Array3::zeros((count, self.output_steps, self.target_width));
        for (slot, window) in batch.axis_iter(Axis(0)).enumerate() {
            let mut sequence = window.to_owned();
            for layer in &self.layers {
                sequence = layer.run(sequence.view());
            }
            let last = sequence.nrows().checked_sub(1).ok_or_else(|| {
                ForecastError::ShapeMismatch {
                    context: "LSTM window length".to_string(),
                    expected: 1,
                    actual: 0,
                }
            })?;
            let y = self.head_weights.dot(&sequence.row(last)) + &self.head_bias;
            scatter_output(&mut output, slot, &y, self.target_width);
        }
        Ok(output)
    }
}

// ============================================================================
// Loading
// ============================================================================

pub fn model_from_artifact(
    artifact: &ModelArtifact,
    source: &str,
) -> ForecastResult<Arc<dyn SequenceModel>> {
    let load_error = |reason: String| ForecastError::ModelLoad {
        path: source.to_string(),
        reason,
    };
    let model: Arc<dyn SequenceModel> = match artifact {
        ModelArtifact::Linear(a) => Arc::new(LinearSequenceModel::from_artifact(a).map_err(load_error)?),
        ModelArtifact::Lstm(a) => Arc::new(LstmSequenceModel::from_artifact(a).map_err(load_error)?),
    };
    Ok(model)
}

pub fn model_from_json(json: &str, source: &str) -> ForecastResult<Arc<dyn SequenceModel>> {
    let artifact: ModelArtifact =
        serde_json::from_str(json).map_err(|e| ForecastError::ModelLoad {
            path: source.to_string(),
            reason: e.to_string(),
        })?;
    model_from_artifact(&artifact, source)
}

pub fn load_model(path: &Path) -> ForecastResult<Arc<dyn SequenceModel>> {
    let source = path.display().to_string();
    let json = std::fs::read_to_string(path).map_err(|e| ForecastError::ModelLoad {
        path: source.clone(),
        reason: e.to_string(),
    })?;
    let model = model_from_json(&json, &source)?;
    tracing::info!(
        path = %source,
        name = model.name(),
        output_steps = model.output_steps(),
        "Loaded sequence model"
    );
    Ok(model)
}

// ============================================================================
// Predictor
// ============================================================================

/// Runs a shared model over window batches in fixed-size chunks
#[derive(Clone)]
pub struct SequencePredictor {
    model: Arc<dyn SequenceModel>,
    batch_size: usize,
}

impl SequencePredictor {
    pub fn new(model: Arc<dyn SequenceModel>, batch_size: usize) -> Self {
        Self {
            model,
            batch_size: batch_size.max(1),
        }
    }

    pub fn model(&self) -> &dyn SequenceModel {
        self.model.as_ref()
    }

    /// Scaled outputs `(windows, output_steps, targets)` for scaled windows
    pub fn predict(&self, windows: ArrayView3<'_, f64>) -> ForecastResult<Array3<f64>> {
        let (count, timesteps, width) = windows.dim();
        if width != self.model.input_width() {
            return Err(ForecastError::ShapeMismatch {
                context: "model input width".to_string(),
                expected: self.model.input_width(),
                actual: width,
            });
        }
        if let Some(expected) = self.model.expected_timesteps() {
            if timesteps != expected {
                return Err(ForecastError::ShapeMismatch {
                    context: "model window length".to_string(),
                    expected,
                    actual: timesteps,
                });
            }
        }

        let steps = self.model.output_steps();
        let targets = self.model.target_width();
        if count == 0 {
            return Ok(Array3::zeros((0, steps, targets)));
        }

        let mut chunks = Vec::new();
        for chunk in windows.axis_chunks_iter(Axis(0), self.batch_size) {
            let output = self.model.forward(chunk)?;
            if output.dim() != (chunk.dim().0, steps, targets) {
                return Err(ForecastError::ShapeMismatch {
                    context: "model output".to_string(),
                    expected: chunk.dim().0 * steps * targets,
                    actual: output.len(),
                });
            }
            chunks.push(output);
        }

        let views: Vec<_> = chunks.iter().map(|c| c.view()).collect();
        concatenate(Axis(0), &views).map_err(|e| ForecastError::Internal(e.to_string()))
    }
}
