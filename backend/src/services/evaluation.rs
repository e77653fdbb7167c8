//! Offline scoring of the model against held-out hours
//!
//! Compares model output with the observed values that followed each window,
//! and with a historical-mean baseline.

use std::path::Path;

use ndarray::{ArrayView2, Axis};
use serde::Serialize;
use shared::PhysicalField;

use crate::error::{ForecastError, ForecastResult};

pub const COMPARISON_CSV: &str = "model_vs_baseline.csv";
pub const PREDICTIONS_CSV: &str = "real_predictions.csv";

const HUBER_DELTA: f64 = 1.0;

/// Loss weight for a target; temperature and precipitation count double
pub fn loss_weight(field: PhysicalField) -> f64 {
    match field {
        PhysicalField::Temperature | PhysicalField::Precipitation => 2.0,
        _ => 1.0,
    }
}

fn huber(error: f64) -> f64 {
    let abs = error.abs();
    if abs <= HUBER_DELTA {
        0.5 * error * error
    } else {
        HUBER_DELTA * abs - 0.5 * HUBER_DELTA * HUBER_DELTA
    }
}

/// Mean Huber loss (delta 1) after weighting each target column.
///
/// Both inputs are `(rows, targets)` in scaled units; `weights` has one entry
/// per target column.
pub fn weighted_huber_loss(
    truth: ArrayView2<'_, f64>,
    predicted: ArrayView2<'_, f64>,
    weights: &[f64],
) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let mut total = 0.0;
    for (t_row, p_row) in truth.axis_iter(Axis(0)).zip(predicted.axis_iter(Axis(0))) {
        for ((t, p), w) in t_row.iter().zip(p_row.iter()).zip(weights) {
            total += huber(t * w - p * w);
        }
    }
    total / truth.len() as f64
}

fn mae(truth: &[f64], predicted: &[f64]) -> f64 {
    let n = truth.len().max(1) as f64;
    truth
        .iter()
        .zip(predicted)
        .map(|(t, p)| (t - p).abs())
        .sum::<f64>()
        / n
}

fn rmse(truth: &[f64], predicted: &[f64]) -> f64 {
    let n = truth.len().max(1) as f64;
    (truth
        .iter()
        .zip(predicted)
        .map(|(t, p)| (t - p).powi(2))
        .sum::<f64>()
        / n)
        .sqrt()
}

/// Error metrics for one target column
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TargetMetrics {
    pub target: String,
    /// `None` when the observed column is all zero
    pub mae: Option<f64>,
    pub rmse: Option<f64>,
    pub baseline_mae: f64,
    pub baseline_rmse: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EvaluationReport {
    pub model: String,
    pub windows: usize,
    pub output_steps: usize,
    pub weighted_huber_loss: f64,
    pub metrics: Vec<TargetMetrics>,
    pub target_columns: Vec<String>,
    /// Physical predictions, one row per window step
    #[serde(skip)]
    pub predictions: Vec<Vec<f64>>,
}

/// Inputs gathered by the pipeline for scoring
pub struct EvaluationInputs<'a> {
    pub model: &'a str,
    pub target_columns: &'a [PhysicalField],
    pub windows: usize,
    pub output_steps: usize,
    /// Every observed target row, physical units
    pub observed: ArrayView2<'a, f64>,
    /// Truth blocks flattened to `(windows * steps, targets)`, physical units
    pub truth: ArrayView2<'a, f64>,
    pub predicted: ArrayView2<'a, f64>,
    pub truth_scaled: ArrayView2<'a, f64>,
    pub predicted_scaled: ArrayView2<'a, f64>,
}

impl EvaluationReport {
    pub fn build(inputs: EvaluationInputs<'_>) -> Self {
        let mut metrics = Vec::with_capacity(inputs.target_columns.len());
        for (j, field) in inputs.target_columns.iter().enumerate() {
            let truth = inputs.truth.column(j).to_vec();
            let predicted = inputs.predicted.column(j).to_vec();
            let all_zero = inputs.observed.column(j).iter().all(|v| *v == 0.0);

            let mean = if truth.is_empty() {
                0.0
            } else {
                truth.iter().sum::<f64>() / truth.len() as f64
            };
            let baseline = vec![mean; truth.len()];

            metrics.push(TargetMetrics {
                target: field.column_name().to_string(),
                mae: (!all_zero).then(|| mae(&truth, &predicted)),
                rmse: (!all_zero).then(|| rmse(&truth, &predicted)),
                baseline_mae: mae(&truth, &baseline),
                baseline_rmse: rmse(&truth, &baseline),
            });
        }

        let weights: Vec<f64> = inputs.target_columns.iter().map(|f| loss_weight(*f)).collect();

        Self {
            model: inputs.model.to_string(),
            windows: inputs.windows,
            output_steps: inputs.output_steps,
            weighted_huber_loss: weighted_huber_loss(
                inputs.truth_scaled,
                inputs.predicted_scaled,
                &weights,
            ),
            metrics,
            target_columns: inputs
                .target_columns
                .iter()
                .map(|f| f.column_name().to_string())
                .collect(),
            predictions: inputs
                .predicted
                .axis_iter(Axis(0))
                .map(|row| row.to_vec())
                .collect(),
        }
    }

    pub fn metrics_for(&self, field: PhysicalField) -> Option<&TargetMetrics> {
        self.metrics
            .iter()
            .find(|m| m.target == field.column_name())
    }

    /// Model and baseline errors per target
    pub fn comparison_csv(&self) -> ForecastResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in &self.metrics {
            wtr.serialize(record)?;
        }
        into_string(wtr)
    }

    /// Physical predictions with their window and step
    pub fn predictions_csv(&self) -> ForecastResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        let mut header = vec!["window".to_string(), "step".to_string()];
        header.extend(self.target_columns.iter().cloned());
        wtr.write_record(&header)?;

        let steps = self.output_steps.max(1);
        for (i, row) in self.predictions.iter().enumerate() {
            let mut record = vec![(i / steps).to_string(), (i % steps).to_string()];
            record.extend(row.iter().map(|v| v.to_string()));
            wtr.write_record(&record)?;
        }
        into_string(wtr)
    }

    /// Write both CSV files into `dir`, creating it if needed
    pub fn write_csv(&self, dir: &Path) -> ForecastResult<()> {
        std::fs::create_dir_all(dir)?;
        std::fs::write(dir.join(COMPARISON_CSV), self.comparison_csv()?)?;
        std::fs::write(dir.join(PREDICTIONS_CSV), self.predictions_csv()?)?;
        tracing::info!(dir = %dir.display(), "Wrote evaluation CSV files");
        Ok(())
    }
}

fn into_string(wtr: csv::Writer<Vec<u8>>) -> ForecastResult<String> {
    let bytes = wtr
        .into_inner()
        .map_err(|e| ForecastError::Internal(format!("CSV writer error: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|e| ForecastError::Internal(format!("UTF-8 conversion error: {}", e)))
}
