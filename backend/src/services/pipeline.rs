//! End-to-end forecasting over an observation sequence
//!
//! raw observations -> features -> scaled features -> windows -> model ->
//! physical targets -> classified predictions -> calendar days

use std::sync::Arc;

use chrono::Duration;
use ndarray::{Array2, Array3};
use shared::{
    classify_condition, classify_current, find_order_violation, find_spacing_gap,
    validate_coordinates, ConditionInputs, CurrentConditions, ForecastAssembler, Location,
    LocationForecast, Observation, PhysicalField, Prediction, TargetValues, HOURLY_STEP_MINUTES,
    OBSERVATION_SOURCE,
};

use crate::config::{GapPolicy, PipelineConfig};
use crate::error::{ForecastError, ForecastResult};
use crate::services::evaluation::{EvaluationInputs, EvaluationReport};
use crate::services::features::{log_column_summary, FeatureEngineer};
use crate::services::predictor::{SequenceModel, SequencePredictor};
use crate::services::scaler::Scaler;
use crate::services::windows::WindowBatcher;

/// Immutable pipeline shared by every request
pub struct ForecastPipeline {
    config: PipelineConfig,
    engineer: FeatureEngineer,
    scaler: Arc<dyn Scaler>,
    batcher: WindowBatcher,
    predictor: SequencePredictor,
    assembler: ForecastAssembler,
}

impl ForecastPipeline {
    /// Check dimensionality once and assemble the components
    pub fn new(
        config: PipelineConfig,
        scaler: Arc<dyn Scaler>,
        model: Arc<dyn SequenceModel>,
    ) -> ForecastResult<Self> {
        config.check()?;
        let columns = config.resolved_feature_columns()?;
        let targets = config.resolved_target_columns()?;

        let checks = [
            ("scaler input width", columns.len(), scaler.input_width()),
            ("scaler target width", targets.len(), scaler.target_width()),
            ("model input width", columns.len(), model.input_width()),
            ("model target width", targets.len(), model.target_width()),
        ];
        for (context, expected, actual) in checks {
            if expected != actual {
                return Err(ForecastError::ShapeMismatch {
                    context: context.to_string(),
                    expected,
                    actual,
                });
            }
        }
        if let Some(actual) = model.expected_timesteps() {
            if actual != config.timesteps {
                return Err(ForecastError::ShapeMismatch {
                    context: "model window length".to_string(),
                    expected: config.timesteps,
                    actual,
                });
            }
        }

        tracing::info!(
            model = model.name(),
            timesteps = config.timesteps,
            batch_size = config.batch_size,
            horizon_days = config.horizon_days,
            "Forecast pipeline ready"
        );

        Ok(Self {
            engineer: FeatureEngineer::new(columns, targets),
            batcher: WindowBatcher::new(config.timesteps),
            predictor: SequencePredictor::new(model, config.batch_size),
            assembler: ForecastAssembler::new(config.horizon_days),
            scaler,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn model_name(&self) -> &str {
        self.predictor.model().name()
    }

    fn check_sequence(&self, observations: &[Observation]) -> ForecastResult<()> {
        if let Some(row) = find_order_violation(observations) {
            return Err(ForecastError::InvalidObservations(format!(
                "timestamps must be strictly increasing (row {})",
                row
            )));
        }
        for (row, observation) in observations.iter().enumerate() {
            validate_coordinates(observation.latitude, observation.longitude).map_err(|msg| {
                ForecastError::InvalidObservations(format!("{} (row {})", msg, row))
            })?;
        }
        if self.config.gap_policy == GapPolicy::Reject {
            if let Some(gap) =
                find_spacing_gap(observations, Duration::minutes(HOURLY_STEP_MINUTES))
            {
                return Err(ForecastError::ObservationGap {
                    at: observations[gap.index].timestamp,
                    expected_minutes: HOURLY_STEP_MINUTES,
                    actual_minutes: gap.actual_minutes,
                });
            }
        }
        Ok(())
    }

    fn target_names(&self) -> Vec<&'static str> {
        self.engineer
            .target_columns()
            .iter()
            .map(|f| f.column_name())
            .collect()
    }

    /// Flatten `(windows, steps, targets)` into `(windows * steps, targets)`
    fn flatten(block: Array3<f64>) -> ForecastResult<Array2<f64>> {
        let (windows, steps, targets) = block.dim();
        block
            .into_shape((windows * steps, targets))
            .map_err(|e| ForecastError::Internal(format!("reshape failed: {}", e)))
    }

    /// Hourly predictions following the last observation.
    ///
    /// Requires at least `timesteps` observations in strictly increasing
    /// time order. Every window contributes `output_steps` rows; row *i* is
    /// stamped `last + (i + 1)` hours.
    pub fn predict(&self, observations: &[Observation]) -> ForecastResult<Vec<Prediction>> {
        let required = self.config.timesteps;
        if observations.len() < required {
            return Err(ForecastError::InsufficientData {
                required,
                actual: observations.len(),
            });
        }
        self.check_sequence(observations)?;

        tracing::info!(rows = observations.len(), "Starting prediction");

        let matrix = self.engineer.engineer(observations)?;
        let scaled = self.scaler.transform(matrix.features.view())?;
        let feature_names: Vec<&str> = matrix.columns.iter().map(|c| c.name()).collect();
        log_column_summary("scaled features", &feature_names, scaled.view());

        let windows = self.batcher.batch(scaled.view());
        tracing::info!(windows = windows.dim().0, "Built windows");

        let output = self.predictor.predict(windows.view())?;
        let physical = self
            .scaler
            .inverse_transform(Self::flatten(output)?.view())?;
        log_column_summary("predictions", &self.target_names(), physical.view());

        let last = matrix
            .timestamps
            .last()
            .copied()
            .ok_or(ForecastError::InsufficientData {
                required,
                actual: 0,
            })?;
        let source = self.model_name().to_string();
        let targets = self.engineer.target_columns();

        let predictions: Vec<Prediction> = physical
            .rows()
            .into_iter()
            .enumerate()
            .map(|(i, row)| {
                let values = TargetValues::from_row(targets, row.iter().copied());
                let condition = classify_condition(&condition_inputs(&values));
                Prediction::new(
                    last + Duration::hours(i as i64 + 1),
                    values,
                    condition,
                    source.clone(),
                )
            })
            .collect();

        tracing::info!(predictions = predictions.len(), "Prediction complete");
        Ok(predictions)
    }

    /// Predictions grouped into at most `horizon_days` calendar days
    pub fn forecast(
        &self,
        location: Location,
        observations: &[Observation],
    ) -> ForecastResult<LocationForecast> {
        let predictions = self.predict(observations)?;
        let forecast = self.assembler.assemble(predictions);
        tracing::info!(
            days = forecast.len(),
            horizon_days = self.assembler.horizon_days(),
            location = %location.name,
            "Assembled forecast"
        );
        Ok(LocationForecast { location, forecast })
    }

    /// Latest observation classified by the radiation-only rule
    pub fn current(
        &self,
        location: Location,
        observations: &[Observation],
    ) -> ForecastResult<CurrentConditions> {
        let (row, latest) = observations
            .iter()
            .enumerate()
            .max_by_key(|(_, o)| o.timestamp)
            .ok_or(ForecastError::InsufficientData {
                required: 1,
                actual: 0,
            })?;

        let mut values = TargetValues::default();
        for field in PhysicalField::ALL {
            let value = latest
                .usable_value(field)
                .ok_or_else(|| ForecastError::MissingField {
                    field: field.column_name().to_string(),
                    row,
                })?;
            values.set(field, value);
        }

        let condition = classify_current(values.clear_sky_radiation);
        Ok(CurrentConditions {
            location,
            timestamp: latest.timestamp,
            values,
            condition: condition.label,
            description: condition.description,
            icon: condition.icon,
            source: OBSERVATION_SOURCE.to_string(),
        })
    }

    /// Score the model on windows whose following `output_steps` hours are
    /// known
    pub fn evaluate(&self, observations: &[Observation]) -> ForecastResult<EvaluationReport> {
        let steps = self.config.output_steps;
        let required = self.config.timesteps + steps;
        if observations.len() < required {
            return Err(ForecastError::InsufficientData {
                required,
                actual: observations.len(),
            });
        }
        let model_steps = self.predictor.model().output_steps();
        if model_steps != steps {
            return Err(ForecastError::ShapeMismatch {
                context: "model output steps".to_string(),
                expected: steps,
                actual: model_steps,
            });
        }
        self.check_sequence(observations)?;

        tracing::info!(rows = observations.len(), output_steps = steps, "Starting evaluation");

        let matrix = self.engineer.engineer(observations)?;
        let scaled = self.scaler.transform(matrix.features.view())?;
        let (inputs, truth) =
            self.batcher
                .batch_with_horizon(scaled.view(), matrix.targets.view(), steps);
        let windows = inputs.dim().0;

        let predicted_scaled = Self::flatten(self.predictor.predict(inputs.view())?)?;
        let predicted = self.scaler.inverse_transform(predicted_scaled.view())?;
        let truth = Self::flatten(truth)?;
        let truth_scaled = self.scaler.transform_targets(truth.view())?;

        let report = EvaluationReport::build(EvaluationInputs {
            model: self.model_name(),
            target_columns: self.engineer.target_columns(),
            windows,
            output_steps: steps,
            observed: matrix.targets.view(),
            truth: truth.view(),
            predicted: predicted.view(),
            truth_scaled: truth_scaled.view(),
            predicted_scaled: predicted_scaled.view(),
        });

        tracing::info!(
            windows,
            weighted_huber_loss = report.weighted_huber_loss,
            "Evaluation complete"
        );
        Ok(report)
    }
}

fn condition_inputs(values: &TargetValues) -> ConditionInputs {
    ConditionInputs {
        temperature: values.temperature,
        precipitation: values.precipitation,
        wind_speed: values.wind_speed,
        humidity_fraction: values.specific_humidity,
        pressure: values.surface_pressure,
    }
}
