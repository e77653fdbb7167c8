//! Concurrent forecasts for many locations

use std::sync::Arc;

use serde::Serialize;
use shared::{Location, LocationForecast, Observation};
use tracing::Instrument;
use uuid::Uuid;

use crate::error::{ErrorDetail, ForecastError};
use crate::services::pipeline::ForecastPipeline;

/// Observations for one named location
#[derive(Debug, Clone)]
pub struct LocationRequest {
    pub location: Location,
    pub observations: Vec<Observation>,
}

/// Outcome for one location; failures do not affect other locations
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LocationReport {
    Completed {
        #[serde(flatten)]
        forecast: LocationForecast,
    },
    Failed {
        location: Location,
        error: ErrorDetail,
    },
}

impl LocationReport {
    pub fn location(&self) -> &Location {
        match self {
            LocationReport::Completed { forecast } => &forecast.location,
            LocationReport::Failed { location, .. } => location,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, LocationReport::Completed { .. })
    }
}

/// Runs the shared pipeline on the blocking pool, one task per location
#[derive(Clone)]
pub struct ForecastRunner {
    pipeline: Arc<ForecastPipeline>,
}

impl ForecastRunner {
    pub fn new(pipeline: Arc<ForecastPipeline>) -> Self {
        Self { pipeline }
    }

    /// Forecast every request concurrently; reports keep input order
    pub async fn run(&self, requests: Vec<LocationRequest>) -> Vec<LocationReport> {
        let mut handles = Vec::with_capacity(requests.len());
        for request in requests {
            let pipeline = Arc::clone(&self.pipeline);
            let location = request.location.clone();
            let span = tracing::info_span!(
                "location_forecast",
                run_id = %Uuid::new_v4(),
                location = %location.name
            );
            let task_span = span.clone();
            let handle = tokio::task::spawn_blocking(move || {
                let _guard = task_span.enter();
                pipeline.forecast(request.location, &request.observations)
            });
            handles.push((location, span, handle));
        }

        let mut reports = Vec::with_capacity(handles.len());
        for (location, span, handle) in handles {
            let outcome = handle.instrument(span.clone()).await;
            let report = span.in_scope(|| match outcome {
                Ok(Ok(forecast)) => LocationReport::Completed { forecast },
                Ok(Err(err)) => LocationReport::Failed {
                    location,
                    error: err.to_response().error,
                },
                Err(join_err) => LocationReport::Failed {
                    location,
                    error: ForecastError::Internal(format!("forecast task failed: {}", join_err))
                        .to_response()
                        .error,
                },
            });
            reports.push(report);
        }

        let failed = reports.iter().filter(|r| !r.is_completed()).count();
        tracing::info!(locations = reports.len(), failed, "Multi-location run complete");
        reports
    }
}
