//! Error handling for the weather forecast pipeline
//!
//! Provides consistent error responses in English and Vietnamese

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pipeline error types
#[derive(Error, Debug)]
pub enum ForecastError {
    // Client-correctable input errors
    #[error("Insufficient data: {required} observations required, {actual} supplied")]
    InsufficientData { required: usize, actual: usize },

    #[error("Missing required field {field} at row {row}")]
    MissingField { field: String, row: usize },

    #[error("Invalid observations: {0}")]
    InvalidObservations(String),

    #[error("Observation gap at {at}: expected {expected_minutes} minutes, found {actual_minutes}")]
    ObservationGap {
        at: NaiveDateTime,
        expected_minutes: i64,
        actual_minutes: i64,
    },

    // Artifact errors
    #[error("Failed to load scaler from {path}: {reason}")]
    ScalerLoad { path: String, reason: String },

    #[error("Failed to load model from {path}: {reason}")]
    ModelLoad { path: String, reason: String },

    #[error("Shape mismatch in {context}: expected {expected}, found {actual}")]
    ShapeMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Configuration error: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    // Collaborator errors
    #[error("Observation source error: {0}")]
    ObservationSource(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorDetail {
    pub code: String,
    pub message_en: String,
    pub message_vi: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ForecastError {
    /// HTTP-style status for a surrounding service
    pub fn status_code(&self) -> u16 {
        match self {
            ForecastError::InsufficientData { .. }
            | ForecastError::MissingField { .. }
            | ForecastError::ObservationGap { .. } => 422,
            ForecastError::InvalidObservations(_) => 400,
            ForecastError::ObservationSource(_) | ForecastError::Csv(_) => 502,
            ForecastError::ScalerLoad { .. }
            | ForecastError::ModelLoad { .. }
            | ForecastError::ShapeMismatch { .. }
            | ForecastError::Configuration(_)
            | ForecastError::ConfigLoad(_)
            | ForecastError::Io(_)
            | ForecastError::Internal(_) => 500,
        }
    }

    /// Whether the caller can fix the request and retry
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    pub fn detail(&self) -> ErrorDetail {
        match self {
            ForecastError::InsufficientData { required, actual } => ErrorDetail {
                code: "INSUFFICIENT_DATA".to_string(),
                message_en: format!(
                    "At least {} hourly observations are required, {} supplied",
                    required, actual
                ),
                message_vi: format!(
                    "Không đủ dữ liệu để dự báo. Cần ít nhất {} mẫu, hiện có {}",
                    required, actual
                ),
                field: None,
            },
            ForecastError::MissingField { field, row } => ErrorDetail {
                code: "MISSING_FIELD".to_string(),
                message_en: format!("Required field {} is missing at row {}", field, row),
                message_vi: format!("Thiếu trường bắt buộc {} tại dòng {}", field, row),
                field: Some(field.clone()),
            },
            ForecastError::InvalidObservations(msg) => ErrorDetail {
                code: "INVALID_OBSERVATIONS".to_string(),
                message_en: msg.clone(),
                message_vi: format!("Dữ liệu quan trắc không hợp lệ: {}", msg),
                field: None,
            },
            ForecastError::ObservationGap {
                at,
                expected_minutes,
                actual_minutes,
            } => ErrorDetail {
                code: "OBSERVATION_GAP".to_string(),
                message_en: format!(
                    "Observation at {} is {} minutes after its predecessor, expected {}",
                    at, actual_minutes, expected_minutes
                ),
                message_vi: format!(
                    "Dữ liệu bị gián đoạn tại {}: cách {} phút, yêu cầu {} phút",
                    at, actual_minutes, expected_minutes
                ),
                field: Some("timestamp".to_string()),
            },
            ForecastError::ScalerLoad { path, .. } => ErrorDetail {
                code: "SCALER_LOAD_ERROR".to_string(),
                message_en: format!("Scaler artifact could not be loaded: {}", path),
                message_vi: format!("Không thể tải scaler: {}", path),
                field: None,
            },
            ForecastError::ModelLoad { path, .. } => ErrorDetail {
                code: "MODEL_LOAD_ERROR".to_string(),
                message_en: format!("Model artifact could not be loaded: {}", path),
                message_vi: format!("Không thể tải mô hình: {}", path),
                field: None,
            },
            ForecastError::ShapeMismatch {
                context,
                expected,
                actual,
            } => ErrorDetail {
                code: "SHAPE_MISMATCH".to_string(),
                message_en: format!(
                    "{}: expected width {}, found {}",
                    context, expected, actual
                ),
                message_vi: format!(
                    "Kích thước không khớp ({}): cần {}, nhận {}",
                    context, expected, actual
                ),
                field: None,
            },
            ForecastError::Configuration(msg) => ErrorDetail {
                code: "CONFIGURATION_ERROR".to_string(),
                message_en: format!("Configuration error: {}", msg),
                message_vi: format!("Lỗi cấu hình: {}", msg),
                field: None,
            },
            ForecastError::ConfigLoad(e) => ErrorDetail {
                code: "CONFIGURATION_ERROR".to_string(),
                message_en: format!("Configuration error: {}", e),
                message_vi: "Lỗi khi đọc cấu hình".to_string(),
                field: None,
            },
            ForecastError::ObservationSource(msg) => ErrorDetail {
                code: "OBSERVATION_SOURCE_ERROR".to_string(),
                message_en: format!("Observation source error: {}", msg),
                message_vi: format!("Lỗi nguồn dữ liệu quan trắc: {}", msg),
                field: None,
            },
            ForecastError::Csv(e) => ErrorDetail {
                code: "CSV_ERROR".to_string(),
                message_en: format!("Malformed observation CSV: {}", e),
                message_vi: "Tệp CSV dữ liệu quan trắc không hợp lệ".to_string(),
                field: None,
            },
            ForecastError::Io(_) => ErrorDetail {
                code: "IO_ERROR".to_string(),
                message_en: "An I/O error occurred".to_string(),
                message_vi: "Đã xảy ra lỗi nhập/xuất".to_string(),
                field: None,
            },
            ForecastError::Internal(msg) => ErrorDetail {
                code: "INTERNAL_ERROR".to_string(),
                message_en: msg.clone(),
                message_vi: "Lỗi nội bộ".to_string(),
                field: None,
            },
        }
    }

    /// Build the serializable response, logging the error
    pub fn to_response(&self) -> ErrorResponse {
        tracing::error!("Error: {:?}", self);
        ErrorResponse {
            error: self.detail(),
        }
    }
}

/// Result type alias for pipeline operations
pub type ForecastResult<T> = Result<T, ForecastError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_map_to_4xx() {
        let err = ForecastError::InsufficientData {
            required: 48,
            actual: 47,
        };
        assert_eq!(err.status_code(), 422);
        assert!(err.is_client_error());

        let err = ForecastError::InvalidObservations("unsorted".to_string());
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_artifact_errors_map_to_5xx() {
        let err = ForecastError::ModelLoad {
            path: "models/model.json".to_string(),
            reason: "missing".to_string(),
        };
        assert_eq!(err.status_code(), 500);
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_missing_field_names_field() {
        let err = ForecastError::MissingField {
            field: "PS".to_string(),
            row: 3,
        };
        let response = err.to_response();
        assert_eq!(response.error.code, "MISSING_FIELD");
        assert_eq!(response.error.field.as_deref(), Some("PS"));
        assert!(err.to_string().contains("row 3"));
    }
}
