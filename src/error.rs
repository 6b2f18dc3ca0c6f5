//! Error types.
//!
//! `ValidationError` is raised by the aggregator for bad numeric input.
//! `ApiError` wraps everything a handler can fail with and maps it onto an
//! HTTP status and JSON body.

use crate::models::RecordField;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use thiserror::Error;

/// Invalid numeric input found while aggregating.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A telemetry record field was not a JSON number.
    #[error("record {index}: field `{field}` is not numeric")]
    NonNumeric { index: usize, field: RecordField },

    /// A telemetry record field was numeric but outside its allowed range.
    #[error("record {index}: field `{field}` is out of range ({value})")]
    OutOfRange {
        index: usize,
        field: RecordField,
        value: f64,
    },

    /// The request threshold was present but not a number.
    #[error("field `threshold_ms` is not numeric")]
    NonNumericThreshold,

    /// The request threshold was not a finite number.
    #[error("field `threshold_ms` must be finite")]
    InvalidThreshold,
}

impl ValidationError {
    /// Name of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::NonNumeric { field, .. } | ValidationError::OutOfRange { field, .. } => {
                field.as_str()
            }
            ValidationError::NonNumericThreshold | ValidationError::InvalidThreshold => {
                "threshold_ms"
            }
        }
    }

    /// Index of the offending telemetry record, if the error concerns one.
    pub fn record_index(&self) -> Option<usize> {
        match self {
            ValidationError::NonNumeric { index, .. } | ValidationError::OutOfRange { index, .. } => {
                Some(*index)
            }
            _ => None,
        }
    }
}

/// Errors returned by the HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request body was missing or not valid JSON for the expected shape.
    #[error("malformed request body: {0}")]
    MalformedBody(#[from] serde_json::Error),

    /// Input parsed but failed numeric validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

/// JSON body of an error response.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    field: Option<&'static str>,
    index: Option<usize>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (field, index) = match &self {
            ApiError::Validation(e) => (Some(e.field()), e.record_index()),
            ApiError::MalformedBody(_) => (None, None),
        };
        let body = ErrorBody {
            error: self.to_string(),
            field,
            index,
        };
        (self.status(), Json(body)).into_response()
    }
}
