//! Rejection and validation response bodies.
//!
//! Detector matches answer with a fixed generic message; which pattern
//! matched is an operational detail that stays in logs and event
//! metadata, never in the response.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Body for input-rejection errors.
#[derive(Debug, Serialize)]
pub struct RejectBody {
    pub code: &'static str,
    pub message: &'static str,
}

/// The pipeline's rejection response: user-correctable, not retried.
pub fn invalid_input() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(RejectBody {
            code: "INVALID_INPUT",
            message: "Invalid input detected",
        }),
    )
        .into_response()
}

pub fn payload_too_large() -> Response {
    (
        StatusCode::PAYLOAD_TOO_LARGE,
        Json(RejectBody {
            code: "PAYLOAD_TOO_LARGE",
            message: "Request body exceeds the configured limit",
        }),
    )
        .into_response()
}

/// One field-level validation message.
#[derive(Debug, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
struct ValidationBody {
    code: &'static str,
    errors: Vec<FieldError>,
}

/// Structured 400 for admin endpoint validation failures.
pub fn validation_failed(errors: Vec<FieldError>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ValidationBody {
            code: "VALIDATION_ERROR",
            errors,
        }),
    )
        .into_response()
}
