//! Response payloads and helpers for collection endpoints.

use datamart_core::transport::{ProblemDetails, WireResponse};
use datamart_core::FieldErrors;
use serde_json::Value;

use crate::router::RouterError;

/// Problem payload for an error status.
pub fn error_response(
    status: u16,
    title: &str,
    detail: Option<String>,
    errors: Option<FieldErrors>,
) -> ProblemDetails {
    let mut problem = ProblemDetails::titled(title, status);
    if let Some(detail) = detail {
        problem = problem.with_detail(detail);
    }
    if let Some(errors) = errors {
        problem = problem.with_errors(errors);
    }
    problem
}

/// JSON response with `body` as payload.
pub fn build_response(status: u16, body: &Value) -> Result<WireResponse, RouterError> {
    WireResponse::json(status, body)
        .map_err(|e| RouterError::InternalError(format!("Failed to serialize response: {}", e)))
}

/// Empty response (for 204 No Content).
pub fn build_empty_response(status: u16) -> WireResponse {
    WireResponse::new(status)
}
