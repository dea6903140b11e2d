//! Request handlers

pub mod campaigns;
pub mod health;
pub mod reports;

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use smsrust_common::Error;

/// Error response
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Map a domain error to its HTTP status and JSON body
pub fn error_response(err: Error) -> (StatusCode, Json<ErrorResponse>) {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(ErrorResponse {
            error: err.code().to_string(),
            message: err.to_string(),
        }),
    )
}
