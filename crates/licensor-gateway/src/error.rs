// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping from [`LicensorError`] to admin API responses.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use licensor_core::LicensorError;
use serde::Serialize;
use tracing::error;

/// Error body of the admin API.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

/// A failed admin request.
///
/// Client errors carry their message through; server faults are logged and
/// answered with a generic message.
#[derive(Debug)]
pub enum ApiError {
    Licensor(LicensorError),
    BadRequest(String),
    Unauthorized(String),
    TooManyAttempts(String),
    /// An outbound dependency (SMTP) rejected the request.
    Upstream(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }
}

impl From<LicensorError> for ApiError {
    fn from(err: LicensorError) -> Self {
        ApiError::Licensor(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message),
            ApiError::TooManyAttempts(message) => (StatusCode::TOO_MANY_REQUESTS, message),
            ApiError::Upstream(message) => (StatusCode::BAD_GATEWAY, message),
            ApiError::Licensor(err) => match err {
                LicensorError::Validation(message) => (StatusCode::BAD_REQUEST, message),
                LicensorError::NotFound(message) => (StatusCode::NOT_FOUND, message),
                LicensorError::Conflict(message) => (StatusCode::CONFLICT, message),
                other => {
                    error!(error = %other, "admin request failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal server error".to_string(),
                    )
                }
            },
        };
        (
            status,
            Json(ErrorResponse {
                success: false,
                error: message,
            }),
        )
            .into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
