// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Handlers for the public activation surface.
//!
//! Every coded outcome is answered with 200 and `{success, code, message}`;
//! only unexpected server faults use 500 with `INTERNAL_ERROR`.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use licensor_core::{LicensorError, ResponseCode};
use licensor_engine::{ActivationOutcome, SnRequest};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::client_ip::ClientIp;
use crate::server::AppState;

/// Request body for POST /activate.
#[derive(Debug, Deserialize)]
pub struct ActivateRequest {
    pub sn: String,
}

/// Request body for POST /request-sn.
#[derive(Debug, Deserialize)]
pub struct RequestSnBody {
    pub email: String,
    /// `0` (or absent) requests an unclassified SN.
    #[serde(default)]
    pub product_id: i64,
}

/// Response body shared by both public endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicResponse {
    pub success: bool,
    pub code: ResponseCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_data: Option<String>,
    /// `YYYY-MM-DD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sn: Option<String>,
}

impl PublicResponse {
    pub fn new(code: ResponseCode, message: impl Into<String>) -> Self {
        Self {
            success: code.is_success(),
            code,
            message: message.into(),
            encrypted_data: None,
            expires_at: None,
            sn: None,
        }
    }

    fn invalid_request(rejection: &JsonRejection) -> Self {
        debug!(reason = %rejection.body_text(), "rejected malformed request body");
        Self::new(ResponseCode::InvalidRequest, "invalid request format")
    }

    fn internal(err: &LicensorError, operation: &str) -> Response {
        error!(error = %err, operation, "public request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(Self::new(
                ResponseCode::InternalError,
                "internal server error, please try again later",
            )),
        )
            .into_response()
    }
}

impl IntoResponse for PublicResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

fn activation_response(outcome: ActivationOutcome) -> PublicResponse {
    let code = outcome.code();
    match outcome {
        ActivationOutcome::Activated {
            encrypted_data,
            expires_at,
        } => PublicResponse {
            encrypted_data: Some(encrypted_data),
            expires_at: Some(expires_at),
            ..PublicResponse::new(code, "activation successful")
        },
        ActivationOutcome::InvalidSn => PublicResponse::new(code, "invalid serial number"),
        ActivationOutcome::Disabled => {
            PublicResponse::new(code, "this serial number has been disabled")
        }
        ActivationOutcome::Expired => PublicResponse::new(code, "this serial number has expired"),
        ActivationOutcome::EncryptFailed => {
            PublicResponse::new(code, "failed to prepare activation data")
        }
    }
}

/// POST /activate
pub async fn post_activate(
    State(state): State<AppState>,
    body: Result<Json<ActivateRequest>, JsonRejection>,
) -> Response {
    let req = match body {
        Ok(Json(req)) => req,
        Err(rejection) => return PublicResponse::invalid_request(&rejection).into_response(),
    };
    match state.service.activate(&req.sn, Utc::now()).await {
        Ok(outcome) => activation_response(outcome).into_response(),
        Err(err) => PublicResponse::internal(&err, "activate"),
    }
}

/// POST /request-sn
pub async fn post_request_sn(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    body: Result<Json<RequestSnBody>, JsonRejection>,
) -> Response {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => return PublicResponse::invalid_request(&rejection).into_response(),
    };
    let req = SnRequest {
        email: body.email,
        product_id: body.product_id,
        ip,
    };
    match state.service.request_sn(req, Utc::now()).await {
        Ok(outcome) => PublicResponse {
            sn: outcome.sn().map(str::to_string),
            ..PublicResponse::new(outcome.code(), outcome.message())
        }
        .into_response(),
        Err(err) => PublicResponse::internal(&err, "request_sn"),
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// GET /health
pub async fn get_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
