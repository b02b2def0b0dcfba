// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime settings: request limits, SMTP, and admin credentials.

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
};
use licensor_core::{LicensorError, RequestLimits, SmtpSettings};
use licensor_crypto::{hash_password, verify_password};
use licensor_storage::queries::settings;
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::auth::Session;
use crate::error::{ApiError, ApiResult};
use crate::server::AppState;

/// Shortest admin password accepted by the password change endpoint.
pub const MIN_PASSWORD_LEN: usize = 8;

/// GET /api/settings/request-limits
pub async fn get_request_limits(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let limits = settings::request_limits(&state.db, state.limit_defaults).await?;
    Ok(Json(json!({ "success": true, "limits": limits })))
}

/// POST /api/settings/request-limits
pub async fn set_request_limits(
    State(state): State<AppState>,
    body: Result<Json<RequestLimits>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(limits) = body?;
    let stored = settings::set_request_limits(&state.db, limits).await?;
    info!(
        daily_request_limit = stored.daily_request_limit,
        daily_email_limit = stored.daily_email_limit,
        "request limits updated"
    );
    Ok(Json(json!({ "success": true, "limits": stored })))
}

/// GET /api/smtp. The password is never echoed back.
pub async fn get_smtp(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let smtp = settings::smtp(&state.db).await?;
    let password_set = !smtp.password.is_empty();
    let smtp = SmtpSettings {
        password: String::new(),
        ..smtp
    };
    Ok(Json(json!({
        "success": true,
        "smtp": smtp,
        "password_set": password_set,
    })))
}

#[derive(Debug, Deserialize)]
pub struct SmtpBody {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    /// Empty keeps the stored password.
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub from_email: String,
    #[serde(default)]
    pub from_name: String,
    #[serde(default)]
    pub use_tls: bool,
    #[serde(default)]
    pub use_starttls: bool,
}

fn default_smtp_port() -> u16 {
    587
}

/// POST /api/smtp
pub async fn set_smtp(
    State(state): State<AppState>,
    body: Result<Json<SmtpBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = body?;
    if req.enabled && req.host.trim().is_empty() {
        return Err(ApiError::bad_request("SMTP host is required when enabled"));
    }
    if req.use_tls && req.use_starttls {
        return Err(ApiError::bad_request("choose either TLS or STARTTLS, not both"));
    }
    let password = if req.password.is_empty() {
        settings::smtp(&state.db).await?.password
    } else {
        req.password
    };
    let smtp = SmtpSettings {
        enabled: req.enabled,
        host: req.host.trim().to_string(),
        port: req.port,
        username: req.username.trim().to_string(),
        password,
        from_email: req.from_email.trim().to_string(),
        from_name: req.from_name.trim().to_string(),
        use_tls: req.use_tls,
        use_starttls: req.use_starttls,
    };
    info!(enabled = smtp.enabled, host = %smtp.host, port = smtp.port, "SMTP settings updated");
    settings::set_smtp(&state.db, smtp).await?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct SmtpTestBody {
    pub email: String,
}

fn error_chain(err: &LicensorError) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// POST /api/smtp/test
pub async fn test_smtp(
    State(state): State<AppState>,
    body: Result<Json<SmtpTestBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = body?;
    let to = req.email.trim();
    if to.is_empty() {
        return Err(ApiError::bad_request("recipient email is required"));
    }
    match state.mailer.send_test(to).await {
        Ok(()) => Ok(Json(json!({ "success": true }))),
        Err(err @ (LicensorError::Notify { .. } | LicensorError::Timeout { .. })) => {
            warn!(to = %to, error = %err, "SMTP test failed");
            Err(ApiError::Upstream(error_chain(&err)))
        }
        Err(err) => Err(err.into()),
    }
}

#[derive(Debug, Deserialize)]
pub struct PasswordChange {
    pub old_password: String,
    pub new_password: String,
}

/// POST /api/password
pub async fn change_password(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    body: Result<Json<PasswordChange>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = body?;
    if req.new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "new password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    let stored = settings::get(&state.db, settings::ADMIN_PASSWORD)
        .await?
        .unwrap_or_default();
    let old = SecretString::from(req.old_password);
    let new = SecretString::from(req.new_password);
    let hashed = tokio::task::spawn_blocking(move || -> Result<Option<String>, LicensorError> {
        if stored.is_empty() || !verify_password(&old, &stored)? {
            return Ok(None);
        }
        hash_password(&new).map(Some)
    })
    .await
    .map_err(|e| LicensorError::Internal(format!("password hashing task failed: {e}")))??;

    let Some(hashed) = hashed else {
        return Err(ApiError::bad_request("current password is wrong"));
    };
    settings::set(&state.db, settings::ADMIN_PASSWORD, &hashed).await?;
    info!(username = %session.username, "admin password changed");
    Ok(Json(json!({ "success": true })))
}

/// GET /api/username
pub async fn get_username(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let username = settings::get(&state.db, settings::ADMIN_USERNAME)
        .await?
        .unwrap_or_else(|| state.admin.username.clone());
    Ok(Json(json!({ "success": true, "username": username })))
}

#[derive(Debug, Deserialize)]
pub struct UsernameChange {
    pub username: String,
}

/// POST /api/username
pub async fn change_username(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    body: Result<Json<UsernameChange>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = body?;
    let username = req.username.trim();
    if username.is_empty() || username.chars().any(char::is_whitespace) {
        return Err(ApiError::bad_request("username must be non-empty without spaces"));
    }
    settings::set(&state.db, settings::ADMIN_USERNAME, username).await?;
    info!(from = %session.username, to = %username, "admin username changed");
    Ok(Json(json!({ "success": true, "username": username })))
}
