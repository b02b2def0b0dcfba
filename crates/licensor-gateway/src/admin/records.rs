// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Email ledger and per-IP counter maintenance.

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
};
use licensor_storage::queries::{email_records, rate_limits};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use super::Paging;
use crate::error::{ApiError, ApiResult};
use crate::server::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RecordSearch {
    /// Substring of email, SN, or IP.
    pub q: Option<String>,
}

/// GET /api/email-records
pub async fn list(
    State(state): State<AppState>,
    Query(search): Query<RecordSearch>,
    Query(paging): Query<Paging>,
) -> ApiResult<Json<Value>> {
    let (records, total) =
        email_records::list(&state.db, search.q, paging.limit(), paging.offset()).await?;
    Ok(Json(json!({
        "success": true,
        "records": records,
        "total": total,
        "page": paging.page.max(1),
        "page_size": paging.limit(),
    })))
}

#[derive(Debug, Deserialize)]
pub struct EmailBody {
    pub email: String,
}

/// POST /api/email-records/clear-by-email
pub async fn clear_by_email(
    State(state): State<AppState>,
    body: Result<Json<EmailBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = body?;
    if req.email.trim().is_empty() {
        return Err(ApiError::bad_request("email is required"));
    }
    let cleared = email_records::clear_by_email(&state.db, &req.email).await?;
    info!(email = %req.email, cleared, "email records cleared");
    Ok(Json(json!({ "success": true, "cleared": cleared })))
}

#[derive(Debug, Deserialize)]
pub struct IpBody {
    pub ip: String,
}

/// POST /api/settings/clear-ip-records
pub async fn clear_ip(
    State(state): State<AppState>,
    body: Result<Json<IpBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = body?;
    if req.ip.trim().is_empty() {
        return Err(ApiError::bad_request("ip is required"));
    }
    let cleared = rate_limits::clear_ip(&state.db, &req.ip).await?;
    info!(ip = %req.ip, cleared, "request counters cleared");
    Ok(Json(json!({ "success": true, "cleared": cleared })))
}
