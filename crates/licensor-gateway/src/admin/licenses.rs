// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! License inventory endpoints.

use std::collections::HashSet;

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
};
use chrono::Utc;
use licensor_core::{LicensorError, MAX_VALID_DAYS, NewLicense};
use licensor_crypto::generate_sn;
use licensor_storage::queries::licenses::{
    self, LicenseGroups, LicenseQuery, LicenseStatus, UnusedFilter,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use super::Paging;
use crate::error::{ApiError, ApiResult};
use crate::server::AppState;

const DEFAULT_VALID_DAYS: i64 = 365;
const DEFAULT_DAILY_ANALYSIS: i64 = 20;

fn check_days(days: i64) -> Result<(), ApiError> {
    if !(1..=MAX_VALID_DAYS).contains(&days) {
        return Err(ApiError::bad_request(format!(
            "days must be between 1 and {MAX_VALID_DAYS}"
        )));
    }
    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_status(value: &str) -> Result<LicenseStatus, ApiError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "active" => Ok(LicenseStatus::Active),
        "disabled" => Ok(LicenseStatus::Disabled),
        "bound" => Ok(LicenseStatus::Bound),
        "available" => Ok(LicenseStatus::Available),
        "expired" => Ok(LicenseStatus::Expired),
        other => Err(ApiError::bad_request(format!("unknown status '{other}'"))),
    }
}

fn not_found(sn: &str) -> ApiError {
    LicensorError::NotFound(format!("serial number {sn}")).into()
}

#[derive(Debug, Default, Deserialize)]
pub struct LicenseFilters {
    pub q: Option<String>,
    pub product_id: Option<i64>,
    pub llm_group_id: Option<String>,
    pub search_group_id: Option<String>,
    pub license_group_id: Option<String>,
    pub status: Option<String>,
}

/// GET /api/licenses
pub async fn list(
    State(state): State<AppState>,
    Query(filters): Query<LicenseFilters>,
    Query(paging): Query<Paging>,
) -> ApiResult<Json<Value>> {
    let status = non_empty(filters.status)
        .map(|s| parse_status(&s))
        .transpose()?;
    let query = LicenseQuery {
        search: non_empty(filters.q),
        product_id: filters.product_id,
        llm_group_id: filters.llm_group_id,
        search_group_id: filters.search_group_id,
        license_group_id: filters.license_group_id,
        status,
        limit: paging.limit(),
        offset: paging.offset(),
    };
    let page = licenses::list(&state.db, query, Utc::now()).await?;
    Ok(Json(json!({
        "success": true,
        "licenses": page.licenses,
        "total": page.total,
        "page": paging.page.max(1),
        "page_size": paging.limit(),
    })))
}

/// GET /api/stats
pub async fn stats(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let stats = licenses::stats(&state.db, Utc::now()).await?;
    Ok(Json(json!({ "success": true, "stats": stats })))
}

/// Shared shape of single and batch create requests.
#[derive(Debug, Deserialize)]
pub struct CreateLicenseRequest {
    /// Caller-chosen SN for single creates; generated when absent.
    #[serde(default)]
    pub sn: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub days: Option<i64>,
    #[serde(default)]
    pub daily_analysis: Option<i64>,
    #[serde(default)]
    pub license_group_id: String,
    #[serde(default)]
    pub llm_group_id: String,
    #[serde(default)]
    pub search_group_id: String,
    #[serde(default)]
    pub product_id: i64,
    /// Batch size; ignored by single creates.
    #[serde(default)]
    pub count: u32,
}

impl CreateLicenseRequest {
    fn to_new_license(&self, sn: String) -> Result<NewLicense, ApiError> {
        let valid_days = self.days.unwrap_or(DEFAULT_VALID_DAYS);
        check_days(valid_days)?;
        let daily_analysis = self.daily_analysis.unwrap_or(DEFAULT_DAILY_ANALYSIS);
        if daily_analysis < 0 {
            return Err(ApiError::bad_request("daily_analysis must not be negative"));
        }
        if self.product_id < 0 {
            return Err(ApiError::bad_request("product_id must not be negative"));
        }
        Ok(NewLicense {
            sn,
            description: self.description.trim().to_string(),
            valid_days,
            daily_analysis,
            license_group_id: self.license_group_id.trim().to_string(),
            llm_group_id: self.llm_group_id.trim().to_string(),
            search_group_id: self.search_group_id.trim().to_string(),
            product_id: self.product_id,
        })
    }
}

/// POST /api/licenses
pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<CreateLicenseRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = body?;
    let sn = match non_empty(req.sn.clone()) {
        Some(sn) => licensor_engine::activation::normalize_sn(&sn),
        None => generate_sn()?,
    };
    let license = req.to_new_license(sn.clone())?;
    licenses::insert(&state.db, license, Utc::now()).await?;
    info!(sn = %sn, product_id = req.product_id, "license created");
    Ok(Json(json!({ "success": true, "sn": sn })))
}

/// POST /api/licenses/batch
pub async fn batch_create(
    State(state): State<AppState>,
    body: Result<Json<CreateLicenseRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = body?;
    if req.count == 0 || req.count > state.batch_create_max {
        return Err(ApiError::bad_request(format!(
            "count must be between 1 and {}",
            state.batch_create_max
        )));
    }
    let mut seen = HashSet::with_capacity(req.count as usize);
    let mut batch = Vec::with_capacity(req.count as usize);
    while batch.len() < req.count as usize {
        let sn = generate_sn()?;
        if seen.insert(sn.clone()) {
            batch.push(req.to_new_license(sn)?);
        }
    }
    let sns: Vec<String> = batch.iter().map(|l| l.sn.clone()).collect();
    let created = licenses::insert_batch(&state.db, batch, Utc::now()).await?;
    info!(
        created,
        product_id = req.product_id,
        llm_group = %req.llm_group_id,
        search_group = %req.search_group_id,
        "license batch created"
    );
    Ok(Json(json!({ "success": true, "created": created, "sns": sns })))
}

#[derive(Debug, Deserialize)]
pub struct SnBody {
    pub sn: String,
}

/// POST /api/licenses/toggle
pub async fn toggle(
    State(state): State<AppState>,
    body: Result<Json<SnBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = body?;
    let license = licenses::get(&state.db, &req.sn)
        .await?
        .ok_or_else(|| not_found(&req.sn))?;
    let active = !license.is_active;
    licenses::set_active(&state.db, &req.sn, active).await?;
    info!(sn = %req.sn, active, "license toggled");
    Ok(Json(json!({ "success": true, "is_active": active })))
}

#[derive(Debug, Deserialize)]
pub struct ExtendRequest {
    pub sn: String,
    pub days: i64,
}

/// POST /api/licenses/extend
pub async fn extend(
    State(state): State<AppState>,
    body: Result<Json<ExtendRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = body?;
    check_days(req.days)?;
    let license = licenses::extend(&state.db, &req.sn, req.days, Utc::now())
        .await?
        .ok_or_else(|| not_found(&req.sn))?;
    Ok(Json(json!({ "success": true, "license": license })))
}

#[derive(Debug, Deserialize)]
pub struct SetDailyRequest {
    pub sn: String,
    pub daily_analysis: i64,
}

/// POST /api/licenses/set-daily
pub async fn set_daily(
    State(state): State<AppState>,
    body: Result<Json<SetDailyRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = body?;
    if req.daily_analysis < 0 {
        return Err(ApiError::bad_request("daily_analysis must not be negative"));
    }
    if !licenses::set_daily_analysis(&state.db, &req.sn, req.daily_analysis).await? {
        return Err(not_found(&req.sn));
    }
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct SetGroupsRequest {
    pub sn: String,
    #[serde(default)]
    pub license_group_id: String,
    #[serde(default)]
    pub llm_group_id: String,
    #[serde(default)]
    pub search_group_id: String,
    #[serde(default)]
    pub product_id: i64,
}

/// POST /api/licenses/set-groups
pub async fn set_groups(
    State(state): State<AppState>,
    body: Result<Json<SetGroupsRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = body?;
    let groups = LicenseGroups {
        license_group_id: req.license_group_id.trim().to_string(),
        llm_group_id: req.llm_group_id.trim().to_string(),
        search_group_id: req.search_group_id.trim().to_string(),
        product_id: req.product_id,
    };
    if !licenses::set_groups(&state.db, &req.sn, groups).await? {
        return Err(not_found(&req.sn));
    }
    Ok(Json(json!({ "success": true })))
}

/// POST /api/licenses/delete
pub async fn delete(
    State(state): State<AppState>,
    body: Result<Json<SnBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = body?;
    if !licenses::delete(&state.db, &req.sn).await? {
        return Err(not_found(&req.sn));
    }
    info!(sn = %req.sn, "license deleted");
    Ok(Json(json!({ "success": true })))
}

/// POST /api/licenses/force-delete
pub async fn force_delete(
    State(state): State<AppState>,
    body: Result<Json<SnBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = body?;
    if !licenses::force_delete(&state.db, &req.sn).await? {
        return Err(not_found(&req.sn));
    }
    info!(sn = %req.sn, "license and its email records deleted");
    Ok(Json(json!({ "success": true })))
}

/// Empty strings mean "no filter"; `"none"` selects ungrouped licenses.
#[derive(Debug, Default, Deserialize)]
pub struct DeleteUnusedRequest {
    #[serde(default)]
    pub llm_group_id: Option<String>,
    #[serde(default)]
    pub search_group_id: Option<String>,
    #[serde(default)]
    pub license_group_id: Option<String>,
    #[serde(default)]
    pub product_id: Option<i64>,
    #[serde(default)]
    pub delete_all: bool,
}

/// POST /api/licenses/delete-unused
pub async fn delete_unused(
    State(state): State<AppState>,
    body: Result<Json<DeleteUnusedRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = body?;
    let filter = UnusedFilter {
        llm_group_id: non_empty(req.llm_group_id),
        search_group_id: non_empty(req.search_group_id),
        license_group_id: non_empty(req.license_group_id),
        product_id: req.product_id,
        delete_all: req.delete_all,
    };
    let deleted = licenses::delete_unused(&state.db, filter).await?;
    info!(deleted, "unused licenses deleted");
    Ok(Json(json!({ "success": true, "deleted": deleted })))
}

/// POST /api/licenses/purge-disabled
pub async fn purge_disabled(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let deleted = licenses::purge_disabled(&state.db).await?;
    info!(deleted, "disabled licenses purged");
    Ok(Json(json!({ "success": true, "deleted": deleted })))
}
