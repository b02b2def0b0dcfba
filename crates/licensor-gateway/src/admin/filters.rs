// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Email blacklist, whitelist, conditions, and the toggles that enable them.

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    routing::{MethodRouter, get},
};
use licensor_core::{FilterList, FilterToggles, LicensorError};
use licensor_storage::queries::{filters, settings};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::server::AppState;

pub fn routes(which: FilterList) -> MethodRouter<AppState> {
    get(move |state: State<AppState>| list(state, which))
        .post(
            move |state: State<AppState>, body: Result<Json<PatternBody>, JsonRejection>| {
                add(state, which, body)
            },
        )
        .delete(move |state: State<AppState>, query: Query<PatternQuery>| {
            remove(state, which, query)
        })
}

/// One pattern, or several at once.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PatternBody {
    pub pattern: String,
    pub patterns: Vec<String>,
}

impl PatternBody {
    fn into_patterns(self) -> Vec<String> {
        std::iter::once(self.pattern)
            .chain(self.patterns)
            .filter(|p| !p.trim().is_empty())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct PatternQuery {
    pub pattern: String,
}

async fn list(State(state): State<AppState>, which: FilterList) -> ApiResult<Json<Value>> {
    let entries = filters::list(&state.db, which).await?;
    Ok(Json(json!({ "success": true, "entries": entries })))
}

async fn add(
    State(state): State<AppState>,
    which: FilterList,
    body: Result<Json<PatternBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = body?;
    let patterns = req.into_patterns();
    if patterns.is_empty() {
        return Err(ApiError::bad_request("no pattern given"));
    }
    let mut added = 0usize;
    for pattern in &patterns {
        if filters::add(&state.db, which, pattern).await? {
            added += 1;
        }
    }
    info!(list = %which, added, "email patterns added");
    Ok(Json(json!({ "success": true, "added": added })))
}

async fn remove(
    State(state): State<AppState>,
    which: FilterList,
    Query(query): Query<PatternQuery>,
) -> ApiResult<Json<Value>> {
    if !filters::remove(&state.db, which, &query.pattern).await? {
        return Err(LicensorError::NotFound(format!("{which} pattern {}", query.pattern)).into());
    }
    info!(list = %which, pattern = %query.pattern, "email pattern removed");
    Ok(Json(json!({ "success": true })))
}

/// GET /api/conditions
pub async fn list_conditions(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let conditions = filters::list_conditions(&state.db).await?;
    Ok(Json(json!({ "success": true, "conditions": conditions })))
}

#[derive(Debug, Deserialize)]
pub struct ConditionBody {
    pub pattern: String,
    #[serde(default)]
    pub llm_group_id: String,
    #[serde(default)]
    pub search_group_id: String,
}

/// POST /api/conditions
pub async fn save_condition(
    State(state): State<AppState>,
    body: Result<Json<ConditionBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = body?;
    filters::upsert_condition(&state.db, &req.pattern, &req.llm_group_id, &req.search_group_id)
        .await?;
    info!(
        pattern = %req.pattern,
        llm_group = %req.llm_group_id,
        search_group = %req.search_group_id,
        "condition saved"
    );
    Ok(Json(json!({ "success": true })))
}

/// DELETE /api/conditions?pattern=
pub async fn delete_condition(
    State(state): State<AppState>,
    Query(query): Query<PatternQuery>,
) -> ApiResult<Json<Value>> {
    if !filters::remove_condition(&state.db, &query.pattern).await? {
        return Err(LicensorError::NotFound(format!("condition {}", query.pattern)).into());
    }
    Ok(Json(json!({ "success": true })))
}

/// GET /api/email-filter
pub async fn get_toggles(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let toggles = settings::filter_toggles(&state.db).await?;
    Ok(Json(json!({ "success": true, "toggles": toggles })))
}

/// POST /api/email-filter
pub async fn set_toggles(
    State(state): State<AppState>,
    body: Result<Json<FilterToggles>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(toggles) = body?;
    settings::set_filter_toggles(&state.db, toggles).await?;
    info!(?toggles, "email filter toggles updated");
    Ok(Json(json!({ "success": true, "toggles": toggles })))
}
