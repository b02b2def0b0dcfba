// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LLM, search, and license groups, plus product types.

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    routing::{MethodRouter, get},
};
use licensor_core::{GroupKind, LicensorError};
use licensor_storage::queries::groups;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use super::IdQuery;
use crate::error::ApiResult;
use crate::server::AppState;

/// GET/POST/DELETE handlers for one group namespace.
pub fn routes(kind: GroupKind) -> MethodRouter<AppState> {
    get(move |state: State<AppState>| list(state, kind))
        .post(
            move |state: State<AppState>, body: Result<Json<GroupBody>, JsonRejection>| {
                save(state, kind, body)
            },
        )
        .delete(move |state: State<AppState>, query: Query<IdQuery>| remove(state, kind, query))
}

async fn list(State(state): State<AppState>, kind: GroupKind) -> ApiResult<Json<Value>> {
    let groups = groups::list(&state.db, kind).await?;
    Ok(Json(json!({ "success": true, "groups": groups })))
}

#[derive(Debug, Deserialize)]
pub struct GroupBody {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

async fn save(
    State(state): State<AppState>,
    kind: GroupKind,
    body: Result<Json<GroupBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = body?;
    let name = if req.name.trim().is_empty() {
        req.id.trim()
    } else {
        req.name.trim()
    };
    groups::upsert(&state.db, kind, &req.id, name, &req.description).await?;
    info!(kind = %kind, id = %req.id, "group saved");
    Ok(Json(json!({ "success": true })))
}

async fn remove(
    State(state): State<AppState>,
    kind: GroupKind,
    Query(query): Query<IdQuery>,
) -> ApiResult<Json<Value>> {
    if !groups::delete(&state.db, kind, &query.id).await? {
        return Err(LicensorError::NotFound(format!("{kind} group {}", query.id)).into());
    }
    info!(kind = %kind, id = %query.id, "group deleted");
    Ok(Json(json!({ "success": true })))
}

/// GET /api/product-types
pub async fn list_products(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let products = groups::list_products(&state.db).await?;
    Ok(Json(json!({ "success": true, "product_types": products })))
}

#[derive(Debug, Deserialize)]
pub struct ProductBody {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// POST /api/product-types
pub async fn create_product(
    State(state): State<AppState>,
    body: Result<Json<ProductBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = body?;
    let id = groups::create_product(&state.db, &req.name, &req.description).await?;
    info!(id, name = %req.name, "product type created");
    Ok(Json(json!({ "success": true, "id": id })))
}

#[derive(Debug, Deserialize)]
pub struct ProductIdQuery {
    pub id: i64,
}

/// DELETE /api/product-types?id=
pub async fn delete_product(
    State(state): State<AppState>,
    Query(query): Query<ProductIdQuery>,
) -> ApiResult<Json<Value>> {
    if !groups::delete_product(&state.db, query.id).await? {
        return Err(LicensorError::NotFound(format!("product type {}", query.id)).into());
    }
    info!(id = query.id, "product type deleted");
    Ok(Json(json!({ "success": true })))
}
