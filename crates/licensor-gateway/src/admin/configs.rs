// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LLM and search credential configurations.
//!
//! Listings mask API keys; saving with an empty `api_key` keeps the stored one.

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    routing::{MethodRouter, get},
};
use licensor_core::{CredentialConfig, CredentialKind, LicensorError};
use licensor_crypto::generate_short_id;
use licensor_storage::queries::credentials;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use super::IdQuery;
use crate::error::ApiResult;
use crate::server::AppState;

pub fn routes(kind: CredentialKind) -> MethodRouter<AppState> {
    get(move |state: State<AppState>| list(state, kind))
        .post(
            move |state: State<AppState>, body: Result<Json<ConfigBody>, JsonRejection>| {
                save(state, kind, body)
            },
        )
        .delete(move |state: State<AppState>, query: Query<IdQuery>| remove(state, kind, query))
}

/// Keep the last four characters of a key visible.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{tail}", "*".repeat(chars.len() - 4))
}

async fn list(State(state): State<AppState>, kind: CredentialKind) -> ApiResult<Json<Value>> {
    let configs: Vec<CredentialConfig> = credentials::list(&state.db, kind)
        .await?
        .into_iter()
        .map(|c| CredentialConfig {
            api_key: mask_key(&c.api_key),
            ..c
        })
        .collect();
    Ok(Json(json!({ "success": true, "configs": configs })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConfigBody {
    /// Empty creates a new configuration.
    pub id: String,
    pub name: String,
    pub provider_type: String,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub is_active: bool,
    pub start_date: String,
    pub end_date: String,
    pub group_id: String,
}

async fn save(
    State(state): State<AppState>,
    kind: CredentialKind,
    body: Result<Json<ConfigBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = body?;
    let id = match req.id.trim() {
        "" => generate_short_id()?,
        id => id.to_string(),
    };

    let mut api_key = req.api_key.trim().to_string();
    if api_key.is_empty() {
        let existing = credentials::list(&state.db, kind).await?;
        if let Some(current) = existing.into_iter().find(|c| c.id == id) {
            api_key = current.api_key;
        }
    }

    let config = CredentialConfig {
        id: id.clone(),
        name: req.name.trim().to_string(),
        provider_type: req.provider_type.trim().to_string(),
        base_url: req.base_url.trim().to_string(),
        api_key,
        model: req.model.trim().to_string(),
        is_active: req.is_active,
        start_date: req.start_date.trim().to_string(),
        end_date: req.end_date.trim().to_string(),
        group_id: req.group_id.trim().to_string(),
    };
    credentials::save(&state.db, kind, config).await?;
    info!(kind = %kind, id = %id, active = req.is_active, "credential config saved");
    Ok(Json(json!({ "success": true, "id": id })))
}

async fn remove(
    State(state): State<AppState>,
    kind: CredentialKind,
    Query(query): Query<IdQuery>,
) -> ApiResult<Json<Value>> {
    if !credentials::delete(&state.db, kind, &query.id).await? {
        return Err(LicensorError::NotFound(format!("{kind} config {}", query.id)).into());
    }
    info!(kind = %kind, id = %query.id, "credential config deleted");
    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masking_keeps_tail_only() {
        assert_eq!(mask_key("sk-abcdefgh1234"), "***********1234");
        assert_eq!(mask_key("short"), "*****");
        assert_eq!(mask_key(""), "");
    }
}
