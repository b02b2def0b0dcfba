// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SN activation.
//!
//! Checks run in a fixed order: existence, then the active flag, then
//! expiry. A valid SN has its usage counted, its credentials resolved for
//! today, and the payload sealed under a key only the SN holder can derive.

use chrono::{DateTime, SecondsFormat, Utc};
use licensor_core::time::{format_date, format_timestamp, parse_timestamp};
use licensor_core::{
    ActivationPayload, CredentialKind, License, LicensorError, ResponseCode,
};
use licensor_storage::Database;
use licensor_storage::queries::{credentials, groups, licenses};
use tracing::{debug, error, info};

use crate::resolver::resolve;

/// Strip whitespace and uppercase.
pub fn normalize_sn(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationOutcome {
    Activated {
        /// `base64(nonce || ciphertext || tag)` of the JSON payload.
        encrypted_data: String,
        /// `YYYY-MM-DD`.
        expires_at: String,
    },
    InvalidSn,
    Disabled,
    Expired,
    EncryptFailed,
}

impl ActivationOutcome {
    pub fn code(&self) -> ResponseCode {
        match self {
            ActivationOutcome::Activated { .. } => ResponseCode::Success,
            ActivationOutcome::InvalidSn => ResponseCode::InvalidSn,
            ActivationOutcome::Disabled => ResponseCode::SnDisabled,
            ActivationOutcome::Expired => ResponseCode::SnExpired,
            ActivationOutcome::EncryptFailed => ResponseCode::EncryptFailed,
        }
    }
}

/// Rejection for a license in its current state, if any.
pub fn check_state(license: &License, now: DateTime<Utc>) -> Option<ActivationOutcome> {
    if !license.is_active {
        return Some(ActivationOutcome::Disabled);
    }
    if let Some(expires_at) = &license.expires_at
        && format_timestamp(now) > *expires_at
    {
        return Some(ActivationOutcome::Expired);
    }
    None
}

fn rfc3339(value: &str) -> Result<String, LicensorError> {
    Ok(parse_timestamp(value)?.to_rfc3339_opts(SecondsFormat::Secs, true))
}

#[derive(Debug, Clone)]
pub struct Activator {
    db: Database,
    product_fallback_name: String,
}

impl Activator {
    pub fn new(db: Database, product_fallback_name: impl Into<String>) -> Self {
        Self {
            db,
            product_fallback_name: product_fallback_name.into(),
        }
    }

    /// Display name for `product_id`, falling back for `0` or unknown ids.
    pub fn fallback_product_name(&self) -> &str {
        &self.product_fallback_name
    }

    pub async fn product_name(&self, product_id: i64) -> Result<String, LicensorError> {
        if product_id > 0
            && let Some(product) = groups::get_product(&self.db, product_id).await?
            && !product.name.is_empty()
        {
            return Ok(product.name);
        }
        Ok(self.product_fallback_name.clone())
    }

    pub async fn activate(
        &self,
        raw_sn: &str,
        now: DateTime<Utc>,
    ) -> Result<ActivationOutcome, LicensorError> {
        let sn = normalize_sn(raw_sn);
        let Some(license) = licenses::get(&self.db, &sn).await? else {
            debug!(sn = %sn, "activation for unknown SN");
            return Ok(ActivationOutcome::InvalidSn);
        };
        if let Some(rejection) = check_state(&license, now) {
            debug!(sn = %sn, code = %rejection.code(), "activation rejected");
            return Ok(rejection);
        }

        let Some(license) = licenses::record_activation(&self.db, &sn, now).await? else {
            return Ok(ActivationOutcome::InvalidSn);
        };
        let payload = self.build_payload(&license, now).await?;
        let expires_on = license
            .expires_at
            .as_deref()
            .map(|e| e.get(..10).unwrap_or(e).to_string())
            .unwrap_or_default();

        let sealed = serde_json::to_vec(&payload)
            .map_err(|e| LicensorError::Crypto(format!("payload serialization failed: {e}")))
            .and_then(|json| licensor_crypto::encrypt_for_sn(&sn, &json));
        match sealed {
            Ok(encrypted_data) => {
                info!(
                    sn = %sn,
                    usage_count = license.usage_count,
                    product_id = license.product_id,
                    llm_group = %license.llm_group_id,
                    search_group = %license.search_group_id,
                    "SN activated"
                );
                Ok(ActivationOutcome::Activated {
                    encrypted_data,
                    expires_at: expires_on,
                })
            }
            Err(e) => {
                error!(sn = %sn, error = %e, "activation payload encryption failed");
                Ok(ActivationOutcome::EncryptFailed)
            }
        }
    }

    async fn build_payload(
        &self,
        license: &License,
        now: DateTime<Utc>,
    ) -> Result<ActivationPayload, LicensorError> {
        let today = format_date(now);
        let llm_configs = credentials::list(&self.db, CredentialKind::Llm).await?;
        let search_configs = credentials::list(&self.db, CredentialKind::Search).await?;

        let mut payload = ActivationPayload {
            expires_at: match &license.expires_at {
                Some(e) => rfc3339(e)?,
                None => String::new(),
            },
            activated_at: now.to_rfc3339_opts(SecondsFormat::Secs, true),
            daily_analysis: license.daily_analysis,
            product_id: license.product_id,
            product_name: self.product_name(license.product_id).await?,
            ..ActivationPayload::default()
        };

        if let Some(llm) = resolve(&license.llm_group_id, &llm_configs, &today) {
            payload.llm_type = llm.provider_type.clone();
            payload.llm_base_url = llm.base_url.clone();
            payload.llm_api_key = llm.api_key.clone();
            payload.llm_model = llm.model.clone();
            payload.llm_start_date = llm.start_date.clone();
            payload.llm_end_date = llm.end_date.clone();
        } else {
            debug!(sn = %license.sn, llm_group = %license.llm_group_id, "no LLM config applies today");
        }
        if let Some(search) = resolve(&license.search_group_id, &search_configs, &today) {
            payload.search_type = search.provider_type.clone();
            payload.search_api_key = search.api_key.clone();
            payload.search_start_date = search.start_date.clone();
            payload.search_end_date = search.end_date.clone();
        } else {
            debug!(sn = %license.sn, search_group = %license.search_group_id, "no search config applies today");
        }
        Ok(payload)
    }
}
