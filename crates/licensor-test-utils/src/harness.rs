// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles a temp SQLite database, a [`LicenseService`] wired
//! to a [`RecordingNotifier`], and helpers to seed inventory and credentials.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use licensor_config::model::LicensorConfig;
use licensor_core::{
    ActivationPayload, CredentialConfig, CredentialKind, GroupKind, LicensorError, NewLicense,
};
use licensor_engine::{ActivationOutcome, LicenseService, SnRequest, SnRequestOutcome};
use licensor_storage::Database;
use licensor_storage::queries::{credentials, groups, licenses};

use crate::recording_notifier::RecordingNotifier;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: LicensorConfig,
    notifier: RecordingNotifier,
    licenses: Vec<NewLicense>,
    credentials: Vec<(CredentialKind, CredentialConfig)>,
    groups: Vec<(GroupKind, String)>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            config: LicensorConfig::default(),
            notifier: RecordingNotifier::new(),
            licenses: Vec::new(),
            credentials: Vec::new(),
            groups: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: LicensorConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the default per-IP daily limits.
    pub fn with_limits(mut self, daily_requests: i64, daily_emails: i64) -> Self {
        self.config.limits.daily_request_limit = daily_requests;
        self.config.limits.daily_email_limit = daily_emails;
        self
    }

    /// Make every notification attempt fail after recording it.
    pub fn with_failing_notifier(mut self) -> Self {
        self.notifier = RecordingNotifier::failing();
        self
    }

    /// Seed ungrouped licenses with the given SNs, in insertion order.
    pub fn with_licenses<I, S>(mut self, sns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.licenses
            .extend(sns.into_iter().map(|sn| license(&sn.into())));
        self
    }

    /// Seed a fully specified license.
    pub fn with_license(mut self, license: NewLicense) -> Self {
        self.licenses.push(license);
        self
    }

    pub fn with_group(mut self, kind: GroupKind, id: impl Into<String>) -> Self {
        self.groups.push((kind, id.into()));
        self
    }

    pub fn with_credential(mut self, kind: CredentialKind, config: CredentialConfig) -> Self {
        self.credentials.push((kind, config));
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, LicensorError> {
        let temp_dir = tempfile::TempDir::new()
            .map_err(|e| LicensorError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");
        let db = Database::open(&db_path.to_string_lossy()).await?;

        for (kind, id) in &self.groups {
            groups::upsert(&db, *kind, id, id, "").await?;
        }
        for (kind, config) in self.credentials {
            credentials::save(&db, kind, config).await?;
        }
        let created_at = Utc::now();
        for license in self.licenses {
            licenses::insert(&db, license, created_at).await?;
        }

        let notifier = Arc::new(self.notifier);
        let service = LicenseService::new(db.clone(), notifier.clone(), &self.config);

        Ok(TestHarness {
            db,
            service,
            notifier,
            config: self.config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment backed by a temp database.
pub struct TestHarness {
    /// Database handle (temp file, removed on drop).
    pub db: Database,
    pub service: LicenseService,
    pub notifier: Arc<RecordingNotifier>,
    pub config: LicensorConfig,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Request an SN for `email` from `ip` at `now`, without a product.
    pub async fn request_sn(
        &self,
        email: &str,
        ip: &str,
        now: DateTime<Utc>,
    ) -> Result<SnRequestOutcome, LicensorError> {
        self.service
            .request_sn(
                SnRequest {
                    email: email.to_string(),
                    product_id: 0,
                    ip: ip.to_string(),
                },
                now,
            )
            .await
    }

    pub async fn activate(
        &self,
        sn: &str,
        now: DateTime<Utc>,
    ) -> Result<ActivationOutcome, LicensorError> {
        self.service.activate(sn, now).await
    }

    /// Activate `sn` and decrypt the payload, failing on any non-success outcome.
    pub async fn activate_payload(
        &self,
        sn: &str,
        now: DateTime<Utc>,
    ) -> Result<ActivationPayload, LicensorError> {
        match self.activate(sn, now).await? {
            ActivationOutcome::Activated { encrypted_data, .. } => {
                let sn = licensor_engine::activation::normalize_sn(sn);
                let plain = licensor_crypto::decrypt_for_sn(&sn, &encrypted_data)?;
                serde_json::from_slice(&plain)
                    .map_err(|e| LicensorError::Internal(format!("payload is not JSON: {e}")))
            }
            other => Err(LicensorError::Validation(format!(
                "activation did not succeed: {:?}",
                other.code()
            ))),
        }
    }
}

/// An ungrouped 30-day license with a daily quota of 20.
pub fn license(sn: &str) -> NewLicense {
    NewLicense {
        sn: sn.to_string(),
        description: String::new(),
        valid_days: 30,
        daily_analysis: 20,
        license_group_id: String::new(),
        llm_group_id: String::new(),
        search_group_id: String::new(),
        product_id: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use licensor_core::ResponseCode;

    #[tokio::test]
    async fn seeded_inventory_is_handed_out_in_order() {
        let harness = TestHarness::builder()
            .with_licenses(["FIRST-0001", "SECOND-0002"])
            .build()
            .await
            .unwrap();
        let now = Utc::now();
        let first = harness.request_sn("a@example.com", "10.0.0.1", now).await.unwrap();
        assert_eq!(first.sn(), Some("FIRST-0001"));
        let second = harness.request_sn("b@example.com", "10.0.0.1", now).await.unwrap();
        assert_eq!(second.sn(), Some("SECOND-0002"));
        let third = harness.request_sn("c@example.com", "10.0.0.1", now).await.unwrap();
        assert_eq!(third.code(), ResponseCode::NoAvailableSn);
    }
}
