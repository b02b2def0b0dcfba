// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SN allocation: hand the oldest eligible serial number to a requester.
//!
//! Eligible means active, unexpired (or not yet started), never activated,
//! and not bound to any email. Product matching is exact, with `0` only
//! seeing unclassified inventory. Group constraints from the policy are
//! exact matches when present.

use chrono::{DateTime, Utc};
use licensor_core::{License, LicensorError};
use licensor_storage::Database;
use licensor_storage::queries::email_records;
use licensor_storage::queries::licenses::{self, ClaimOutcome, ClaimRequest};
use tracing::{info, warn};

use crate::policy::GroupBinding;

/// One allocation attempt, already past policy and rate limiting.
#[derive(Debug, Clone)]
pub struct AllocationRequest {
    pub email: String,
    pub ip: String,
    pub product_id: i64,
    pub binding: GroupBinding,
    /// Try ungrouped inventory first. Set when conditions are enabled and
    /// the requester matched none.
    pub prefer_ungrouped: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocationOutcome {
    Allocated(License),
    /// The email already holds a live SN for this product.
    AlreadyAssigned { sn: String },
    NoAvailableSn,
}

#[derive(Debug, Clone)]
pub struct SnAllocator {
    db: Database,
}

impl SnAllocator {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// The SN this email already holds for `product_id`, if it still exists.
    ///
    /// Ledger rows whose SN was deleted are purged so a fresh allocation can
    /// proceed.
    pub async fn existing_assignment(
        &self,
        email: &str,
        product_id: i64,
    ) -> Result<Option<String>, LicensorError> {
        if let Some(sn) = email_records::find_live_binding(&self.db, email, product_id).await? {
            return Ok(Some(sn));
        }
        let purged = email_records::purge_stale(&self.db, email, product_id).await?;
        for sn in purged {
            info!(email = %email, product_id, sn = %sn, "bound SN no longer exists, record purged");
        }
        Ok(None)
    }

    /// Select and bind one SN atomically.
    pub async fn allocate(
        &self,
        req: AllocationRequest,
        now: DateTime<Utc>,
    ) -> Result<AllocationOutcome, LicensorError> {
        let llm_group = req.binding.llm_group_id.clone().unwrap_or_default();
        let search_group = req.binding.search_group_id.clone().unwrap_or_default();
        let claim = ClaimRequest {
            email: req.email.clone(),
            ip: req.ip.clone(),
            product_id: req.product_id,
            llm_group_id: req.binding.llm_group_id.clone(),
            search_group_id: req.binding.search_group_id.clone(),
            prefer_ungrouped: req.prefer_ungrouped && req.binding.is_unconstrained(),
            now,
        };

        match licenses::claim(&self.db, claim).await? {
            ClaimOutcome::Claimed(claimed) => {
                info!(
                    email = %req.email,
                    ip = %req.ip,
                    sn = %claimed.license.sn,
                    product_id = req.product_id,
                    llm_group = %llm_group,
                    search_group = %search_group,
                    "SN allocated"
                );
                Ok(AllocationOutcome::Allocated(claimed.license))
            }
            ClaimOutcome::AlreadyBound { sn } => Ok(AllocationOutcome::AlreadyAssigned { sn }),
            ClaimOutcome::Exhausted => {
                let breakdown = licenses::inventory_breakdown(&self.db, now).await?;
                warn!(
                    email = %req.email,
                    ip = %req.ip,
                    product_id = req.product_id,
                    llm_group = %llm_group,
                    search_group = %search_group,
                    total = breakdown.total,
                    active = breakdown.active,
                    unexpired = breakdown.unexpired,
                    unused = breakdown.unused,
                    unbound = breakdown.unbound,
                    "no available SN matches the request"
                );
                Ok(AllocationOutcome::NoAvailableSn)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tracing_test::traced_test;

    #[tokio::test]
    #[traced_test]
    async fn exhaustion_is_logged_with_inventory_breakdown() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("alloc.db").to_str().unwrap())
            .await
            .unwrap();
        let allocator = SnAllocator::new(db);
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();

        let outcome = allocator
            .allocate(
                AllocationRequest {
                    email: "late@example.com".to_string(),
                    ip: "10.9.9.9".to_string(),
                    product_id: 3,
                    binding: GroupBinding::default(),
                    prefer_ungrouped: false,
                },
                now,
            )
            .await
            .unwrap();

        assert_eq!(outcome, AllocationOutcome::NoAvailableSn);
        assert!(logs_contain("no available SN matches the request"));
        assert!(logs_contain("product_id=3"));
    }
}
