// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The two public operations: request an SN, and activate one.
//!
//! Request flow: email shape, policy, existing assignment (with stale
//! record purge), rate limits, allocation, then a spawned notification.
//! A returning requester gets their SN back without consuming quota.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use licensor_config::model::LicensorConfig;
use licensor_core::time::{days_left, format_date, parse_timestamp};
use licensor_core::{LicensorError, Notifier, RequestLimits, ResponseCode, SnIssuedNotice};
use licensor_storage::Database;
use tracing::{debug, info, warn};

use crate::activation::{ActivationOutcome, Activator};
use crate::allocator::{AllocationOutcome, AllocationRequest, SnAllocator};
use crate::policy::{PolicyDecision, PolicyRules, is_valid_email, normalize_email};
use crate::rate_limit::{RateDecision, RateLimiter};

/// Inbound SN request.
#[derive(Debug, Clone)]
pub struct SnRequest {
    pub email: String,
    /// `0` means unclassified.
    pub product_id: i64,
    pub ip: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnRequestOutcome {
    Issued {
        sn: String,
        /// `YYYY-MM-DD`.
        expires_at: String,
        days_left: i64,
    },
    AlreadyIssued {
        sn: String,
    },
    InvalidEmail,
    Denied(PolicyDecision),
    RateLimited(RateDecision),
    NoAvailableSn,
}

impl SnRequestOutcome {
    pub fn code(&self) -> ResponseCode {
        match self {
            SnRequestOutcome::Issued { .. } => ResponseCode::Success,
            SnRequestOutcome::AlreadyIssued { .. } => ResponseCode::EmailAlreadyUsed,
            SnRequestOutcome::InvalidEmail => ResponseCode::InvalidEmail,
            SnRequestOutcome::Denied(decision) => {
                decision.denial_code().unwrap_or(ResponseCode::InternalError)
            }
            SnRequestOutcome::RateLimited(decision) => {
                decision.denial_code().unwrap_or(ResponseCode::InternalError)
            }
            SnRequestOutcome::NoAvailableSn => ResponseCode::NoAvailableSn,
        }
    }

    /// The SN handed back to the caller, if any.
    pub fn sn(&self) -> Option<&str> {
        match self {
            SnRequestOutcome::Issued { sn, .. } | SnRequestOutcome::AlreadyIssued { sn } => {
                Some(sn)
            }
            _ => None,
        }
    }

    /// Human-readable message for the response body.
    pub fn message(&self) -> String {
        match self {
            SnRequestOutcome::Issued { days_left, .. } => {
                format!("serial number issued, valid for {days_left} days")
            }
            SnRequestOutcome::AlreadyIssued { .. } => {
                "a serial number was already issued to this email for this product".to_string()
            }
            SnRequestOutcome::InvalidEmail => "please enter a valid email address".to_string(),
            SnRequestOutcome::Denied(PolicyDecision::Blacklisted { .. }) => {
                "this email is not allowed to request a serial number".to_string()
            }
            SnRequestOutcome::Denied(_) => "this email is not on the allow list".to_string(),
            SnRequestOutcome::RateLimited(RateDecision::EmailLimitExceeded { limit }) => {
                format!("too many different emails from this address today (limit {limit}), try again tomorrow")
            }
            SnRequestOutcome::RateLimited(RateDecision::RequestLimitExceeded { limit }) => {
                format!("daily request limit reached ({limit}), try again tomorrow")
            }
            SnRequestOutcome::RateLimited(RateDecision::Admitted { .. }) => String::new(),
            SnRequestOutcome::NoAvailableSn => {
                "no serial number is available right now, please contact the administrator"
                    .to_string()
            }
        }
    }
}

/// Engine entry point shared by the HTTP handlers.
#[derive(Clone)]
pub struct LicenseService {
    db: Database,
    limiter: RateLimiter,
    allocator: SnAllocator,
    activator: Activator,
    notifier: Arc<dyn Notifier>,
    send_timeout: Duration,
}

impl std::fmt::Debug for LicenseService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LicenseService")
            .field("send_timeout", &self.send_timeout)
            .finish_non_exhaustive()
    }
}

impl LicenseService {
    pub fn new(db: Database, notifier: Arc<dyn Notifier>, config: &LicensorConfig) -> Self {
        let defaults = RequestLimits {
            daily_request_limit: config.limits.daily_request_limit,
            daily_email_limit: config.limits.daily_email_limit,
        };
        Self {
            limiter: RateLimiter::new(db.clone(), defaults),
            allocator: SnAllocator::new(db.clone()),
            activator: Activator::new(db.clone(), config.notify.product_fallback_name.clone()),
            db,
            notifier,
            send_timeout: Duration::from_secs(config.notify.send_timeout_secs),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub async fn request_sn(
        &self,
        req: SnRequest,
        now: DateTime<Utc>,
    ) -> Result<SnRequestOutcome, LicensorError> {
        let email = normalize_email(&req.email);
        // Negative product ids are served from unclassified inventory, so they
        // share its binding.
        let product_id = req.product_id.max(0);
        if !is_valid_email(&email) {
            return Ok(SnRequestOutcome::InvalidEmail);
        }

        let rules = PolicyRules::load(&self.db).await?;
        let binding = match rules.evaluate(&email) {
            PolicyDecision::Allowed(binding) => binding,
            denied => {
                debug!(email = %email, ip = %req.ip, ?denied, "SN request denied by email policy");
                return Ok(SnRequestOutcome::Denied(denied));
            }
        };

        if let Some(sn) = self
            .allocator
            .existing_assignment(&email, product_id)
            .await?
        {
            debug!(email = %email, sn = %sn, product_id, "returning existing SN");
            return Ok(SnRequestOutcome::AlreadyIssued { sn });
        }

        let rate = self.limiter.check_and_increment(&req.ip, now).await?;
        if !rate.is_admitted() {
            return Ok(SnRequestOutcome::RateLimited(rate));
        }

        let allocation = AllocationRequest {
            email: email.clone(),
            ip: req.ip.clone(),
            product_id,
            prefer_ungrouped: rules.toggles.conditions_enabled && binding.is_unconstrained(),
            binding,
        };
        match self.allocator.allocate(allocation, now).await? {
            // The binding is committed from here on; nothing below may turn
            // it into an error.
            AllocationOutcome::Allocated(license) => {
                let expires = issued_expiry(&license.sn, license.expires_at.as_deref(), now);
                let expires_on = format_date(expires);
                let remaining = days_left(now, expires);
                let product_name = match self.activator.product_name(license.product_id).await {
                    Ok(name) => name,
                    Err(e) => {
                        warn!(
                            sn = %license.sn,
                            product_id = license.product_id,
                            error = %e,
                            "product lookup failed, notifying with fallback name"
                        );
                        self.activator.fallback_product_name().to_string()
                    }
                };
                self.spawn_notification(SnIssuedNotice {
                    email,
                    sn: license.sn.clone(),
                    expires_at: expires_on.clone(),
                    days_left: remaining,
                    product_id: license.product_id,
                    product_name,
                });
                Ok(SnRequestOutcome::Issued {
                    sn: license.sn,
                    expires_at: expires_on,
                    days_left: remaining,
                })
            }
            AllocationOutcome::AlreadyAssigned { sn } => Ok(SnRequestOutcome::AlreadyIssued { sn }),
            AllocationOutcome::NoAvailableSn => Ok(SnRequestOutcome::NoAvailableSn),
        }
    }

    pub async fn activate(
        &self,
        raw_sn: &str,
        now: DateTime<Utc>,
    ) -> Result<ActivationOutcome, LicensorError> {
        self.activator.activate(raw_sn, now).await
    }

    fn spawn_notification(&self, notice: SnIssuedNotice) {
        let notifier = Arc::clone(&self.notifier);
        let timeout = self.send_timeout;
        tokio::spawn(async move {
            match tokio::time::timeout(timeout, notifier.send_sn_issued(&notice)).await {
                Ok(Ok(())) => info!(email = %notice.email, sn = %notice.sn, "SN notification sent"),
                Ok(Err(e)) => {
                    warn!(email = %notice.email, sn = %notice.sn, error = %e, "SN notification failed")
                }
                Err(_) => warn!(
                    email = %notice.email,
                    sn = %notice.sn,
                    timeout_secs = timeout.as_secs(),
                    "SN notification timed out"
                ),
            }
        });
    }
}

/// Expiry reported for a freshly issued SN. An unreadable stored value is
/// logged and reported as `now`.
fn issued_expiry(sn: &str, stored: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    match stored.map(parse_timestamp) {
        Some(Ok(expires)) => expires,
        Some(Err(e)) => {
            warn!(sn = %sn, error = %e, "stored expiry is unreadable, reporting issue time");
            now
        }
        None => now,
    }
}
