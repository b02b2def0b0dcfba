// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-IP daily gates for SN requests.
//!
//! Two gates must both pass: the request counter for (ip, day) must be below
//! the daily request limit, and the number of distinct emails bound from the
//! IP that day must be below the daily email limit. Only an admitted request
//! bumps the counter. Counters are keyed by UTC calendar day, so they reset
//! when the date changes.

use chrono::{DateTime, Utc};
use licensor_core::time::format_date;
use licensor_core::{LicensorError, RequestLimits, ResponseCode};
use licensor_storage::Database;
use licensor_storage::queries::rate_limits::{self, DailyUsage};
use licensor_storage::queries::settings;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// Admitted; `usage` is what was observed before this request.
    Admitted { usage: DailyUsage },
    RequestLimitExceeded { limit: i64 },
    EmailLimitExceeded { limit: i64 },
}

impl RateDecision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, RateDecision::Admitted { .. })
    }

    /// Wire code for a denial; `None` when admitted.
    pub fn denial_code(&self) -> Option<ResponseCode> {
        match self {
            RateDecision::Admitted { .. } => None,
            RateDecision::RequestLimitExceeded { .. } => Some(ResponseCode::RateLimitExceeded),
            RateDecision::EmailLimitExceeded { .. } => Some(ResponseCode::EmailLimitExceeded),
        }
    }
}

/// Judge one day's usage against the limits. The request gate runs first.
pub fn decide(usage: DailyUsage, limits: RequestLimits) -> RateDecision {
    if usage.requests >= limits.daily_request_limit {
        return RateDecision::RequestLimitExceeded {
            limit: limits.daily_request_limit,
        };
    }
    if usage.distinct_emails >= limits.daily_email_limit {
        return RateDecision::EmailLimitExceeded {
            limit: limits.daily_email_limit,
        };
    }
    RateDecision::Admitted { usage }
}

/// Applies [`decide`] against stored counters.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    db: Database,
    defaults: RequestLimits,
}

impl RateLimiter {
    /// `defaults` apply until an administrator stores limits in settings.
    pub fn new(db: Database, defaults: RequestLimits) -> Self {
        Self { db, defaults }
    }

    /// Check both gates for `ip` on the day of `now`, counting the request
    /// if admitted. Check and increment happen in one storage transaction.
    pub async fn check_and_increment(
        &self,
        ip: &str,
        now: DateTime<Utc>,
    ) -> Result<RateDecision, LicensorError> {
        let limits = settings::request_limits(&self.db, self.defaults).await?;
        let day = format_date(now);
        let decision = rate_limits::admit_with(&self.db, ip, &day, move |usage| {
            let decision = decide(usage, limits);
            (decision, decision.is_admitted())
        })
        .await?;

        if !decision.is_admitted() {
            debug!(ip = %ip, day = %day, ?decision, "request denied by daily limit");
        }
        Ok(decision)
    }
}
