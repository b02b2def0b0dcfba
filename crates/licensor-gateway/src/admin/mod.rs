// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session-protected admin API.
//!
//! Handlers are thin: they validate input, call the storage query modules,
//! and answer `{"success": true, ...}` JSON. Failures go through
//! [`crate::error::ApiError`].

pub mod configs;
pub mod filters;
pub mod groups;
pub mod licenses;
pub mod records;
pub mod settings;

use axum::Router;
use axum::routing::{get, post};
use licensor_core::{CredentialKind, FilterList, GroupKind};
use serde::Deserialize;

use crate::server::AppState;

/// Routes mounted behind the session middleware.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/stats", get(licenses::stats))
        .route("/api/licenses", get(licenses::list).post(licenses::create))
        .route("/api/licenses/batch", post(licenses::batch_create))
        .route("/api/licenses/toggle", post(licenses::toggle))
        .route("/api/licenses/extend", post(licenses::extend))
        .route("/api/licenses/set-daily", post(licenses::set_daily))
        .route("/api/licenses/set-groups", post(licenses::set_groups))
        .route("/api/licenses/delete", post(licenses::delete))
        .route("/api/licenses/force-delete", post(licenses::force_delete))
        .route("/api/licenses/delete-unused", post(licenses::delete_unused))
        .route("/api/licenses/purge-disabled", post(licenses::purge_disabled))
        .route("/api/llm-groups", groups::routes(GroupKind::Llm))
        .route("/api/search-groups", groups::routes(GroupKind::Search))
        .route("/api/license-groups", groups::routes(GroupKind::License))
        .route(
            "/api/product-types",
            get(groups::list_products)
                .post(groups::create_product)
                .delete(groups::delete_product),
        )
        .route("/api/llm-configs", configs::routes(CredentialKind::Llm))
        .route("/api/search-configs", configs::routes(CredentialKind::Search))
        .route("/api/blacklist", filters::routes(FilterList::Blacklist))
        .route("/api/whitelist", filters::routes(FilterList::Whitelist))
        .route(
            "/api/conditions",
            get(filters::list_conditions)
                .post(filters::save_condition)
                .delete(filters::delete_condition),
        )
        .route(
            "/api/email-filter",
            get(filters::get_toggles).post(filters::set_toggles),
        )
        .route(
            "/api/settings/request-limits",
            get(settings::get_request_limits).post(settings::set_request_limits),
        )
        .route("/api/smtp", get(settings::get_smtp).post(settings::set_smtp))
        .route("/api/smtp/test", post(settings::test_smtp))
        .route("/api/password", post(settings::change_password))
        .route(
            "/api/username",
            get(settings::get_username).post(settings::change_username),
        )
        .route("/api/email-records", get(records::list))
        .route("/api/email-records/clear-by-email", post(records::clear_by_email))
        .route("/api/settings/clear-ip-records", post(records::clear_ip))
}

/// `?id=` for string-keyed deletes.
#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: String,
}

/// Paging parameters shared by list endpoints. Pages start at 1.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Paging {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

impl Paging {
    pub const MAX_PAGE_SIZE: i64 = 500;

    pub fn limit(self) -> i64 {
        self.page_size.clamp(1, Self::MAX_PAGE_SIZE)
    }

    pub fn offset(self) -> i64 {
        (self.page.max(1) - 1) * self.limit()
    }
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    50
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paging_clamps_inputs() {
        let paging = Paging {
            page: 0,
            page_size: 10_000,
        };
        assert_eq!(paging.limit(), Paging::MAX_PAGE_SIZE);
        assert_eq!(paging.offset(), 0);

        let paging = Paging {
            page: 3,
            page_size: 20,
        };
        assert_eq!(paging.offset(), 40);
    }
}
