// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Email policy evaluation.
//!
//! Fixed order: blacklist, then whitelist, then conditions. A blacklist hit
//! dominates everything else. The first matching condition (in creation
//! order) assigns the requester's LLM and search groups.

use licensor_core::{ConditionEntry, FilterList, FilterToggles, LicensorError, ResponseCode};
use licensor_storage::Database;
use licensor_storage::queries::{filters, settings};

/// Trim and lowercase an email address.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Minimal shape check applied to a normalized address.
pub fn is_valid_email(email: &str) -> bool {
    !email.is_empty() && email.contains('@') && email.contains('.')
}

/// `@domain` patterns match by suffix, anything else by equality. Both sides
/// are compared case-insensitively.
pub fn matches_pattern(email: &str, pattern: &str) -> bool {
    let email = email.to_lowercase();
    let pattern = pattern.to_lowercase();
    if pattern.starts_with('@') {
        email.ends_with(&pattern)
    } else {
        email == pattern
    }
}

/// Groups an allowed requester is entitled to. `None` leaves that dimension
/// unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupBinding {
    pub llm_group_id: Option<String>,
    pub search_group_id: Option<String>,
    /// Pattern of the condition that produced this binding.
    pub matched_condition: Option<String>,
}

impl GroupBinding {
    fn from_condition(entry: &ConditionEntry) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Self {
            llm_group_id: non_empty(&entry.llm_group_id),
            search_group_id: non_empty(&entry.search_group_id),
            matched_condition: Some(entry.pattern.clone()),
        }
    }

    /// No group constraint at all.
    pub fn is_unconstrained(&self) -> bool {
        self.llm_group_id.is_none() && self.search_group_id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    Allowed(GroupBinding),
    Blacklisted { pattern: String },
    NotWhitelisted,
}

impl PolicyDecision {
    /// Wire code for a denial; `None` when allowed.
    pub fn denial_code(&self) -> Option<ResponseCode> {
        match self {
            PolicyDecision::Allowed(_) => None,
            PolicyDecision::Blacklisted { .. } => Some(ResponseCode::EmailBlacklisted),
            PolicyDecision::NotWhitelisted => Some(ResponseCode::EmailNotWhitelisted),
        }
    }
}

/// A snapshot of the filter lists and toggles.
#[derive(Debug, Clone, Default)]
pub struct PolicyRules {
    pub toggles: FilterToggles,
    pub blacklist: Vec<String>,
    pub whitelist: Vec<String>,
    pub conditions: Vec<ConditionEntry>,
}

impl PolicyRules {
    /// Read the current rules. Lists whose toggle is off are not loaded.
    pub async fn load(db: &Database) -> Result<Self, LicensorError> {
        let toggles = settings::filter_toggles(db).await?;
        let patterns = |entries: Vec<licensor_core::FilterEntry>| {
            entries.into_iter().map(|e| e.pattern).collect::<Vec<_>>()
        };

        let blacklist = if toggles.blacklist_enabled {
            patterns(filters::list(db, FilterList::Blacklist).await?)
        } else {
            Vec::new()
        };
        let whitelist = if toggles.whitelist_enabled {
            patterns(filters::list(db, FilterList::Whitelist).await?)
        } else {
            Vec::new()
        };
        let conditions = if toggles.conditions_enabled {
            filters::list_conditions(db).await?
        } else {
            Vec::new()
        };

        Ok(Self {
            toggles,
            blacklist,
            whitelist,
            conditions,
        })
    }

    pub fn evaluate(&self, email: &str) -> PolicyDecision {
        if self.toggles.blacklist_enabled
            && let Some(pattern) = self.blacklist.iter().find(|p| matches_pattern(email, p))
        {
            return PolicyDecision::Blacklisted {
                pattern: pattern.clone(),
            };
        }

        if self.toggles.whitelist_enabled
            && !self.whitelist.iter().any(|p| matches_pattern(email, p))
        {
            return PolicyDecision::NotWhitelisted;
        }

        if self.toggles.conditions_enabled
            && let Some(entry) = self
                .conditions
                .iter()
                .find(|c| matches_pattern(email, &c.pattern))
        {
            return PolicyDecision::Allowed(GroupBinding::from_condition(entry));
        }

        PolicyDecision::Allowed(GroupBinding::default())
    }
}
