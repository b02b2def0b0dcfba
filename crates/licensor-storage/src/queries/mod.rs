// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per table family.

pub mod credentials;
pub mod email_records;
pub mod filters;
pub mod groups;
pub mod licenses;
pub mod rate_limits;
pub mod settings;
