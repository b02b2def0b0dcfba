// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Email notifications for issued serial numbers.
//!
//! SMTP settings are read from the settings table on every send, so changes
//! made through the admin API apply without a restart.

pub mod smtp;
pub mod template;

pub use smtp::SmtpNotifier;
pub use template::render_sn_issued;
