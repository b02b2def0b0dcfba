// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Seams between the engine and its collaborators.

pub mod notifier;
pub mod store;

pub use notifier::Notifier;
pub use store::ExpiringStore;
