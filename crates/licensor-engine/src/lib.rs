// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Allocation and activation decision engine.
//!
//! [`policy`] decides whether an email may request an SN and which groups
//! it is entitled to; [`rate_limit`] gates requests per IP per day;
//! [`allocator`] binds the oldest eligible SN; [`resolver`] picks the
//! credentials an activation hands out; [`activation`] runs the activation
//! checks and seals the payload. [`service`] wires them together.

pub mod activation;
pub mod allocator;
pub mod policy;
pub mod rate_limit;
pub mod resolver;
pub mod service;

pub use activation::{ActivationOutcome, Activator};
pub use allocator::{AllocationOutcome, AllocationRequest, SnAllocator};
pub use policy::{GroupBinding, PolicyDecision, PolicyRules};
pub use rate_limit::{RateDecision, RateLimiter};
pub use service::{LicenseService, SnRequest, SnRequestOutcome};
