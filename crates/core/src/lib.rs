//! Core business logic for Monetrax.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and calculations live here.
//!
//! # Modules
//!
//! - `tax` - Tax rule sets, VAT exemption, VAT and income tax summaries
//! - `readiness` - Compliance readiness scoring
//! - `subscription` - Plans, usage quotas, entitlements, promotions, billing lifecycle
//! - `tenant` - Business profile and per-request tenant context

pub mod readiness;
pub mod subscription;
pub mod tax;
pub mod tenant;
