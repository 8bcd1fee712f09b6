//! Shared types, errors, and configuration for Monetrax.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe entity references
//! - Pagination types for list endpoints
//! - Application-wide error types
//! - Configuration management
//! - Identity claims issued by the external identity provider

pub mod auth;
pub mod config;
pub mod error;
pub mod jwt;
pub mod types;

pub use auth::{Claims, Role};
pub use config::{AppConfig, ReadinessWeights};
pub use error::{AppError, AppResult};
pub use jwt::{JwtConfig, JwtError, JwtService};
