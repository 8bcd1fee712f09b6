//! Database layer with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - Repository abstractions for data access
//! - Database migrations
//!
//! Quota consumption, promotional signups and billing events are made safe
//! under concurrency here, by row locks and conditional updates inside
//! database transactions. The domain decisions themselves come from
//! `monetrax-core`.

pub mod entities;
pub mod migration;
pub mod repositories;

pub use repositories::{
    AgentRepository, BankAccountRepository, BusinessRepository, PlanRepository, PromoRepository,
    SubscriptionRepository, TaxRuleRepository, TransactionRepository,
};

use monetrax_shared::config::DatabaseConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Establishes a connection pool sized from configuration.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .sqlx_logging(false);
    Database::connect(options).await
}
