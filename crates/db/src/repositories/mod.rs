//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.
//! Every write that depends on a tenant's subscription runs in one database
//! transaction holding that tenant's `businesses` row lock.

pub mod agent;
pub mod bank;
pub mod business;
pub mod plan;
pub mod promo;
pub mod subscription;
pub mod tax_rule;
pub mod transaction;

pub use agent::{AgentError, AgentRecord, AgentRepository};
pub use bank::{BankAccount, BankAccountRepository, BankError, BankSyncStatus, LinkBankAccountInput};
pub use business::{BusinessError, BusinessRepository};
pub use plan::{PlanError, PlanRepository};
pub use promo::{AgentDashboard, PromoRepoError, PromoRepository, PromoUserStatus};
pub use subscription::{EventOutcome, SubscriptionRepoError, SubscriptionRepository, TenantSnapshot};
pub use tax_rule::{TaxRuleError, TaxRuleRepository};
pub use transaction::{TransactionError, TransactionFilter, TransactionRecord, TransactionRepository};

use chrono::{DateTime, SubsecRound, Utc};
use sea_orm::{DbErr, SqlErr};

/// Truncates an instant to the microsecond precision Postgres stores, so
/// values computed in memory compare equal to values read back.
pub(crate) fn db_time(at: DateTime<Utc>) -> DateTime<Utc> {
    at.trunc_subsecs(6)
}

/// Reads a non-negative integer column.
pub(crate) fn to_count(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

/// Writes a count into an integer column.
pub(crate) fn to_column(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_db_time_truncates_to_micros() {
        let at = Utc
            .timestamp_opt(1_767_225_600, 123_456_789)
            .single()
            .unwrap();
        assert_eq!(db_time(at).timestamp_subsec_nanos(), 123_456_000);
    }

    #[test]
    fn test_count_conversions_saturate() {
        assert_eq!(to_count(-3), 0);
        assert_eq!(to_count(42), 42);
        assert_eq!(to_column(u32::MAX), i32::MAX);
        assert_eq!(to_column(7), 7);
    }
}
