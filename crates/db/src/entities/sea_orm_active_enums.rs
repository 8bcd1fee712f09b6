//! `SeaORM` active enums mirroring the Postgres enum types.

use monetrax_core::subscription::{
    BillingCycle as CoreCycle, SubscriptionStatus as CoreStatus, SyncFrequency, Tier,
};
use monetrax_core::tax::TransactionKind as CoreKind;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "transaction_kind")]
pub enum TransactionKind {
    #[sea_orm(string_value = "income")]
    Income,
    #[sea_orm(string_value = "expense")]
    Expense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "subscription_tier")]
pub enum SubscriptionTier {
    #[sea_orm(string_value = "free")]
    Free,
    #[sea_orm(string_value = "starter")]
    Starter,
    #[sea_orm(string_value = "business")]
    Business,
    #[sea_orm(string_value = "enterprise")]
    Enterprise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "billing_cycle")]
pub enum BillingCycle {
    #[sea_orm(string_value = "monthly")]
    Monthly,
    #[sea_orm(string_value = "yearly")]
    Yearly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "subscription_status")]
pub enum SubscriptionStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "cancelling")]
    Cancelling,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "bank_sync_frequency")]
pub enum BankSyncFrequency {
    #[sea_orm(string_value = "manual")]
    Manual,
    #[sea_orm(string_value = "daily")]
    Daily,
    #[sea_orm(string_value = "twice_daily")]
    TwiceDaily,
    #[sea_orm(string_value = "hourly")]
    Hourly,
}

impl From<CoreKind> for TransactionKind {
    fn from(kind: CoreKind) -> Self {
        match kind {
            CoreKind::Income => Self::Income,
            CoreKind::Expense => Self::Expense,
        }
    }
}

impl From<TransactionKind> for CoreKind {
    fn from(kind: TransactionKind) -> Self {
        match kind {
            TransactionKind::Income => Self::Income,
            TransactionKind::Expense => Self::Expense,
        }
    }
}

impl From<Tier> for SubscriptionTier {
    fn from(tier: Tier) -> Self {
        match tier {
            Tier::Free => Self::Free,
            Tier::Starter => Self::Starter,
            Tier::Business => Self::Business,
            Tier::Enterprise => Self::Enterprise,
        }
    }
}

impl From<SubscriptionTier> for Tier {
    fn from(tier: SubscriptionTier) -> Self {
        match tier {
            SubscriptionTier::Free => Self::Free,
            SubscriptionTier::Starter => Self::Starter,
            SubscriptionTier::Business => Self::Business,
            SubscriptionTier::Enterprise => Self::Enterprise,
        }
    }
}

impl From<CoreCycle> for BillingCycle {
    fn from(cycle: CoreCycle) -> Self {
        match cycle {
            CoreCycle::Monthly => Self::Monthly,
            CoreCycle::Yearly => Self::Yearly,
        }
    }
}

impl From<BillingCycle> for CoreCycle {
    fn from(cycle: BillingCycle) -> Self {
        match cycle {
            BillingCycle::Monthly => Self::Monthly,
            BillingCycle::Yearly => Self::Yearly,
        }
    }
}

impl From<CoreStatus> for SubscriptionStatus {
    fn from(status: CoreStatus) -> Self {
        match status {
            CoreStatus::Active => Self::Active,
            CoreStatus::Cancelling => Self::Cancelling,
            CoreStatus::Cancelled => Self::Cancelled,
        }
    }
}

impl From<SubscriptionStatus> for CoreStatus {
    fn from(status: SubscriptionStatus) -> Self {
        match status {
            SubscriptionStatus::Active => Self::Active,
            SubscriptionStatus::Cancelling => Self::Cancelling,
            SubscriptionStatus::Cancelled => Self::Cancelled,
        }
    }
}

impl From<SyncFrequency> for BankSyncFrequency {
    fn from(frequency: SyncFrequency) -> Self {
        match frequency {
            SyncFrequency::Manual => Self::Manual,
            SyncFrequency::Daily => Self::Daily,
            SyncFrequency::TwiceDaily => Self::TwiceDaily,
            SyncFrequency::Hourly => Self::Hourly,
        }
    }
}

impl From<BankSyncFrequency> for SyncFrequency {
    fn from(frequency: BankSyncFrequency) -> Self {
        match frequency {
            BankSyncFrequency::Manual => Self::Manual,
            BankSyncFrequency::Daily => Self::Daily,
            BankSyncFrequency::TwiceDaily => Self::TwiceDaily,
            BankSyncFrequency::Hourly => Self::Hourly,
        }
    }
}
