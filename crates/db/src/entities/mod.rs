//! `SeaORM` entity definitions.

pub mod prelude;

pub mod agents;
pub mod bank_accounts;
pub mod billing_events;
pub mod businesses;
pub mod promo_signups;
pub mod sea_orm_active_enums;
pub mod subscription_plans;
pub mod subscriptions;
pub mod tax_rule_sets;
pub mod transactions;
pub mod usage_counters;
