//! `SeaORM` entity prelude.

pub use super::agents::Entity as Agents;
pub use super::bank_accounts::Entity as BankAccounts;
pub use super::billing_events::Entity as BillingEvents;
pub use super::businesses::Entity as Businesses;
pub use super::promo_signups::Entity as PromoSignups;
pub use super::subscription_plans::Entity as SubscriptionPlans;
pub use super::subscriptions::Entity as Subscriptions;
pub use super::tax_rule_sets::Entity as TaxRuleSets;
pub use super::transactions::Entity as Transactions;
pub use super::usage_counters::Entity as UsageCounters;
