//! Subscription domain types.

use std::fmt;

use chrono::{DateTime, Utc};
use monetrax_shared::types::{SubscriptionId, TenantId};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Subscription tier, ordered from lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// No-cost tier.
    Free,
    /// Entry paid tier.
    Starter,
    /// Mid paid tier.
    Business,
    /// Top paid tier.
    Enterprise,
}

impl Tier {
    /// All tiers in ascending order.
    pub const ALL: [Self; 4] = [Self::Free, Self::Starter, Self::Business, Self::Enterprise];

    /// Returns the string representation of the tier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Starter => "starter",
            Self::Business => "business",
            Self::Enterprise => "enterprise",
        }
    }

    /// Parses a tier from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "free" => Some(Self::Free),
            "starter" => Some(Self::Starter),
            "business" => Some(Self::Business),
            "enterprise" => Some(Self::Enterprise),
            _ => None,
        }
    }

    /// Returns true for every tier except `Free`.
    #[must_use]
    pub const fn is_paid(&self) -> bool {
        !matches!(self, Self::Free)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Billing cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    /// Billed every month.
    Monthly,
    /// Billed every year.
    Yearly,
}

impl BillingCycle {
    /// Returns the string representation of the cycle.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    /// Parses a cycle from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "monthly" => Some(Self::Monthly),
            "yearly" => Some(Self::Yearly),
            _ => None,
        }
    }
}

/// Subscription status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// In good standing.
    Active,
    /// Cancellation requested; tier retained until period end.
    Cancelling,
    /// Closed. Superseded by a newer subscription record.
    Cancelled,
}

impl SubscriptionStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Cancelling => "cancelling",
            Self::Cancelled => "cancelled",
        }
    }
}

/// A quota value: a finite count or unlimited.
///
/// Serialized as an integer or the string `"unlimited"`. On input `-1` is
/// also read as unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "RawLimit")]
pub enum Limit {
    /// At most this many.
    Limited(u32),
    /// No cap.
    Unlimited,
}

impl Limit {
    /// Returns true if one more unit may be consumed after `used`.
    #[must_use]
    pub const fn allows(&self, used: u32) -> bool {
        match self {
            Self::Limited(max) => used < *max,
            Self::Unlimited => true,
        }
    }

    /// Units left after `used`, `None` when unlimited.
    #[must_use]
    pub const fn remaining(&self, used: u32) -> Option<u32> {
        match self {
            Self::Limited(max) => Some(max.saturating_sub(used)),
            Self::Unlimited => None,
        }
    }

    /// Returns true for `Unlimited`.
    #[must_use]
    pub const fn is_unlimited(&self) -> bool {
        matches!(self, Self::Unlimited)
    }

    /// The finite cap, `None` when unlimited.
    #[must_use]
    pub const fn as_option(&self) -> Option<u32> {
        match self {
            Self::Limited(max) => Some(*max),
            Self::Unlimited => None,
        }
    }
}

impl Serialize for Limit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Limited(max) => serializer.serialize_u32(*max),
            Self::Unlimited => serializer.serialize_str("unlimited"),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLimit {
    Count(i64),
    Keyword(String),
}

impl TryFrom<RawLimit> for Limit {
    type Error = String;

    fn try_from(raw: RawLimit) -> Result<Self, Self::Error> {
        match raw {
            RawLimit::Count(-1) => Ok(Self::Unlimited),
            RawLimit::Count(n) => u32::try_from(n)
                .map(Self::Limited)
                .map_err(|_| format!("invalid limit {n}")),
            RawLimit::Keyword(s) if s.eq_ignore_ascii_case("unlimited") => Ok(Self::Unlimited),
            RawLimit::Keyword(s) => Err(format!("invalid limit {s:?}")),
        }
    }
}

/// How often linked bank accounts are refreshed automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncFrequency {
    /// No automatic refresh.
    Manual,
    /// Once a day.
    Daily,
    /// Twice a day.
    TwiceDaily,
    /// Every hour.
    Hourly,
}

/// A gateable plan feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// AI-generated insights.
    AiInsights,
    /// Receipt scanning.
    ReceiptOcr,
    /// PDF report export.
    PdfReports,
    /// CSV export.
    CsvExport,
    /// User-defined categories.
    CustomCategories,
    /// Several users per tenant.
    MultiUser,
    /// Priority support.
    PrioritySupport,
    /// Transactions per billing period.
    TransactionsPerMonth,
    /// Linked bank accounts.
    BankAccountsMax,
    /// Manual bank syncs per UTC day.
    ManualSyncsPerDay,
}

impl Feature {
    /// Every feature.
    pub const ALL: [Self; 10] = [
        Self::AiInsights,
        Self::ReceiptOcr,
        Self::PdfReports,
        Self::CsvExport,
        Self::CustomCategories,
        Self::MultiUser,
        Self::PrioritySupport,
        Self::TransactionsPerMonth,
        Self::BankAccountsMax,
        Self::ManualSyncsPerDay,
    ];

    /// Returns the string representation of the feature.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AiInsights => "ai_insights",
            Self::ReceiptOcr => "receipt_ocr",
            Self::PdfReports => "pdf_reports",
            Self::CsvExport => "csv_export",
            Self::CustomCategories => "custom_categories",
            Self::MultiUser => "multi_user",
            Self::PrioritySupport => "priority_support",
            Self::TransactionsPerMonth => "transactions_per_month",
            Self::BankAccountsMax => "bank_accounts_max",
            Self::ManualSyncsPerDay => "manual_syncs_per_day",
        }
    }

    /// Parses a feature name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == s)
    }
}

/// How a feature is gated for a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FeatureGate {
    /// On or off.
    Flag(bool),
    /// Allowed up to a quota.
    Quota(Limit),
}

impl FeatureGate {
    /// Whether the feature is usable at all: an enabled flag, or a quota
    /// that is unlimited or positive.
    #[must_use]
    pub const fn allows(&self) -> bool {
        match self {
            Self::Flag(enabled) => *enabled,
            Self::Quota(Limit::Limited(max)) => *max > 0,
            Self::Quota(Limit::Unlimited) => true,
        }
    }
}

/// Feature table of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanFeatures {
    /// Transactions per billing period.
    pub transactions_per_month: Limit,
    /// AI insights.
    pub ai_insights: bool,
    /// Receipt OCR.
    pub receipt_ocr: bool,
    /// PDF reports.
    pub pdf_reports: bool,
    /// CSV export.
    pub csv_export: bool,
    /// Custom categories.
    pub custom_categories: bool,
    /// Multiple users.
    pub multi_user: bool,
    /// Priority support.
    pub priority_support: bool,
    /// Linked bank accounts.
    pub bank_accounts_max: Limit,
    /// Automatic sync cadence. Descriptive only.
    pub bank_sync_frequency: SyncFrequency,
    /// Manual syncs per UTC day.
    pub manual_syncs_per_day: Limit,
}

impl PlanFeatures {
    /// Returns the gate for `feature`.
    #[must_use]
    pub const fn gate(&self, feature: Feature) -> FeatureGate {
        match feature {
            Feature::AiInsights => FeatureGate::Flag(self.ai_insights),
            Feature::ReceiptOcr => FeatureGate::Flag(self.receipt_ocr),
            Feature::PdfReports => FeatureGate::Flag(self.pdf_reports),
            Feature::CsvExport => FeatureGate::Flag(self.csv_export),
            Feature::CustomCategories => FeatureGate::Flag(self.custom_categories),
            Feature::MultiUser => FeatureGate::Flag(self.multi_user),
            Feature::PrioritySupport => FeatureGate::Flag(self.priority_support),
            Feature::TransactionsPerMonth => FeatureGate::Quota(self.transactions_per_month),
            Feature::BankAccountsMax => FeatureGate::Quota(self.bank_accounts_max),
            Feature::ManualSyncsPerDay => FeatureGate::Quota(self.manual_syncs_per_day),
        }
    }
}

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionPlan {
    /// Tier the plan describes.
    pub tier: Tier,
    /// Display name.
    pub name: String,
    /// Monthly price.
    pub price_monthly: Decimal,
    /// Yearly price.
    pub price_yearly: Decimal,
    /// First-month price for agent promotions.
    pub promo_price_monthly: Option<Decimal>,
    /// Whether the UI highlights the plan.
    #[serde(default)]
    pub highlight: bool,
    /// Feature table.
    pub features: PlanFeatures,
}

impl SubscriptionPlan {
    /// Price for a billing cycle.
    #[must_use]
    pub const fn price_for(&self, cycle: BillingCycle) -> Decimal {
        match cycle {
            BillingCycle::Monthly => self.price_monthly,
            BillingCycle::Yearly => self.price_yearly,
        }
    }
}

/// A tenant's subscription record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Record ID.
    pub id: SubscriptionId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Purchased tier.
    pub tier: Tier,
    /// Billing cycle.
    pub billing_cycle: BillingCycle,
    /// Status.
    pub status: SubscriptionStatus,
    /// Start of the current billing period.
    pub current_period_start: DateTime<Utc>,
    /// End of the current billing period; `None` for free.
    pub current_period_end: Option<DateTime<Utc>>,
    /// Set once the tenant has ever paid. Never cleared.
    pub had_paid_subscription: bool,
    /// Discounted price for the current (first) cycle of a promo signup.
    pub promo_price: Option<Decimal>,
}

impl Subscription {
    /// The default free subscription for a new tenant.
    #[must_use]
    pub fn free(tenant_id: TenantId, now: DateTime<Utc>) -> Self {
        Self {
            id: SubscriptionId::new(),
            tenant_id,
            tier: Tier::Free,
            billing_cycle: BillingCycle::Monthly,
            status: SubscriptionStatus::Active,
            current_period_start: now,
            current_period_end: None,
            had_paid_subscription: false,
            promo_price: None,
        }
    }

    /// Tier whose quotas and features currently apply.
    ///
    /// A cancelled record grants nothing beyond the free tier.
    #[must_use]
    pub const fn effective_tier(&self) -> Tier {
        match self.status {
            SubscriptionStatus::Cancelled => Tier::Free,
            SubscriptionStatus::Active | SubscriptionStatus::Cancelling => self.tier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("50", Limit::Limited(50))]
    #[case("0", Limit::Limited(0))]
    #[case("-1", Limit::Unlimited)]
    #[case("\"unlimited\"", Limit::Unlimited)]
    #[case("\"UNLIMITED\"", Limit::Unlimited)]
    fn test_limit_deserialize(#[case] json: &str, #[case] expected: Limit) {
        let limit: Limit = serde_json::from_str(json).unwrap();
        assert_eq!(limit, expected);
    }

    #[rstest]
    #[case("-2")]
    #[case("\"lots\"")]
    #[case("true")]
    fn test_limit_rejects_garbage(#[case] json: &str) {
        assert!(serde_json::from_str::<Limit>(json).is_err());
    }

    #[test]
    fn test_limit_serialize() {
        assert_eq!(serde_json::to_string(&Limit::Limited(7)).unwrap(), "7");
        assert_eq!(serde_json::to_string(&Limit::Unlimited).unwrap(), "\"unlimited\"");
    }

    #[test]
    fn test_limit_ordering_puts_unlimited_on_top() {
        assert!(Limit::Limited(u32::MAX) < Limit::Unlimited);
        assert!(Limit::Limited(50) < Limit::Limited(200));
    }

    #[test]
    fn test_limit_allows() {
        assert!(Limit::Limited(50).allows(49));
        assert!(!Limit::Limited(50).allows(50));
        assert!(!Limit::Limited(0).allows(0));
        assert!(Limit::Unlimited.allows(u32::MAX));
        assert_eq!(Limit::Limited(50).remaining(60), Some(0));
        assert_eq!(Limit::Unlimited.remaining(3), None);
    }

    #[rstest]
    #[case(FeatureGate::Flag(true), true)]
    #[case(FeatureGate::Flag(false), false)]
    #[case(FeatureGate::Quota(Limit::Limited(0)), false)]
    #[case(FeatureGate::Quota(Limit::Limited(1)), true)]
    #[case(FeatureGate::Quota(Limit::Unlimited), true)]
    fn test_feature_gate_allows(#[case] gate: FeatureGate, #[case] expected: bool) {
        assert_eq!(gate.allows(), expected);
    }

    #[test]
    fn test_feature_names_round_trip() {
        for feature in Feature::ALL {
            assert_eq!(Feature::parse(feature.as_str()), Some(feature));
        }
        assert_eq!(Feature::parse("teleportation"), None);
    }

    #[test]
    fn test_cancelled_subscription_falls_back_to_free() {
        let mut sub = Subscription::free(TenantId::new(), Utc::now());
        sub.tier = Tier::Business;
        sub.status = SubscriptionStatus::Cancelling;
        assert_eq!(sub.effective_tier(), Tier::Business);
        sub.status = SubscriptionStatus::Cancelled;
        assert_eq!(sub.effective_tier(), Tier::Free);
    }
}
