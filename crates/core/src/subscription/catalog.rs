//! The subscription catalog: one plan per tier.
//!
//! The catalog is the single source of truth for prices, quotas and feature
//! flags. It is validated whenever it is built, so an inconsistent catalog
//! never reaches the entitlement gate.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use super::error::SubscriptionError;
use super::types::{Feature, FeatureGate, SubscriptionPlan, Tier};

/// Validated set of plans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionCatalog {
    plans: BTreeMap<Tier, SubscriptionPlan>,
}

impl SubscriptionCatalog {
    /// Builds and validates a catalog.
    ///
    /// # Errors
    ///
    /// Returns `SubscriptionError::InvalidCatalog` when a tier is missing or
    /// duplicated, a price is out of range, or a higher tier grants less
    /// than a lower one.
    pub fn new(plans: Vec<SubscriptionPlan>) -> Result<Self, SubscriptionError> {
        let mut by_tier = BTreeMap::new();
        for plan in plans {
            let tier = plan.tier;
            if by_tier.insert(tier, plan).is_some() {
                return Err(invalid(format!("tier {tier} is defined twice")));
            }
        }

        let catalog = Self { plans: by_tier };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Returns a new catalog with `plan` replacing the plan for its tier.
    ///
    /// # Errors
    ///
    /// Returns `SubscriptionError::InvalidCatalog` if the result is invalid.
    pub fn with_plan(&self, plan: SubscriptionPlan) -> Result<Self, SubscriptionError> {
        let mut plans = self.plans.clone();
        plans.insert(plan.tier, plan);
        let catalog = Self { plans };
        catalog.validate()?;
        Ok(catalog)
    }

    /// The plan for `tier`.
    ///
    /// # Errors
    ///
    /// Returns `SubscriptionError::TierNotInCatalog` if absent.
    pub fn plan(&self, tier: Tier) -> Result<&SubscriptionPlan, SubscriptionError> {
        self.plans
            .get(&tier)
            .ok_or(SubscriptionError::TierNotInCatalog(tier))
    }

    /// All plans in ascending tier order.
    pub fn plans(&self) -> impl Iterator<Item = &SubscriptionPlan> {
        self.plans.values()
    }

    /// Lowest tier granting `feature`, if any.
    #[must_use]
    pub fn lowest_tier_with(&self, feature: Feature) -> Option<Tier> {
        self.plans()
            .find(|plan| plan.features.gate(feature).allows())
            .map(|plan| plan.tier)
    }

    fn validate(&self) -> Result<(), SubscriptionError> {
        for tier in Tier::ALL {
            let plan = self
                .plans
                .get(&tier)
                .ok_or_else(|| invalid(format!("tier {tier} is missing")))?;
            validate_prices(plan)?;
        }

        let plans: Vec<&SubscriptionPlan> = self.plans.values().collect();
        for pair in plans.windows(2) {
            let (lower, higher) = (pair[0], pair[1]);
            for feature in Feature::ALL {
                let ok = match (lower.features.gate(feature), higher.features.gate(feature)) {
                    (FeatureGate::Flag(lo), FeatureGate::Flag(hi)) => !lo || hi,
                    (FeatureGate::Quota(lo), FeatureGate::Quota(hi)) => lo <= hi,
                    _ => false,
                };
                if !ok {
                    return Err(invalid(format!(
                        "{} grants less {} than {}",
                        higher.tier,
                        feature.as_str(),
                        lower.tier
                    )));
                }
            }
        }
        Ok(())
    }
}

fn validate_prices(plan: &SubscriptionPlan) -> Result<(), SubscriptionError> {
    let tier = plan.tier;
    if plan.name.trim().is_empty() {
        return Err(invalid(format!("tier {tier} has no display name")));
    }
    if plan.price_monthly < Decimal::ZERO || plan.price_yearly < Decimal::ZERO {
        return Err(invalid(format!("tier {tier} has a negative price")));
    }
    if tier == Tier::Free {
        if !plan.price_monthly.is_zero() || !plan.price_yearly.is_zero() {
            return Err(invalid("free tier must cost nothing"));
        }
        if plan.promo_price_monthly.is_some() {
            return Err(invalid("free tier cannot carry a promotional price"));
        }
    }
    if let Some(promo) = plan.promo_price_monthly {
        if promo < Decimal::ZERO || promo >= plan.price_monthly {
            return Err(invalid(format!(
                "tier {tier} promo price {promo} must be below the monthly price {}",
                plan.price_monthly
            )));
        }
    }
    Ok(())
}

fn invalid(message: impl Into<String>) -> SubscriptionError {
    SubscriptionError::InvalidCatalog(message.into())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::subscription::types::{Limit, PlanFeatures, SyncFrequency};
    use rust_decimal_macros::dec;

    fn plan(
        tier: Tier,
        prices: (Decimal, Decimal, Option<Decimal>),
        transactions: Limit,
        flags: [bool; 7],
        bank: (Limit, SyncFrequency, Limit),
    ) -> SubscriptionPlan {
        let [ai, ocr, pdf, csv, custom, multi, priority] = flags;
        SubscriptionPlan {
            tier,
            name: format!("{} plan", tier.as_str()),
            price_monthly: prices.0,
            price_yearly: prices.1,
            promo_price_monthly: prices.2,
            highlight: tier == Tier::Business,
            features: PlanFeatures {
                transactions_per_month: transactions,
                ai_insights: ai,
                receipt_ocr: ocr,
                pdf_reports: pdf,
                csv_export: csv,
                custom_categories: custom,
                multi_user: multi,
                priority_support: priority,
                bank_accounts_max: bank.0,
                bank_sync_frequency: bank.1,
                manual_syncs_per_day: bank.2,
            },
        }
    }

    /// A catalog shaped like the seeded one.
    pub fn standard_plans() -> Vec<SubscriptionPlan> {
        vec![
            plan(
                Tier::Free,
                (dec!(0), dec!(0), None),
                Limit::Limited(50),
                [false, false, false, false, false, false, false],
                (Limit::Limited(0), SyncFrequency::Manual, Limit::Limited(0)),
            ),
            plan(
                Tier::Starter,
                (dec!(3000), dec!(30000), Some(dec!(1500))),
                Limit::Limited(200),
                [false, true, true, true, false, false, false],
                (Limit::Limited(1), SyncFrequency::Daily, Limit::Limited(3)),
            ),
            plan(
                Tier::Business,
                (dec!(7500), dec!(75000), Some(dec!(5000))),
                Limit::Limited(1000),
                [true, true, true, true, true, false, false],
                (Limit::Limited(3), SyncFrequency::TwiceDaily, Limit::Limited(10)),
            ),
            plan(
                Tier::Enterprise,
                (dec!(20000), dec!(200000), Some(dec!(15000))),
                Limit::Unlimited,
                [true, true, true, true, true, true, true],
                (Limit::Unlimited, SyncFrequency::Hourly, Limit::Unlimited),
            ),
        ]
    }

    pub fn standard_catalog() -> SubscriptionCatalog {
        SubscriptionCatalog::new(standard_plans()).unwrap()
    }
}
