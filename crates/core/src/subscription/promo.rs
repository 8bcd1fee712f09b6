//! Agent-issued promotional signups.
//!
//! A promotion discounts the first monthly cycle of a paid tier. Each
//! normalized identifier can receive at most one promotion ever; the storage
//! layer enforces that with a unique index, this module decides eligibility
//! and builds the records.

use std::fmt;

use chrono::{DateTime, Months, Utc};
use monetrax_shared::types::{PromoSignupId, SubscriptionId, TenantId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::catalog::SubscriptionCatalog;
use super::error::PromoError;
use super::types::{BillingCycle, Subscription, SubscriptionPlan, SubscriptionStatus, Tier};

/// Minimum digits in a phone number.
pub const MIN_PHONE_DIGITS: usize = 7;
/// Maximum digits in a phone number (E.164).
pub const MAX_PHONE_DIGITS: usize = 15;

/// Kind of contact identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierKind {
    /// Email address.
    Email,
    /// Phone number.
    Phone,
}

/// A normalized email or phone number.
///
/// Emails are trimmed and lowercased; phone numbers keep only their digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromoIdentifier(String);

impl PromoIdentifier {
    /// Normalizes a raw identifier.
    ///
    /// # Errors
    ///
    /// Returns `PromoError::InvalidIdentifier` for a malformed email or a
    /// phone number with the wrong number of digits.
    pub fn parse(raw: &str) -> Result<Self, PromoError> {
        let trimmed = raw.trim();
        if trimmed.contains('@') {
            let email = trimmed.to_lowercase();
            let valid = email.split_once('@').is_some_and(|(local, domain)| {
                !local.is_empty()
                    && !domain.contains('@')
                    && domain
                        .split('.')
                        .all(|label| !label.is_empty())
                    && domain.contains('.')
                    && !email.chars().any(char::is_whitespace)
            });
            if !valid {
                return Err(PromoError::InvalidIdentifier(format!(
                    "{trimmed:?} is not a valid email address"
                )));
            }
            return Ok(Self(email));
        }

        let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
        if !(MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits.len()) {
            return Err(PromoError::InvalidIdentifier(format!(
                "phone numbers must have {MIN_PHONE_DIGITS}-{MAX_PHONE_DIGITS} digits"
            )));
        }
        Ok(Self(digits))
    }

    /// The normalized value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Email or phone.
    #[must_use]
    pub fn kind(&self) -> IdentifierKind {
        if self.0.contains('@') {
            IdentifierKind::Email
        } else {
            IdentifierKind::Phone
        }
    }
}

impl fmt::Display for PromoIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An agent's registered initials, e.g. `AO`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentTag(String);

impl AgentTag {
    /// Validates and uppercases agent initials.
    ///
    /// # Errors
    ///
    /// Returns `PromoError::InvalidAgentTag` unless the tag is 2-5 ASCII
    /// alphanumerics.
    pub fn parse(raw: &str) -> Result<Self, PromoError> {
        let tag = raw.trim().to_ascii_uppercase();
        if !(2..=5).contains(&tag.len()) || !tag.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(PromoError::InvalidAgentTag(format!(
                "{raw:?} must be 2-5 letters or digits"
            )));
        }
        Ok(Self(tag))
    }

    /// The uppercase tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Promotional price of a tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromoQuote {
    /// Tier.
    pub tier: Tier,
    /// Display name.
    pub name: String,
    /// Regular monthly price.
    pub regular_price: Decimal,
    /// First-month promotional price.
    pub promo_price: Decimal,
    /// `regular_price - promo_price`.
    pub savings: Decimal,
}

/// A recorded promotional signup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromoSignup {
    /// Signup ID.
    pub id: PromoSignupId,
    /// Normalized identifier; unique across all signups.
    pub identifier: PromoIdentifier,
    /// Tenant that received the promotion.
    pub tenant_id: TenantId,
    /// Issuing agent.
    pub agent_user_id: UserId,
    /// Issuing agent's initials.
    pub agent_tag: AgentTag,
    /// Promoted tier.
    pub tier: Tier,
    /// Price charged for the first cycle.
    pub promo_price: Decimal,
    /// Discount granted.
    pub savings: Decimal,
    /// When the signup was issued.
    pub created_at: DateTime<Utc>,
}

/// What an eligibility lookup found about an identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PromoHistory {
    /// A signup already exists for the identifier.
    pub has_signup: bool,
    /// The identified tenant has paid before.
    pub had_paid_subscription: bool,
}

/// A request to issue a promotion.
#[derive(Debug, Clone)]
pub struct PromoRequest {
    /// Issuing agent.
    pub agent_user_id: UserId,
    /// Issuing agent's initials.
    pub agent_tag: AgentTag,
    /// Target identifier.
    pub identifier: PromoIdentifier,
    /// Target tenant.
    pub tenant_id: TenantId,
    /// Promoted tier.
    pub tier: Tier,
}

/// Records produced by a successful issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromoIssuance {
    /// The discounted subscription.
    pub subscription: Subscription,
    /// The signup record.
    pub signup: PromoSignup,
}

/// Promotional pricing rules.
pub struct PromotionalPricingService<'a> {
    catalog: &'a SubscriptionCatalog,
}

impl<'a> PromotionalPricingService<'a> {
    /// Creates the service over a validated catalog.
    #[must_use]
    pub const fn new(catalog: &'a SubscriptionCatalog) -> Self {
        Self { catalog }
    }

    /// Tiers that carry a promotional price.
    #[must_use]
    pub fn promotional_plans(&self) -> Vec<PromoQuote> {
        self.catalog.plans().filter_map(quote_for).collect()
    }

    /// Promotional quote for `tier`.
    ///
    /// # Errors
    ///
    /// Returns `PromoError::TierNotPromotable` if the tier has no promo price.
    pub fn quote(&self, tier: Tier) -> Result<PromoQuote, PromoError> {
        quote_for(self.catalog.plan(tier)?).ok_or(PromoError::TierNotPromotable(tier))
    }

    /// Eligibility of an identifier given what storage knows about it.
    ///
    /// # Errors
    ///
    /// Returns `PromoError::AlreadyUsedPromo` if a signup exists or the
    /// tenant has already paid.
    pub const fn check_eligibility(history: PromoHistory) -> Result<(), PromoError> {
        if history.has_signup || history.had_paid_subscription {
            return Err(PromoError::AlreadyUsedPromo);
        }
        Ok(())
    }

    /// Builds the discounted subscription and the signup record.
    ///
    /// The subscription is monthly, starts at `now` and carries the promo
    /// price for its first cycle only. It marks the tenant as having paid.
    ///
    /// # Errors
    ///
    /// Returns `PromoError::AlreadyUsedPromo` when ineligible, or
    /// `PromoError::TierNotPromotable` for a tier without a promo price.
    pub fn issue(
        &self,
        request: PromoRequest,
        history: PromoHistory,
        now: DateTime<Utc>,
    ) -> Result<PromoIssuance, PromoError> {
        Self::check_eligibility(history)?;
        let quote = self.quote(request.tier)?;

        let subscription = Subscription {
            id: SubscriptionId::new(),
            tenant_id: request.tenant_id,
            tier: request.tier,
            billing_cycle: BillingCycle::Monthly,
            status: SubscriptionStatus::Active,
            current_period_start: now,
            current_period_end: Some(now.checked_add_months(Months::new(1)).unwrap_or(now)),
            had_paid_subscription: true,
            promo_price: Some(quote.promo_price),
        };

        let signup = PromoSignup {
            id: PromoSignupId::new(),
            identifier: request.identifier,
            tenant_id: request.tenant_id,
            agent_user_id: request.agent_user_id,
            agent_tag: request.agent_tag,
            tier: request.tier,
            promo_price: quote.promo_price,
            savings: quote.savings,
            created_at: now,
        };

        Ok(PromoIssuance {
            subscription,
            signup,
        })
    }
}

fn quote_for(plan: &SubscriptionPlan) -> Option<PromoQuote> {
    let promo_price = plan.promo_price_monthly?;
    Some(PromoQuote {
        tier: plan.tier,
        name: plan.name.clone(),
        regular_price: plan.price_monthly,
        promo_price,
        savings: plan.price_monthly - promo_price,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscription::catalog::fixtures::standard_catalog;
    use chrono::TimeZone;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case("  Ada@Example.COM ", "ada@example.com")]
    #[case("+234 (803) 555-0101", "2348035550101")]
    #[case("0803-555-0101", "08035550101")]
    fn test_identifier_normalization(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(PromoIdentifier::parse(raw).unwrap().as_str(), expected);
    }

    #[rstest]
    #[case("@example.com")]
    #[case("ada@localhost")]
    #[case("ada@@example.com")]
    #[case("ada@example..com")]
    #[case("12345")]
    #[case("1234567890123456")]
    #[case("")]
    fn test_identifier_rejected(#[case] raw: &str) {
        assert!(matches!(
            PromoIdentifier::parse(raw),
            Err(PromoError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_identifier_kind() {
        assert_eq!(
            PromoIdentifier::parse("a@b.co").unwrap().kind(),
            IdentifierKind::Email
        );
        assert_eq!(
            PromoIdentifier::parse("08035550101").unwrap().kind(),
            IdentifierKind::Phone
        );
    }

    #[rstest]
    #[case("ao", Some("AO"))]
    #[case(" jd2 ", Some("JD2"))]
    #[case("a", None)]
    #[case("abcdef", None)]
    #[case("a-b", None)]
    fn test_agent_tag(#[case] raw: &str, #[case] expected: Option<&str>) {
        assert_eq!(
            AgentTag::parse(raw).ok().as_ref().map(AgentTag::as_str),
            expected
        );
    }

    fn request(tier: Tier) -> PromoRequest {
        PromoRequest {
            agent_user_id: UserId::new(),
            agent_tag: AgentTag::parse("AO").unwrap(),
            identifier: PromoIdentifier::parse("ada@example.com").unwrap(),
            tenant_id: TenantId::new(),
            tier,
        }
    }

    #[test]
    fn test_promotional_plans_exclude_free() {
        let catalog = standard_catalog();
        let plans = PromotionalPricingService::new(&catalog).promotional_plans();
        assert_eq!(plans.len(), 3);
        assert!(plans.iter().all(|p| p.tier != Tier::Free));
        let starter = plans.iter().find(|p| p.tier == Tier::Starter).unwrap();
        assert_eq!(starter.savings, dec!(1500));
    }

    #[test]
    fn test_issue_creates_discounted_monthly_subscription() {
        let catalog = standard_catalog();
        let service = PromotionalPricingService::new(&catalog);
        let now = Utc.with_ymd_and_hms(2026, 1, 31, 9, 0, 0).unwrap();

        let issuance = service
            .issue(request(Tier::Business), PromoHistory::default(), now)
            .unwrap();

        let sub = issuance.subscription;
        assert_eq!(sub.tier, Tier::Business);
        assert_eq!(sub.billing_cycle, BillingCycle::Monthly);
        assert_eq!(sub.promo_price, Some(dec!(5000)));
        assert!(sub.had_paid_subscription);
        assert_eq!(
            sub.current_period_end,
            Some(Utc.with_ymd_and_hms(2026, 2, 28, 9, 0, 0).unwrap())
        );
        assert_eq!(issuance.signup.savings, dec!(2500));
        assert_eq!(issuance.signup.identifier.as_str(), "ada@example.com");
    }

    #[test]
    fn test_existing_signup_denied() {
        let catalog = standard_catalog();
        let service = PromotionalPricingService::new(&catalog);
        let history = PromoHistory {
            has_signup: true,
            had_paid_subscription: false,
        };
        assert_eq!(
            service.issue(request(Tier::Starter), history, Utc::now()),
            Err(PromoError::AlreadyUsedPromo)
        );
    }

    #[test]
    fn test_previously_paid_tenant_denied() {
        let history = PromoHistory {
            has_signup: false,
            had_paid_subscription: true,
        };
        assert_eq!(
            PromotionalPricingService::check_eligibility(history),
            Err(PromoError::AlreadyUsedPromo)
        );
    }

    #[test]
    fn test_free_tier_not_promotable() {
        let catalog = standard_catalog();
        let service = PromotionalPricingService::new(&catalog);
        assert_eq!(
            service.issue(request(Tier::Free), PromoHistory::default(), Utc::now()),
            Err(PromoError::TierNotPromotable(Tier::Free))
        );
    }
}
