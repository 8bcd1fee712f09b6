//! Promotional signup repository.
//!
//! An identifier receives at most one promotion, ever. The unique index on
//! `promo_signups.identifier` is the final arbiter; the eligibility check
//! runs under the target business's row lock so concurrent attempts for the
//! same identifier queue up and all but the first see the existing signup.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use monetrax_core::subscription::{
    AgentTag, PromoError, PromoHistory, PromoIdentifier, PromoIssuance, PromoRequest,
    PromoSignup, PromotionalPricingService, Tier,
};
use monetrax_shared::types::{PageRequest, PromoSignupId, TenantId, UserId};
use rust_decimal::Decimal;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use tracing::{info, warn};

use super::agent::AgentRecord;
use super::business::ensure_free_subscription;
use super::plan::{PlanError, load_catalog};
use super::subscription::{live_subscription, replace_subscription};
use super::{db_time, is_unique_violation};
use crate::entities::sea_orm_active_enums::{SubscriptionStatus, SubscriptionTier};
use crate::entities::{businesses, promo_signups, subscriptions};

/// Error types for promotional signups.
#[derive(Debug, thiserror::Error)]
pub enum PromoRepoError {
    /// Promotion refused.
    #[error(transparent)]
    Promo(#[from] PromoError),

    /// The catalog could not be loaded.
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// A stored signup no longer parses.
    #[error("Stored promo signup {0} is unreadable: {1}")]
    Corrupt(PromoSignupId, String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// What an agent learns about an identifier before signing it up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromoUserStatus {
    /// The normalized identifier.
    pub identifier: PromoIdentifier,
    /// A business already uses this identifier.
    pub found: bool,
    /// The identifier may still receive a promotion.
    pub eligible_for_promo: bool,
    /// The business's current tier, if found.
    pub current_tier: Option<Tier>,
}

/// Aggregate figures for one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentDashboard {
    /// The agent's tag.
    pub agent_tag: AgentTag,
    /// Businesses carrying the agent's tag.
    pub total_signups: u64,
    /// Promotional signups issued by the agent.
    pub promo_signups: u64,
    /// Sum of discounts granted.
    pub total_savings_given: Decimal,
    /// Promotional signups per tier.
    pub signups_by_tier: BTreeMap<Tier, u64>,
}

fn decode(model: promo_signups::Model) -> Result<PromoSignup, PromoRepoError> {
    let id = PromoSignupId::from_uuid(model.id);
    let corrupt = |e: PromoError| PromoRepoError::Corrupt(id, e.to_string());
    Ok(PromoSignup {
        id,
        identifier: PromoIdentifier::parse(&model.identifier).map_err(corrupt)?,
        tenant_id: TenantId::from_uuid(model.tenant_id),
        agent_user_id: UserId::from_uuid(model.agent_user_id),
        agent_tag: AgentTag::parse(&model.agent_tag).map_err(corrupt)?,
        tier: model.tier.into(),
        promo_price: model.promo_price,
        savings: model.savings,
        created_at: model.created_at.to_utc(),
    })
}

/// Promotional signup repository.
#[derive(Debug, Clone)]
pub struct PromoRepository {
    db: DatabaseConnection,
}

impl PromoRepository {
    /// Creates a new promo repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Looks up an identifier's business and promo eligibility.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn check_user(
        &self,
        identifier: &PromoIdentifier,
    ) -> Result<PromoUserStatus, PromoRepoError> {
        let has_signup = promo_signups::Entity::find()
            .filter(promo_signups::Column::Identifier.eq(identifier.as_str()))
            .count(&self.db)
            .await?
            > 0;

        let business = businesses::Entity::find()
            .filter(businesses::Column::ContactIdentifier.eq(identifier.as_str()))
            .one(&self.db)
            .await?;

        let (had_paid, current_tier) = match &business {
            Some(business) => {
                let subs = subscriptions::Entity::find()
                    .filter(subscriptions::Column::TenantId.eq(business.tenant_id))
                    .all(&self.db)
                    .await?;
                let had_paid = subs.iter().any(|s| s.had_paid_subscription);
                let live = subs
                    .iter()
                    .find(|s| s.status != SubscriptionStatus::Cancelled)
                    .map(|s| Tier::from(s.tier));
                (had_paid, live)
            }
            None => (false, None),
        };

        let eligible = PromotionalPricingService::check_eligibility(PromoHistory {
            has_signup,
            had_paid_subscription: had_paid,
        })
        .is_ok();

        Ok(PromoUserStatus {
            identifier: identifier.clone(),
            found: business.is_some(),
            eligible_for_promo: eligible,
            current_tier,
        })
    }

    /// Issues a promotional subscription to the business behind
    /// `identifier`, creating the business if none uses it yet.
    ///
    /// # Errors
    ///
    /// Returns `PromoError::AlreadyUsedPromo` when the identifier already
    /// received a promotion or its tenant has paid before, and
    /// `PromoError::TierNotPromotable` for a tier without a promo price.
    pub async fn issue(
        &self,
        agent: &AgentRecord,
        identifier: PromoIdentifier,
        tier: Tier,
        now: DateTime<Utc>,
    ) -> Result<PromoIssuance, PromoRepoError> {
        let now = db_time(now);
        let txn = self.db.begin().await?;

        let catalog = load_catalog(&txn).await?;
        let service = PromotionalPricingService::new(&catalog);
        service.quote(tier)?;

        let candidate = businesses::ActiveModel {
            tenant_id: Set(TenantId::new().into_inner()),
            contact_identifier: Set(Some(identifier.as_str().to_string())),
            ..Default::default()
        };
        businesses::Entity::insert(candidate)
            .on_conflict(
                OnConflict::column(businesses::Column::ContactIdentifier)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;

        let business = businesses::Entity::find()
            .filter(businesses::Column::ContactIdentifier.eq(identifier.as_str()))
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("business for {identifier}")))?;
        let tenant_id = TenantId::from_uuid(business.tenant_id);
        ensure_free_subscription(&txn, tenant_id, now).await?;

        let has_signup = promo_signups::Entity::find()
            .filter(promo_signups::Column::Identifier.eq(identifier.as_str()))
            .count(&txn)
            .await?
            > 0;
        let had_paid = subscriptions::Entity::find()
            .filter(subscriptions::Column::TenantId.eq(tenant_id.into_inner()))
            .filter(subscriptions::Column::HadPaidSubscription.eq(true))
            .count(&txn)
            .await?
            > 0;

        let request = PromoRequest {
            agent_user_id: agent.user_id,
            agent_tag: agent.agent_tag.clone(),
            identifier,
            tenant_id,
            tier,
        };
        let issuance = service
            .issue(
                request,
                PromoHistory {
                    has_signup,
                    had_paid_subscription: had_paid,
                },
                now,
            )
            .inspect_err(|e| {
                warn!(tenant_id = %tenant_id, agent_tag = %agent.agent_tag, reason = e.reason(), "Promo refused");
            })?;

        let current = live_subscription(&txn, tenant_id).await?;
        replace_subscription(&txn, current, &issuance.subscription, now).await?;

        let signup = &issuance.signup;
        promo_signups::ActiveModel {
            id: Set(signup.id.into_inner()),
            identifier: Set(signup.identifier.as_str().to_string()),
            tenant_id: Set(tenant_id.into_inner()),
            agent_user_id: Set(signup.agent_user_id.into_inner()),
            agent_tag: Set(signup.agent_tag.as_str().to_string()),
            tier: Set(signup.tier.into()),
            promo_price: Set(signup.promo_price),
            savings: Set(signup.savings),
            created_at: Set(now.into()),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                PromoRepoError::Promo(PromoError::AlreadyUsedPromo)
            } else {
                PromoRepoError::Database(e)
            }
        })?;

        let mut tagged = business.into_active_model();
        tagged.agent_tag = Set(Some(agent.agent_tag.as_str().to_string()));
        tagged.update(&txn).await?;

        txn.commit().await?;

        info!(
            tenant_id = %tenant_id,
            agent_tag = %agent.agent_tag,
            tier = %tier,
            savings = %signup.savings,
            "Promotional signup issued"
        );
        Ok(issuance)
    }

    /// Signups issued by an agent, newest first.
    ///
    /// # Errors
    ///
    /// Returns `PromoRepoError::Corrupt` if a stored signup cannot be read.
    pub async fn signups(
        &self,
        agent_user_id: UserId,
        tier: Option<Tier>,
        page: &PageRequest,
    ) -> Result<(Vec<PromoSignup>, u64), PromoRepoError> {
        let mut query = promo_signups::Entity::find()
            .filter(promo_signups::Column::AgentUserId.eq(agent_user_id.into_inner()));
        if let Some(tier) = tier {
            query = query.filter(promo_signups::Column::Tier.eq(SubscriptionTier::from(tier)));
        }

        let total = query.clone().count(&self.db).await?;
        let signups = query
            .order_by_desc(promo_signups::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?
            .into_iter()
            .map(decode)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((signups, total))
    }

    /// Totals for an agent's dashboard.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn dashboard(&self, agent: &AgentRecord) -> Result<AgentDashboard, PromoRepoError> {
        let total_signups = businesses::Entity::find()
            .filter(businesses::Column::AgentTag.eq(agent.agent_tag.as_str()))
            .count(&self.db)
            .await?;

        let signups = promo_signups::Entity::find()
            .filter(promo_signups::Column::AgentUserId.eq(agent.user_id.into_inner()))
            .all(&self.db)
            .await?;

        Ok(summarize(agent.agent_tag.clone(), total_signups, &signups))
    }
}

fn summarize(
    agent_tag: AgentTag,
    total_signups: u64,
    signups: &[promo_signups::Model],
) -> AgentDashboard {
    let mut signups_by_tier = BTreeMap::new();
    let mut total_savings_given = Decimal::ZERO;
    for signup in signups {
        *signups_by_tier.entry(Tier::from(signup.tier)).or_insert(0) += 1;
        total_savings_given += signup.savings;
    }

    AgentDashboard {
        agent_tag,
        total_signups,
        promo_signups: u64::try_from(signups.len()).unwrap_or(u64::MAX),
        total_savings_given,
        signups_by_tier,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn signup(tier: SubscriptionTier, savings: Decimal) -> promo_signups::Model {
        promo_signups::Model {
            id: Uuid::now_v7(),
            identifier: "owner@example.com".to_string(),
            tenant_id: Uuid::now_v7(),
            agent_user_id: Uuid::now_v7(),
            agent_tag: "AO".to_string(),
            tier,
            promo_price: dec!(1500),
            savings,
            created_at: Utc::now().into(),
        }
    }

    #[test]
    fn test_summarize_groups_by_tier() {
        let tag = AgentTag::parse("ao").unwrap();
        let dashboard = summarize(
            tag,
            5,
            &[
                signup(SubscriptionTier::Starter, dec!(1500)),
                signup(SubscriptionTier::Starter, dec!(1500)),
                signup(SubscriptionTier::Business, dec!(2500)),
            ],
        );

        assert_eq!(dashboard.total_signups, 5);
        assert_eq!(dashboard.promo_signups, 3);
        assert_eq!(dashboard.total_savings_given, dec!(5500));
        assert_eq!(dashboard.signups_by_tier.get(&Tier::Starter), Some(&2));
        assert_eq!(dashboard.signups_by_tier.get(&Tier::Business), Some(&1));

        let json = serde_json::to_value(&dashboard).unwrap();
        assert_eq!(json["signups_by_tier"]["starter"], 2);
        assert_eq!(json["agent_tag"], "AO");
    }

    #[test]
    fn test_decode_signup() {
        let decoded = decode(signup(SubscriptionTier::Enterprise, dec!(5000))).unwrap();
        assert_eq!(decoded.tier, Tier::Enterprise);
        assert_eq!(decoded.identifier.as_str(), "owner@example.com");
    }
}
