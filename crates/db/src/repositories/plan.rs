//! Subscription plan repository.
//!
//! The catalog lives in `subscription_plans`, one row per tier. Every read
//! builds a validated `SubscriptionCatalog`, so a broken table surfaces as a
//! catalog error instead of a wrong entitlement decision.

use chrono::Utc;
use monetrax_core::subscription::{
    Limit, PlanFeatures, SubscriptionCatalog, SubscriptionError, SubscriptionPlan,
};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use tracing::{error, info};

use super::{to_column, to_count};
use crate::entities::subscription_plans;

/// Error types for plan operations.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// The stored or proposed catalog is inconsistent.
    #[error(transparent)]
    Catalog(#[from] SubscriptionError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

fn read_limit(value: Option<i32>) -> Limit {
    value.map_or(Limit::Unlimited, |max| Limit::Limited(to_count(max)))
}

fn write_limit(limit: Limit) -> Option<i32> {
    limit.as_option().map(to_column)
}

impl From<subscription_plans::Model> for SubscriptionPlan {
    fn from(model: subscription_plans::Model) -> Self {
        Self {
            tier: model.tier.into(),
            name: model.name,
            price_monthly: model.price_monthly,
            price_yearly: model.price_yearly,
            promo_price_monthly: model.promo_price_monthly,
            highlight: model.highlight,
            features: PlanFeatures {
                transactions_per_month: read_limit(model.max_transactions_per_month),
                ai_insights: model.has_ai_insights,
                receipt_ocr: model.has_receipt_ocr,
                pdf_reports: model.has_pdf_reports,
                csv_export: model.has_csv_export,
                custom_categories: model.has_custom_categories,
                multi_user: model.has_multi_user,
                priority_support: model.has_priority_support,
                bank_accounts_max: read_limit(model.max_bank_accounts),
                bank_sync_frequency: model.bank_sync_frequency.into(),
                manual_syncs_per_day: read_limit(model.max_manual_syncs_per_day),
            },
        }
    }
}

fn to_active_model(plan: &SubscriptionPlan) -> subscription_plans::ActiveModel {
    let features = &plan.features;
    subscription_plans::ActiveModel {
        tier: Set(plan.tier.into()),
        name: Set(plan.name.clone()),
        price_monthly: Set(plan.price_monthly),
        price_yearly: Set(plan.price_yearly),
        promo_price_monthly: Set(plan.promo_price_monthly),
        highlight: Set(plan.highlight),
        max_transactions_per_month: Set(write_limit(features.transactions_per_month)),
        has_ai_insights: Set(features.ai_insights),
        has_receipt_ocr: Set(features.receipt_ocr),
        has_pdf_reports: Set(features.pdf_reports),
        has_csv_export: Set(features.csv_export),
        has_custom_categories: Set(features.custom_categories),
        has_multi_user: Set(features.multi_user),
        has_priority_support: Set(features.priority_support),
        max_bank_accounts: Set(write_limit(features.bank_accounts_max)),
        bank_sync_frequency: Set(features.bank_sync_frequency.into()),
        max_manual_syncs_per_day: Set(write_limit(features.manual_syncs_per_day)),
        ..Default::default()
    }
}

/// Loads and validates the catalog on any connection.
pub(crate) async fn load_catalog<C: ConnectionTrait>(
    conn: &C,
) -> Result<SubscriptionCatalog, PlanError> {
    let plans = subscription_plans::Entity::find()
        .order_by_asc(subscription_plans::Column::Tier)
        .all(conn)
        .await?
        .into_iter()
        .map(SubscriptionPlan::from)
        .collect();

    SubscriptionCatalog::new(plans).map_err(|e| {
        error!(error = %e, "Stored subscription catalog is invalid");
        PlanError::Catalog(e)
    })
}

/// Subscription plan repository.
#[derive(Debug, Clone)]
pub struct PlanRepository {
    db: DatabaseConnection,
}

impl PlanRepository {
    /// Creates a new plan repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// The validated catalog.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::Catalog` if the stored plans are inconsistent.
    pub async fn catalog(&self) -> Result<SubscriptionCatalog, PlanError> {
        load_catalog(&self.db).await
    }

    /// Replaces the plan for `plan.tier`.
    ///
    /// The candidate catalog is validated before anything is written, so a
    /// change that would leave a higher tier granting less than a lower one
    /// is refused and the stored catalog is unchanged. The plan rows stay
    /// locked from the read to the commit, so concurrent updates validate
    /// against each other's results.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::Catalog` if the resulting catalog is invalid.
    pub async fn update_plan(&self, plan: SubscriptionPlan) -> Result<SubscriptionCatalog, PlanError> {
        let txn = self.db.begin().await?;

        let mut plans: Vec<SubscriptionPlan> = subscription_plans::Entity::find()
            .order_by_asc(subscription_plans::Column::Tier)
            .lock_exclusive()
            .all(&txn)
            .await?
            .into_iter()
            .map(SubscriptionPlan::from)
            .filter(|existing| existing.tier != plan.tier)
            .collect();
        plans.push(plan.clone());
        let catalog = SubscriptionCatalog::new(plans)?;

        let mut active = to_active_model(&plan);
        active.updated_at = Set(Utc::now().into());
        subscription_plans::Entity::insert(active)
            .on_conflict(
                OnConflict::column(subscription_plans::Column::Tier)
                    .update_columns([
                        subscription_plans::Column::Name,
                        subscription_plans::Column::PriceMonthly,
                        subscription_plans::Column::PriceYearly,
                        subscription_plans::Column::PromoPriceMonthly,
                        subscription_plans::Column::Highlight,
                        subscription_plans::Column::MaxTransactionsPerMonth,
                        subscription_plans::Column::HasAiInsights,
                        subscription_plans::Column::HasReceiptOcr,
                        subscription_plans::Column::HasPdfReports,
                        subscription_plans::Column::HasCsvExport,
                        subscription_plans::Column::HasCustomCategories,
                        subscription_plans::Column::HasMultiUser,
                        subscription_plans::Column::HasPrioritySupport,
                        subscription_plans::Column::MaxBankAccounts,
                        subscription_plans::Column::BankSyncFrequency,
                        subscription_plans::Column::MaxManualSyncsPerDay,
                        subscription_plans::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;
        txn.commit().await?;

        info!(tier = %plan.tier, price_monthly = %plan.price_monthly, "Subscription plan updated");
        Ok(catalog)
    }
}
