//! Transaction repository.
//!
//! Creating a transaction consumes one unit of the tenant's monthly quota.
//! The entitlement check, the counter increment and the insert run in one
//! database transaction holding the tenant lock, and the increment itself is
//! conditional on the counter still being below the limit. Concurrent
//! requests therefore never push usage past the plan's limit.

use chrono::{DateTime, NaiveDate, Utc};
use monetrax_core::subscription::{
    Action, Decision, DenialReason, EntitlementGate, SubscriptionError, UsageTracker,
};
use monetrax_core::tax::{
    NewTransaction, ReportingPeriod, TaxError, Transaction, TransactionKind,
    VatExemptionClassifier,
};
use monetrax_shared::types::{PageRequest, RuleSetId, TenantId, TransactionId};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::business::lock_tenant;
use super::plan::{PlanError, load_catalog};
use super::subscription::{ensure_counter, load_state};
use super::tax_rule::{TaxRuleError, version_at};
use super::{db_time, to_column};
use crate::entities::sea_orm_active_enums::TransactionKind as DbKind;
use crate::entities::{transactions, usage_counters};

/// Error types for transaction operations.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// The candidate failed validation.
    #[error(transparent)]
    Invalid(#[from] TaxError),

    /// The tenant's plan does not allow another transaction.
    #[error("{}", .0.message())]
    Denied(DenialReason),

    /// Transaction not found for this tenant.
    #[error("Transaction not found: {0}")]
    NotFound(TransactionId),

    /// The catalog could not be loaded.
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// The tenant's tier is missing from the catalog.
    #[error(transparent)]
    Catalog(#[from] SubscriptionError),

    /// No usable tax rule set.
    #[error(transparent)]
    Rules(#[from] TaxRuleError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Optional list filters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TransactionFilter {
    /// Earliest transaction date, inclusive.
    pub from: Option<NaiveDate>,
    /// Latest transaction date, inclusive.
    pub to: Option<NaiveDate>,
    /// Only this direction.
    #[serde(rename = "type")]
    pub kind: Option<TransactionKind>,
}

/// A stored transaction with the VAT fixed at recording time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionRecord {
    /// The transaction.
    #[serde(flatten)]
    pub transaction: Transaction,
    /// VAT computed under the rule set in force when it was recorded.
    pub vat_amount: Decimal,
    /// That rule set.
    pub rule_set_id: Option<RuleSetId>,
}

impl From<transactions::Model> for TransactionRecord {
    fn from(model: transactions::Model) -> Self {
        Self {
            transaction: Transaction {
                id: TransactionId::from_uuid(model.id),
                tenant_id: TenantId::from_uuid(model.tenant_id),
                kind: model.kind.into(),
                category: model.category,
                amount: model.amount,
                date: model.transaction_date,
                is_taxable: model.is_taxable,
                description: model.description,
                recorded_at: model.recorded_at.to_utc(),
            },
            vat_amount: model.vat_amount,
            rule_set_id: model.rule_set_id.map(RuleSetId::from_uuid),
        }
    }
}

/// Transaction repository.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    db: DatabaseConnection,
}

impl TransactionRepository {
    /// Creates a new transaction repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Records a transaction, consuming one unit of quota.
    ///
    /// # Errors
    ///
    /// Returns `TransactionError::Invalid` for a malformed candidate,
    /// `TransactionError::Denied(QuotaExceeded)` when the monthly quota is
    /// used up, or `TransactionError::Catalog` when the tenant's tier has no
    /// plan. Nothing is written in any of these cases.
    pub async fn create(
        &self,
        tenant_id: TenantId,
        input: NewTransaction,
        now: DateTime<Utc>,
    ) -> Result<TransactionRecord, TransactionError> {
        let input = input.validate()?;
        let now = db_time(now);
        let txn = self.db.begin().await?;

        lock_tenant(&txn, tenant_id, now).await?;
        let catalog = load_catalog(&txn).await?;
        let state = load_state(&txn, tenant_id, now).await?;

        let gate = EntitlementGate::new(&catalog);
        if let Decision::Denied(reason) = gate.check(&state, Action::CreateTransaction, now)? {
            debug!(tenant_id = %tenant_id, reason = reason.as_str(), "Transaction refused");
            return Err(TransactionError::Denied(reason));
        }

        let limit = gate.features_for(&state.subscription)?.transactions_per_month;
        let period_start = UsageTracker::quota_period_start(&state.subscription, now);
        ensure_counter(&txn, tenant_id, period_start, now).await?;

        let mut condition = Condition::all()
            .add(usage_counters::Column::TenantId.eq(tenant_id.into_inner()))
            .add(usage_counters::Column::PeriodStart.eq(period_start));
        if let Some(max) = limit.as_option() {
            condition = condition.add(usage_counters::Column::TransactionsUsed.lt(to_column(max)));
        }
        let consumed = usage_counters::Entity::update_many()
            .col_expr(
                usage_counters::Column::TransactionsUsed,
                Expr::col(usage_counters::Column::TransactionsUsed).add(1),
            )
            .filter(condition)
            .exec(&txn)
            .await?;
        if consumed.rows_affected == 0 {
            return Err(TransactionError::Denied(DenialReason::QuotaExceeded));
        }

        let version = version_at(&txn, now).await?;
        version.rules.check().map_err(TaxRuleError::from)?;

        let transaction = input.into_transaction(TransactionId::new(), tenant_id, now);
        let vat_amount = VatExemptionClassifier::vat_amount(&transaction, &version.rules);

        transactions::ActiveModel {
            id: Set(transaction.id.into_inner()),
            tenant_id: Set(tenant_id.into_inner()),
            kind: Set(transaction.kind.into()),
            category: Set(transaction.category.clone()),
            amount: Set(transaction.amount),
            transaction_date: Set(transaction.date),
            is_taxable: Set(transaction.is_taxable),
            description: Set(transaction.description.clone()),
            vat_amount: Set(vat_amount),
            rule_set_id: Set(Some(version.id.into_inner())),
            recorded_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        info!(
            tenant_id = %tenant_id,
            transaction_id = %transaction.id,
            kind = transaction.kind.as_str(),
            amount = %transaction.amount,
            "Transaction recorded"
        );

        Ok(TransactionRecord {
            transaction,
            vat_amount,
            rule_set_id: Some(version.id),
        })
    }

    /// Lists the tenant's transactions, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        tenant_id: TenantId,
        filter: TransactionFilter,
        page: &PageRequest,
    ) -> Result<(Vec<TransactionRecord>, u64), DbErr> {
        let mut query = transactions::Entity::find()
            .filter(transactions::Column::TenantId.eq(tenant_id.into_inner()));
        if let Some(from) = filter.from {
            query = query.filter(transactions::Column::TransactionDate.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(transactions::Column::TransactionDate.lte(to));
        }
        if let Some(kind) = filter.kind {
            query = query.filter(transactions::Column::Kind.eq(DbKind::from(kind)));
        }

        let total = query.clone().count(&self.db).await?;
        let rows = query
            .order_by_desc(transactions::Column::TransactionDate)
            .order_by_desc(transactions::Column::RecordedAt)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok((rows.into_iter().map(TransactionRecord::from).collect(), total))
    }

    /// All of the tenant's transactions dated within `period`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn for_period(
        &self,
        tenant_id: TenantId,
        period: ReportingPeriod,
    ) -> Result<Vec<Transaction>, DbErr> {
        let rows = transactions::Entity::find()
            .filter(transactions::Column::TenantId.eq(tenant_id.into_inner()))
            .filter(transactions::Column::TransactionDate.between(period.start, period.end))
            .order_by_asc(transactions::Column::TransactionDate)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| TransactionRecord::from(row).transaction)
            .collect())
    }

    /// Deletes a transaction. Quota already consumed is not refunded.
    ///
    /// # Errors
    ///
    /// Returns `TransactionError::NotFound` if the tenant has no such
    /// transaction.
    pub async fn delete(
        &self,
        tenant_id: TenantId,
        id: TransactionId,
    ) -> Result<(), TransactionError> {
        let result = transactions::Entity::delete_many()
            .filter(transactions::Column::Id.eq(id.into_inner()))
            .filter(transactions::Column::TenantId.eq(tenant_id.into_inner()))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(TransactionError::NotFound(id));
        }

        info!(tenant_id = %tenant_id, transaction_id = %id, "Transaction deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[test]
    fn test_record_serializes_flat_with_type_field() {
        let now = Utc::now();
        let record = TransactionRecord::from(transactions::Model {
            id: Uuid::now_v7(),
            tenant_id: Uuid::now_v7(),
            kind: DbKind::Income,
            category: "Sales".to_string(),
            amount: dec!(100000),
            transaction_date: now.date_naive(),
            is_taxable: true,
            description: String::new(),
            vat_amount: dec!(7500),
            rule_set_id: None,
            recorded_at: now.into(),
        });

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "income");
        assert_eq!(json["vat_amount"], "7500");
        assert!(json.get("transaction").is_none());
    }

    #[test]
    fn test_filter_reads_type_query_key() {
        let filter: TransactionFilter =
            serde_json::from_str(r#"{"from":"2026-01-01","type":"expense"}"#).unwrap();
        assert_eq!(filter.kind, Some(TransactionKind::Expense));
        assert_eq!(filter.from, NaiveDate::from_ymd_opt(2026, 1, 1));
        assert!(filter.to.is_none());
    }

    #[test]
    fn test_denied_message() {
        let err = TransactionError::Denied(DenialReason::QuotaExceeded);
        assert_eq!(err.to_string(), DenialReason::QuotaExceeded.message());
    }
}
