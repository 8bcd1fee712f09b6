//! Linked bank accounts and manual sync allowance.
//!
//! Only the entitlement side lives here. Fetching statements is the bank
//! collaborator's job; a manual sync just consumes one unit of the daily
//! allowance and stamps the accounts.

use chrono::{DateTime, Utc};
use monetrax_core::subscription::{
    Action, Decision, DenialReason, EntitlementGate, Limit, SubscriptionError, SyncFrequency,
    UsageTracker,
};
use monetrax_shared::types::{BankAccountId, TenantId};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::business::{ensure_tenant, lock_tenant};
use super::plan::{PlanError, load_catalog};
use super::subscription::{ensure_counter, load_state};
use super::{db_time, to_column};
use crate::entities::{bank_accounts, usage_counters};

/// Maximum length of bank and account names.
const MAX_NAME_LEN: usize = 100;

/// Error types for bank account operations.
#[derive(Debug, thiserror::Error)]
pub enum BankError {
    /// Input failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The plan does not allow the action.
    #[error("{}", .0.message())]
    Denied(DenialReason),

    /// The catalog could not be loaded.
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// The tenant's tier is missing from the catalog.
    #[error(transparent)]
    Catalog(#[from] SubscriptionError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Request to link an account.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkBankAccountInput {
    /// Bank display name.
    pub bank_name: String,
    /// Account holder name.
    pub account_name: String,
    /// Full account number; only the last four digits are kept.
    pub account_number: String,
}

impl LinkBankAccountInput {
    fn validate(self) -> Result<(String, String, String), BankError> {
        let bank_name = self.bank_name.trim().to_string();
        let account_name = self.account_name.trim().to_string();
        if bank_name.is_empty() || account_name.is_empty() {
            return Err(BankError::Validation(
                "bank_name and account_name are required".to_string(),
            ));
        }
        if bank_name.chars().count() > MAX_NAME_LEN || account_name.chars().count() > MAX_NAME_LEN {
            return Err(BankError::Validation(format!(
                "names must be at most {MAX_NAME_LEN} characters"
            )));
        }

        let digits: Vec<char> = self
            .account_number
            .chars()
            .filter(char::is_ascii_digit)
            .collect();
        if digits.len() < 4 {
            return Err(BankError::Validation(
                "account_number must contain at least 4 digits".to_string(),
            ));
        }
        let mask = digits[digits.len() - 4..].iter().collect();
        Ok((bank_name, account_name, mask))
    }
}

/// A linked account as shown to the tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BankAccount {
    /// Account ID.
    pub id: BankAccountId,
    /// Bank display name.
    pub bank_name: String,
    /// Account holder name.
    pub account_name: String,
    /// Last four digits.
    pub account_mask: String,
    /// Last manual or scheduled sync.
    pub last_synced_at: Option<DateTime<Utc>>,
    /// When the account was linked.
    pub created_at: DateTime<Utc>,
}

impl From<bank_accounts::Model> for BankAccount {
    fn from(model: bank_accounts::Model) -> Self {
        Self {
            id: BankAccountId::from_uuid(model.id),
            bank_name: model.bank_name,
            account_name: model.account_name,
            account_mask: model.account_mask,
            last_synced_at: model.last_synced_at.map(|at| at.to_utc()),
            created_at: model.created_at.to_utc(),
        }
    }
}

/// Sync allowance for the current day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BankSyncStatus {
    /// Automatic refresh cadence of the tenant's plan.
    pub sync_frequency: SyncFrequency,
    /// Manual syncs used today.
    pub manual_syncs_today: u32,
    /// Daily manual sync allowance.
    pub manual_syncs_limit: Limit,
    /// Whether one more manual sync is allowed today.
    pub can_manual_sync: bool,
    /// Linked accounts.
    pub linked_accounts: u32,
    /// Linked account allowance.
    pub accounts_limit: Limit,
    /// Most recent sync across all accounts.
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// Bank account repository.
#[derive(Debug, Clone)]
pub struct BankAccountRepository {
    db: DatabaseConnection,
}

impl BankAccountRepository {
    /// Creates a new bank account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// The tenant's linked accounts.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self, tenant_id: TenantId) -> Result<Vec<BankAccount>, DbErr> {
        Ok(bank_accounts::Entity::find()
            .filter(bank_accounts::Column::TenantId.eq(tenant_id.into_inner()))
            .order_by_asc(bank_accounts::Column::CreatedAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(BankAccount::from)
            .collect())
    }

    /// Links an account if the plan allows another one.
    ///
    /// # Errors
    ///
    /// Returns `BankError::Denied(QuotaExceeded)` at the account limit.
    pub async fn link(
        &self,
        tenant_id: TenantId,
        input: LinkBankAccountInput,
        now: DateTime<Utc>,
    ) -> Result<BankAccount, BankError> {
        let (bank_name, account_name, account_mask) = input.validate()?;
        let now = db_time(now);
        let txn = self.db.begin().await?;

        lock_tenant(&txn, tenant_id, now).await?;
        let catalog = load_catalog(&txn).await?;
        let state = load_state(&txn, tenant_id, now).await?;
        if let Decision::Denied(reason) =
            EntitlementGate::new(&catalog).check(&state, Action::LinkBankAccount, now)?
        {
            debug!(tenant_id = %tenant_id, reason = reason.as_str(), "Bank link refused");
            return Err(BankError::Denied(reason));
        }

        let model = bank_accounts::ActiveModel {
            id: Set(BankAccountId::new().into_inner()),
            tenant_id: Set(tenant_id.into_inner()),
            bank_name: Set(bank_name),
            account_name: Set(account_name),
            account_mask: Set(account_mask),
            last_synced_at: Set(None),
            created_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        info!(tenant_id = %tenant_id, bank_account_id = %model.id, "Bank account linked");
        Ok(model.into())
    }

    /// Consumes one manual sync from today's allowance.
    ///
    /// The day rollover and the conditional increment both run as single
    /// statements under the tenant lock, so the allowance is never exceeded.
    ///
    /// # Errors
    ///
    /// Returns `BankError::Denied(SyncLimitExceeded)` once today's allowance
    /// is used up.
    pub async fn manual_sync(
        &self,
        tenant_id: TenantId,
        now: DateTime<Utc>,
    ) -> Result<BankSyncStatus, BankError> {
        let now = db_time(now);
        let today = now.date_naive();
        let txn = self.db.begin().await?;

        lock_tenant(&txn, tenant_id, now).await?;
        let catalog = load_catalog(&txn).await?;
        let state = load_state(&txn, tenant_id, now).await?;
        let gate = EntitlementGate::new(&catalog);
        if let Decision::Denied(reason) = gate.check(&state, Action::ManualBankSync, now)? {
            debug!(tenant_id = %tenant_id, reason = reason.as_str(), "Manual sync refused");
            return Err(BankError::Denied(reason));
        }

        let limit = gate.features_for(&state.subscription)?.manual_syncs_per_day;
        let period_start = UsageTracker::quota_period_start(&state.subscription, now);
        ensure_counter(&txn, tenant_id, period_start, now).await?;

        let this_counter = Condition::all()
            .add(usage_counters::Column::TenantId.eq(tenant_id.into_inner()))
            .add(usage_counters::Column::PeriodStart.eq(period_start));

        usage_counters::Entity::update_many()
            .col_expr(usage_counters::Column::ManualSyncsUsedToday, Expr::value(0))
            .col_expr(usage_counters::Column::SyncDay, Expr::value(today))
            .filter(this_counter.clone())
            .filter(
                Condition::any()
                    .add(usage_counters::Column::SyncDay.is_null())
                    .add(usage_counters::Column::SyncDay.ne(today)),
            )
            .exec(&txn)
            .await?;

        let mut consume = this_counter;
        if let Some(max) = limit.as_option() {
            consume = consume.add(usage_counters::Column::ManualSyncsUsedToday.lt(to_column(max)));
        }
        let consumed = usage_counters::Entity::update_many()
            .col_expr(
                usage_counters::Column::ManualSyncsUsedToday,
                Expr::col(usage_counters::Column::ManualSyncsUsedToday).add(1),
            )
            .filter(consume)
            .exec(&txn)
            .await?;
        if consumed.rows_affected == 0 {
            return Err(BankError::Denied(DenialReason::SyncLimitExceeded));
        }

        bank_accounts::Entity::update_many()
            .col_expr(bank_accounts::Column::LastSyncedAt, Expr::value(now))
            .filter(bank_accounts::Column::TenantId.eq(tenant_id.into_inner()))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        info!(tenant_id = %tenant_id, "Manual bank sync recorded");

        self.status(tenant_id, now).await
    }

    /// Current sync allowance and account count.
    ///
    /// # Errors
    ///
    /// Returns `BankError::Catalog` if the tenant's tier has no plan.
    pub async fn status(
        &self,
        tenant_id: TenantId,
        now: DateTime<Utc>,
    ) -> Result<BankSyncStatus, BankError> {
        ensure_tenant(&self.db, tenant_id, now).await?;
        let catalog = load_catalog(&self.db).await?;
        let state = load_state(&self.db, tenant_id, now).await?;
        let gate = EntitlementGate::new(&catalog);
        let features = gate.features_for(&state.subscription)?;

        let last_synced_at = self
            .list(tenant_id)
            .await?
            .into_iter()
            .filter_map(|account| account.last_synced_at)
            .max();

        Ok(BankSyncStatus {
            sync_frequency: features.bank_sync_frequency,
            manual_syncs_today: state.usage.syncs_on(now.date_naive()),
            manual_syncs_limit: features.manual_syncs_per_day,
            can_manual_sync: gate
                .check(&state, Action::ManualBankSync, now)?
                .is_allowed(),
            linked_accounts: state.linked_bank_accounts,
            accounts_limit: features.bank_accounts_max,
            last_synced_at,
        })
    }
}
