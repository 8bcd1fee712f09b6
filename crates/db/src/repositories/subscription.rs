//! Subscription repository: tenant state snapshots and billing events.
//!
//! Billing events are applied at most once. The `billing_events` ledger is
//! written in the same transaction as the subscription change, keyed by the
//! provider's event id, so a replay finds its row and changes nothing.

use chrono::{DateTime, Utc};
use monetrax_core::subscription::{
    BillingEvent, BillingEventKind, LifecycleError, Subscription, SubscriptionCatalog,
    SubscriptionLifecycle, SubscriptionStatus, TenantState, Tier, Transition, UsageCounter,
    UsageTracker,
};
use monetrax_shared::types::{SubscriptionId, TenantId};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::{info, warn};
use uuid::Uuid;

use super::business::{ensure_free_subscription, ensure_tenant, lock_existing_tenant};
use super::plan::{PlanError, load_catalog};
use super::{db_time, to_column, to_count};
use crate::entities::sea_orm_active_enums::SubscriptionStatus as DbStatus;
use crate::entities::{bank_accounts, billing_events, subscriptions, usage_counters};

/// Error types for subscription operations.
#[derive(Debug, thiserror::Error)]
pub enum SubscriptionRepoError {
    /// The catalog could not be loaded.
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// The event can never apply to the current subscription.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// A billing event names a tenant that does not exist.
    #[error("Unknown tenant: {0}")]
    UnknownTenant(TenantId),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Result of handing a billing event to the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// The event changed the subscription.
    Applied(Subscription),
    /// The event was out of date; recorded but ignored.
    Stale,
    /// The event id was seen before; nothing happened.
    Duplicate,
}

impl EventOutcome {
    /// Outcome name as reported to the provider.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Applied(_) => "applied",
            Self::Stale => "stale",
            Self::Duplicate => "duplicate",
        }
    }
}

/// Everything needed to evaluate entitlements for one tenant.
#[derive(Debug, Clone)]
pub struct TenantSnapshot {
    /// Subscription, usage and linked accounts.
    pub state: TenantState,
    /// The catalog the state is evaluated against.
    pub catalog: SubscriptionCatalog,
}

impl From<subscriptions::Model> for Subscription {
    fn from(model: subscriptions::Model) -> Self {
        Self {
            id: SubscriptionId::from_uuid(model.id),
            tenant_id: TenantId::from_uuid(model.tenant_id),
            tier: model.tier.into(),
            billing_cycle: model.billing_cycle.into(),
            status: model.status.into(),
            current_period_start: model.current_period_start.to_utc(),
            current_period_end: model.current_period_end.map(|end| end.to_utc()),
            had_paid_subscription: model.had_paid_subscription,
            promo_price: model.promo_price,
        }
    }
}

impl From<usage_counters::Model> for UsageCounter {
    fn from(model: usage_counters::Model) -> Self {
        Self {
            tenant_id: TenantId::from_uuid(model.tenant_id),
            period_start: model.period_start.to_utc(),
            transactions_used: to_count(model.transactions_used),
            manual_syncs_used_today: to_count(model.manual_syncs_used_today),
            sync_day: model.sync_day,
        }
    }
}

fn new_row(sub: &Subscription) -> subscriptions::ActiveModel {
    subscriptions::ActiveModel {
        id: Set(sub.id.into_inner()),
        tenant_id: Set(sub.tenant_id.into_inner()),
        tier: Set(sub.tier.into()),
        billing_cycle: Set(sub.billing_cycle.into()),
        status: Set(sub.status.into()),
        current_period_start: Set(db_time(sub.current_period_start).into()),
        current_period_end: Set(sub.current_period_end.map(|end| db_time(end).into())),
        had_paid_subscription: Set(sub.had_paid_subscription),
        promo_price: Set(sub.promo_price),
        ..Default::default()
    }
}

/// The tenant's live (not cancelled) subscription row.
pub(crate) async fn live_subscription<C: ConnectionTrait>(
    conn: &C,
    tenant_id: TenantId,
) -> Result<subscriptions::Model, DbErr> {
    subscriptions::Entity::find()
        .filter(subscriptions::Column::TenantId.eq(tenant_id.into_inner()))
        .filter(subscriptions::Column::Status.ne(DbStatus::Cancelled))
        .one(conn)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("live subscription for {tenant_id}")))
}

/// Closes the live subscription and installs `next` with a counter for its
/// first quota period.
///
/// An upgrade inside the running window keeps the window's transaction
/// count; see `UsageTracker::carried_transactions`.
pub(crate) async fn replace_subscription<C: ConnectionTrait>(
    conn: &C,
    current: subscriptions::Model,
    next: &Subscription,
    now: DateTime<Utc>,
) -> Result<(), DbErr> {
    let previous = Subscription::from(current.clone());
    let window = UsageTracker::quota_period_start(&previous, now);
    let used = find_counter(conn, previous.tenant_id, window)
        .await?
        .map_or(0, |row| to_count(row.transactions_used));
    let carried = UsageTracker::carried_transactions(&previous, next, used, now);

    let mut closing = current.into_active_model();
    closing.status = Set(DbStatus::Cancelled);
    closing.update(conn).await?;

    new_row(next).insert(conn).await?;
    open_counter(
        conn,
        next.tenant_id,
        UsageTracker::quota_period_start(next, now),
        now,
        carried,
    )
    .await
}

async fn find_counter<C: ConnectionTrait>(
    conn: &C,
    tenant_id: TenantId,
    period_start: DateTime<Utc>,
) -> Result<Option<usage_counters::Model>, DbErr> {
    let key: (Uuid, DateTimeWithTimeZone) = (tenant_id.into_inner(), period_start.into());
    usage_counters::Entity::find_by_id(key).one(conn).await
}

/// Manual syncs used on `now`'s UTC day under quota periods other than
/// `period_start`.
async fn syncs_elsewhere<C: ConnectionTrait>(
    conn: &C,
    tenant_id: TenantId,
    period_start: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<u32, DbErr> {
    let busiest = usage_counters::Entity::find()
        .filter(usage_counters::Column::TenantId.eq(tenant_id.into_inner()))
        .filter(usage_counters::Column::PeriodStart.ne(period_start))
        .filter(usage_counters::Column::SyncDay.eq(now.date_naive()))
        .order_by_desc(usage_counters::Column::ManualSyncsUsedToday)
        .one(conn)
        .await?;
    Ok(busiest.map_or(0, |row| to_count(row.manual_syncs_used_today)))
}

/// Creates the counter row for a quota period if it does not exist yet.
pub(crate) async fn ensure_counter<C: ConnectionTrait>(
    conn: &C,
    tenant_id: TenantId,
    period_start: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), DbErr> {
    open_counter(conn, tenant_id, period_start, now, 0).await
}

/// Inserts the counter for a new quota period starting from
/// `transactions_used`. Syncs already made today under the previous
/// period move with it. An existing row is left alone.
async fn open_counter<C: ConnectionTrait>(
    conn: &C,
    tenant_id: TenantId,
    period_start: DateTime<Utc>,
    now: DateTime<Utc>,
    transactions_used: u32,
) -> Result<(), DbErr> {
    let syncs_today = syncs_elsewhere(conn, tenant_id, period_start, now).await?;
    let opening = UsageCounter::opening(
        tenant_id,
        period_start,
        transactions_used,
        syncs_today,
        now.date_naive(),
    );
    let counter = usage_counters::ActiveModel {
        tenant_id: Set(tenant_id.into_inner()),
        period_start: Set(period_start.into()),
        transactions_used: Set(to_column(opening.transactions_used)),
        manual_syncs_used_today: Set(to_column(opening.manual_syncs_used_today)),
        sync_day: Set(opening.sync_day),
        ..Default::default()
    };
    usage_counters::Entity::insert(counter)
        .on_conflict(
            OnConflict::columns([
                usage_counters::Column::TenantId,
                usage_counters::Column::PeriodStart,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

/// Reads subscription, current-period usage and linked account count.
///
/// Inside a transaction holding the tenant lock, the result stays accurate
/// until commit.
pub(crate) async fn load_state<C: ConnectionTrait>(
    conn: &C,
    tenant_id: TenantId,
    now: DateTime<Utc>,
) -> Result<TenantState, DbErr> {
    let subscription = Subscription::from(live_subscription(conn, tenant_id).await?);
    let period_start = UsageTracker::quota_period_start(&subscription, now);

    let usage = match find_counter(conn, tenant_id, period_start).await? {
        Some(row) => UsageCounter::from(row),
        None => {
            let syncs_today = syncs_elsewhere(conn, tenant_id, period_start, now).await?;
            UsageCounter::opening(tenant_id, period_start, 0, syncs_today, now.date_naive())
        }
    };

    let linked = bank_accounts::Entity::find()
        .filter(bank_accounts::Column::TenantId.eq(tenant_id.into_inner()))
        .count(conn)
        .await?;

    Ok(TenantState {
        subscription,
        usage,
        linked_bank_accounts: u32::try_from(linked).unwrap_or(u32::MAX),
    })
}

/// Subscription repository.
#[derive(Debug, Clone)]
pub struct SubscriptionRepository {
    db: DatabaseConnection,
}

impl SubscriptionRepository {
    /// Creates a new subscription repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Current state and catalog for a tenant, creating the tenant's free
    /// subscription on first use.
    ///
    /// # Errors
    ///
    /// Returns `SubscriptionRepoError::Plan` if the catalog is invalid.
    pub async fn snapshot(
        &self,
        tenant_id: TenantId,
        now: DateTime<Utc>,
    ) -> Result<TenantSnapshot, SubscriptionRepoError> {
        ensure_tenant(&self.db, tenant_id, now).await?;
        let catalog = load_catalog(&self.db).await?;
        let state = load_state(&self.db, tenant_id, now).await?;
        Ok(TenantSnapshot { state, catalog })
    }

    /// Applies a billing event exactly once.
    ///
    /// The ledger row, the subscription change and any new usage counter
    /// commit together. An event rejected by the lifecycle rolls back
    /// entirely, ledger row included, so a corrected redelivery can apply.
    ///
    /// # Errors
    ///
    /// Returns `SubscriptionRepoError::UnknownTenant` when the tenant does
    /// not exist, or `SubscriptionRepoError::Lifecycle` for an event that
    /// can never apply.
    pub async fn apply_billing_event(
        &self,
        event: &BillingEvent,
    ) -> Result<EventOutcome, SubscriptionRepoError> {
        let received_at = db_time(Utc::now());
        let tenant_id = event.tenant_id;
        let txn = self.db.begin().await?;

        if lock_existing_tenant(&txn, tenant_id).await?.is_none() {
            warn!(event_id = %event.event_id, tenant_id = %tenant_id, "Billing event for unknown tenant");
            return Err(SubscriptionRepoError::UnknownTenant(tenant_id));
        }

        let payload = serde_json::to_value(&event.kind)
            .map_err(|e| DbErr::Custom(format!("unserializable billing event: {e}")))?;
        let ledger = billing_events::ActiveModel {
            event_id: Set(event.event_id.clone()),
            tenant_id: Set(tenant_id.into_inner()),
            event_type: Set(event.kind.as_str().to_string()),
            payload: Set(payload),
            outcome: Set("applied".to_string()),
            occurred_at: Set(db_time(event.occurred_at).into()),
            received_at: Set(received_at.into()),
        };
        let inserted = billing_events::Entity::insert(ledger)
            .on_conflict(
                OnConflict::column(billing_events::Column::EventId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;
        if inserted == 0 {
            info!(event_id = %event.event_id, tenant_id = %tenant_id, "Duplicate billing event ignored");
            return Ok(EventOutcome::Duplicate);
        }

        ensure_free_subscription(&txn, tenant_id, received_at).await?;
        let current = live_subscription(&txn, tenant_id).await?;
        let transition = SubscriptionLifecycle::apply(&Subscription::from(current.clone()), &event.kind)
            .inspect_err(|e| {
                warn!(
                    event_id = %event.event_id,
                    tenant_id = %tenant_id,
                    reason = e.reason(),
                    "Billing event rejected"
                );
            })?;

        let outcome = match transition {
            Transition::Updated(next) => {
                let mut row = current.into_active_model();
                row.tier = Set(next.tier.into());
                row.billing_cycle = Set(next.billing_cycle.into());
                row.had_paid_subscription = Set(next.had_paid_subscription);
                row.status = Set(next.status.into());
                row.current_period_start = Set(db_time(next.current_period_start).into());
                row.current_period_end =
                    Set(next.current_period_end.map(|end| db_time(end).into()));
                row.promo_price = Set(next.promo_price);
                row.update(&txn).await?;
                EventOutcome::Applied(next)
            }
            Transition::Replaced(next) => {
                replace_subscription(&txn, current, &next, received_at).await?;
                EventOutcome::Applied(next)
            }
            Transition::Stale => {
                billing_events::Entity::update_many()
                    .col_expr(
                        billing_events::Column::Outcome,
                        Expr::value(EventOutcome::Stale.as_str()),
                    )
                    .filter(billing_events::Column::EventId.eq(event.event_id.as_str()))
                    .exec(&txn)
                    .await?;
                EventOutcome::Stale
            }
        };

        txn.commit().await?;

        info!(
            event_id = %event.event_id,
            tenant_id = %tenant_id,
            event_type = event.kind.as_str(),
            outcome = outcome.as_str(),
            "Billing event processed"
        );
        Ok(outcome)
    }

    /// Marks the tenant's paid subscription to end at its period end.
    ///
    /// Goes through the same path as a provider cancellation request, under
    /// a locally generated event id.
    ///
    /// # Errors
    ///
    /// Returns `LifecycleError::NothingToCancel` for a free subscription.
    pub async fn request_cancellation(
        &self,
        tenant_id: TenantId,
        now: DateTime<Utc>,
    ) -> Result<EventOutcome, SubscriptionRepoError> {
        ensure_tenant(&self.db, tenant_id, now).await?;
        // A provider event for a closed period is stale; a tenant asking
        // for it is told there is nothing to cancel.
        let live = Subscription::from(live_subscription(&self.db, tenant_id).await?);
        if live.effective_tier() == Tier::Free {
            return Err(LifecycleError::NothingToCancel.into());
        }
        let event = BillingEvent {
            event_id: format!("local-cancel-{}", Uuid::now_v7()),
            tenant_id,
            occurred_at: now,
            kind: BillingEventKind::CancellationRequested,
        };
        self.apply_billing_event(&event).await
    }
}

impl TenantSnapshot {
    /// The live subscription.
    #[must_use]
    pub const fn subscription(&self) -> &Subscription {
        &self.state.subscription
    }

    /// Returns true once a cancellation request is pending.
    #[must_use]
    pub fn is_cancelling(&self) -> bool {
        self.state.subscription.status == SubscriptionStatus::Cancelling
    }
}
