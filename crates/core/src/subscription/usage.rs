//! Per-tenant usage counters and quota periods.

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use monetrax_shared::types::TenantId;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use super::types::{Limit, Subscription};

/// Usage for one tenant in one quota period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageCounter {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Start of the quota period this counter belongs to.
    pub period_start: DateTime<Utc>,
    /// Transactions created in the period. Never decreases.
    pub transactions_used: u32,
    /// Manual syncs on `sync_day`.
    pub manual_syncs_used_today: u32,
    /// UTC day the sync count refers to.
    pub sync_day: Option<NaiveDate>,
}

impl UsageCounter {
    /// A zeroed counter for a new period.
    #[must_use]
    pub const fn fresh(tenant_id: TenantId, period_start: DateTime<Utc>) -> Self {
        Self {
            tenant_id,
            period_start,
            transactions_used: 0,
            manual_syncs_used_today: 0,
            sync_day: None,
        }
    }

    /// Counter for a period opening on `day`.
    ///
    /// The manual sync allowance is daily, so syncs already used on `day`
    /// under an earlier period carry into the new one.
    #[must_use]
    pub const fn opening(
        tenant_id: TenantId,
        period_start: DateTime<Utc>,
        transactions_used: u32,
        syncs_today: u32,
        day: NaiveDate,
    ) -> Self {
        Self {
            tenant_id,
            period_start,
            transactions_used,
            manual_syncs_used_today: syncs_today,
            sync_day: if syncs_today > 0 { Some(day) } else { None },
        }
    }

    /// Manual syncs used on `day`; a stale day reads as zero.
    #[must_use]
    pub fn syncs_on(&self, day: NaiveDate) -> u32 {
        if self.sync_day == Some(day) {
            self.manual_syncs_used_today
        } else {
            0
        }
    }
}

/// Quota period arithmetic.
pub struct UsageTracker;

impl UsageTracker {
    /// Start of the quota period containing `now`.
    ///
    /// Paid subscriptions use their billing period. Free subscriptions have
    /// no period end, so their quota renews on each monthly anniversary of
    /// `current_period_start`.
    #[must_use]
    pub fn quota_period_start(subscription: &Subscription, now: DateTime<Utc>) -> DateTime<Utc> {
        let start = subscription.current_period_start;
        if subscription.effective_tier().is_paid() && subscription.current_period_end.is_some() {
            return start;
        }
        monthly_anniversary(start, now)
    }

    /// Transactions used in the period starting at `period_start`.
    ///
    /// A counter for a different period belongs to an earlier window and
    /// reads as zero.
    #[must_use]
    pub fn transactions_used(counter: &UsageCounter, period_start: DateTime<Utc>) -> u32 {
        if counter.period_start == period_start {
            counter.transactions_used
        } else {
            0
        }
    }

    /// Transactions carried into the first quota period of `next` when it
    /// replaces `previous` at `now`.
    ///
    /// `used` is the count of the window `previous` had at `now`. Moving to
    /// a paid tier inside that window keeps the count. Falling back to free,
    /// or buying after the previous paid period ended, starts from zero.
    #[must_use]
    pub fn carried_transactions(
        previous: &Subscription,
        next: &Subscription,
        used: u32,
        now: DateTime<Utc>,
    ) -> u32 {
        if !next.effective_tier().is_paid() {
            return 0;
        }
        let lapsed = previous.effective_tier().is_paid()
            && previous.current_period_end.is_some_and(|end| end <= now);
        if lapsed { 0 } else { used }
    }
}

/// Most recent monthly anniversary of `anchor` at or before `now`.
fn monthly_anniversary(anchor: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if now <= anchor {
        return anchor;
    }
    let months = u32::try_from(month_index(now) - month_index(anchor)).unwrap_or(0);

    let candidate = anchor
        .checked_add_months(Months::new(months))
        .unwrap_or(anchor);
    if candidate <= now {
        candidate
    } else {
        anchor
            .checked_add_months(Months::new(months.saturating_sub(1)))
            .unwrap_or(anchor)
    }
}

fn month_index(at: DateTime<Utc>) -> i32 {
    at.year() * 12 + i32::try_from(at.month0()).unwrap_or(0)
}

/// Usage against a limit, as shown to tenants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageReport {
    /// Units used.
    pub used: u32,
    /// Applicable limit.
    pub limit: Limit,
    /// Units left, `None` when unlimited.
    pub remaining: Option<u32>,
    /// `used / limit` as a percentage, 2 dp. Zero when unlimited.
    pub usage_percentage: Decimal,
    /// True once `used` has reached the limit.
    pub limit_exceeded: bool,
}

impl UsageReport {
    /// Builds a report for `used` against `limit`.
    #[must_use]
    pub fn new(used: u32, limit: Limit) -> Self {
        let usage_percentage = match limit {
            Limit::Unlimited => Decimal::ZERO,
            Limit::Limited(0) => Decimal::ONE_HUNDRED,
            Limit::Limited(max) => (Decimal::from(used) * Decimal::ONE_HUNDRED
                / Decimal::from(max))
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        };
        Self {
            used,
            limit,
            remaining: limit.remaining(used),
            usage_percentage,
            limit_exceeded: !limit.allows(used),
        }
    }
}
