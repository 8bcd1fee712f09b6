//! Tax summary, readiness and filing calendar routes.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{NaiveDate, Utc};
use monetrax_core::readiness::{ReadinessReport, ReadinessScorer};
use monetrax_core::tax::{
    PeriodPreset, ReportingPeriod, TaxCalculator, TaxError, TaxSummary, upcoming_deadlines,
};
use monetrax_db::{BusinessRepository, TaxRuleRepository, TransactionRepository};
use monetrax_shared::types::TenantId;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{AppState, error::ApiError, middleware::AuthUser};

/// Creates the tax routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/summary", get(tax_summary))
        .route("/tax/summary", get(tax_summary))
        .route("/tax/readiness", get(readiness))
        .route("/tax/calendar", get(calendar))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Period selection. An explicit `from`/`to` range wins over `period`.
#[derive(Debug, Default, Deserialize)]
pub struct PeriodQuery {
    /// `month`, `quarter` or `year`; defaults to `month`.
    pub period: Option<String>,
    /// First day, inclusive.
    pub from: Option<NaiveDate>,
    /// Last day, inclusive.
    pub to: Option<NaiveDate>,
}

impl PeriodQuery {
    fn resolve(&self, today: NaiveDate) -> Result<ReportingPeriod, ApiError> {
        match (self.from, self.to) {
            (Some(from), Some(to)) => Ok(ReportingPeriod::new(from, to)?),
            (None, None) => {
                let preset = match self.period.as_deref() {
                    None => PeriodPreset::Month,
                    Some(raw) => PeriodPreset::parse(raw).ok_or_else(|| {
                        ApiError::validation(format!(
                            "Unknown period {raw:?}; expected month, quarter or year"
                        ))
                    })?,
                };
                Ok(ReportingPeriod::preset(preset, today))
            }
            _ => Err(ApiError::validation("from and to must be given together")),
        }
    }
}

/// Tax position and readiness for a period.
#[derive(Debug, Serialize)]
pub struct TaxSummaryResponse {
    /// VAT and income tax figures.
    #[serde(flatten)]
    pub summary: TaxSummary,
    /// Readiness score for the same period.
    pub readiness: ReadinessReport,
}

async fn compute(
    state: &AppState,
    tenant_id: TenantId,
    period: ReportingPeriod,
) -> Result<TaxSummaryResponse, ApiError> {
    let history = TaxRuleRepository::new((*state.db).clone()).history().await?;
    let transactions = TransactionRepository::new((*state.db).clone())
        .for_period(tenant_id, period)
        .await?;
    let business = BusinessRepository::new((*state.db).clone())
        .get_or_create(tenant_id)
        .await?;

    let summary = TaxCalculator::summarize_with_history(&transactions, &history, period)?;
    let latest = history.latest().ok_or(TaxError::NoRuleSet)?;
    let readiness =
        ReadinessScorer::new(&state.readiness, &latest.rules).score(&business, &transactions, period);

    Ok(TaxSummaryResponse { summary, readiness })
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/tax/summary` - VAT, income tax estimate and readiness for a period.
async fn tax_summary(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<PeriodQuery>,
) -> Result<Response, ApiError> {
    let period = query.resolve(Utc::now().date_naive())?;
    let response = compute(&state, auth.tenant_id(), period).await?;
    Ok((StatusCode::OK, Json(response)).into_response())
}

/// GET `/tax/readiness` - Readiness score only.
async fn readiness(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<PeriodQuery>,
) -> Result<Response, ApiError> {
    let period = query.resolve(Utc::now().date_naive())?;
    let response = compute(&state, auth.tenant_id(), period).await?;
    Ok((
        StatusCode::OK,
        Json(json!({
            "period": period,
            "readiness": response.readiness,
        })),
    )
        .into_response())
}

/// GET `/tax/calendar` - Upcoming filing deadlines.
async fn calendar(_auth: AuthUser) -> impl IntoResponse {
    let deadlines = upcoming_deadlines(Utc::now().date_naive());
    (StatusCode::OK, Json(json!({ "deadlines": deadlines })))
}
