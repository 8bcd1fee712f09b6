//! Weighted readiness score over bookkeeping completeness signals.
//!
//! The score is recomputed on every request from the current profile and
//! transaction set; nothing is stored.

use monetrax_shared::ReadinessWeights;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::tax::{ReportingPeriod, TaxRuleSet, Transaction, VatExemptionClassifier};
use crate::tenant::Business;

/// Category labels that count as "not categorized".
const PLACEHOLDER_CATEGORIES: [&str; 2] = ["uncategorized", "other"];

/// A readiness signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessSignal {
    /// Name, business type and industry are filled in.
    ProfileComplete,
    /// A tax ID is recorded.
    TaxIdPresent,
    /// Enough transactions were recorded in the period.
    MinimumTransactions,
    /// Enough transactions carry a real category.
    CategorizedRatio,
    /// At least one transaction is VAT-applicable.
    VatTagged,
}

/// Outcome of one signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignalResult {
    /// Which signal.
    pub signal: ReadinessSignal,
    /// Whether it is satisfied.
    pub satisfied: bool,
    /// Points earned (the signal weight when satisfied, else zero).
    pub points: u32,
    /// Points available.
    pub max_points: u32,
}

/// Readiness score with its breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadinessReport {
    /// Score in `[0, 100]`.
    pub score: u8,
    /// Per-signal breakdown.
    pub signals: Vec<SignalResult>,
}

/// Computes readiness scores from configured weights.
pub struct ReadinessScorer<'a> {
    weights: &'a ReadinessWeights,
    rules: &'a TaxRuleSet,
}

impl<'a> ReadinessScorer<'a> {
    /// Creates a scorer. The rule set decides which transactions are VAT-applicable.
    #[must_use]
    pub const fn new(weights: &'a ReadinessWeights, rules: &'a TaxRuleSet) -> Self {
        Self { weights, rules }
    }

    /// Scores a tenant's bookkeeping for `period`.
    #[must_use]
    pub fn score(
        &self,
        business: &Business,
        transactions: &[Transaction],
        period: ReportingPeriod,
    ) -> ReadinessReport {
        let in_period: Vec<&Transaction> = transactions
            .iter()
            .filter(|tx| period.contains(tx.date))
            .collect();
        let count = in_period.len();

        let categorized = in_period.iter().filter(|tx| is_categorized(tx)).count();
        let categorized_ok = count > 0
            && Decimal::from(categorized)
                >= self.weights.categorized_threshold * Decimal::from(count);

        let vat_tagged = in_period
            .iter()
            .any(|tx| VatExemptionClassifier::is_vat_applicable(tx, self.rules));

        let min_tx = usize::try_from(self.weights.min_transactions).unwrap_or(usize::MAX);

        let w = self.weights;
        let signals = vec![
            signal(ReadinessSignal::ProfileComplete, business.is_profile_complete(), w.profile_complete),
            signal(ReadinessSignal::TaxIdPresent, business.has_tax_id(), w.tax_id_present),
            signal(ReadinessSignal::MinimumTransactions, count >= min_tx, w.minimum_transactions),
            signal(ReadinessSignal::CategorizedRatio, categorized_ok, w.categorized_ratio),
            signal(ReadinessSignal::VatTagged, vat_tagged, w.vat_tagged),
        ];

        let earned: u64 = signals.iter().map(|s| u64::from(s.points)).sum();
        let total: u64 = signals.iter().map(|s| u64::from(s.max_points)).sum();

        ReadinessReport {
            score: normalize(earned, total),
            signals,
        }
    }
}

fn signal(signal: ReadinessSignal, satisfied: bool, weight: u32) -> SignalResult {
    SignalResult {
        signal,
        satisfied,
        points: if satisfied { weight } else { 0 },
        max_points: weight,
    }
}

fn is_categorized(tx: &Transaction) -> bool {
    let category = tx.category.trim().to_lowercase();
    !category.is_empty() && !PLACEHOLDER_CATEGORIES.contains(&category.as_str())
}

/// `round(earned * 100 / total)`, half away from zero; zero when `total` is zero.
fn normalize(earned: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let scaled = (earned.min(total) * 200 + total) / (total * 2);
    u8::try_from(scaled).unwrap_or(100)
}
