//! VAT and progressive income tax computation.

use rust_decimal::{Decimal, RoundingStrategy};

use super::error::TaxError;
use super::exemption::VatExemptionClassifier;
use super::period::ReportingPeriod;
use super::rules::{IncomeTaxBracket, RuleSetHistory, TaxRuleSet};
use super::types::{TaxSummary, Transaction, TransactionKind};

/// Tax calculator.
///
/// Pure functions over a transaction snapshot; no state is kept between calls.
pub struct TaxCalculator;

impl TaxCalculator {
    /// Summarises the VAT and income tax position for `period` under a
    /// single rule set.
    ///
    /// Transactions outside the period are ignored. An empty set yields an
    /// all-zero summary.
    ///
    /// # Errors
    ///
    /// Returns `TaxError::InvalidBracketConfig` if the rule set is invalid;
    /// no figure is produced from a broken configuration.
    pub fn summarize(
        transactions: &[Transaction],
        rules: &TaxRuleSet,
        period: ReportingPeriod,
    ) -> Result<TaxSummary, TaxError> {
        rules.check()?;
        Ok(Self::aggregate(transactions, rules, period, |_| rules))
    }

    /// Summarises `period` using the rule set version in force when each
    /// transaction was recorded.
    ///
    /// VAT is never recomputed retroactively: each transaction uses the
    /// version effective at its `recorded_at`. The income tax estimate uses
    /// the latest version.
    ///
    /// # Errors
    ///
    /// Returns `TaxError::NoRuleSet` for an empty history, or
    /// `TaxError::InvalidBracketConfig` if any version involved is invalid.
    pub fn summarize_with_history(
        transactions: &[Transaction],
        history: &RuleSetHistory,
        period: ReportingPeriod,
    ) -> Result<TaxSummary, TaxError> {
        let latest = &history.latest().ok_or(TaxError::NoRuleSet)?.rules;
        latest.check()?;

        for tx in transactions.iter().filter(|tx| period.contains(tx.date)) {
            if let Some(version) = history.effective_at(tx.recorded_at) {
                version.rules.check()?;
            }
        }

        Ok(Self::aggregate(transactions, latest, period, |tx| {
            history
                .effective_at(tx.recorded_at)
                .map_or(latest, |version| &version.rules)
        }))
    }

    /// Progressive income tax on `taxable_profit`.
    ///
    /// Each bracket taxes only the slice of profit between the previous
    /// bound and its own upper bound, so the result is continuous across
    /// bracket boundaries.
    #[must_use]
    pub fn income_tax(taxable_profit: Decimal, brackets: &[IncomeTaxBracket]) -> Decimal {
        let mut tax = Decimal::ZERO;
        let mut lower = Decimal::ZERO;

        for bracket in brackets {
            if taxable_profit <= lower {
                break;
            }
            let top = bracket
                .upper_bound
                .map_or(taxable_profit, |upper| taxable_profit.min(upper));
            tax += (top - lower) * bracket.rate;

            match bracket.upper_bound {
                Some(upper) => lower = upper,
                None => break,
            }
        }

        round_money(tax)
    }

    fn aggregate<'a, F>(
        transactions: &[Transaction],
        income_rules: &TaxRuleSet,
        period: ReportingPeriod,
        rules_for: F,
    ) -> TaxSummary
    where
        F: Fn(&Transaction) -> &'a TaxRuleSet,
    {
        let mut summary = TaxSummary::empty(period);
        let mut vat_collected = Decimal::ZERO;
        let mut vat_paid = Decimal::ZERO;

        for tx in transactions.iter().filter(|tx| period.contains(tx.date)) {
            let rules = rules_for(tx);
            summary.transaction_count += 1;
            if VatExemptionClassifier::is_exempt(tx, rules) {
                summary.exempt_count += 1;
            }

            let vat = if VatExemptionClassifier::is_vat_applicable(tx, rules) {
                tx.amount * rules.vat_rate
            } else {
                Decimal::ZERO
            };

            match tx.kind {
                TransactionKind::Income => {
                    summary.gross_income += tx.amount;
                    vat_collected += vat;
                }
                TransactionKind::Expense => {
                    summary.gross_expenses += tx.amount;
                    vat_paid += vat;
                }
            }
        }

        summary.vat_collected = round_money(vat_collected);
        summary.vat_paid = round_money(vat_paid);
        summary.net_vat = (summary.vat_collected - summary.vat_paid).max(Decimal::ZERO);

        summary.taxable_profit = round_money(
            (summary.gross_income - summary.gross_expenses - income_rules.tax_free_threshold)
                .max(Decimal::ZERO),
        );
        summary.income_tax_estimate =
            Self::income_tax(summary.taxable_profit, &income_rules.income_tax_brackets);
        summary.total_tax_due = summary.net_vat + summary.income_tax_estimate;
        summary
    }
}

fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax::rules::TaxRuleVersion;
    use crate::tax::rules::fixtures::standard_rules;
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use monetrax_shared::types::{RuleSetId, TenantId, TransactionId};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn january() -> ReportingPeriod {
        ReportingPeriod::new(date(2026, 1, 1), date(2026, 1, 31)).unwrap()
    }

    fn tx(kind: TransactionKind, category: &str, amount: Decimal, day: NaiveDate) -> Transaction {
        Transaction {
            id: TransactionId::new(),
            tenant_id: TenantId::new(),
            kind,
            category: category.into(),
            amount,
            date: day,
            is_taxable: true,
            description: String::new(),
            recorded_at: Utc.with_ymd_and_hms(2026, 1, 31, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_reference_scenario() {
        let transactions = vec![
            tx(TransactionKind::Income, "Sales", dec!(1500000), date(2026, 1, 15)),
            tx(TransactionKind::Expense, "Supplies", dec!(300000), date(2026, 1, 20)),
        ];

        let summary = TaxCalculator::summarize(&transactions, &standard_rules(), january()).unwrap();

        assert_eq!(summary.vat_collected, dec!(112500));
        assert_eq!(summary.vat_paid, dec!(22500));
        assert_eq!(summary.net_vat, dec!(90000));
        assert_eq!(summary.gross_income, dec!(1500000));
        assert_eq!(summary.gross_expenses, dec!(300000));
        assert_eq!(summary.taxable_profit, dec!(400000));
        assert_eq!(summary.income_tax_estimate, dec!(32000));
        assert_eq!(summary.total_tax_due, dec!(122000));
        assert_eq!(summary.transaction_count, 2);
        assert_eq!(summary.exempt_count, 0);
    }

    #[test]
    fn test_empty_set_is_all_zero() {
        let summary = TaxCalculator::summarize(&[], &standard_rules(), january()).unwrap();
        assert_eq!(summary, TaxSummary::empty(january()));
    }

    #[test]
    fn test_exempt_income_contributes_no_vat() {
        let transactions = vec![tx(
            TransactionKind::Income,
            "Medical",
            dec!(100000),
            date(2026, 1, 3),
        )];
        let summary = TaxCalculator::summarize(&transactions, &standard_rules(), january()).unwrap();
        assert_eq!(summary.vat_collected, dec!(0));
        assert_eq!(summary.gross_income, dec!(100000));
        assert_eq!(summary.exempt_count, 1);
    }

    #[test]
    fn test_net_vat_floors_at_zero() {
        let transactions = vec![
            tx(TransactionKind::Income, "Sales", dec!(1000), date(2026, 1, 3)),
            tx(TransactionKind::Expense, "Stock", dec!(50000), date(2026, 1, 4)),
        ];
        let summary = TaxCalculator::summarize(&transactions, &standard_rules(), january()).unwrap();
        assert_eq!(summary.net_vat, dec!(0));
        assert_eq!(summary.vat_paid, dec!(3750));
    }

    #[test]
    fn test_period_filter_is_inclusive() {
        let transactions = vec![
            tx(TransactionKind::Income, "Sales", dec!(100), date(2026, 1, 1)),
            tx(TransactionKind::Income, "Sales", dec!(100), date(2026, 1, 31)),
            tx(TransactionKind::Income, "Sales", dec!(100), date(2026, 2, 1)),
            tx(TransactionKind::Income, "Sales", dec!(100), date(2025, 12, 31)),
        ];
        let summary = TaxCalculator::summarize(&transactions, &standard_rules(), january()).unwrap();
        assert_eq!(summary.transaction_count, 2);
        assert_eq!(summary.gross_income, dec!(200));
    }

    #[test]
    fn test_income_tax_straddles_brackets() {
        let brackets = standard_rules().income_tax_brackets;
        assert_eq!(TaxCalculator::income_tax(dec!(0), &brackets), dec!(0));
        assert_eq!(TaxCalculator::income_tax(dec!(300000), &brackets), dec!(21000));
        assert_eq!(TaxCalculator::income_tax(dec!(600000), &brackets), dec!(54000));
        // 21,000 + 33,000 + 400,000 * 0.15
        assert_eq!(TaxCalculator::income_tax(dec!(1000000), &brackets), dec!(114000));
    }

    #[test]
    fn test_invalid_rules_fail_closed() {
        let mut rules = standard_rules();
        rules.income_tax_brackets.pop();
        assert!(matches!(
            TaxCalculator::summarize(&[], &rules, january()),
            Err(TaxError::InvalidBracketConfig(_))
        ));
    }

    fn version(effective_from: DateTime<Utc>, vat_rate: Decimal) -> TaxRuleVersion {
        TaxRuleVersion {
            id: RuleSetId::new(),
            effective_from,
            rules: TaxRuleSet {
                vat_rate,
                ..standard_rules()
            },
        }
    }

    #[test]
    fn test_history_applies_vat_non_retroactively() {
        let history = RuleSetHistory::new(vec![
            version(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(), dec!(0.075)),
            version(Utc.with_ymd_and_hms(2026, 1, 16, 0, 0, 0).unwrap(), dec!(0.1)),
        ]);

        let mut before = tx(TransactionKind::Income, "Sales", dec!(10000), date(2026, 1, 10));
        before.recorded_at = Utc.with_ymd_and_hms(2026, 1, 10, 9, 0, 0).unwrap();
        let mut after = tx(TransactionKind::Income, "Sales", dec!(10000), date(2026, 1, 20));
        after.recorded_at = Utc.with_ymd_and_hms(2026, 1, 20, 9, 0, 0).unwrap();

        let summary =
            TaxCalculator::summarize_with_history(&[before, after], &history, january()).unwrap();
        assert_eq!(summary.vat_collected, dec!(1750));
    }

    #[test]
    fn test_history_requires_a_version() {
        assert!(matches!(
            TaxCalculator::summarize_with_history(&[], &RuleSetHistory::default(), january()),
            Err(TaxError::NoRuleSet)
        ));
    }
}
