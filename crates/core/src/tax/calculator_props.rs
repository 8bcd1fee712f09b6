//! Property-based tests for the tax calculator.

use chrono::{NaiveDate, Utc};
use monetrax_shared::types::{TenantId, TransactionId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::calculator::TaxCalculator;
use super::period::ReportingPeriod;
use super::rules::{IncomeTaxBracket, TaxRuleSet};
use super::types::{Transaction, TransactionKind};

/// Strategy for a valid bracket schedule: strictly increasing bounds and
/// an unbounded final band.
fn brackets_strategy() -> impl Strategy<Value = Vec<IncomeTaxBracket>> {
    (
        prop::collection::vec((1i64..500_000i64, 0u32..=100u32), 0..5),
        0u32..=100u32,
    )
        .prop_map(|(steps, last_rate)| {
            let mut upper = Decimal::ZERO;
            let mut brackets: Vec<IncomeTaxBracket> = steps
                .into_iter()
                .map(|(step, rate)| {
                    upper += Decimal::from(step);
                    IncomeTaxBracket::bounded(upper, Decimal::new(i64::from(rate), 2))
                })
                .collect();
            brackets.push(IncomeTaxBracket::unbounded(Decimal::new(
                i64::from(last_rate),
                2,
            )));
            brackets
        })
}

fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn transaction_strategy() -> impl Strategy<Value = Transaction> {
    (
        prop_oneof![Just(TransactionKind::Income), Just(TransactionKind::Expense)],
        prop_oneof![Just("Sales"), Just("Medical"), Just("Rent"), Just("Stock")],
        amount_strategy(),
        any::<bool>(),
        1u32..=28u32,
    )
        .prop_map(|(kind, category, amount, is_taxable, day)| Transaction {
            id: TransactionId::new(),
            tenant_id: TenantId::new(),
            kind,
            category: category.to_string(),
            amount,
            date: NaiveDate::from_ymd_opt(2026, 3, day).unwrap_or_default(),
            is_taxable,
            description: String::new(),
            recorded_at: Utc::now(),
        })
}

fn rules_with(brackets: Vec<IncomeTaxBracket>) -> TaxRuleSet {
    TaxRuleSet {
        vat_rate: Decimal::new(75, 3),
        tax_free_threshold: Decimal::from(800_000),
        income_tax_brackets: brackets,
        exempt_categories: ["medical".to_string()].into_iter().collect(),
        exempt_keywords: Default::default(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Income tax never decreases as profit grows.
    #[test]
    fn prop_income_tax_non_decreasing(
        brackets in brackets_strategy(),
        a in 0i64..5_000_000i64,
        b in 0i64..5_000_000i64,
    ) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let low_tax = TaxCalculator::income_tax(Decimal::from(low), &brackets);
        let high_tax = TaxCalculator::income_tax(Decimal::from(high), &brackets);
        prop_assert!(low_tax <= high_tax);
    }

    /// No cliff at a bracket boundary: one unit of extra profit adds at most
    /// one unit times the highest marginal rate (plus rounding).
    #[test]
    fn prop_income_tax_continuous_at_boundaries(brackets in brackets_strategy()) {
        let max_rate = brackets.iter().map(|b| b.rate).max().unwrap_or_default();
        let epsilon = Decimal::new(1, 2);
        for bound in brackets.iter().filter_map(|b| b.upper_bound) {
            let at = TaxCalculator::income_tax(bound, &brackets);
            let above = TaxCalculator::income_tax(bound + Decimal::ONE, &brackets);
            prop_assert!(above - at <= max_rate + epsilon);
            prop_assert!(above >= at);
        }
    }

    /// Income tax never exceeds profit.
    #[test]
    fn prop_income_tax_bounded_by_profit(
        brackets in brackets_strategy(),
        profit in 0i64..10_000_000i64,
    ) {
        let profit = Decimal::from(profit);
        prop_assert!(TaxCalculator::income_tax(profit, &brackets) <= profit);
    }

    /// Net VAT is never negative, and total tax due is its sum with income tax.
    #[test]
    fn prop_net_vat_never_negative(
        brackets in brackets_strategy(),
        transactions in prop::collection::vec(transaction_strategy(), 0..40),
    ) {
        let rules = rules_with(brackets);
        let period = ReportingPeriod::new(
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap_or_default(),
            NaiveDate::from_ymd_opt(2026, 3, 31).unwrap_or_default(),
        ).map_err(|e| TestCaseError::fail(e.to_string()))?;

        let summary = TaxCalculator::summarize(&transactions, &rules, period)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;

        prop_assert!(summary.net_vat >= Decimal::ZERO);
        prop_assert!(summary.taxable_profit >= Decimal::ZERO);
        prop_assert_eq!(summary.total_tax_due, summary.net_vat + summary.income_tax_estimate);
        prop_assert_eq!(summary.transaction_count, transactions.len());
    }
}
