//! VAT exemption classification.

use rust_decimal::{Decimal, RoundingStrategy};

use super::rules::TaxRuleSet;
use super::types::Transaction;

/// Decides whether a transaction accrues VAT.
///
/// Exemption overrides the tenant's `is_taxable` flag: an exempt transaction
/// never accrues VAT, a non-exempt one accrues VAT only when flagged taxable.
pub struct VatExemptionClassifier;

impl VatExemptionClassifier {
    /// Returns true if the category or description matches the exemption table.
    ///
    /// Categories match exactly, keywords match as substrings of the
    /// description. Both comparisons ignore case.
    #[must_use]
    pub fn is_exempt(tx: &Transaction, rules: &TaxRuleSet) -> bool {
        let category = tx.category.trim().to_lowercase();
        if rules
            .exempt_categories
            .iter()
            .any(|c| c.trim().to_lowercase() == category)
        {
            return true;
        }

        let description = tx.description.to_lowercase();
        rules.exempt_keywords.iter().any(|k| {
            let keyword = k.trim().to_lowercase();
            !keyword.is_empty() && description.contains(&keyword)
        })
    }

    /// Returns true if the transaction is flagged taxable and is not exempt.
    #[must_use]
    pub fn is_vat_applicable(tx: &Transaction, rules: &TaxRuleSet) -> bool {
        tx.is_taxable && !Self::is_exempt(tx, rules)
    }

    /// VAT carried by a single transaction, rounded to 2 dp.
    #[must_use]
    pub fn vat_amount(tx: &Transaction, rules: &TaxRuleSet) -> Decimal {
        if Self::is_vat_applicable(tx, rules) {
            (tx.amount * rules.vat_rate)
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        } else {
            Decimal::ZERO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax::rules::fixtures::standard_rules;
    use crate::tax::types::TransactionKind;
    use chrono::{NaiveDate, Utc};
    use monetrax_shared::types::{TenantId, TransactionId};
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn tx(category: &str, description: &str, is_taxable: bool) -> Transaction {
        Transaction {
            id: TransactionId::new(),
            tenant_id: TenantId::new(),
            kind: TransactionKind::Income,
            category: category.into(),
            amount: dec!(10000),
            date: NaiveDate::from_ymd_opt(2026, 1, 10).unwrap(),
            is_taxable,
            description: description.into(),
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn test_medical_category_exempt_despite_taxable_flag() {
        let rules = standard_rules();
        let medical = tx("Medical", "Consultation", true);
        assert!(VatExemptionClassifier::is_exempt(&medical, &rules));
        assert!(!VatExemptionClassifier::is_vat_applicable(&medical, &rules));
        assert_eq!(VatExemptionClassifier::vat_amount(&medical, &rules), dec!(0));
    }

    #[rstest]
    #[case("Sales", "Paid HOSPITAL bill", true)]
    #[case("Sales", "school fees for staff kids", true)]
    #[case("MEDICAL", "", true)]
    #[case("Medical supplies", "", false)]
    #[case("Sales", "Retail order", false)]
    fn test_exemption_matching(
        #[case] category: &str,
        #[case] description: &str,
        #[case] expected: bool,
    ) {
        let rules = standard_rules();
        assert_eq!(
            VatExemptionClassifier::is_exempt(&tx(category, description, true), &rules),
            expected
        );
    }

    #[test]
    fn test_untaxed_non_exempt_has_no_vat() {
        let rules = standard_rules();
        let sale = tx("Sales", "Retail", false);
        assert!(!VatExemptionClassifier::is_vat_applicable(&sale, &rules));
        assert_eq!(VatExemptionClassifier::vat_amount(&sale, &rules), dec!(0));
    }

    #[test]
    fn test_vat_amount_rounds_half_away_from_zero() {
        let rules = standard_rules();
        let mut sale = tx("Sales", "", true);
        sale.amount = dec!(0.07);
        // 0.07 * 0.075 = 0.00525
        assert_eq!(VatExemptionClassifier::vat_amount(&sale, &rules), dec!(0.01));
        sale.amount = dec!(10000);
        assert_eq!(VatExemptionClassifier::vat_amount(&sale, &rules), dec!(750.00));
    }
}
