//! Transaction and tax summary types.

use chrono::{DateTime, NaiveDate, Utc};
use monetrax_shared::types::{TenantId, TransactionId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::TaxError;
use super::period::ReportingPeriod;

/// Maximum length of a category label.
pub const MAX_CATEGORY_LEN: usize = 100;

/// Decimal places an amount may carry.
pub const AMOUNT_SCALE: u32 = 2;

/// Amounts must stay below this value (`NUMERIC(19, 2)`).
pub const AMOUNT_CEILING: i64 = 100_000_000_000_000_000;

/// Direction of a bookkeeping transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money received; output VAT accrues.
    Income,
    /// Money spent; input VAT is credited.
    Expense,
}

impl TransactionKind {
    /// Returns the string representation of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    /// Parses a kind from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "income" => Some(Self::Income),
            "expense" => Some(Self::Expense),
            _ => None,
        }
    }
}

/// A recorded transaction. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction ID.
    pub id: TransactionId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Income or expense.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// Category label.
    pub category: String,
    /// Positive amount.
    pub amount: Decimal,
    /// Business date of the transaction.
    pub date: NaiveDate,
    /// Tenant-supplied intent that the transaction carries VAT.
    pub is_taxable: bool,
    /// Free-text description.
    pub description: String,
    /// When the transaction was recorded; selects the rule set version.
    pub recorded_at: DateTime<Utc>,
}

/// Candidate transaction submitted by a tenant or an ingestion collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransaction {
    /// Income or expense.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// Category label.
    pub category: String,
    /// Amount, must be positive.
    pub amount: Decimal,
    /// Business date.
    pub date: NaiveDate,
    /// Tenant-supplied taxable flag.
    pub is_taxable: bool,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
}

impl NewTransaction {
    /// Validates and normalises the candidate at the transaction boundary.
    ///
    /// # Errors
    ///
    /// Returns `TaxError::InvalidTransaction` for a non-positive, oversized
    /// or sub-cent amount, or a missing/oversized category.
    pub fn validate(mut self) -> Result<Self, TaxError> {
        if self.amount <= Decimal::ZERO {
            return Err(TaxError::InvalidTransaction(
                "amount must be greater than zero".into(),
            ));
        }
        if self.amount.normalize().scale() > AMOUNT_SCALE {
            return Err(TaxError::InvalidTransaction(format!(
                "amount must have at most {AMOUNT_SCALE} decimal places"
            )));
        }
        if self.amount >= Decimal::from(AMOUNT_CEILING) {
            return Err(TaxError::InvalidTransaction(format!(
                "amount must be below {AMOUNT_CEILING}"
            )));
        }

        self.category = self.category.trim().to_string();
        if self.category.is_empty() {
            return Err(TaxError::InvalidTransaction("category is required".into()));
        }
        if self.category.chars().count() > MAX_CATEGORY_LEN {
            return Err(TaxError::InvalidTransaction(format!(
                "category exceeds {MAX_CATEGORY_LEN} characters"
            )));
        }

        self.description = self.description.trim().to_string();
        Ok(self)
    }

    /// Materialises the validated candidate as a recorded transaction.
    #[must_use]
    pub fn into_transaction(
        self,
        id: TransactionId,
        tenant_id: TenantId,
        recorded_at: DateTime<Utc>,
    ) -> Transaction {
        Transaction {
            id,
            tenant_id,
            kind: self.kind,
            category: self.category,
            amount: self.amount,
            date: self.date,
            is_taxable: self.is_taxable,
            description: self.description,
            recorded_at,
        }
    }
}

/// VAT and income tax position for a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxSummary {
    /// Period the summary covers.
    pub period: ReportingPeriod,
    /// Output VAT on taxable, non-exempt income.
    pub vat_collected: Decimal,
    /// Input VAT on taxable, non-exempt expenses.
    pub vat_paid: Decimal,
    /// `max(vat_collected - vat_paid, 0)`.
    pub net_vat: Decimal,
    /// Sum of income amounts.
    pub gross_income: Decimal,
    /// Sum of expense amounts.
    pub gross_expenses: Decimal,
    /// `max(gross_income - gross_expenses - tax_free_threshold, 0)`.
    pub taxable_profit: Decimal,
    /// Progressive income tax on `taxable_profit`.
    pub income_tax_estimate: Decimal,
    /// `net_vat + income_tax_estimate`.
    pub total_tax_due: Decimal,
    /// Transactions inside the period.
    pub transaction_count: usize,
    /// Transactions excluded from VAT by category or keyword.
    pub exempt_count: usize,
}

impl TaxSummary {
    /// An all-zero summary for a period with no transactions.
    #[must_use]
    pub fn empty(period: ReportingPeriod) -> Self {
        Self {
            period,
            vat_collected: Decimal::ZERO,
            vat_paid: Decimal::ZERO,
            net_vat: Decimal::ZERO,
            gross_income: Decimal::ZERO,
            gross_expenses: Decimal::ZERO,
            taxable_profit: Decimal::ZERO,
            income_tax_estimate: Decimal::ZERO,
            total_tax_due: Decimal::ZERO,
            transaction_count: 0,
            exempt_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn candidate(amount: Decimal, category: &str) -> NewTransaction {
        NewTransaction {
            kind: TransactionKind::Income,
            category: category.to_string(),
            amount,
            date: NaiveDate::from_ymd_opt(2026, 1, 20).unwrap(),
            is_taxable: true,
            description: "  Product sales  ".into(),
        }
    }

    #[test]
    fn test_validate_trims_fields() {
        let tx = candidate(dec!(10000), " Sales ").validate().unwrap();
        assert_eq!(tx.category, "Sales");
        assert_eq!(tx.description, "Product sales");
    }

    #[test]
    fn test_non_positive_amount_rejected() {
        assert!(matches!(
            candidate(dec!(0), "Sales").validate(),
            Err(TaxError::InvalidTransaction(_))
        ));
        assert!(matches!(
            candidate(dec!(-5), "Sales").validate(),
            Err(TaxError::InvalidTransaction(_))
        ));
    }

    #[test]
    fn test_amount_must_fit_storage() {
        assert!(matches!(
            candidate(dec!(100.005), "Sales").validate(),
            Err(TaxError::InvalidTransaction(_))
        ));
        assert!(matches!(
            candidate(dec!(1000000000000000000), "Sales").validate(),
            Err(TaxError::InvalidTransaction(_))
        ));
        assert!(candidate(dec!(100000000000000000), "Sales").validate().is_err());

        // Trailing zeros are not extra precision.
        let tx = candidate(dec!(100.500), "Sales").validate().unwrap();
        assert_eq!(tx.amount, dec!(100.5));
        assert!(candidate(dec!(99999999999999999.99), "Sales").validate().is_ok());
    }

    #[test]
    fn test_blank_category_rejected() {
        assert!(candidate(dec!(1), "   ").validate().is_err());
        assert!(candidate(dec!(1), &"x".repeat(101)).validate().is_err());
    }

    #[test]
    fn test_new_transaction_reads_type_field() {
        let tx: NewTransaction = serde_json::from_str(
            r#"{"type":"expense","category":"Rent","amount":"250000","date":"2026-01-05","is_taxable":false}"#,
        )
        .unwrap();
        assert_eq!(tx.kind, TransactionKind::Expense);
        assert_eq!(tx.amount, dec!(250000));
        assert!(tx.description.is_empty());
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!(TransactionKind::parse("INCOME"), Some(TransactionKind::Income));
        assert_eq!(TransactionKind::parse("expense"), Some(TransactionKind::Expense));
        assert_eq!(TransactionKind::parse("transfer"), None);
    }
}
