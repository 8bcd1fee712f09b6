//! Tax rule sets and their version history.
//!
//! A rule set bundles the VAT rate, the income-tax free threshold, the
//! progressive brackets and the VAT exemption table. Versions are
//! append-only; each applies from its `effective_from` instant onwards.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use monetrax_shared::types::RuleSetId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::TaxError;

/// One band of the progressive income-tax schedule.
///
/// The band starts at the previous bracket's upper bound (or zero) and runs to
/// `upper_bound`. `None` means the band is unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeTaxBracket {
    /// Upper bound of the band, `None` for the final open-ended band.
    pub upper_bound: Option<Decimal>,
    /// Marginal rate as a fraction.
    pub rate: Decimal,
}

impl IncomeTaxBracket {
    /// A bounded band.
    #[must_use]
    pub const fn bounded(upper_bound: Decimal, rate: Decimal) -> Self {
        Self {
            upper_bound: Some(upper_bound),
            rate,
        }
    }

    /// The final open-ended band.
    #[must_use]
    pub const fn unbounded(rate: Decimal) -> Self {
        Self {
            upper_bound: None,
            rate,
        }
    }
}

/// Operator-editable tax configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRuleSet {
    /// VAT rate as a fraction, e.g. `0.075`.
    pub vat_rate: Decimal,
    /// Profit below this amount is not subject to income tax.
    pub tax_free_threshold: Decimal,
    /// Ascending brackets covering `[0, ∞)`.
    pub income_tax_brackets: Vec<IncomeTaxBracket>,
    /// Category labels exempt from VAT, matched case-insensitively.
    #[serde(default)]
    pub exempt_categories: BTreeSet<String>,
    /// Description substrings exempting a transaction from VAT.
    #[serde(default)]
    pub exempt_keywords: BTreeSet<String>,
}

impl TaxRuleSet {
    /// Validates a candidate rule set and normalises its exemption table.
    ///
    /// Categories and keywords are trimmed and lowercased; blanks are dropped.
    ///
    /// # Errors
    ///
    /// Returns `TaxError::InvalidBracketConfig` if the rule set violates the
    /// bracket coverage invariant or carries an out-of-range rate.
    pub fn validate(mut self) -> Result<Self, TaxError> {
        self.check()?;
        self.exempt_categories = normalize_terms(&self.exempt_categories);
        self.exempt_keywords = normalize_terms(&self.exempt_keywords);
        Ok(self)
    }

    /// Checks the structural invariants without modifying the rule set.
    ///
    /// Calculations call this before producing a figure so that a corrupted
    /// stored rule set fails closed.
    ///
    /// # Errors
    ///
    /// Returns `TaxError::InvalidBracketConfig` describing the first violation.
    pub fn check(&self) -> Result<(), TaxError> {
        if !is_fraction(self.vat_rate) {
            return Err(invalid(format!(
                "vat_rate {} must be between 0 and 1",
                self.vat_rate
            )));
        }
        if self.tax_free_threshold < Decimal::ZERO {
            return Err(invalid("tax_free_threshold must not be negative"));
        }
        if self.income_tax_brackets.is_empty() {
            return Err(invalid("at least one income tax bracket is required"));
        }

        let last = self.income_tax_brackets.len() - 1;
        let mut previous = Decimal::ZERO;
        for (idx, bracket) in self.income_tax_brackets.iter().enumerate() {
            if !is_fraction(bracket.rate) {
                return Err(invalid(format!(
                    "bracket {idx} rate {} must be between 0 and 1",
                    bracket.rate
                )));
            }
            match bracket.upper_bound {
                Some(upper) if idx == last => {
                    return Err(invalid(format!(
                        "final bracket must be unbounded, found upper bound {upper}"
                    )));
                }
                Some(upper) if upper <= previous => {
                    return Err(invalid(format!(
                        "bracket {idx} upper bound {upper} must exceed {previous}"
                    )));
                }
                Some(upper) => previous = upper,
                None if idx != last => {
                    return Err(invalid(format!(
                        "bracket {idx} is unbounded but is not the final bracket"
                    )));
                }
                None => {}
            }
        }
        Ok(())
    }
}

fn is_fraction(value: Decimal) -> bool {
    value >= Decimal::ZERO && value <= Decimal::ONE
}

fn invalid(message: impl Into<String>) -> TaxError {
    TaxError::InvalidBracketConfig(message.into())
}

fn normalize_terms(terms: &BTreeSet<String>) -> BTreeSet<String> {
    terms
        .iter()
        .map(|term| term.trim().to_lowercase())
        .filter(|term| !term.is_empty())
        .collect()
}

/// A published rule set version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRuleVersion {
    /// Version ID.
    pub id: RuleSetId,
    /// Instant from which this version applies.
    pub effective_from: DateTime<Utc>,
    /// The rules themselves.
    pub rules: TaxRuleSet,
}

/// All published versions, ordered by `effective_from`.
#[derive(Debug, Clone, Default)]
pub struct RuleSetHistory {
    versions: Vec<TaxRuleVersion>,
}

impl RuleSetHistory {
    /// Builds a history from versions in any order.
    #[must_use]
    pub fn new(mut versions: Vec<TaxRuleVersion>) -> Self {
        versions.sort_by_key(|v| v.effective_from);
        Self { versions }
    }

    /// The most recently effective version.
    #[must_use]
    pub fn latest(&self) -> Option<&TaxRuleVersion> {
        self.versions.last()
    }

    /// The version in force at `at`.
    ///
    /// Instants before the first version resolve to the first version, which
    /// is the baseline every tenant started with.
    #[must_use]
    pub fn effective_at(&self, at: DateTime<Utc>) -> Option<&TaxRuleVersion> {
        self.versions
            .iter()
            .rev()
            .find(|v| v.effective_from <= at)
            .or_else(|| self.versions.first())
    }

    /// Returns true if no version has been published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use rust_decimal_macros::dec;

    /// The reference rule set used across the tax tests.
    pub fn standard_rules() -> TaxRuleSet {
        TaxRuleSet {
            vat_rate: dec!(0.075),
            tax_free_threshold: dec!(800000),
            income_tax_brackets: vec![
                IncomeTaxBracket::bounded(dec!(300000), dec!(0.07)),
                IncomeTaxBracket::bounded(dec!(600000), dec!(0.11)),
                IncomeTaxBracket::unbounded(dec!(0.15)),
            ],
            exempt_categories: ["medical", "education", "basic food"]
                .into_iter()
                .map(String::from)
                .collect(),
            exempt_keywords: ["hospital", "school fees"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}
