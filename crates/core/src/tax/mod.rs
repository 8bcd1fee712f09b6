//! Tax computation.
//!
//! - Versioned tax rule sets and bracket validation
//! - VAT exemption classification
//! - VAT and progressive income tax summaries
//! - Reporting periods and filing deadlines

pub mod calculator;
pub mod calendar;
pub mod error;
pub mod exemption;
pub mod period;
pub mod rules;
pub mod types;

#[cfg(test)]
mod calculator_props;

pub use calculator::TaxCalculator;
pub use calendar::{TaxDeadline, upcoming_deadlines};
pub use error::TaxError;
pub use exemption::VatExemptionClassifier;
pub use period::{PeriodPreset, ReportingPeriod};
pub use rules::{IncomeTaxBracket, RuleSetHistory, TaxRuleSet, TaxRuleVersion};
pub use types::{
    AMOUNT_CEILING, AMOUNT_SCALE, MAX_CATEGORY_LEN, NewTransaction, TaxSummary, Transaction,
    TransactionKind,
};
