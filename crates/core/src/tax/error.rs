//! Tax computation error types.

use thiserror::Error;

/// Tax-related errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaxError {
    /// The rule set violates the bracket coverage invariant or has out-of-range rates.
    #[error("Invalid tax rule configuration: {0}")]
    InvalidBracketConfig(String),

    /// No rule set has been published yet.
    #[error("No tax rule set is in effect")]
    NoRuleSet,

    /// A transaction failed boundary validation.
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    /// A reporting period is malformed.
    #[error("Invalid period: {0}")]
    InvalidPeriod(String),
}

impl TaxError {
    /// Machine-readable reason code.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::InvalidBracketConfig(_) | Self::NoRuleSet => "invalid_bracket_config",
            Self::InvalidTransaction(_) | Self::InvalidPeriod(_) => "validation_error",
        }
    }
}
