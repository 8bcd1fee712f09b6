//! Inclusive reporting periods.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use super::error::TaxError;

/// Calendar window preset relative to a reference day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodPreset {
    /// Calendar month containing the reference day.
    Month,
    /// Calendar quarter containing the reference day.
    Quarter,
    /// Calendar year containing the reference day.
    Year,
}

impl PeriodPreset {
    /// Parses a preset from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "month" => Some(Self::Month),
            "quarter" => Some(Self::Quarter),
            "year" => Some(Self::Year),
            _ => None,
        }
    }
}

/// An inclusive date range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingPeriod {
    /// First day, inclusive.
    pub start: NaiveDate,
    /// Last day, inclusive.
    pub end: NaiveDate,
}

impl ReportingPeriod {
    /// Creates a period, rejecting `start > end`.
    ///
    /// # Errors
    ///
    /// Returns `TaxError::InvalidPeriod` if the range is inverted.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, TaxError> {
        if start > end {
            return Err(TaxError::InvalidPeriod(format!(
                "start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Resolves a preset to the calendar window containing `today`.
    #[must_use]
    pub fn preset(preset: PeriodPreset, today: NaiveDate) -> Self {
        let (start, months) = match preset {
            PeriodPreset::Month => (first_of_month(today.year(), today.month()), 1),
            PeriodPreset::Quarter => {
                let first_month = (today.month0() / 3) * 3 + 1;
                (first_of_month(today.year(), first_month), 3)
            }
            PeriodPreset::Year => (first_of_month(today.year(), 1), 12),
        };
        let end = start
            .checked_add_months(Months::new(months))
            .and_then(|next| next.pred_opt())
            .unwrap_or(NaiveDate::MAX);
        Self { start, end }
    }

    /// Returns true if `date` falls inside the period.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
}
