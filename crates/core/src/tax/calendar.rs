//! Statutory filing deadlines.

use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;

/// Day of the month on which the monthly VAT return is due.
pub const VAT_FILING_DAY: u32 = 21;

/// An upcoming filing deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxDeadline {
    /// Display name.
    pub name: &'static str,
    /// What must be filed.
    pub description: String,
    /// Due date.
    pub due_date: NaiveDate,
    /// Days from `today` to `due_date`, zero on the due date.
    pub days_remaining: i64,
}

/// Returns the next VAT and income tax deadlines on or after `today`,
/// ordered by due date.
#[must_use]
pub fn upcoming_deadlines(today: NaiveDate) -> Vec<TaxDeadline> {
    let mut deadlines = vec![next_vat_filing(today), next_income_tax_filing(today)];
    deadlines.sort_by_key(|d| d.due_date);
    deadlines
}

fn next_vat_filing(today: NaiveDate) -> TaxDeadline {
    let this_month = NaiveDate::from_ymd_opt(today.year(), today.month(), VAT_FILING_DAY)
        .unwrap_or(today);
    let due_date = if today <= this_month {
        this_month
    } else {
        this_month
            .checked_add_months(Months::new(1))
            .unwrap_or(this_month)
    };
    let covered = due_date
        .checked_sub_months(Months::new(1))
        .unwrap_or(due_date);

    TaxDeadline {
        name: "Monthly VAT Filing",
        description: format!("VAT return for {}", covered.format("%B %Y")),
        due_date,
        days_remaining: (due_date - today).num_days(),
    }
}

fn next_income_tax_filing(today: NaiveDate) -> TaxDeadline {
    let year = if (today.month(), today.day()) <= (3, 31) {
        today.year()
    } else {
        today.year() + 1
    };
    let due_date = NaiveDate::from_ymd_opt(year, 3, 31).unwrap_or(today);

    TaxDeadline {
        name: "Annual Income Tax",
        description: format!("Income tax return for {}", year - 1),
        due_date,
        days_remaining: (due_date - today).num_days(),
    }
}
