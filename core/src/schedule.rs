//! Amortization schedule generation.
//!
//! A loan of `principal` over `terms` months is split into `terms`
//! installments of ceil(principal / terms), followed by one remainder row of
//! floor(principal / terms). The schedule therefore has `terms + 1` rows and
//! its total can exceed the principal; callers must not assume otherwise.
//!
//! Installment i (1-indexed) falls due i calendar months after the processing
//! date, with the day clipped to the length of the target month.

use chrono::{Months, NaiveDate};

use crate::{
    error::{LendingError, LendingResult},
    types::Amount,
};

/// One row of the schedule before it is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallmentPlan {
    pub amount: Amount,
    pub due_date: NaiveDate,
}

/// A generated schedule and the sum of its rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    pub installments: Vec<InstallmentPlan>,
    pub total: Amount,
}

pub fn build_schedule(
    principal: Amount,
    terms: i64,
    processed_at: NaiveDate,
) -> LendingResult<Schedule> {
    if terms <= 0 {
        return Err(LendingError::validation(format!(
            "cannot schedule a loan over {terms} terms"
        )));
    }
    if principal <= 0 {
        return Err(LendingError::validation(format!(
            "cannot schedule a principal of {principal}"
        )));
    }
    let rows = u32::try_from(terms)
        .ok()
        .and_then(|t| t.checked_add(1))
        .ok_or_else(|| LendingError::validation(format!("too many terms: {terms}")))?;

    let base = ceil_div(principal, terms);
    let remainder_row = principal / terms;

    let mut installments = Vec::new();
    let mut total: Amount = 0;
    for i in 1..=rows {
        let amount = if i < rows { base } else { remainder_row };
        total = total.checked_add(amount).ok_or_else(|| {
            LendingError::validation(format!(
                "schedule for {principal} over {terms} terms overflows the amount range"
            ))
        })?;
        installments.push(InstallmentPlan {
            amount,
            due_date: add_months(processed_at, i)?,
        });
    }

    Ok(Schedule {
        installments,
        total,
    })
}

/// Calendar "add N months"; 2024-01-31 + 1 month is 2024-02-29.
pub fn add_months(date: NaiveDate, months: u32) -> LendingResult<NaiveDate> {
    date.checked_add_months(Months::new(months)).ok_or_else(|| {
        LendingError::validation(format!("{date} + {months} months is out of range"))
    })
}

/// Integer ceiling division for a positive divisor and non-negative dividend.
fn ceil_div(numerator: Amount, denominator: i64) -> Amount {
    let quotient = numerator / denominator;
    if numerator % denominator == 0 {
        quotient
    } else {
        quotient + 1
    }
}
