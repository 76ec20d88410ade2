//! Loan domain entities.
//!
//! RULE: status is never set directly. It is derived from the outstanding
//! amount every time that amount changes, so the two cannot diverge.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    error::{LendingError, LendingResult},
    types::{Amount, LoanId, RowId, UserId},
};

// ── Status ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Due,
    Repaid,
}

impl LoanStatus {
    pub fn for_outstanding(outstanding: Amount) -> Self {
        if outstanding > 0 {
            Self::Due
        } else {
            Self::Repaid
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Due => "due",
            Self::Repaid => "repaid",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "due" => Some(Self::Due),
            "repaid" => Some(Self::Repaid),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RepaymentStatus {
    Due,
    Partial,
    Repaid,
}

impl RepaymentStatus {
    /// Status of an installment scheduled at `amount` with `outstanding` left.
    /// A zero balance is always repaid, including zero-amount installments.
    pub fn derive(amount: Amount, outstanding: Amount) -> Self {
        if outstanding <= 0 {
            Self::Repaid
        } else if outstanding >= amount {
            Self::Due
        } else {
            Self::Partial
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Due => "due",
            Self::Partial => "partial",
            Self::Repaid => "repaid",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "due" => Some(Self::Due),
            "partial" => Some(Self::Partial),
            "repaid" => Some(Self::Repaid),
            _ => None,
        }
    }
}

// ── Loan ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Loan {
    pub id: LoanId,
    pub user_id: UserId,
    pub amount: Amount,
    pub currency_code: String,
    pub terms: i64,
    outstanding_amount: Amount,
    status: LoanStatus,
    pub processed_at: NaiveDate,
}

impl Loan {
    /// Rebuild a loan from stored columns, rejecting rows whose status
    /// disagrees with their outstanding amount.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: LoanId,
        user_id: UserId,
        amount: Amount,
        currency_code: String,
        terms: i64,
        outstanding_amount: Amount,
        stored_status: LoanStatus,
        processed_at: NaiveDate,
    ) -> LendingResult<Self> {
        if outstanding_amount < 0 {
            return Err(corrupt("loans", id, format!("negative outstanding {outstanding_amount}")));
        }
        let derived = LoanStatus::for_outstanding(outstanding_amount);
        if derived != stored_status {
            return Err(corrupt(
                "loans",
                id,
                format!(
                    "status '{}' but outstanding {outstanding_amount} implies '{}'",
                    stored_status.as_str(),
                    derived.as_str()
                ),
            ));
        }
        Ok(Self {
            id,
            user_id,
            amount,
            currency_code,
            terms,
            outstanding_amount,
            status: derived,
            processed_at,
        })
    }

    pub fn outstanding_amount(&self) -> Amount {
        self.outstanding_amount
    }

    pub fn status(&self) -> LoanStatus {
        self.status
    }

    /// Replace the outstanding balance with a freshly computed aggregate.
    /// Returns true when anything changed.
    pub fn apply_outstanding(&mut self, outstanding: Amount) -> bool {
        let outstanding = outstanding.max(0);
        let status = LoanStatus::for_outstanding(outstanding);
        let changed = outstanding != self.outstanding_amount || status != self.status;
        self.outstanding_amount = outstanding;
        self.status = status;
        changed
    }
}

// ── Scheduled repayment ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ScheduledRepayment {
    pub id: RowId,
    pub loan_id: LoanId,
    pub amount: Amount,
    outstanding_amount: Amount,
    pub currency_code: String,
    pub due_date: NaiveDate,
    status: RepaymentStatus,
}

impl ScheduledRepayment {
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: RowId,
        loan_id: LoanId,
        amount: Amount,
        outstanding_amount: Amount,
        currency_code: String,
        due_date: NaiveDate,
        stored_status: RepaymentStatus,
    ) -> LendingResult<Self> {
        if outstanding_amount < 0 || outstanding_amount > amount {
            return Err(corrupt(
                "scheduled_repayments",
                id,
                format!("outstanding {outstanding_amount} outside 0..={amount}"),
            ));
        }
        let derived = RepaymentStatus::derive(amount, outstanding_amount);
        if derived != stored_status {
            return Err(corrupt(
                "scheduled_repayments",
                id,
                format!(
                    "status '{}' but balance {outstanding_amount}/{amount} implies '{}'",
                    stored_status.as_str(),
                    derived.as_str()
                ),
            ));
        }
        Ok(Self {
            id,
            loan_id,
            amount,
            outstanding_amount,
            currency_code,
            due_date,
            status: derived,
        })
    }

    pub fn outstanding_amount(&self) -> Amount {
        self.outstanding_amount
    }

    pub fn status(&self) -> RepaymentStatus {
        self.status
    }

    pub fn is_open(&self) -> bool {
        self.outstanding_amount > 0 && self.status != RepaymentStatus::Repaid
    }

    /// Settle as much of this installment as `available` covers.
    /// Returns the portion consumed, never more than the outstanding balance.
    pub fn settle(&mut self, available: Amount) -> Amount {
        let portion = available.clamp(0, self.outstanding_amount);
        self.outstanding_amount -= portion;
        self.status = RepaymentStatus::derive(self.amount, self.outstanding_amount);
        portion
    }
}

// ── Received repayment ─────────────────────────────────────────────

/// Append-only record of cash received against a loan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReceivedRepayment {
    pub id: RowId,
    pub loan_id: LoanId,
    pub amount: Amount,
    pub currency_code: String,
    pub received_at: NaiveDate,
}

// ── Requests and results ───────────────────────────────────────────

/// Input to loan origination.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewLoan {
    pub owner_id: UserId,
    pub amount: Amount,
    pub currency_code: String,
    pub terms: i64,
    pub processed_at: NaiveDate,
}

impl NewLoan {
    pub fn validate(&self) -> LendingResult<()> {
        if self.amount <= 0 {
            return Err(LendingError::validation(format!(
                "loan amount must be positive, got {}",
                self.amount
            )));
        }
        if self.terms <= 0 {
            return Err(LendingError::validation(format!(
                "loan terms must be positive, got {}",
                self.terms
            )));
        }
        validate_currency(&self.currency_code)
    }
}

/// Input to repayment allocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Repayment {
    pub loan_id: LoanId,
    pub amount: Amount,
    pub currency_code: String,
    pub received_at: NaiveDate,
}

impl Repayment {
    pub fn validate(&self) -> LendingResult<()> {
        if self.amount <= 0 {
            return Err(LendingError::validation(format!(
                "repayment amount must be positive, got {}",
                self.amount
            )));
        }
        validate_currency(&self.currency_code)
    }
}

/// A loan together with its full schedule in creation order.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LoanWithSchedule {
    pub loan: Loan,
    pub scheduled_repayments: Vec<ScheduledRepayment>,
}

impl LoanWithSchedule {
    pub fn scheduled_total(&self) -> Amount {
        self.scheduled_repayments.iter().map(|s| s.amount).sum()
    }
}

fn validate_currency(code: &str) -> LendingResult<()> {
    if code.trim().is_empty() {
        return Err(LendingError::validation("currency code must not be empty"));
    }
    Ok(())
}

fn corrupt(table: &'static str, id: RowId, reason: String) -> LendingError {
    LendingError::CorruptRow { table, id, reason }
}
