use super::LoanStore;
use crate::{
    error::{LendingError, LendingResult},
    loan::{Loan, LoanStatus, NewLoan},
    types::{Amount, LoanId, UserId},
};
use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};

/// Columns exactly as stored; status is still an unchecked string.
struct LoanRow {
    id: LoanId,
    user_id: UserId,
    amount: Amount,
    currency_code: String,
    terms: i64,
    outstanding_amount: Amount,
    status: String,
    processed_at: NaiveDate,
}

const LOAN_COLUMNS: &str =
    "id, user_id, amount, currency_code, terms, outstanding_amount, status, processed_at";

impl LoanRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            amount: row.get(2)?,
            currency_code: row.get(3)?,
            terms: row.get(4)?,
            outstanding_amount: row.get(5)?,
            status: row.get(6)?,
            processed_at: row.get(7)?,
        })
    }

    fn into_loan(self) -> LendingResult<Loan> {
        let status = LoanStatus::parse(&self.status).ok_or_else(|| LendingError::CorruptRow {
            table: "loans",
            id: self.id,
            reason: format!("unknown status '{}'", self.status),
        })?;
        Loan::restore(
            self.id,
            self.user_id,
            self.amount,
            self.currency_code,
            self.terms,
            self.outstanding_amount,
            status,
            self.processed_at,
        )
    }
}

impl LoanStore {
    // ── Loan ──────────────────────────────────────────────────────

    /// Insert a fresh loan: the whole principal is outstanding.
    pub fn insert_loan(&self, request: &NewLoan) -> LendingResult<LoanId> {
        self.conn.execute(
            "INSERT INTO loans (user_id, amount, terms, outstanding_amount, currency_code, processed_at, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                request.owner_id,
                request.amount,
                request.terms,
                request.amount,
                &request.currency_code,
                request.processed_at,
                LoanStatus::for_outstanding(request.amount).as_str(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn loan_by_id(&self, loan_id: LoanId) -> LendingResult<Option<Loan>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {LOAN_COLUMNS} FROM loans WHERE id = ?1"),
                params![loan_id],
                LoanRow::from_row,
            )
            .optional()?;
        row.map(LoanRow::into_loan).transpose()
    }

    pub fn loans_for_user(&self, user_id: UserId) -> LendingResult<Vec<Loan>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {LOAN_COLUMNS} FROM loans WHERE user_id = ?1 ORDER BY id ASC"
        ))?;
        let rows = stmt
            .query_map(params![user_id], LoanRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(LoanRow::into_loan).collect()
    }

    pub fn update_loan_outstanding(&self, loan: &Loan) -> LendingResult<()> {
        let changed = self.conn.execute(
            "UPDATE loans SET outstanding_amount = ?1, status = ?2, updated_at = CURRENT_TIMESTAMP
             WHERE id = ?3",
            params![loan.outstanding_amount(), loan.status().as_str(), loan.id],
        )?;
        if changed == 0 {
            return Err(LendingError::LoanNotFound { loan_id: loan.id });
        }
        Ok(())
    }

    /// Sum of what is still owed on the loan's unpaid installments.
    pub fn outstanding_sum_for_loan(&self, loan_id: LoanId) -> LendingResult<Amount> {
        let sum: Amount = self.conn.query_row(
            "SELECT COALESCE(SUM(outstanding_amount), 0) FROM scheduled_repayments
             WHERE loan_id = ?1 AND status != 'repaid'",
            params![loan_id],
            |row| row.get(0),
        )?;
        Ok(sum)
    }

    // ── Test / summary helpers ────────────────────────────────────

    pub fn loan_count(&self) -> LendingResult<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM loans", [], |row| row.get(0))?;
        Ok(count)
    }
}
