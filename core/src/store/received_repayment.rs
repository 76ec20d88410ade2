use super::LoanStore;
use crate::{
    error::LendingResult,
    loan::{ReceivedRepayment, Repayment},
    types::{LoanId, RowId},
};
use rusqlite::params;

impl LoanStore {
    // ── Received repayment ────────────────────────────────────────

    /// Append a receipt. Receipts are never updated or deleted.
    pub fn insert_received_repayment(&self, repayment: &Repayment) -> LendingResult<RowId> {
        self.conn.execute(
            "INSERT INTO received_repayments (loan_id, amount, currency_code, received_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                repayment.loan_id,
                repayment.amount,
                &repayment.currency_code,
                repayment.received_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn received_repayments_for_loan(
        &self,
        loan_id: LoanId,
    ) -> LendingResult<Vec<ReceivedRepayment>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, loan_id, amount, currency_code, received_at
             FROM received_repayments WHERE loan_id = ?1
             ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![loan_id], |row| {
            Ok(ReceivedRepayment {
                id: row.get(0)?,
                loan_id: row.get(1)?,
                amount: row.get(2)?,
                currency_code: row.get(3)?,
                received_at: row.get(4)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ── Test / summary helpers ────────────────────────────────────

    pub fn received_repayment_count(&self, loan_id: LoanId) -> LendingResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM received_repayments WHERE loan_id = ?1",
            params![loan_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
