use super::LoanStore;
use crate::{
    error::{LendingError, LendingResult},
    loan::{RepaymentStatus, ScheduledRepayment},
    schedule::InstallmentPlan,
    types::{Amount, LoanId, RowId},
};
use chrono::NaiveDate;
use rusqlite::{params, Row};

struct ScheduledRepaymentRow {
    id: RowId,
    loan_id: LoanId,
    amount: Amount,
    outstanding_amount: Amount,
    currency_code: String,
    due_date: NaiveDate,
    status: String,
}

const SCHEDULED_COLUMNS: &str =
    "id, loan_id, amount, outstanding_amount, currency_code, due_date, status";

impl ScheduledRepaymentRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            loan_id: row.get(1)?,
            amount: row.get(2)?,
            outstanding_amount: row.get(3)?,
            currency_code: row.get(4)?,
            due_date: row.get(5)?,
            status: row.get(6)?,
        })
    }

    fn into_scheduled(self) -> LendingResult<ScheduledRepayment> {
        let status =
            RepaymentStatus::parse(&self.status).ok_or_else(|| LendingError::CorruptRow {
                table: "scheduled_repayments",
                id: self.id,
                reason: format!("unknown status '{}'", self.status),
            })?;
        ScheduledRepayment::restore(
            self.id,
            self.loan_id,
            self.amount,
            self.outstanding_amount,
            self.currency_code,
            self.due_date,
            status,
        )
    }
}

impl LoanStore {
    // ── Scheduled repayment ───────────────────────────────────────

    /// Insert the whole schedule through one prepared statement.
    /// Call inside `begin_write()` so the rows land together or not at all.
    pub fn insert_scheduled_repayments(
        &self,
        loan_id: LoanId,
        currency_code: &str,
        plans: &[InstallmentPlan],
    ) -> LendingResult<()> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO scheduled_repayments (loan_id, amount, outstanding_amount, currency_code, due_date, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for plan in plans {
            stmt.execute(params![
                loan_id,
                plan.amount,
                plan.amount,
                currency_code,
                plan.due_date,
                RepaymentStatus::derive(plan.amount, plan.amount).as_str(),
            ])?;
        }
        Ok(())
    }

    /// The full schedule in creation order.
    pub fn scheduled_repayments_for_loan(
        &self,
        loan_id: LoanId,
    ) -> LendingResult<Vec<ScheduledRepayment>> {
        self.query_scheduled(
            &format!(
                "SELECT {SCHEDULED_COLUMNS} FROM scheduled_repayments
                 WHERE loan_id = ?1 ORDER BY id ASC"
            ),
            loan_id,
        )
    }

    /// Installments still owing money, in waterfall order.
    pub fn open_scheduled_repayments(
        &self,
        loan_id: LoanId,
    ) -> LendingResult<Vec<ScheduledRepayment>> {
        self.query_scheduled(
            &format!(
                "SELECT {SCHEDULED_COLUMNS} FROM scheduled_repayments
                 WHERE loan_id = ?1 AND outstanding_amount > 0 AND status != 'repaid'
                 ORDER BY due_date ASC, id ASC"
            ),
            loan_id,
        )
    }

    pub fn update_scheduled_repayment(&self, installment: &ScheduledRepayment) -> LendingResult<()> {
        self.conn.execute(
            "UPDATE scheduled_repayments
             SET outstanding_amount = ?1, status = ?2, updated_at = CURRENT_TIMESTAMP
             WHERE id = ?3",
            params![
                installment.outstanding_amount(),
                installment.status().as_str(),
                installment.id,
            ],
        )?;
        Ok(())
    }

    fn query_scheduled(
        &self,
        sql: &str,
        loan_id: LoanId,
    ) -> LendingResult<Vec<ScheduledRepayment>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params![loan_id], ScheduledRepaymentRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(ScheduledRepaymentRow::into_scheduled)
            .collect()
    }

    // ── Test / summary helpers ────────────────────────────────────

    pub fn scheduled_repayment_count(&self) -> LendingResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM scheduled_repayments",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
