//! Loan origination and repayment allocation.
//!
//! Each mutating operation is one immediate SQLite transaction: the receipt,
//! every touched installment, the loan aggregate and the operation events
//! commit together or not at all.

use crate::{
    allocation::allocate,
    error::{LendingError, LendingResult},
    event::{EventLogEntry, LendingEvent},
    loan::{Loan, LoanWithSchedule, NewLoan, ReceivedRepayment, Repayment},
    schedule::build_schedule,
    store::LoanStore,
    types::{LoanId, UserId},
};

pub struct LoanService {
    store: LoanStore,
}

impl LoanService {
    pub fn new(store: LoanStore) -> Self {
        Self { store }
    }

    /// Build a service over a fresh, migrated in-memory database.
    pub fn build_test() -> LendingResult<Self> {
        let store = LoanStore::in_memory()?;
        store.migrate()?;
        Ok(Self::new(store))
    }

    pub fn store(&self) -> &LoanStore {
        &self.store
    }

    pub fn create_user(&self, name: &str) -> LendingResult<UserId> {
        self.store.insert_user(name)
    }

    /// Create a loan and its full repayment schedule.
    pub fn create_loan(&self, request: &NewLoan) -> LendingResult<LoanWithSchedule> {
        request.validate()?;
        let schedule = build_schedule(request.amount, request.terms, request.processed_at)?;
        let scheduled_total = schedule.total;
        let plans = &schedule.installments;

        let tx = self.store.begin_write()?;

        let loan_id = self.store.insert_loan(request)?;
        self.store
            .insert_scheduled_repayments(loan_id, &request.currency_code, plans)?;
        self.record(&LendingEvent::LoanCreated {
            loan_id,
            user_id: request.owner_id,
            amount: request.amount,
            currency_code: request.currency_code.clone(),
            terms: request.terms,
            installments: plans.len(),
            scheduled_total,
        })?;
        let created = self.load_with_schedule(loan_id)?;

        tx.commit()?;

        log::info!(
            "loan={loan_id} created: owner={} amount={} {} terms={} installments={} scheduled_total={scheduled_total}",
            request.owner_id,
            request.amount,
            request.currency_code,
            request.terms,
            plans.len(),
        );
        Ok(created)
    }

    /// Record a received payment and allocate it across open installments,
    /// earliest due first.
    pub fn repay_loan(&self, request: &Repayment) -> LendingResult<LoanWithSchedule> {
        request.validate()?;

        let tx = self.store.begin_write()?;

        let mut loan = self
            .store
            .loan_by_id(request.loan_id)?
            .ok_or(LendingError::LoanNotFound {
                loan_id: request.loan_id,
            })?;
        if loan.currency_code != request.currency_code {
            log::warn!(
                "loan={} repayment in {} against a {} loan; recorded as received",
                loan.id,
                request.currency_code,
                loan.currency_code
            );
        }

        let received_repayment_id = self.store.insert_received_repayment(request)?;
        self.record(&LendingEvent::RepaymentReceived {
            loan_id: loan.id,
            received_repayment_id,
            amount: request.amount,
            currency_code: request.currency_code.clone(),
            received_at: request.received_at,
        })?;

        let mut open = self.store.open_scheduled_repayments(loan.id)?;
        let allocation = allocate(&mut open, request.amount);

        for installment in open.iter().filter(|s| allocation.touched(s.id)) {
            self.store.update_scheduled_repayment(installment)?;
        }
        for portion in &allocation.applied {
            log::debug!(
                "loan={} installment={} applied={} outstanding_after={} status={}",
                loan.id,
                portion.scheduled_repayment_id,
                portion.applied,
                portion.outstanding_after,
                portion.status_after.as_str(),
            );
            self.record(&LendingEvent::InstallmentAllocated {
                loan_id: loan.id,
                scheduled_repayment_id: portion.scheduled_repayment_id,
                applied: portion.applied,
                outstanding_after: portion.outstanding_after,
                status: portion.status_after,
            })?;
        }

        self.refresh_outstanding(&mut loan)?;
        self.record(&LendingEvent::LoanOutstandingRecomputed {
            loan_id: loan.id,
            outstanding_amount: loan.outstanding_amount(),
            status: loan.status(),
            unapplied: allocation.unapplied,
        })?;
        let refreshed = self.load_with_schedule(loan.id)?;

        tx.commit()?;

        if allocation.unapplied > 0 {
            log::warn!(
                "loan={} repayment={received_repayment_id}: {} exceeds what was owed and was dropped",
                loan.id,
                allocation.unapplied
            );
        }
        log::info!(
            "loan={} repaid {} {}: applied={} outstanding={} status={}",
            loan.id,
            request.amount,
            request.currency_code,
            allocation.total_applied(),
            loan.outstanding_amount(),
            loan.status().as_str(),
        );
        Ok(refreshed)
    }

    /// Recompute the loan aggregate from its schedule without taking a payment.
    /// Running it again without new payments changes nothing.
    ///
    /// A loan that has never received a payment still carries its principal
    /// as outstanding and is returned untouched; the schedule sum only takes
    /// over once the allocator has run.
    pub fn recompute_outstanding(&self, loan_id: LoanId) -> LendingResult<Loan> {
        let tx = self.store.begin_write()?;

        let mut loan = self
            .store
            .loan_by_id(loan_id)?
            .ok_or(LendingError::LoanNotFound { loan_id })?;
        if self.store.received_repayment_count(loan_id)? == 0 {
            return Ok(loan);
        }
        let changed = self.refresh_outstanding(&mut loan)?;
        if changed {
            self.record(&LendingEvent::LoanOutstandingRecomputed {
                loan_id,
                outstanding_amount: loan.outstanding_amount(),
                status: loan.status(),
                unapplied: 0,
            })?;
        }

        tx.commit()?;
        Ok(loan)
    }

    // ── Read side ─────────────────────────────────────────────────

    pub fn loan(&self, loan_id: LoanId) -> LendingResult<LoanWithSchedule> {
        self.load_with_schedule(loan_id)
    }

    pub fn loans_for_owner(&self, user_id: UserId) -> LendingResult<Vec<Loan>> {
        self.store.loans_for_user(user_id)
    }

    pub fn received_repayments(&self, loan_id: LoanId) -> LendingResult<Vec<ReceivedRepayment>> {
        self.store.received_repayments_for_loan(loan_id)
    }

    pub fn events(&self, loan_id: LoanId) -> LendingResult<Vec<EventLogEntry>> {
        self.store.events_for_loan(loan_id)
    }

    // ── Internals ─────────────────────────────────────────────────

    /// Replace the loan's outstanding balance with the sum still owed on its
    /// unpaid installments and persist it. Returns true when it changed.
    fn refresh_outstanding(&self, loan: &mut Loan) -> LendingResult<bool> {
        let outstanding = self.store.outstanding_sum_for_loan(loan.id)?;
        let changed = loan.apply_outstanding(outstanding);
        self.store.update_loan_outstanding(loan)?;
        Ok(changed)
    }

    fn load_with_schedule(&self, loan_id: LoanId) -> LendingResult<LoanWithSchedule> {
        let loan = self
            .store
            .loan_by_id(loan_id)?
            .ok_or(LendingError::LoanNotFound { loan_id })?;
        let scheduled_repayments = self.store.scheduled_repayments_for_loan(loan_id)?;
        Ok(LoanWithSchedule {
            loan,
            scheduled_repayments,
        })
    }

    fn record(&self, event: &LendingEvent) -> LendingResult<()> {
        self.store.append_event(&EventLogEntry::from_event(event)?)
    }
}
