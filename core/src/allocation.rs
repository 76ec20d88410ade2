//! Waterfall allocation of a received payment across open installments.
//!
//! The earliest-due installment is settled in full before the next one is
//! touched. Installments sharing a due date are consumed in row id order.
//! Whatever is left once every open installment is settled is reported as
//! `unapplied` and is not carried anywhere.

use crate::{
    loan::{RepaymentStatus, ScheduledRepayment},
    types::{Amount, RowId},
};

/// The part of a payment that landed on one installment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedPortion {
    pub scheduled_repayment_id: RowId,
    pub applied: Amount,
    pub outstanding_after: Amount,
    pub status_after: RepaymentStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Allocation {
    pub applied: Vec<AppliedPortion>,
    pub unapplied: Amount,
}

impl Allocation {
    pub fn total_applied(&self) -> Amount {
        self.applied.iter().map(|p| p.applied).sum()
    }

    pub fn touched(&self, scheduled_repayment_id: RowId) -> bool {
        self.applied
            .iter()
            .any(|p| p.scheduled_repayment_id == scheduled_repayment_id)
    }
}

/// Walk `installments` in waterfall order, settling them with `amount_received`.
///
/// The slice is sorted in place by (due date, id) and settled installments are
/// mutated in place; `Allocation::touched` tells which ones need writing back.
pub fn allocate(installments: &mut [ScheduledRepayment], amount_received: Amount) -> Allocation {
    installments.sort_by_key(|s| (s.due_date, s.id));

    let mut remaining = amount_received;
    let mut applied = Vec::new();

    for installment in installments.iter_mut() {
        if remaining <= 0 {
            break;
        }
        if !installment.is_open() {
            continue;
        }
        let portion = installment.settle(remaining);
        remaining -= portion;
        applied.push(AppliedPortion {
            scheduled_repayment_id: installment.id,
            applied: portion,
            outstanding_after: installment.outstanding_amount(),
            status_after: installment.status(),
        });
    }

    Allocation {
        applied,
        unapplied: remaining.max(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn open(id: RowId, amount: Amount, due: (i32, u32, u32)) -> ScheduledRepayment {
        ScheduledRepayment::restore(
            id,
            1,
            amount,
            amount,
            "VND".into(),
            NaiveDate::from_ymd_opt(due.0, due.1, due.2).unwrap(),
            RepaymentStatus::Due,
        )
        .unwrap()
    }

    fn schedule() -> Vec<ScheduledRepayment> {
        vec![
            open(1, 1667, (2024, 2, 15)),
            open(2, 1667, (2024, 3, 15)),
            open(3, 1667, (2024, 4, 15)),
            open(4, 1666, (2024, 5, 15)),
        ]
    }

    #[test]
    fn payment_spills_into_next_installment() {
        let mut rows = schedule();
        let allocation = allocate(&mut rows, 2000);

        assert_eq!(allocation.applied.len(), 2);
        assert_eq!(allocation.unapplied, 0);
        assert_eq!(rows[0].status(), RepaymentStatus::Repaid);
        assert_eq!(rows[1].outstanding_amount(), 1334);
        assert_eq!(rows[1].status(), RepaymentStatus::Partial);
        assert_eq!(rows[2].status(), RepaymentStatus::Due);
    }

    #[test]
    fn excess_is_reported_not_applied() {
        let mut rows = schedule();
        let allocation = allocate(&mut rows, 10_000);

        assert_eq!(allocation.total_applied(), 6667);
        assert_eq!(allocation.unapplied, 3333);
        assert!(rows.iter().all(|r| r.status() == RepaymentStatus::Repaid));
    }

    #[test]
    fn unsorted_input_is_walked_by_due_date_then_id() {
        let mut rows = vec![
            open(9, 100, (2024, 3, 1)),
            open(5, 100, (2024, 2, 1)),
            open(3, 100, (2024, 2, 1)),
        ];
        let allocation = allocate(&mut rows, 150);

        let ids: Vec<_> = allocation
            .applied
            .iter()
            .map(|p| p.scheduled_repayment_id)
            .collect();
        assert_eq!(ids, vec![3, 5]);
        assert_eq!(rows[1].outstanding_amount(), 50);
        assert_eq!(rows[2].status(), RepaymentStatus::Due);
    }

    #[test]
    fn nothing_open_applies_nothing() {
        let mut rows = schedule();
        allocate(&mut rows, 6667);
        let second = allocate(&mut rows, 500);
        assert!(second.applied.is_empty());
        assert_eq!(second.unapplied, 500);
    }
}
