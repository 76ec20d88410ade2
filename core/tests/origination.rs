//! Integration tests for loan origination.
//!
//! A loan over N terms is persisted with N + 1 scheduled installments: N of
//! ceil(amount / N) and a trailing row of floor(amount / N), each due one
//! more calendar month after the processing date.

use chrono::NaiveDate;
use lending_core::{
    error::LendingError,
    event::LendingEvent,
    loan::{LoanStatus, NewLoan, RepaymentStatus},
    service::LoanService,
};

// ── Test helpers ────────────────────────────────────────────────────────────

fn service() -> LoanService {
    let _ = env_logger::builder().is_test(true).try_init();
    LoanService::build_test().expect("build_test failed")
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn new_loan(owner_id: i64, amount: i64, terms: i64, processed_at: NaiveDate) -> NewLoan {
    NewLoan {
        owner_id,
        amount,
        currency_code: "VND".into(),
        terms,
        processed_at,
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn five_thousand_over_three_terms() {
    let svc = service();
    let owner = svc.create_user("alice").unwrap();

    let created = svc
        .create_loan(&new_loan(owner, 5000, 3, date(2024, 1, 15)))
        .unwrap();

    assert_eq!(created.loan.user_id, owner);
    assert_eq!(created.loan.amount, 5000);
    assert_eq!(created.loan.terms, 3);
    assert_eq!(created.loan.outstanding_amount(), 5000);
    assert_eq!(created.loan.status(), LoanStatus::Due);
    assert_eq!(created.loan.processed_at, date(2024, 1, 15));

    let amounts: Vec<_> = created.scheduled_repayments.iter().map(|s| s.amount).collect();
    assert_eq!(amounts, vec![1667, 1667, 1667, 1666]);

    let due: Vec<_> = created
        .scheduled_repayments
        .iter()
        .map(|s| s.due_date)
        .collect();
    assert_eq!(
        due,
        vec![
            date(2024, 2, 15),
            date(2024, 3, 15),
            date(2024, 4, 15),
            date(2024, 5, 15),
        ]
    );

    for s in &created.scheduled_repayments {
        assert_eq!(s.outstanding_amount(), s.amount);
        assert_eq!(s.status(), RepaymentStatus::Due);
        assert_eq!(s.currency_code, "VND");
        assert_eq!(s.loan_id, created.loan.id);
    }
}

#[test]
fn schedule_always_has_terms_plus_one_rows() {
    let svc = service();
    let owner = svc.create_user("bob").unwrap();

    for (amount, terms) in [(1, 1), (100, 7), (3000, 3), (12_345, 12), (999_999, 36)] {
        let created = svc
            .create_loan(&new_loan(owner, amount, terms, date(2024, 3, 10)))
            .unwrap();
        let rows = &created.scheduled_repayments;
        assert_eq!(rows.len() as i64, terms + 1, "amount={amount} terms={terms}");

        let ceil = (amount + terms - 1) / terms;
        assert!(rows[..terms as usize].iter().all(|s| s.amount == ceil));
        assert_eq!(rows[terms as usize].amount, amount / terms);

        for (i, s) in rows.iter().enumerate() {
            let expected = date(2024, 3, 10)
                .checked_add_months(chrono::Months::new(i as u32 + 1))
                .unwrap();
            assert_eq!(s.due_date, expected);
        }
    }
}

#[test]
fn zero_terms_is_a_validation_error_and_writes_nothing() {
    let svc = service();
    let owner = svc.create_user("carol").unwrap();

    let err = svc
        .create_loan(&new_loan(owner, 5000, 0, date(2024, 1, 15)))
        .unwrap_err();
    assert!(matches!(err, LendingError::Validation(_)), "got {err:?}");

    assert_eq!(svc.store().loan_count().unwrap(), 0);
    assert_eq!(svc.store().scheduled_repayment_count().unwrap(), 0);
}

#[test]
fn non_positive_amount_is_rejected() {
    let svc = service();
    let owner = svc.create_user("dave").unwrap();

    for amount in [0, -10] {
        let err = svc
            .create_loan(&new_loan(owner, amount, 3, date(2024, 1, 15)))
            .unwrap_err();
        assert!(matches!(err, LendingError::Validation(_)));
    }
    assert_eq!(svc.store().loan_count().unwrap(), 0);
}

#[test]
fn oversized_principal_is_rejected_and_writes_nothing() {
    let svc = service();
    let owner = svc.create_user("erin").unwrap();

    let err = svc
        .create_loan(&new_loan(owner, i64::MAX, 2, date(2024, 1, 15)))
        .unwrap_err();
    assert!(matches!(err, LendingError::Validation(_)), "got {err:?}");

    assert_eq!(svc.store().loan_count().unwrap(), 0);
    assert_eq!(svc.store().scheduled_repayment_count().unwrap(), 0);
}

#[test]
fn unknown_owner_rolls_back_everything() {
    let svc = service();

    let err = svc
        .create_loan(&new_loan(4242, 5000, 3, date(2024, 1, 15)))
        .unwrap_err();
    assert!(matches!(err, LendingError::Persistence(_)), "got {err:?}");

    assert_eq!(svc.store().loan_count().unwrap(), 0);
    assert_eq!(svc.store().scheduled_repayment_count().unwrap(), 0);
}

#[test]
fn failing_installment_insert_discards_the_loan() {
    let svc = service();
    let owner = svc.create_user("erin").unwrap();
    svc.store()
        .connection()
        .execute_batch(
            "CREATE TRIGGER reject_last_row BEFORE INSERT ON scheduled_repayments
             WHEN NEW.due_date = '2024-05-15'
             BEGIN SELECT RAISE(ABORT, 'schedule rejected'); END;",
        )
        .unwrap();

    let err = svc
        .create_loan(&new_loan(owner, 5000, 3, date(2024, 1, 15)))
        .unwrap_err();
    assert!(matches!(err, LendingError::Persistence(_)));

    assert_eq!(svc.store().loan_count().unwrap(), 0);
    assert_eq!(svc.store().scheduled_repayment_count().unwrap(), 0);
}

#[test]
fn month_end_due_dates_are_clipped() {
    let svc = service();
    let owner = svc.create_user("frank").unwrap();

    let created = svc
        .create_loan(&new_loan(owner, 1000, 2, date(2023, 12, 31)))
        .unwrap();
    let due: Vec<_> = created
        .scheduled_repayments
        .iter()
        .map(|s| s.due_date)
        .collect();
    assert_eq!(due, vec![date(2024, 1, 31), date(2024, 2, 29), date(2024, 3, 31)]);
}

#[test]
fn zero_remainder_row_is_born_repaid() {
    let svc = service();
    let owner = svc.create_user("gina").unwrap();

    let created = svc
        .create_loan(&new_loan(owner, 2, 3, date(2024, 1, 1)))
        .unwrap();
    let last = created.scheduled_repayments.last().unwrap();
    assert_eq!(last.amount, 0);
    assert_eq!(last.status(), RepaymentStatus::Repaid);
    assert_eq!(created.loan.status(), LoanStatus::Due);
}

#[test]
fn creation_is_logged() {
    let svc = service();
    let owner = svc.create_user("hank").unwrap();
    let created = svc
        .create_loan(&new_loan(owner, 5000, 3, date(2024, 1, 15)))
        .unwrap();

    let events = svc.events(created.loan.id).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, "loan_created");
    match events[0].decode().unwrap() {
        LendingEvent::LoanCreated {
            installments,
            scheduled_total,
            ..
        } => {
            assert_eq!(installments, 4);
            assert_eq!(scheduled_total, 6667);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn owners_only_see_their_loans() {
    let svc = service();
    let alice = svc.create_user("alice").unwrap();
    let bob = svc.create_user("bob").unwrap();

    svc.create_loan(&new_loan(alice, 5000, 3, date(2024, 1, 15))).unwrap();
    svc.create_loan(&new_loan(alice, 800, 2, date(2024, 2, 1))).unwrap();
    svc.create_loan(&new_loan(bob, 100, 1, date(2024, 2, 1))).unwrap();

    let loans = svc.loans_for_owner(alice).unwrap();
    assert_eq!(loans.len(), 2);
    assert!(loans.iter().all(|l| l.user_id == alice));
    assert_eq!(svc.loans_for_owner(bob).unwrap().len(), 1);
    assert!(svc.store().user_exists(bob).unwrap());
    assert!(!svc.store().user_exists(bob + 100).unwrap());
}
