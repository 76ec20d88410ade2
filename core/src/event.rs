//! The operation log.
//!
//! RULE: every committed change to a loan is described by events written in
//! the same transaction. A rolled-back operation leaves no event behind.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    error::LendingResult,
    loan::{LoanStatus, RepaymentStatus},
    types::{Amount, LoanId, RowId, UserId},
};

/// Variants are only ever appended, never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LendingEvent {
    LoanCreated {
        loan_id: LoanId,
        user_id: UserId,
        amount: Amount,
        currency_code: String,
        terms: i64,
        installments: usize,
        scheduled_total: Amount,
    },
    RepaymentReceived {
        loan_id: LoanId,
        received_repayment_id: RowId,
        amount: Amount,
        currency_code: String,
        received_at: NaiveDate,
    },
    InstallmentAllocated {
        loan_id: LoanId,
        scheduled_repayment_id: RowId,
        applied: Amount,
        outstanding_after: Amount,
        status: RepaymentStatus,
    },
    LoanOutstandingRecomputed {
        loan_id: LoanId,
        outstanding_amount: Amount,
        status: LoanStatus,
        unapplied: Amount,
    },
}

impl LendingEvent {
    pub fn loan_id(&self) -> LoanId {
        match self {
            Self::LoanCreated { loan_id, .. }
            | Self::RepaymentReceived { loan_id, .. }
            | Self::InstallmentAllocated { loan_id, .. }
            | Self::LoanOutstandingRecomputed { loan_id, .. } => *loan_id,
        }
    }

    /// Stable name stored in the event_type column.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::LoanCreated { .. }               => "loan_created",
            Self::RepaymentReceived { .. }         => "repayment_received",
            Self::InstallmentAllocated { .. }      => "installment_allocated",
            Self::LoanOutstandingRecomputed { .. } => "loan_outstanding_recomputed",
        }
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: Option<i64>,
    pub loan_id: LoanId,
    pub event_type: String,
    pub payload: String, // JSON-serialized LendingEvent
}

impl EventLogEntry {
    pub fn from_event(event: &LendingEvent) -> LendingResult<Self> {
        Ok(Self {
            id: None,
            loan_id: event.loan_id(),
            event_type: event.type_name().to_string(),
            payload: serde_json::to_string(event)?,
        })
    }

    pub fn decode(&self) -> LendingResult<LendingEvent> {
        Ok(serde_json::from_str(&self.payload)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_is_tagged_with_type_name() {
        let event = LendingEvent::LoanOutstandingRecomputed {
            loan_id: 4,
            outstanding_amount: 0,
            status: LoanStatus::Repaid,
            unapplied: 12,
        };
        let entry = EventLogEntry::from_event(&event).unwrap();
        assert_eq!(entry.loan_id, 4);
        assert_eq!(entry.event_type, "loan_outstanding_recomputed");
        assert!(entry.payload.contains("\"type\":\"loan_outstanding_recomputed\""));
        assert!(entry.payload.contains("\"status\":\"repaid\""));
        assert_eq!(entry.decode().unwrap(), event);
    }
}
