use thiserror::Error;

use crate::types::{LoanId, RowId};

#[derive(Error, Debug)]
pub enum LendingError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] rusqlite::Error),

    #[error("Loan {loan_id} not found")]
    LoanNotFound { loan_id: LoanId },

    #[error("Corrupt row {table}#{id}: {reason}")]
    CorruptRow {
        table: &'static str,
        id: RowId,
        reason: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LendingError {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }
}

pub type LendingResult<T> = Result<T, LendingError>;
