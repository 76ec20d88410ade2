//! Shared primitive types used across the lending core.

/// A money amount in integer minor units of the loan's currency.
pub type Amount = i64;

/// Primary key of a row in `loans`.
pub type LoanId = i64;

/// Primary key of a row in `users`.
pub type UserId = i64;

/// Primary key of any other persisted row.
pub type RowId = i64;
