//! Lending back-office core: loan origination with a monthly amortization
//! schedule, and waterfall allocation of received repayments.
//!
//! RULE: Only the store module executes SQL.
//! The service owns transaction boundaries; allocation and scheduling are pure.

pub mod allocation;
pub mod config;
pub mod error;
pub mod event;
pub mod loan;
pub mod schedule;
pub mod service;
pub mod store;
pub mod types;
