//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The service calls store methods — it never executes SQL directly.
//!
//! Writes are grouped by the caller under `begin_write()`. The returned
//! guard rolls back when dropped without `commit()`, so every early return,
//! `?` and panic leaves the database untouched.

use std::time::Duration;

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::{config::LendingConfig, error::LendingResult};

mod event_log;
mod loan;
mod received_repayment;
mod scheduled_repayment;
mod user;

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5_000);

pub struct LoanStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl LoanStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: &str) -> LendingResult<Self> {
        Self::open_with(path, true, DEFAULT_BUSY_TIMEOUT)
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> LendingResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    /// Open the database described by `config`.
    pub fn from_config(config: &LendingConfig) -> LendingResult<Self> {
        if config.database_path == ":memory:" {
            let store = Self::in_memory()?;
            store
                .conn
                .busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
            return Ok(store);
        }
        Self::open_with(
            &config.database_path,
            config.journal_mode_wal,
            Duration::from_millis(config.busy_timeout_ms),
        )
    }

    fn open_with(path: &str, wal: bool, busy_timeout: Duration) -> LendingResult<Self> {
        let conn = Connection::open(path)?;
        if wal {
            // journal_mode answers with a row; execute_batch discards it.
            conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        }
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.busy_timeout(busy_timeout)?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open a second connection to the same database.
    /// For in-memory databases this returns a new, isolated database.
    pub fn reopen(&self) -> LendingResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> LendingResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_lending.sql"))?;
        Ok(())
    }

    /// Start a write transaction that holds the database write lock from the
    /// first statement on, so concurrent writers on the same loan serialize
    /// instead of interleaving their read-modify-write cycles.
    pub fn begin_write(&self) -> LendingResult<Transaction<'_>> {
        Ok(Transaction::new_unchecked(
            &self.conn,
            TransactionBehavior::Immediate,
        )?)
    }

    /// Raw connection, for tests and tooling only.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}
