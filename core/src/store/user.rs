use super::LoanStore;
use crate::{error::LendingResult, types::UserId};
use rusqlite::params;

impl LoanStore {
    // ── User ──────────────────────────────────────────────────────

    pub fn insert_user(&self, name: &str) -> LendingResult<UserId> {
        self.conn
            .execute("INSERT INTO users (name) VALUES (?1)", params![name])?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn user_exists(&self, user_id: UserId) -> LendingResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM users WHERE id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}
