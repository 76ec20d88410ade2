use super::LoanStore;
use crate::{error::LendingResult, event::EventLogEntry, types::LoanId};
use rusqlite::params;

impl LoanStore {
    // ── Event log ─────────────────────────────────────────────────

    pub fn append_event(&self, entry: &EventLogEntry) -> LendingResult<()> {
        self.conn.execute(
            "INSERT INTO event_log (loan_id, event_type, payload) VALUES (?1, ?2, ?3)",
            params![entry.loan_id, entry.event_type, entry.payload],
        )?;
        Ok(())
    }

    pub fn events_for_loan(&self, loan_id: LoanId) -> LendingResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, loan_id, event_type, payload
             FROM event_log WHERE loan_id = ?1
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![loan_id], |row| {
                Ok(EventLogEntry {
                    id: Some(row.get(0)?),
                    loan_id: row.get(1)?,
                    event_type: row.get(2)?,
                    payload: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}
