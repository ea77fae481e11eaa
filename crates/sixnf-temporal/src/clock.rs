//! Transaction time.
//!
//! One timestamp per transaction, drawn from the engine's clock on first use
//! and shared by every statement and savepoint inside it. Timestamps of
//! successive transactions on the same engine are strictly increasing.

use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use sixnf_core::errors::{SixnfResult, StorageError};
use sixnf_core::models::Timestamp;
use sixnf_core::traits::ISqlEngine;

#[derive(Debug, Default)]
struct ClockState {
    savepoints: Vec<String>,
    in_transaction: bool,
    /// The outermost savepoint opened the transaction (no BEGIN).
    started_by_savepoint: bool,
    current: Option<Timestamp>,
    last: Option<Timestamp>,
}

impl ClockState {
    fn end_transaction(&mut self) {
        self.savepoints.clear();
        self.in_transaction = false;
        self.started_by_savepoint = false;
        self.current = None;
    }
}

#[derive(Debug, Default)]
pub struct TransactionClock {
    state: Mutex<ClockState>,
}

impl TransactionClock {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> SixnfResult<MutexGuard<'_, ClockState>> {
        self.state
            .lock()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()).into())
    }

    pub fn begin(&self) -> SixnfResult<()> {
        let mut state = self.lock()?;
        state.end_transaction();
        state.in_transaction = true;
        Ok(())
    }

    pub fn savepoint(&self, name: &str) -> SixnfResult<()> {
        let mut state = self.lock()?;
        if !state.in_transaction {
            state.end_transaction();
            state.in_transaction = true;
            state.started_by_savepoint = true;
        }
        state.savepoints.push(name.to_string());
        Ok(())
    }

    /// Release `name` and every savepoint opened after it. Returns whether the
    /// release ended the transaction.
    pub fn release(&self, name: &str) -> SixnfResult<bool> {
        let mut state = self.lock()?;
        let Some(position) = find(&state.savepoints, name) else {
            return Ok(false);
        };
        state.savepoints.truncate(position);
        let ended = state.savepoints.is_empty() && state.started_by_savepoint;
        if ended {
            state.end_transaction();
        }
        Ok(ended)
    }

    /// Undo back to `name`; the savepoint itself stays open.
    pub fn rollback_to(&self, name: &str) -> SixnfResult<()> {
        let mut state = self.lock()?;
        if let Some(position) = find(&state.savepoints, name) {
            state.savepoints.truncate(position + 1);
        }
        Ok(())
    }

    pub fn commit(&self) -> SixnfResult<()> {
        self.lock()?.end_transaction();
        Ok(())
    }

    pub fn rollback(&self) -> SixnfResult<()> {
        self.lock()?.end_transaction();
        Ok(())
    }

    pub fn in_transaction(&self) -> SixnfResult<bool> {
        Ok(self.lock()?.in_transaction)
    }

    /// The current transaction's timestamp.
    ///
    /// Outside a transaction every call draws a fresh timestamp.
    pub fn now(&self, engine: &dyn ISqlEngine) -> SixnfResult<Timestamp> {
        let autocommit = engine.is_autocommit()?;
        let mut state = self.lock()?;
        if autocommit {
            // The engine left the transaction behind our back (e.g. a COMMIT we never saw).
            state.end_transaction();
        } else if let Some(current) = state.current {
            return Ok(current);
        }

        let mut now = engine.now()?;
        if let Some(last) = state.last {
            if now <= last {
                now = last.next_millisecond();
            }
        }
        state.last = Some(now);
        if !autocommit {
            state.in_transaction = true;
            state.current = Some(now);
        }
        debug!(%now, "transaction time drawn");
        Ok(now)
    }
}

/// Position of the most recent savepoint named `name` (case-insensitive, like SQLite).
fn find(savepoints: &[String], name: &str) -> Option<usize> {
    savepoints.iter().rposition(|s| s.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sixnf_storage::SqliteEngine;

    #[test]
    fn one_timestamp_per_transaction() {
        let engine = SqliteEngine::open_in_memory().unwrap();
        let clock = TransactionClock::new();

        engine.begin().unwrap();
        clock.begin().unwrap();
        let first = clock.now(&engine).unwrap();
        clock.savepoint("a").unwrap();
        assert_eq!(clock.now(&engine).unwrap(), first);
        clock.release("a").unwrap();
        assert_eq!(clock.now(&engine).unwrap(), first);
        engine.commit().unwrap();
        clock.commit().unwrap();

        engine.begin().unwrap();
        clock.begin().unwrap();
        assert!(clock.now(&engine).unwrap() > first);
        engine.rollback().unwrap();
        clock.rollback().unwrap();
    }

    #[test]
    fn autocommit_calls_are_strictly_increasing() {
        let engine = SqliteEngine::open_in_memory().unwrap();
        let clock = TransactionClock::new();
        let mut previous = clock.now(&engine).unwrap();
        for _ in 0..20 {
            let next = clock.now(&engine).unwrap();
            assert!(next > previous);
            previous = next;
        }
    }

    #[test]
    fn outermost_savepoint_release_ends_transaction() {
        let clock = TransactionClock::new();
        clock.savepoint("outer").unwrap();
        clock.savepoint("inner").unwrap();
        assert!(!clock.release("INNER").unwrap());
        assert!(clock.in_transaction().unwrap());
        assert!(clock.release("outer").unwrap());
        assert!(!clock.in_transaction().unwrap());
    }

    #[test]
    fn savepoint_inside_begin_keeps_transaction() {
        let clock = TransactionClock::new();
        clock.begin().unwrap();
        clock.savepoint("s").unwrap();
        clock.rollback_to("s").unwrap();
        assert!(!clock.release("s").unwrap());
        assert!(clock.in_transaction().unwrap());
    }
}
