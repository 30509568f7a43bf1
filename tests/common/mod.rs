//! Shared in-memory SQL driver for integration tests
//!
//! Statements executed inside a transaction stay staged in a journal
//! and only land in `committed` on commit; statements executed without
//! a transaction commit immediately. Failures are triggered by SQL
//! substring so tests can fail a chosen statement.

use std::collections::HashMap;

use serde_json::Value;
use sqlgate::exec::{ConnHandle, ConnectTarget, DriverError, QueryRows, SqlDriver, TxHandle};

/// One executed statement: SQL text plus its arguments
pub type Recorded = (String, Vec<Value>);

#[derive(Default)]
pub struct MemoryDriver {
    next_id: u64,
    /// Statements visible after commit (or immediately, outside a tx)
    pub committed: Vec<Recorded>,
    /// Per-transaction journals, discarded on rollback
    pub staged: HashMap<u64, Vec<Recorded>>,
    /// Open/closed state per issued connection
    pub open: HashMap<u64, bool>,
    /// Fail any execute/query whose SQL contains this substring
    pub fail_contains: Option<String>,
    /// Fail every ping
    pub fail_ping: bool,
    /// Rows returned by the next query
    pub query_result: Option<QueryRows>,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when every connection handed out has been closed again
    pub fn all_closed(&self) -> bool {
        self.open.values().all(|open| !open)
    }

    fn check_fail(&self, sql: &str) -> Result<(), DriverError> {
        if let Some(needle) = &self.fail_contains {
            if sql.contains(needle.as_str()) {
                return Err(DriverError::new("forced failure"));
            }
        }
        Ok(())
    }
}

impl SqlDriver for MemoryDriver {
    fn acquire(&mut self, _target: &ConnectTarget) -> Result<ConnHandle, DriverError> {
        self.next_id += 1;
        self.open.insert(self.next_id, true);
        Ok(ConnHandle(self.next_id))
    }

    fn ping(&mut self, _conn: ConnHandle) -> Result<(), DriverError> {
        if self.fail_ping {
            return Err(DriverError::new("no route to host"));
        }
        Ok(())
    }

    fn begin(&mut self, _conn: ConnHandle) -> Result<TxHandle, DriverError> {
        self.next_id += 1;
        self.staged.insert(self.next_id, Vec::new());
        Ok(TxHandle(self.next_id))
    }

    fn execute(
        &mut self,
        _conn: ConnHandle,
        tx: Option<TxHandle>,
        sql: &str,
        args: &[Value],
    ) -> Result<u64, DriverError> {
        self.check_fail(sql)?;
        let record = (sql.to_string(), args.to_vec());
        match tx {
            Some(tx) => {
                if let Some(journal) = self.staged.get_mut(&tx.0) {
                    journal.push(record);
                }
            }
            None => self.committed.push(record),
        }
        Ok(1)
    }

    fn query(
        &mut self,
        _conn: ConnHandle,
        sql: &str,
        _args: &[Value],
    ) -> Result<QueryRows, DriverError> {
        self.check_fail(sql)?;
        Ok(self.query_result.take().unwrap_or_default())
    }

    fn commit(&mut self, tx: TxHandle) -> Result<(), DriverError> {
        if let Some(journal) = self.staged.remove(&tx.0) {
            self.committed.extend(journal);
        }
        Ok(())
    }

    fn rollback(&mut self, tx: TxHandle) -> Result<(), DriverError> {
        self.staged.remove(&tx.0);
        Ok(())
    }

    fn close(&mut self, conn: ConnHandle) {
        self.open.insert(conn.0, false);
    }
}
