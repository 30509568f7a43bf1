//! External SQL driver contract
//!
//! The coordinator never talks to a database directly; everything goes
//! through this narrow trait. Handles are driver-issued opaque ids, and
//! every acquired connection is closed on every exit path.

use serde_json::{Map, Value};
use thiserror::Error;

use super::config::ConnectTarget;

/// Opaque connection handle issued by a driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnHandle(pub u64);

/// Opaque transaction handle issued by a driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxHandle(pub u64);

/// A failure reported by the driver, surfaced verbatim
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct DriverError(pub String);

impl DriverError {
    /// Creates a driver error from any message
    pub fn new(detail: impl Into<String>) -> Self {
        Self(detail.into())
    }
}

/// Rows returned by a query: column names plus value rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRows {
    /// Column names in select order
    pub columns: Vec<String>,
    /// Rows, each aligned with `columns`
    pub rows: Vec<Vec<Value>>,
}

impl QueryRows {
    /// The first row as a column-name to value map, if any
    pub fn first_map(&self) -> Option<Map<String, Value>> {
        self.rows.first().map(|row| self.zip(row))
    }

    /// Every row as a column-name to value map
    pub fn maps(&self) -> Vec<Map<String, Value>> {
        self.rows.iter().map(|row| self.zip(row)).collect()
    }

    fn zip(&self, row: &[Value]) -> Map<String, Value> {
        self.columns
            .iter()
            .cloned()
            .zip(row.iter().cloned())
            .collect()
    }
}

/// The external SQL execution collaborator.
///
/// `execute` runs a statement either directly on the connection
/// (implicit commit) or inside the given transaction.
pub trait SqlDriver {
    /// Opens a connection to the given target
    fn acquire(&mut self, target: &ConnectTarget) -> Result<ConnHandle, DriverError>;

    /// Liveness check; performed before each unit of work
    fn ping(&mut self, conn: ConnHandle) -> Result<(), DriverError>;

    /// Begins a transaction on the connection
    fn begin(&mut self, conn: ConnHandle) -> Result<TxHandle, DriverError>;

    /// Executes a statement, returning the affected row count
    fn execute(
        &mut self,
        conn: ConnHandle,
        tx: Option<TxHandle>,
        sql: &str,
        args: &[Value],
    ) -> Result<u64, DriverError>;

    /// Runs a query, returning its rows
    fn query(&mut self, conn: ConnHandle, sql: &str, args: &[Value])
        -> Result<QueryRows, DriverError>;

    /// Commits a transaction
    fn commit(&mut self, tx: TxHandle) -> Result<(), DriverError>;

    /// Rolls a transaction back
    fn rollback(&mut self, tx: TxHandle) -> Result<(), DriverError>;

    /// Releases a connection
    fn close(&mut self, conn: ConnHandle);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_rows_zip_to_maps() {
        let rows = QueryRows {
            columns: vec!["id".into(), "name".into()],
            rows: vec![
                vec![json!(1), json!("Ana")],
                vec![json!(2), json!("Luis")],
            ],
        };

        let first = rows.first_map().unwrap();
        assert_eq!(first.get("name"), Some(&json!("Ana")));

        let all = rows.maps();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].get("id"), Some(&json!(2)));
    }

    #[test]
    fn test_empty_result_has_no_first_map() {
        assert!(QueryRows::default().first_map().is_none());
    }
}
