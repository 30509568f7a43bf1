//! Execution errors
//!
//! Driver failures are never retried: the first one aborts the
//! surrounding unit of work, after any open transaction is rolled back,
//! and is returned verbatim.

use thiserror::Error;

/// Result type for execution operations
pub type ExecResult<T> = Result<T, ExecError>;

/// Errors from the execution coordinator
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExecError {
    /// Acquiring a connection failed
    #[error("connection failed: {0}")]
    ConnectionFailure(String),

    /// The liveness check failed
    #[error("ping failed: {0}")]
    PingFailure(String),

    /// Beginning a transaction failed
    #[error("transaction begin failed: {0}")]
    BeginFailure(String),

    /// A statement failed at the driver
    #[error("sql {action} failed: {detail}")]
    StatementFailure {
        /// The SQL verb that failed
        action: String,
        /// The driver's message, verbatim
        detail: String,
    },

    /// A query failed at the driver
    #[error("sql query failed: {0}")]
    QueryFailure(String),

    /// Committing failed; the transaction is closed
    #[error("commit failed: {0}")]
    CommitFailure(String),

    /// Operation attempted after commit or rollback
    #[error("transaction already closed")]
    TransactionClosed,

    /// Execution requested before any compile call
    #[error("statements have not been compiled")]
    NotCompiled,

    /// No registered transaction at the given index
    #[error("no registered transaction at index {0}")]
    UnknownUnit(usize),
}
