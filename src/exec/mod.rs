//! Transactional execution coordinator
//!
//! Owns compiled statements from one or more schemas and executes them
//! through the external [`SqlDriver`] collaborator as either a
//! single-statement unit with implicit commit, a batch under one
//! all-or-nothing transaction, or an externally-stepped transaction with
//! an explicit commit.

mod config;
mod driver;
mod errors;
mod multi;
mod rewrite;
mod single;

pub use config::{ConnectTarget, ExecOptions};
pub use driver::{ConnHandle, DriverError, QueryRows, SqlDriver, TxHandle};
pub use errors::{ExecError, ExecResult};
pub use multi::{MultiExec, TransactionUnit, TxState};
pub use rewrite::rewrite_cross_update;
pub use single::SingleExec;

/// The mutation a compiled unit performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// INSERT statements
    Insert,
    /// UPDATE statements
    Update,
    /// DELETE statements
    Delete,
}

impl Action {
    /// Returns the SQL verb for messages and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Insert => "INSERT",
            Action::Update => "UPDATE",
            Action::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
