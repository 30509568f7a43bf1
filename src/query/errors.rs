//! Query builder errors

use thiserror::Error;

use crate::exec::ExecError;

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors from building or running a SELECT
#[derive(Debug, Clone, Error, PartialEq)]
pub enum QueryError {
    /// The operator needs a sequence operand and got something else
    #[error("operator {operator} requires a sequence operand")]
    InvalidOperandType {
        /// The SQL operator text
        operator: String,
    },

    /// The operator got an empty sequence
    #[error("operator {operator} requires a non-empty operand")]
    EmptyOperand {
        /// The SQL operator text
        operator: String,
    },

    /// The operator needs at least two elements
    #[error("operator {operator} requires at least two operand elements")]
    InsufficientOperands {
        /// The SQL operator text
        operator: String,
    },

    /// Replacement arguments do not match the placeholder count
    #[error("arguments supplied ({supplied}), required ({required})")]
    ArgumentCountMismatch {
        /// How many arguments the caller supplied
        supplied: usize,
        /// How many placeholders the statement carries
        required: usize,
    },

    /// A result accessor was called before any run
    #[error("query has not been executed")]
    NotExecuted,

    /// The run itself failed
    #[error(transparent)]
    Exec(#[from] ExecError),
}
