//! Compilation errors

use thiserror::Error;

use crate::validate::RowReport;

/// Result type for statement compilation
pub type CompileResult<T> = Result<T, CompileError>;

/// Errors from compiling a batch of rows
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CompileError {
    /// The batch contains no rows
    #[error("batch contains no rows")]
    EmptyBatch,

    /// A row failed validation; the report lists every offending field
    #[error(transparent)]
    Row(#[from] RowReport),
}
