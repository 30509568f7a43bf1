//! Schema construction errors

use thiserror::Error;

use super::types::DataType;

/// Result type for schema construction
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors detected while building a [`super::Schema`]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    /// Table name is empty
    #[error("table name must not be empty")]
    EmptyTableName,

    /// Schema has no fields
    #[error("schema must declare at least one field")]
    NoFields,

    /// Two fields share the same name
    #[error("duplicate field '{0}'")]
    DuplicateField(String),

    /// A field's validation rule does not match its declared type
    #[error("field '{field}': rule shape does not match declared type '{}'", .declared.type_name())]
    RuleMismatch {
        /// Offending field name
        field: String,
        /// The field's declared type
        declared: DataType,
    },
}
