//! Validation error types
//!
//! Per-field failures are accumulated into a [`RowReport`] for the row
//! being processed; a failing field never aborts its siblings.

use std::fmt;
use thiserror::Error;

/// Result type for per-field validation
pub type FieldResult<T> = Result<T, ValidationError>;

/// One field's validation failure.
///
/// Messages are phrased to read naturally after the field description,
/// e.g. `field 'full name' is required`.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    /// No value supplied and no default configured
    #[error("is required")]
    MissingRequiredField,

    /// Runtime type cannot be converted to the declared type
    #[error("expected {expected}, got {actual}")]
    TypeMismatch {
        /// Declared type name
        expected: &'static str,
        /// Runtime type name of the supplied value
        actual: &'static str,
    },

    /// Value does not match the configured pattern
    #[error("does not match the required pattern")]
    PatternMismatch,

    /// Value is not a dd/mm/yyyy date
    #[error("is not a valid dd/mm/yyyy date")]
    InvalidDate,

    /// String length outside the configured bounds
    #[error("has length {actual}, outside the allowed bounds (min {min}, max {max})")]
    LengthViolation {
        /// Configured minimum (0 = unbounded)
        min: usize,
        /// Configured maximum (0 = unbounded)
        max: usize,
        /// Actual length
        actual: usize,
    },

    /// Numeric value outside the configured range
    #[error("{0}")]
    RangeViolation(String),

    /// Negative value where negatives are not allowed
    #[error("must not be negative")]
    SignViolation,

    /// Field present in an update row but not updatable
    #[error("cannot be modified")]
    FieldNotUpdatable,

    /// Field present in a WHERE map but neither whereable nor primary key
    #[error("cannot be used to filter")]
    FieldNotWhereable,

    /// Value resolves to empty where empty is not allowed
    #[error("must not be empty")]
    EmptyValue,

    /// One-way hashing failed
    #[error("could not be hashed")]
    HashingFailed,

    /// Cipher flagged but no key configured
    #[error("has a cipher rule but no cipher key is configured")]
    CipherKeyMissing,

    /// Encryption or decryption failed
    #[error("cipher failure: {0}")]
    CipherFailed(String),
}

/// A single field's failure inside a row report
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFailure {
    /// The field's human description
    pub description: String,
    /// What went wrong
    pub error: ValidationError,
}

/// Aggregated failures for one row.
///
/// Rendered as a numbered list with 1-based ordinals, one line per
/// offending field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowReport {
    failures: Vec<FieldFailure>,
}

impl RowReport {
    /// Creates an empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one field failure
    pub fn push(&mut self, description: impl Into<String>, error: ValidationError) {
        self.failures.push(FieldFailure {
            description: description.into(),
            error,
        });
    }

    /// Whether any field failed
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// The recorded failures in field order
    pub fn failures(&self) -> &[FieldFailure] {
        &self.failures
    }

    /// Returns `ok` when no field failed, otherwise the report itself
    pub fn into_result<T>(self, ok: T) -> Result<T, RowReport> {
        if self.is_empty() {
            Ok(ok)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for RowReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(
                f,
                "{}.- field '{}' {}",
                i + 1,
                failure.description,
                failure.error
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for RowReport {}
