//! Type coercion and validation engine
//!
//! Converts untyped row values to their fields' declared types and
//! applies type-specific constraints, accumulating every failure of a
//! row into a single report.

mod coerce;
mod context;
mod crypto;
mod errors;
mod rows;
mod rules;

pub use coerce::{coerce, json_type_name, TypedValue};
pub use context::ValidateContext;
pub use crypto::{hash_value, StringCipher};
pub use errors::{FieldFailure, FieldResult, RowReport, ValidationError};
pub use rows::{check_insert, check_update, check_where, RowInput};
pub use rules::apply_rules;
