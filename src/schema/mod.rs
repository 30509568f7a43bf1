//! Field descriptors and table schemas
//!
//! A [`Schema`] is an ordered list of [`FieldDef`]s plus a table name.
//! Rule/type shape consistency is checked once at construction, and the
//! three operation views (insert/update/where) are derived there as well.

mod errors;
mod types;

pub use errors::{SchemaError, SchemaResult};
pub use types::{
    DataType, FieldDef, FloatRule, IntRule, Schema, StringRule, UintRule, ValidationRule,
};
