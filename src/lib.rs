//! sqlgate - a schema-driven SQL access layer
//!
//! A declarative field schema per table drives three engines:
//! - validation and coercion of untyped row maps into typed column values
//! - compilation of positional-parameter INSERT/UPDATE/DELETE statements
//! - a fluent SELECT builder with operator-aware parameter expansion
//!
//! Execution is delegated to an external SQL driver through the narrow
//! [`exec::SqlDriver`] trait; sqlgate defines no wire protocol of its own.

pub mod compiler;
pub mod exec;
pub mod obs;
pub mod query;
pub mod schema;
pub mod validate;
