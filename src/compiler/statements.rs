//! INSERT/UPDATE/DELETE statement compilation
//!
//! Placeholders are `$1..$n`; within one statement a single counter is
//! shared across the SET and WHERE sections, never restarted. Column
//! order follows the schema's field declaration order.

use serde_json::{Map, Value};

use crate::schema::Schema;
use crate::validate::{check_insert, check_update, check_where, RowInput, ValidateContext};

use super::errors::{CompileError, CompileResult};

/// Reserved row key holding the UPDATE WHERE sub-map
pub const WHERE_KEY: &str = "where";

/// One parameterized statement: SQL text plus its ordered arguments.
/// The number of `$n` placeholders always equals `args.len()`.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStatement {
    /// Parameterized SQL text
    pub sql: String,
    /// Arguments in placeholder order
    pub args: Vec<Value>,
}

/// A compiled batch: one statement per input row, plus the validated
/// row data for observation.
#[derive(Debug, Clone, Default)]
pub struct CompiledBatch {
    /// Statements in input-row order
    pub statements: Vec<CompiledStatement>,
    /// The validated and coerced rows that produced the statements
    pub rows: Vec<Map<String, Value>>,
}

fn to_map(columns: &[(String, Value)]) -> Map<String, Value> {
    columns.iter().cloned().collect()
}

/// Compiles an INSERT statement per row.
pub fn compile_insert(
    schema: &Schema,
    rows: &[RowInput],
    ctx: &ValidateContext,
) -> CompileResult<CompiledBatch> {
    if rows.is_empty() {
        return Err(CompileError::EmptyBatch);
    }

    let mut batch = CompiledBatch::default();
    for row in rows {
        let columns = check_insert(schema, row, ctx)?;

        let mut names = Vec::with_capacity(columns.len());
        let mut placeholders = Vec::with_capacity(columns.len());
        let mut args = Vec::with_capacity(columns.len());
        for (i, (name, value)) in columns.iter().enumerate() {
            names.push(name.as_str());
            placeholders.push(format!("${}", i + 1));
            args.push(value.clone());
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            schema.table(),
            names.join(", "),
            placeholders.join(", ")
        );

        batch.rows.push(to_map(&columns));
        batch.statements.push(CompiledStatement { sql, args });
    }
    Ok(batch)
}

/// Compiles an UPDATE statement per row.
///
/// The reserved `"where"` key, when present, is removed from the row and
/// validated against the where view; its predicates continue the SET
/// section's placeholder counter.
pub fn compile_update(
    schema: &Schema,
    rows: &[RowInput],
    ctx: &ValidateContext,
) -> CompileResult<CompiledBatch> {
    if rows.is_empty() {
        return Err(CompileError::EmptyBatch);
    }

    let mut batch = CompiledBatch::default();
    for row in rows {
        let mut row = row.clone();
        let where_map = match row.remove(WHERE_KEY) {
            Some(Value::Object(m)) => Some(m),
            _ => None,
        };

        let set_columns = check_update(schema, &row, ctx)?;
        let where_columns = match &where_map {
            Some(m) => check_where(schema, m)?,
            None => Vec::new(),
        };

        let mut counter = 0usize;
        let mut args = Vec::with_capacity(set_columns.len() + where_columns.len());

        let mut setters = Vec::with_capacity(set_columns.len());
        for (name, value) in &set_columns {
            counter += 1;
            setters.push(format!("{} = ${}", name, counter));
            args.push(value.clone());
        }

        let mut predicates = Vec::with_capacity(where_columns.len());
        for (name, value) in &where_columns {
            counter += 1;
            predicates.push(format!("{} = ${}", name, counter));
            args.push(value.clone());
        }

        let mut sql = format!("UPDATE {} SET {}", schema.table(), setters.join(", "));
        if !predicates.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&predicates.join(" AND "));
        }

        batch.rows.push(to_map(&set_columns));
        batch.statements.push(CompiledStatement { sql, args });
    }
    Ok(batch)
}

/// Compiles a DELETE statement per row.
///
/// An empty predicate set from a non-empty row compiles to an
/// unrestricted delete; only a zero-row batch is rejected.
pub fn compile_delete(schema: &Schema, rows: &[RowInput]) -> CompileResult<CompiledBatch> {
    if rows.is_empty() {
        return Err(CompileError::EmptyBatch);
    }

    let mut batch = CompiledBatch::default();
    for row in rows {
        let columns = check_where(schema, row)?;

        let mut predicates = Vec::with_capacity(columns.len());
        let mut args = Vec::with_capacity(columns.len());
        for (i, (name, value)) in columns.iter().enumerate() {
            predicates.push(format!("{} = ${}", name, i + 1));
            args.push(value.clone());
        }

        let mut sql = format!("DELETE FROM {}", schema.table());
        if !predicates.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&predicates.join(" AND "));
        }

        batch.rows.push(to_map(&columns));
        batch.statements.push(CompiledStatement { sql, args });
    }
    Ok(batch)
}
