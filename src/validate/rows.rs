//! Row-level validation against a schema's operation views
//!
//! Every field failure in a row is collected into one [`RowReport`];
//! sibling fields are always processed. Output pairs preserve the
//! schema's field declaration order, which fixes the column order of the
//! compiled statements. A JSON null is treated the same as an absent
//! entry, never as a value.

use serde_json::{Map, Value};

use crate::schema::{DataType, Schema};

use super::coerce::{coerce, TypedValue};
use super::context::ValidateContext;
use super::errors::{RowReport, ValidationError};
use super::rules::apply_rules;

/// Untyped input row: field name to raw value
pub type RowInput = Map<String, Value>;

fn present<'a>(row: &'a RowInput, name: &str) -> Option<&'a Value> {
    row.get(name).filter(|v| !v.is_null())
}

/// Validates a row against the insert view (every field).
///
/// Missing fields take their default when configured; otherwise a
/// required field fails and an optional one is simply omitted.
pub fn check_insert(
    schema: &Schema,
    row: &RowInput,
    ctx: &ValidateContext,
) -> Result<Vec<(String, Value)>, RowReport> {
    let mut report = RowReport::new();
    let mut out = Vec::new();

    for field in schema.insert_view() {
        match present(row, &field.name) {
            Some(raw) => {
                match coerce(field.data_type, raw).and_then(|v| apply_rules(field, v, ctx)) {
                    Ok(typed) => out.push((field.name.clone(), typed.into_value())),
                    Err(err) => report.push(&field.description, err),
                }
            }
            None => match &field.default {
                Some(default) => out.push((field.name.clone(), default.clone())),
                None if field.required => {
                    report.push(&field.description, ValidationError::MissingRequiredField)
                }
                None => {}
            },
        }
    }

    report.into_result(out)
}

/// Validates a row against the update view.
///
/// A present field that is not updatable fails. A present string field
/// resolving to empty fails unless the field allows empty, in which case
/// it is skipped from the SET list entirely; other types have no such
/// skip.
pub fn check_update(
    schema: &Schema,
    row: &RowInput,
    ctx: &ValidateContext,
) -> Result<Vec<(String, Value)>, RowReport> {
    let mut report = RowReport::new();
    let mut out = Vec::new();

    for field in schema.insert_view() {
        let Some(raw) = present(row, &field.name) else {
            continue;
        };

        if !field.updatable {
            report.push(&field.description, ValidationError::FieldNotUpdatable);
            continue;
        }

        let typed = match coerce(field.data_type, raw) {
            Ok(t) => t,
            Err(err) => {
                report.push(&field.description, err);
                continue;
            }
        };

        if let TypedValue::Str(s) = &typed {
            if s.is_empty() {
                if !field.allow_empty {
                    report.push(&field.description, ValidationError::EmptyValue);
                }
                continue;
            }
        }

        match apply_rules(field, typed, ctx) {
            Ok(typed) => out.push((field.name.clone(), typed.into_value())),
            Err(err) => report.push(&field.description, err),
        }
    }

    report.into_result(out)
}

/// Validates a WHERE map against the where view.
///
/// Every present field must be whereable or a primary key, coerce to its
/// declared type, and (for strings) be non-empty; a missing primary key
/// fails. Type-specific rules are not applied to predicate values.
pub fn check_where(schema: &Schema, row: &RowInput) -> Result<Vec<(String, Value)>, RowReport> {
    let mut report = RowReport::new();
    let mut out = Vec::new();

    for field in schema.insert_view() {
        match present(row, &field.name) {
            Some(raw) => {
                if !field.whereable && !field.primary_key {
                    report.push(&field.description, ValidationError::FieldNotWhereable);
                    continue;
                }
                match coerce(field.data_type, raw) {
                    Ok(typed) => {
                        if field.data_type == DataType::String
                            && matches!(&typed, TypedValue::Str(s) if s.is_empty())
                        {
                            report.push(&field.description, ValidationError::EmptyValue);
                        } else {
                            out.push((field.name.clone(), typed.into_value()));
                        }
                    }
                    Err(err) => report.push(&field.description, err),
                }
            }
            None => {
                if field.primary_key {
                    report.push(&field.description, ValidationError::MissingRequiredField);
                }
            }
        }
    }

    report.into_result(out)
}
