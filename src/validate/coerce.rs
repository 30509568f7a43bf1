//! Runtime-type to declared-type coercion
//!
//! String values convert to numerics via textual parsing; numerics
//! convert among each other via narrowing/widening. A value whose runtime
//! type cannot reach the declared type fails with a type mismatch.

use base64::{engine::general_purpose, Engine as _};
use serde_json::Value;

use crate::schema::DataType;

use super::errors::{FieldResult, ValidationError};

/// A value coerced to its field's declared type
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    /// Boolean
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit unsigned integer
    Uint(u64),
    /// 64-bit floating point
    Float(f64),
    /// UTF-8 string
    Str(String),
    /// Timestamp carried as text
    Time(String),
    /// Raw bytes
    Bytes(Vec<u8>),
}

impl TypedValue {
    /// Converts into the JSON value handed to the driver as a positional
    /// argument. Bytes travel as base64 text.
    pub fn into_value(self) -> Value {
        match self {
            TypedValue::Bool(b) => Value::Bool(b),
            TypedValue::Int(i) => Value::from(i),
            TypedValue::Uint(u) => Value::from(u),
            TypedValue::Float(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            TypedValue::Str(s) | TypedValue::Time(s) => Value::String(s),
            TypedValue::Bytes(b) => Value::String(general_purpose::STANDARD.encode(b)),
        }
    }
}

/// Returns the runtime type name of a JSON value for error messages
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                "int"
            } else {
                "float"
            }
        }
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn mismatch(data_type: DataType, raw: &Value) -> ValidationError {
    ValidationError::TypeMismatch {
        expected: data_type.type_name(),
        actual: json_type_name(raw),
    }
}

/// Coerces an untyped value to the declared type.
pub fn coerce(data_type: DataType, raw: &Value) -> FieldResult<TypedValue> {
    match data_type {
        DataType::String => match raw {
            Value::String(s) => Ok(TypedValue::Str(s.clone())),
            _ => Err(mismatch(data_type, raw)),
        },
        DataType::Time => match raw {
            Value::String(s) => Ok(TypedValue::Time(s.clone())),
            _ => Err(mismatch(data_type, raw)),
        },
        DataType::Bool => match raw {
            Value::Bool(b) => Ok(TypedValue::Bool(*b)),
            _ => Err(mismatch(data_type, raw)),
        },
        DataType::Float => match raw {
            Value::Number(n) => n
                .as_f64()
                .map(TypedValue::Float)
                .ok_or_else(|| mismatch(data_type, raw)),
            Value::String(s) => s
                .parse::<f64>()
                .map(TypedValue::Float)
                .map_err(|_| mismatch(data_type, raw)),
            _ => Err(mismatch(data_type, raw)),
        },
        DataType::Int => match raw {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(TypedValue::Int(i))
                } else if let Some(u) = n.as_u64() {
                    i64::try_from(u)
                        .map(TypedValue::Int)
                        .map_err(|_| mismatch(data_type, raw))
                } else if let Some(f) = n.as_f64() {
                    Ok(TypedValue::Int(f as i64))
                } else {
                    Err(mismatch(data_type, raw))
                }
            }
            Value::String(s) => s
                .parse::<i64>()
                .map(TypedValue::Int)
                .map_err(|_| mismatch(data_type, raw)),
            _ => Err(mismatch(data_type, raw)),
        },
        DataType::Uint => match raw {
            Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    Ok(TypedValue::Uint(u))
                } else if let Some(f) = n.as_f64() {
                    Ok(TypedValue::Uint(f as u64))
                } else {
                    Err(mismatch(data_type, raw))
                }
            }
            Value::String(s) => s
                .parse::<u64>()
                .map(TypedValue::Uint)
                .map_err(|_| mismatch(data_type, raw)),
            _ => Err(mismatch(data_type, raw)),
        },
        DataType::Bytes => match raw {
            Value::String(s) => general_purpose::STANDARD
                .decode(s)
                .map(TypedValue::Bytes)
                .map_err(|_| mismatch(data_type, raw)),
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match item.as_u64().and_then(|u| u8::try_from(u).ok()) {
                        Some(b) => out.push(b),
                        None => return Err(mismatch(data_type, raw)),
                    }
                }
                Ok(TypedValue::Bytes(out))
            }
            _ => Err(mismatch(data_type, raw)),
        },
    }
}
