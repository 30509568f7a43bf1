//! Schema type definitions
//!
//! Supported column types:
//! - bool: boolean
//! - int64: 64-bit signed integer
//! - uint64: 64-bit unsigned integer
//! - float64: 64-bit floating point
//! - string: UTF-8 string
//! - time: timestamp carried as text
//! - bytes: raw bytes (base64 text on the wire)

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use super::errors::{SchemaError, SchemaResult};

/// Supported column data types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Boolean
    Bool,
    /// 64-bit signed integer
    #[serde(rename = "int64")]
    Int,
    /// 64-bit unsigned integer
    #[serde(rename = "uint64")]
    Uint,
    /// 64-bit floating point
    #[serde(rename = "float64")]
    Float,
    /// UTF-8 string
    String,
    /// Timestamp carried as text
    Time,
    /// Raw bytes
    Bytes,
}

impl DataType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            DataType::Bool => "bool",
            DataType::Int => "int64",
            DataType::Uint => "uint64",
            DataType::Float => "float64",
            DataType::String => "string",
            DataType::Time => "time",
            DataType::Bytes => "bytes",
        }
    }
}

/// String field constraints.
///
/// Rules run in a fixed order after trimming surrounding whitespace:
/// pattern, date, hash, cipher, min length, max length, case folding.
/// A successful date check returns the value as-is; hash and cipher
/// replace the value and also end the chain, so when both flags are set
/// hash wins by evaluation order rather than by a guard.
#[derive(Debug, Clone, Default)]
pub struct StringRule {
    /// Fold the value to lower case
    pub lower_case: bool,
    /// Fold the value to upper case (wins over `lower_case`)
    pub upper_case: bool,
    /// Replace the value with a one-way password hash
    pub hash: bool,
    /// Replace the value with a reversible ciphertext
    pub cipher: bool,
    /// Require a `dd/mm/yyyy` date
    pub date: bool,
    /// Minimum length in bytes; 0 means unbounded
    pub min: usize,
    /// Maximum length in bytes; 0 means unbounded
    pub max: usize,
    /// Pattern the value must match
    pub pattern: Option<Regex>,
}

/// Float field constraints.
///
/// A bound of exactly 0.0 means "unbounded"; the allowed range between
/// two configured bounds is strictly exclusive on both ends.
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatRule {
    /// Divide the accepted value by 100 (bounds apply before division)
    pub percentage: bool,
    /// Accept negative values
    pub allow_negative: bool,
    /// Reject values less than or equal to this bound when non-zero
    pub lower_bound: f64,
    /// Reject values greater than or equal to this bound when non-zero
    pub upper_bound: f64,
}

/// Integer field constraints. A bound of 0 means "unbounded".
#[derive(Debug, Clone, Copy, Default)]
pub struct IntRule {
    /// Reject values below this minimum when non-zero
    pub min: i64,
    /// Reject values above this maximum when non-zero
    pub max: i64,
    /// Accept negative values
    pub allow_negative: bool,
}

/// Unsigned integer field constraints. A maximum of 0 means "unbounded".
#[derive(Debug, Clone, Copy, Default)]
pub struct UintRule {
    /// Reject values above this maximum when non-zero
    pub max: u64,
}

/// Type-specific validation rule, keyed by the field's declared type
#[derive(Debug, Clone, Default)]
pub enum ValidationRule {
    /// No extra constraints
    #[default]
    None,
    /// Constraints for `string` fields
    Str(StringRule),
    /// Constraints for `float64` fields
    Float(FloatRule),
    /// Constraints for `int64` fields
    Int(IntRule),
    /// Constraints for `uint64` fields
    Uint(UintRule),
}

impl ValidationRule {
    /// Whether this rule shape is valid for the given declared type
    pub fn matches(&self, data_type: DataType) -> bool {
        match self {
            ValidationRule::None => true,
            ValidationRule::Str(_) => data_type == DataType::String,
            ValidationRule::Float(_) => data_type == DataType::Float,
            ValidationRule::Int(_) => data_type == DataType::Int,
            ValidationRule::Uint(_) => data_type == DataType::Uint,
        }
    }
}

/// One column's metadata: type, constraints, and operation capabilities
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// Column name
    pub name: String,
    /// Human description used in validation reports
    pub description: String,
    /// Declared column type
    pub data_type: DataType,
    /// Whether an insert must supply a value (or a default)
    pub required: bool,
    /// Whether the column is part of the primary key
    pub primary_key: bool,
    /// Whether the column may appear in WHERE predicates
    pub whereable: bool,
    /// Whether the column may appear in an UPDATE SET list
    pub updatable: bool,
    /// Whether an update may resolve the value to empty (string fields)
    pub allow_empty: bool,
    /// Value used when an insert omits the field
    pub default: Option<Value>,
    /// Type-specific constraints
    pub rule: ValidationRule,
}

impl FieldDef {
    /// Creates a field with the given name, description, and type.
    /// All capability flags start false; chain the builder methods below.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        data_type: DataType,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            data_type,
            required: false,
            primary_key: false,
            whereable: false,
            updatable: false,
            allow_empty: false,
            default: None,
            rule: ValidationRule::None,
        }
    }

    /// Creates a string field
    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, DataType::String)
    }

    /// Creates an int64 field
    pub fn int(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, DataType::Int)
    }

    /// Creates a uint64 field
    pub fn uint(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, DataType::Uint)
    }

    /// Creates a float64 field
    pub fn float(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, DataType::Float)
    }

    /// Marks the field required on insert
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Marks the field as part of the primary key
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Allows the field in WHERE predicates
    pub fn whereable(mut self) -> Self {
        self.whereable = true;
        self
    }

    /// Allows the field in UPDATE SET lists
    pub fn updatable(mut self) -> Self {
        self.updatable = true;
        self
    }

    /// Allows an update to resolve the value to empty
    pub fn allow_empty(mut self) -> Self {
        self.allow_empty = true;
        self
    }

    /// Sets the insert default
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Attaches a type-specific rule
    pub fn with_rule(mut self, rule: ValidationRule) -> Self {
        self.rule = rule;
        self
    }
}

/// An immutable table schema: ordered field descriptors plus a table name.
///
/// The update and where views are index lists computed once here, never
/// recomputed per operation.
#[derive(Debug, Clone)]
pub struct Schema {
    table: String,
    fields: Vec<FieldDef>,
    update_view: Vec<usize>,
    where_view: Vec<usize>,
}

impl Schema {
    /// Builds a schema, checking table name, field uniqueness, and that
    /// every field's rule shape matches its declared type.
    pub fn new(table: impl Into<String>, fields: Vec<FieldDef>) -> SchemaResult<Self> {
        let table = table.into();
        if table.trim().is_empty() {
            return Err(SchemaError::EmptyTableName);
        }
        if fields.is_empty() {
            return Err(SchemaError::NoFields);
        }

        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField(field.name.clone()));
            }
            if !field.rule.matches(field.data_type) {
                return Err(SchemaError::RuleMismatch {
                    field: field.name.clone(),
                    declared: field.data_type,
                });
            }
        }

        let update_view = fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.updatable || f.primary_key || f.whereable)
            .map(|(i, _)| i)
            .collect();
        let where_view = fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.whereable || f.primary_key)
            .map(|(i, _)| i)
            .collect();

        Ok(Self {
            table,
            fields,
            update_view,
            where_view,
        })
    }

    /// Table name
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Insert view: every field, in declaration order
    pub fn insert_view(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter()
    }

    /// Update view: fields that are updatable, primary key, or whereable
    pub fn update_view(&self) -> impl Iterator<Item = &FieldDef> {
        self.update_view.iter().map(|&i| &self.fields[i])
    }

    /// Where view: fields that are whereable or primary key
    pub fn where_view(&self) -> impl Iterator<Item = &FieldDef> {
        self.where_view.iter().map(|&i| &self.fields[i])
    }

    /// All fields in declaration order
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Looks up a field by name
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}
