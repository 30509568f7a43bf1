//! Fluent SELECT builder
//!
//! Assembles a statement clause by clause with positional `$n`
//! parameters, expands set- and range-membership operators into
//! placeholder lists, and runs the result through the [`SqlDriver`]
//! collaborator. A literal mode bypasses clause assembly entirely.
//!
//! [`SqlDriver`]: crate::exec::SqlDriver

mod builder;
mod errors;

pub use builder::QueryBuilder;
pub use errors::{QueryError, QueryResult};

/// WHERE comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `LIKE`
    Like,
    /// `IN`, expands one placeholder per element
    In,
    /// `NOT IN`, expands one placeholder per element
    NotIn,
    /// `BETWEEN`, consumes exactly two elements
    Between,
    /// `NOT BETWEEN`, consumes exactly two elements
    NotBetween,
}

impl Operator {
    /// The operator's SQL text
    pub fn as_sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "<>",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Like => "LIKE",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::Between => "BETWEEN",
            Operator::NotBetween => "NOT BETWEEN",
        }
    }

    fn takes_sequence(&self) -> bool {
        matches!(
            self,
            Operator::In | Operator::NotIn | Operator::Between | Operator::NotBetween
        )
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_sql())
    }
}

/// JOIN variants, rendered in call order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// `INNER JOIN`
    Inner,
    /// `LEFT JOIN`
    Left,
    /// `RIGHT JOIN`
    Right,
    /// `FULL OUTER JOIN`
    Full,
}

impl JoinKind {
    /// The join's SQL text
    pub fn as_sql(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL OUTER JOIN",
        }
    }
}
