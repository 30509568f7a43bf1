//! Clause-by-clause SELECT assembly
//!
//! The builder owns its placeholder counter and argument list; the
//! counter only ever moves forward, so every operand rendered on one
//! builder gets a distinct `$n` slot. Instances are single-owner: clause
//! text and the counter mutate in place with no synchronization.

use serde_json::{Map, Value};

use crate::exec::{ConnectTarget, ExecError, QueryRows, SqlDriver};
use crate::obs::{Logger, Severity};

use super::errors::{QueryError, QueryResult};
use super::{JoinKind, Operator};

/// A fluent SELECT builder bound to one table
pub struct QueryBuilder {
    table: String,
    select: String,
    joins: Vec<String>,
    where_clause: String,
    group_by: String,
    order_by: String,
    limit: String,
    literal: Option<String>,
    args: Vec<Value>,
    counter: usize,
    err: Option<QueryError>,
    outcome: Option<Result<QueryRows, QueryError>>,
}

impl QueryBuilder {
    /// Creates a builder for the given table
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            select: String::new(),
            joins: Vec::new(),
            where_clause: String::new(),
            group_by: String::new(),
            order_by: String::new(),
            limit: String::new(),
            literal: None,
            args: Vec::new(),
            counter: 0,
            err: None,
            outcome: None,
        }
    }

    /// Sets the base clause; no columns means `SELECT *`
    pub fn select(&mut self, columns: &[&str]) -> &mut Self {
        self.select = if columns.is_empty() {
            format!("SELECT * FROM {}", self.table)
        } else {
            format!("SELECT {} FROM {}", columns.join(", "), self.table)
        };
        self
    }

    /// Sets `SELECT * FROM <table>`
    pub fn select_all(&mut self) -> &mut Self {
        self.select(&[])
    }

    /// Appends one join clause; call order is preserved
    pub fn join(&mut self, kind: JoinKind, table: &str, on: &str) -> &mut Self {
        self.joins.push(format!("{} {} ON {}", kind.as_sql(), table, on));
        self
    }

    /// Opens the WHERE clause with one predicate
    pub fn where_(&mut self, column: &str, op: Operator, value: Value) -> &mut Self {
        match self.render_operand(op, value) {
            Ok(operand) => {
                self.where_clause = format!("WHERE {} {} {}", column, op.as_sql(), operand);
            }
            Err(err) => self.record(err),
        }
        self
    }

    /// Appends an AND predicate; ignored if no WHERE has been set
    pub fn and(&mut self, column: &str, op: Operator, value: Value) -> &mut Self {
        if self.where_clause.is_empty() {
            return self;
        }
        match self.render_operand(op, value) {
            Ok(operand) => {
                self.where_clause
                    .push_str(&format!(" AND {} {} {}", column, op.as_sql(), operand));
            }
            Err(err) => self.record(err),
        }
        self
    }

    /// Appends an OR predicate; ignored if no WHERE has been set
    pub fn or(&mut self, column: &str, op: Operator, value: Value) -> &mut Self {
        if self.where_clause.is_empty() {
            return self;
        }
        match self.render_operand(op, value) {
            Ok(operand) => {
                self.where_clause
                    .push_str(&format!(" OR {} {} {}", column, op.as_sql(), operand));
            }
            Err(err) => self.record(err),
        }
        self
    }

    /// Replaces the GROUP BY clause; no columns means no clause
    pub fn group_by(&mut self, columns: &[&str]) -> &mut Self {
        if !columns.is_empty() {
            self.group_by = format!("GROUP BY {}", columns.join(", "));
        }
        self
    }

    /// Replaces the ORDER BY clause; no columns means no clause
    pub fn order_by(&mut self, columns: &[&str]) -> &mut Self {
        if !columns.is_empty() {
            self.order_by = format!("ORDER BY {}", columns.join(", "));
        }
        self
    }

    /// Sets `LIMIT n`
    pub fn top(&mut self, n: u64) -> &mut Self {
        self.limit = format!("LIMIT {}", n);
        self
    }

    /// Sets `LIMIT n`
    pub fn limit(&mut self, n: u64) -> &mut Self {
        self.top(n)
    }

    /// Sets `LIMIT n OFFSET offset`
    pub fn limit_offset(&mut self, n: u64, offset: u64) -> &mut Self {
        self.limit = format!("LIMIT {} OFFSET {}", n, offset);
        self
    }

    /// Sets `LIMIT 1`
    pub fn limit_one(&mut self) -> &mut Self {
        self.limit = "LIMIT 1".to_string();
        self
    }

    /// Switches to literal mode: the given text is rendered verbatim and
    /// every structured clause is bypassed. `args` may be a single
    /// value, a sequence (flattened), or null for none.
    pub fn set_query_string(&mut self, sql: impl Into<String>, args: Value) -> &mut Self {
        self.literal = Some(sql.into());
        match args {
            Value::Null => {}
            Value::Array(values) => {
                self.counter += values.len();
                self.args.extend(values);
            }
            value => {
                self.counter += 1;
                self.args.push(value);
            }
        }
        self
    }

    /// Clears clause text only. Accumulated arguments and the
    /// placeholder counter are kept, so [`set_args`] replacement stays
    /// aligned with previously rendered placeholders.
    ///
    /// [`set_args`]: Self::set_args
    pub fn reset(&mut self) -> &mut Self {
        self.select.clear();
        self.joins.clear();
        self.where_clause.clear();
        self.group_by.clear();
        self.order_by.clear();
        self.limit.clear();
        self.literal = None;
        self
    }

    /// Replaces the argument list; the count must match the number of
    /// placeholders already rendered.
    pub fn set_args(&mut self, args: Vec<Value>) -> QueryResult<()> {
        if args.len() != self.args.len() {
            return Err(QueryError::ArgumentCountMismatch {
                supplied: args.len(),
                required: self.args.len(),
            });
        }
        self.args = args;
        Ok(())
    }

    /// The rendered statement text, without the argument list
    pub fn query_sql(&self) -> String {
        if let Some(literal) = &self.literal {
            return literal.clone();
        }

        let mut sql = self.select.clone();
        for join in &self.joins {
            push_clause(&mut sql, join);
        }
        push_clause(&mut sql, &self.where_clause);
        push_clause(&mut sql, &self.group_by);
        push_clause(&mut sql, &self.order_by);
        push_clause(&mut sql, &self.limit);
        sql
    }

    /// Renders the statement and its arguments, surfacing any operand
    /// error recorded while chaining
    pub fn build(&self) -> QueryResult<(String, Vec<Value>)> {
        if let Some(err) = &self.err {
            return Err(err.clone());
        }
        Ok((self.query_sql(), self.args.clone()))
    }

    /// Runs the statement as a row query and records the outcome for
    /// the result accessors
    pub fn run<D: SqlDriver>(&mut self, driver: &mut D, target: &ConnectTarget) -> QueryResult<()> {
        let outcome = self.run_inner(driver, target, false).map(|rows| {
            rows.unwrap_or_default()
        });
        let result = outcome.as_ref().map(|_| ()).map_err(|e| e.clone());
        self.outcome = Some(outcome);
        result
    }

    /// Runs the statement for effect only (procedures, DDL); a
    /// successful run records an empty row set
    pub fn run_statement<D: SqlDriver>(
        &mut self,
        driver: &mut D,
        target: &ConnectTarget,
    ) -> QueryResult<()> {
        let outcome = self.run_inner(driver, target, true).map(|rows| {
            rows.unwrap_or_default()
        });
        let result = outcome.as_ref().map(|_| ()).map_err(|e| e.clone());
        self.outcome = Some(outcome);
        result
    }

    fn run_inner<D: SqlDriver>(
        &mut self,
        driver: &mut D,
        target: &ConnectTarget,
        statement_only: bool,
    ) -> QueryResult<Option<QueryRows>> {
        let (sql, args) = self.build()?;

        let conn = driver
            .acquire(target)
            .map_err(|e| ExecError::ConnectionFailure(e.to_string()))?;

        if let Err(e) = driver.ping(conn) {
            driver.close(conn);
            return Err(ExecError::PingFailure(e.to_string()).into());
        }

        let result = if statement_only {
            driver.execute(conn, None, &sql, &args).map(|_| None)
        } else {
            driver.query(conn, &sql, &args).map(Some)
        };
        driver.close(conn);

        result.map_err(|e| {
            let detail = e.to_string();
            Logger::log_stderr(
                Severity::Error,
                "sql_query_failed",
                &[("table", self.table.as_str()), ("detail", &detail)],
            );
            ExecError::QueryFailure(detail).into()
        })
    }

    /// The first row as a column map; empty when the result had no rows
    pub fn one(&self) -> QueryResult<Map<String, Value>> {
        let rows = self.recorded()?;
        Ok(rows.first_map().unwrap_or_default())
    }

    /// One column of the first row; null when absent
    pub fn scalar(&self, column: &str) -> QueryResult<Value> {
        let rows = self.recorded()?;
        Ok(rows
            .first_map()
            .and_then(|m| m.get(column).cloned())
            .unwrap_or(Value::Null))
    }

    /// Every row as a column map
    pub fn all(&self) -> QueryResult<Vec<Map<String, Value>>> {
        let rows = self.recorded()?;
        Ok(rows.maps())
    }

    fn recorded(&self) -> QueryResult<&QueryRows> {
        match &self.outcome {
            None => Err(QueryError::NotExecuted),
            Some(Err(err)) => Err(err.clone()),
            Some(Ok(rows)) => Ok(rows),
        }
    }

    fn record(&mut self, err: QueryError) {
        // first error wins; later chained calls keep it intact
        if self.err.is_none() {
            self.err = Some(err);
        }
    }

    fn next_placeholder(&mut self) -> String {
        self.counter += 1;
        format!("${}", self.counter)
    }

    fn render_operand(&mut self, op: Operator, value: Value) -> QueryResult<String> {
        if !op.takes_sequence() {
            let placeholder = self.next_placeholder();
            self.args.push(value);
            return Ok(placeholder);
        }

        let Value::Array(values) = value else {
            return Err(QueryError::InvalidOperandType {
                operator: op.as_sql().to_string(),
            });
        };

        match op {
            Operator::In | Operator::NotIn => {
                if values.is_empty() {
                    return Err(QueryError::EmptyOperand {
                        operator: op.as_sql().to_string(),
                    });
                }
                let mut placeholders = Vec::with_capacity(values.len());
                for value in values {
                    placeholders.push(self.next_placeholder());
                    self.args.push(value);
                }
                Ok(format!("({})", placeholders.join(",")))
            }
            Operator::Between | Operator::NotBetween => {
                if values.len() < 2 {
                    return Err(QueryError::InsufficientOperands {
                        operator: op.as_sql().to_string(),
                    });
                }
                // extras beyond the first two are silently ignored
                let mut pair = values.into_iter();
                let low = pair.next().unwrap_or(Value::Null);
                let high = pair.next().unwrap_or(Value::Null);
                let first = self.next_placeholder();
                self.args.push(low);
                let second = self.next_placeholder();
                self.args.push(high);
                Ok(format!("{} AND {}", first, second))
            }
            _ => unreachable!("scalar operators are handled above"),
        }
    }
}

fn push_clause(sql: &mut String, clause: &str) {
    if !clause.is_empty() {
        if !sql.is_empty() {
            sql.push(' ');
        }
        sql.push_str(clause);
    }
}
