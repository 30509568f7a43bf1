//! Single-unit execution with implicit commit
//!
//! One schema, one row batch, one mutation. Each statement is executed
//! directly on the connection (the driver commits implicitly) and the
//! first failure aborts the remainder of the batch.

use serde_json::{Map, Value};

use crate::compiler::{compile_delete, compile_insert, compile_update, CompileResult, CompiledBatch};
use crate::obs::{Logger, Severity};
use crate::schema::Schema;
use crate::validate::{RowInput, ValidateContext};

use super::config::{ConnectTarget, ExecOptions};
use super::driver::SqlDriver;
use super::errors::{ExecError, ExecResult};
use super::rewrite::rewrite_cross_update;
use super::Action;

/// A standalone unit of work: compile one mutation over a row batch,
/// then execute it statement by statement outside any transaction.
pub struct SingleExec {
    schema: Schema,
    rows: Vec<RowInput>,
    ctx: ValidateContext,
    compiled: Option<CompiledBatch>,
    action: Option<Action>,
}

impl SingleExec {
    /// Creates a unit for the given schema and input rows
    pub fn new(schema: Schema, rows: Vec<RowInput>) -> Self {
        Self {
            schema,
            rows,
            ctx: ValidateContext::new(),
            compiled: None,
            action: None,
        }
    }

    /// Enables the cipher rule with the given key
    pub fn with_cipher_key(mut self, key: [u8; 32]) -> Self {
        self.ctx = ValidateContext::with_cipher_key(key);
        self
    }

    /// Compiles the rows as INSERT statements. A later compile call
    /// replaces any earlier result.
    pub fn insert(&mut self) -> CompileResult<()> {
        let batch = compile_insert(&self.schema, &self.rows, &self.ctx)?;
        self.compiled = Some(batch);
        self.action = Some(Action::Insert);
        Ok(())
    }

    /// Compiles the rows as UPDATE statements
    pub fn update(&mut self) -> CompileResult<()> {
        let batch = compile_update(&self.schema, &self.rows, &self.ctx)?;
        self.compiled = Some(batch);
        self.action = Some(Action::Update);
        Ok(())
    }

    /// Compiles the rows as DELETE statements
    pub fn delete(&mut self) -> CompileResult<()> {
        let batch = compile_delete(&self.schema, &self.rows)?;
        self.compiled = Some(batch);
        self.action = Some(Action::Delete);
        Ok(())
    }

    /// The validated rows from the last compile, in input order
    pub fn data(&self) -> &[Map<String, Value>] {
        self.compiled.as_ref().map(|b| b.rows.as_slice()).unwrap_or(&[])
    }

    /// Executes the compiled statements, returning the summed affected
    /// row count. The connection is closed on every exit path.
    pub fn exec<D: SqlDriver>(
        &self,
        driver: &mut D,
        target: &ConnectTarget,
        opts: ExecOptions,
    ) -> ExecResult<u64> {
        let (Some(batch), Some(action)) = (&self.compiled, self.action) else {
            return Err(ExecError::NotCompiled);
        };

        let conn = driver
            .acquire(target)
            .map_err(|e| ExecError::ConnectionFailure(e.to_string()))?;

        if let Err(e) = driver.ping(conn) {
            driver.close(conn);
            return Err(ExecError::PingFailure(e.to_string()));
        }

        let mut affected = 0u64;
        for stmt in &batch.statements {
            let sql = if action == Action::Update && opts.cross_update {
                rewrite_cross_update(&stmt.sql)
            } else {
                stmt.sql.clone()
            };

            match driver.execute(conn, None, &sql, &stmt.args) {
                Ok(n) => affected += n,
                Err(e) => {
                    let detail = e.to_string();
                    Logger::log_stderr(
                        Severity::Error,
                        "sql_exec_failed",
                        &[
                            ("action", action.as_str()),
                            ("table", self.schema.table()),
                            ("detail", &detail),
                        ],
                    );
                    driver.close(conn);
                    return Err(ExecError::StatementFailure {
                        action: action.as_str().to_string(),
                        detail,
                    });
                }
            }
        }

        driver.close(conn);
        Ok(affected)
    }
}
