//! Multi-unit execution under one transaction
//!
//! Registered units (schema + row batch, compiled independently) share a
//! single driver transaction. The coordinator runs either as a batch,
//! where every unit executes and commits in one call, or stepped, where
//! the caller drives units one at a time and commits explicitly. Any
//! statement failure rolls back the whole transaction; a closed
//! transaction refuses further work.

use serde_json::{Map, Value};

use crate::compiler::{compile_delete, compile_insert, compile_update, CompileResult, CompiledBatch};
use crate::obs::{Logger, Severity};
use crate::schema::Schema;
use crate::validate::{RowInput, ValidateContext};

use super::config::{ConnectTarget, ExecOptions};
use super::driver::{ConnHandle, SqlDriver, TxHandle};
use super::errors::{ExecError, ExecResult};
use super::rewrite::rewrite_cross_update;
use super::Action;

/// Lifecycle of the coordinator's transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    /// No transaction opened yet
    NotStarted,
    /// A transaction is open and accepting work
    Active,
    /// Committed; the coordinator is finished
    Committed,
    /// Rolled back; the coordinator is finished
    RolledBack,
}

/// One registered unit: a schema, its row batch, and the compiled
/// statements once a compile method has run.
#[derive(Debug)]
pub struct TransactionUnit {
    schema: Schema,
    rows: Vec<RowInput>,
    ctx: ValidateContext,
    compiled: Option<CompiledBatch>,
    action: Option<Action>,
}

impl TransactionUnit {
    fn new(schema: Schema, rows: Vec<RowInput>) -> Self {
        Self {
            schema,
            rows,
            ctx: ValidateContext::new(),
            compiled: None,
            action: None,
        }
    }

    /// Enables the cipher rule for this unit's validation
    pub fn set_cipher_key(&mut self, key: [u8; 32]) {
        self.ctx = ValidateContext::with_cipher_key(key);
    }

    /// Compiles the unit's rows as INSERT statements
    pub fn insert(&mut self) -> CompileResult<()> {
        let batch = compile_insert(&self.schema, &self.rows, &self.ctx)?;
        self.compiled = Some(batch);
        self.action = Some(Action::Insert);
        Ok(())
    }

    /// Compiles the unit's rows as UPDATE statements
    pub fn update(&mut self) -> CompileResult<()> {
        let batch = compile_update(&self.schema, &self.rows, &self.ctx)?;
        self.compiled = Some(batch);
        self.action = Some(Action::Update);
        Ok(())
    }

    /// Compiles the unit's rows as DELETE statements
    pub fn delete(&mut self) -> CompileResult<()> {
        let batch = compile_delete(&self.schema, &self.rows)?;
        self.compiled = Some(batch);
        self.action = Some(Action::Delete);
        Ok(())
    }

    /// The validated rows from the last compile
    pub fn data(&self) -> &[Map<String, Value>] {
        self.compiled.as_ref().map(|b| b.rows.as_slice()).unwrap_or(&[])
    }

    fn batch(&self) -> ExecResult<(&CompiledBatch, Action)> {
        match (&self.compiled, self.action) {
            (Some(batch), Some(action)) => Ok((batch, action)),
            _ => Err(ExecError::NotCompiled),
        }
    }
}

/// Coordinates several units under one all-or-nothing transaction
pub struct MultiExec {
    target: ConnectTarget,
    units: Vec<TransactionUnit>,
    state: TxState,
    conn: Option<ConnHandle>,
    tx: Option<TxHandle>,
}

impl MultiExec {
    /// Creates a coordinator against the given target
    pub fn new(target: ConnectTarget) -> Self {
        Self {
            target,
            units: Vec::new(),
            state: TxState::NotStarted,
            conn: None,
            tx: None,
        }
    }

    /// Registers a unit, returning its index for stepped execution
    pub fn register(&mut self, schema: Schema, rows: Vec<RowInput>) -> usize {
        self.units.push(TransactionUnit::new(schema, rows));
        self.units.len() - 1
    }

    /// Mutable access to a registered unit, for compiling
    pub fn unit_mut(&mut self, index: usize) -> ExecResult<&mut TransactionUnit> {
        self.units
            .get_mut(index)
            .ok_or(ExecError::UnknownUnit(index))
    }

    /// The registered units, in registration order
    pub fn units(&self) -> &[TransactionUnit] {
        &self.units
    }

    /// Current transaction state
    pub fn state(&self) -> TxState {
        self.state
    }

    /// Executes every registered unit inside one transaction and
    /// commits. Any failure rolls back; a finished coordinator refuses
    /// to run again.
    pub fn exec<D: SqlDriver>(&mut self, driver: &mut D, opts: ExecOptions) -> ExecResult<u64> {
        if self.state != TxState::NotStarted {
            return Err(ExecError::TransactionClosed);
        }

        // Everything must be compiled before a connection is opened.
        for unit in &self.units {
            unit.batch()?;
        }

        let conn = driver
            .acquire(&self.target)
            .map_err(|e| ExecError::ConnectionFailure(e.to_string()))?;

        if let Err(e) = driver.ping(conn) {
            driver.close(conn);
            return Err(ExecError::PingFailure(e.to_string()));
        }

        let tx = match driver.begin(conn) {
            Ok(tx) => tx,
            Err(e) => {
                driver.close(conn);
                return Err(ExecError::BeginFailure(e.to_string()));
            }
        };

        let mut affected = 0u64;
        for unit in &self.units {
            let (batch, action) = unit.batch()?;
            match run_batch(driver, conn, tx, batch, action, opts, unit.schema.table()) {
                Ok(n) => affected += n,
                Err(err) => {
                    let _ = driver.rollback(tx);
                    driver.close(conn);
                    self.state = TxState::RolledBack;
                    return Err(err);
                }
            }
        }

        if let Err(e) = driver.commit(tx) {
            driver.close(conn);
            self.state = TxState::RolledBack;
            return Err(ExecError::CommitFailure(e.to_string()));
        }

        driver.close(conn);
        self.state = TxState::Committed;
        Ok(affected)
    }

    /// Executes one unit inside the shared transaction. The first step
    /// opens the connection and begins the transaction; every step pings
    /// before running. A failure rolls back the whole transaction.
    pub fn exec_step<D: SqlDriver>(
        &mut self,
        driver: &mut D,
        index: usize,
        opts: ExecOptions,
    ) -> ExecResult<u64> {
        match self.state {
            TxState::Committed | TxState::RolledBack => {
                return Err(ExecError::TransactionClosed)
            }
            TxState::NotStarted | TxState::Active => {}
        }

        // Validate the unit before any driver work; the batch itself is
        // re-borrowed after the connection is in place.
        self.units
            .get(index)
            .ok_or(ExecError::UnknownUnit(index))?
            .batch()?;

        if self.state == TxState::NotStarted {
            let conn = driver
                .acquire(&self.target)
                .map_err(|e| ExecError::ConnectionFailure(e.to_string()))?;

            if let Err(e) = driver.ping(conn) {
                driver.close(conn);
                return Err(ExecError::PingFailure(e.to_string()));
            }

            let tx = match driver.begin(conn) {
                Ok(tx) => tx,
                Err(e) => {
                    driver.close(conn);
                    return Err(ExecError::BeginFailure(e.to_string()));
                }
            };

            self.conn = Some(conn);
            self.tx = Some(tx);
            self.state = TxState::Active;
        }

        let (Some(conn), Some(tx)) = (self.conn, self.tx) else {
            return Err(ExecError::TransactionClosed);
        };

        if let Err(e) = driver.ping(conn) {
            self.abort(driver, conn, tx);
            return Err(ExecError::PingFailure(e.to_string()));
        }

        let result = {
            let unit = &self.units[index];
            let (batch, action) = unit.batch()?;
            run_batch(driver, conn, tx, batch, action, opts, unit.schema.table())
        };

        match result {
            Ok(n) => Ok(n),
            Err(err) => {
                self.abort(driver, conn, tx);
                Err(err)
            }
        }
    }

    /// Commits the stepped transaction and releases the connection
    pub fn commit<D: SqlDriver>(&mut self, driver: &mut D) -> ExecResult<()> {
        if self.state != TxState::Active {
            return Err(ExecError::TransactionClosed);
        }
        let (Some(conn), Some(tx)) = (self.conn.take(), self.tx.take()) else {
            return Err(ExecError::TransactionClosed);
        };

        if let Err(e) = driver.commit(tx) {
            driver.close(conn);
            self.state = TxState::RolledBack;
            return Err(ExecError::CommitFailure(e.to_string()));
        }

        driver.close(conn);
        self.state = TxState::Committed;
        Ok(())
    }

    /// Rolls the stepped transaction back and releases the connection
    pub fn rollback<D: SqlDriver>(&mut self, driver: &mut D) -> ExecResult<()> {
        if self.state != TxState::Active {
            return Err(ExecError::TransactionClosed);
        }
        let (Some(conn), Some(tx)) = (self.conn.take(), self.tx.take()) else {
            return Err(ExecError::TransactionClosed);
        };

        self.abort(driver, conn, tx);
        Ok(())
    }

    fn abort<D: SqlDriver>(&mut self, driver: &mut D, conn: ConnHandle, tx: TxHandle) {
        let _ = driver.rollback(tx);
        driver.close(conn);
        self.conn = None;
        self.tx = None;
        self.state = TxState::RolledBack;
    }
}

fn run_batch<D: SqlDriver>(
    driver: &mut D,
    conn: ConnHandle,
    tx: TxHandle,
    batch: &CompiledBatch,
    action: Action,
    opts: ExecOptions,
    table: &str,
) -> ExecResult<u64> {
    let mut affected = 0u64;
    for stmt in &batch.statements {
        let sql = if action == Action::Update && opts.cross_update {
            rewrite_cross_update(&stmt.sql)
        } else {
            stmt.sql.clone()
        };

        match driver.execute(conn, Some(tx), &sql, &stmt.args) {
            Ok(n) => affected += n,
            Err(e) => {
                let detail = e.to_string();
                Logger::log_stderr(
                    Severity::Error,
                    "sql_tx_failed",
                    &[
                        ("action", action.as_str()),
                        ("table", table),
                        ("detail", &detail),
                    ],
                );
                return Err(ExecError::StatementFailure {
                    action: action.as_str().to_string(),
                    detail,
                });
            }
        }
    }
    Ok(affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::driver::{DriverError, QueryRows};
    use crate::schema::FieldDef;
    use serde_json::json;
    use std::collections::HashMap;

    /// Journaling stub: executed statements stay staged per transaction
    /// and only land in `committed` on commit.
    struct TxDriver {
        next_id: u64,
        staged: HashMap<u64, Vec<String>>,
        committed: Vec<String>,
        open: HashMap<u64, bool>,
        fail_contains: Option<String>,
    }

    impl TxDriver {
        fn new() -> Self {
            Self {
                next_id: 0,
                staged: HashMap::new(),
                committed: Vec::new(),
                open: HashMap::new(),
                fail_contains: None,
            }
        }
    }

    impl SqlDriver for TxDriver {
        fn acquire(&mut self, _target: &ConnectTarget) -> Result<ConnHandle, DriverError> {
            self.next_id += 1;
            self.open.insert(self.next_id, true);
            Ok(ConnHandle(self.next_id))
        }

        fn ping(&mut self, _conn: ConnHandle) -> Result<(), DriverError> {
            Ok(())
        }

        fn begin(&mut self, _conn: ConnHandle) -> Result<TxHandle, DriverError> {
            self.next_id += 1;
            self.staged.insert(self.next_id, Vec::new());
            Ok(TxHandle(self.next_id))
        }

        fn execute(
            &mut self,
            _conn: ConnHandle,
            tx: Option<TxHandle>,
            sql: &str,
            _args: &[Value],
        ) -> Result<u64, DriverError> {
            if let Some(needle) = &self.fail_contains {
                if sql.contains(needle.as_str()) {
                    return Err(DriverError::new("duplicate key"));
                }
            }
            if let Some(tx) = tx {
                if let Some(journal) = self.staged.get_mut(&tx.0) {
                    journal.push(sql.to_string());
                }
            }
            Ok(1)
        }

        fn query(
            &mut self,
            _conn: ConnHandle,
            _sql: &str,
            _args: &[Value],
        ) -> Result<QueryRows, DriverError> {
            Ok(QueryRows::default())
        }

        fn commit(&mut self, tx: TxHandle) -> Result<(), DriverError> {
            if let Some(journal) = self.staged.remove(&tx.0) {
                self.committed.extend(journal);
            }
            Ok(())
        }

        fn rollback(&mut self, tx: TxHandle) -> Result<(), DriverError> {
            self.staged.remove(&tx.0);
            Ok(())
        }

        fn close(&mut self, conn: ConnHandle) {
            self.open.insert(conn.0, false);
        }
    }

    fn schema(table: &str) -> Schema {
        Schema::new(
            table,
            vec![
                FieldDef::string("id", "identifier").primary_key().required(),
                FieldDef::string("label", "label").required().updatable(),
            ],
        )
        .unwrap()
    }

    fn rows(values: Vec<Value>) -> Vec<RowInput> {
        values
            .into_iter()
            .map(|v| match v {
                Value::Object(m) => m,
                _ => panic!("fixture must be an object"),
            })
            .collect()
    }

    #[test]
    fn test_batch_commits_all_units() {
        let mut coord = MultiExec::new(ConnectTarget::Cloud);
        let a = coord.register(schema("alpha"), rows(vec![json!({"id": "1", "label": "x"})]));
        let b = coord.register(schema("beta"), rows(vec![json!({"id": "2", "label": "y"})]));
        coord.unit_mut(a).unwrap().insert().unwrap();
        coord.unit_mut(b).unwrap().insert().unwrap();

        let mut driver = TxDriver::new();
        let affected = coord.exec(&mut driver, ExecOptions::default()).unwrap();

        assert_eq!(affected, 2);
        assert_eq!(coord.state(), TxState::Committed);
        assert_eq!(driver.committed.len(), 2);
        assert!(driver.committed[0].starts_with("INSERT INTO alpha"));
        assert!(driver.open.values().all(|open| !open));
    }

    #[test]
    fn test_batch_failure_rolls_back_everything() {
        let mut coord = MultiExec::new(ConnectTarget::Cloud);
        let a = coord.register(schema("alpha"), rows(vec![json!({"id": "1", "label": "x"})]));
        let b = coord.register(schema("beta"), rows(vec![json!({"id": "2", "label": "y"})]));
        coord.unit_mut(a).unwrap().insert().unwrap();
        coord.unit_mut(b).unwrap().insert().unwrap();

        let mut driver = TxDriver::new();
        driver.fail_contains = Some("beta".into());
        let err = coord.exec(&mut driver, ExecOptions::default()).unwrap_err();

        assert!(matches!(err, ExecError::StatementFailure { .. }));
        assert_eq!(coord.state(), TxState::RolledBack);
        assert!(driver.committed.is_empty());
        assert!(driver.staged.is_empty());
    }

    #[test]
    fn test_batch_requires_every_unit_compiled() {
        let mut coord = MultiExec::new(ConnectTarget::Cloud);
        let a = coord.register(schema("alpha"), rows(vec![json!({"id": "1", "label": "x"})]));
        coord.register(schema("beta"), rows(vec![json!({"id": "2", "label": "y"})]));
        coord.unit_mut(a).unwrap().insert().unwrap();

        let mut driver = TxDriver::new();
        let err = coord.exec(&mut driver, ExecOptions::default()).unwrap_err();
        assert_eq!(err, ExecError::NotCompiled);
        // nothing was opened
        assert!(driver.open.is_empty());
    }

    #[test]
    fn test_finished_coordinator_refuses_more_work() {
        let mut coord = MultiExec::new(ConnectTarget::Cloud);
        let a = coord.register(schema("alpha"), rows(vec![json!({"id": "1", "label": "x"})]));
        coord.unit_mut(a).unwrap().insert().unwrap();

        let mut driver = TxDriver::new();
        coord.exec(&mut driver, ExecOptions::default()).unwrap();
        assert_eq!(
            coord.exec(&mut driver, ExecOptions::default()).unwrap_err(),
            ExecError::TransactionClosed
        );
    }

    #[test]
    fn test_stepped_lifecycle_commits_on_demand() {
        let mut coord = MultiExec::new(ConnectTarget::Database("shop".into()));
        let a = coord.register(schema("alpha"), rows(vec![json!({"id": "1", "label": "x"})]));
        let b = coord.register(schema("beta"), rows(vec![json!({"id": "2", "label": "y"})]));
        coord.unit_mut(a).unwrap().insert().unwrap();
        coord.unit_mut(b).unwrap().insert().unwrap();

        let mut driver = TxDriver::new();
        coord.exec_step(&mut driver, a, ExecOptions::default()).unwrap();
        assert_eq!(coord.state(), TxState::Active);
        assert!(driver.committed.is_empty());

        coord.exec_step(&mut driver, b, ExecOptions::default()).unwrap();
        coord.commit(&mut driver).unwrap();

        assert_eq!(coord.state(), TxState::Committed);
        assert_eq!(driver.committed.len(), 2);
        assert!(driver.open.values().all(|open| !open));
    }

    #[test]
    fn test_stepped_failure_discards_prior_steps() {
        let mut coord = MultiExec::new(ConnectTarget::Cloud);
        let a = coord.register(schema("alpha"), rows(vec![json!({"id": "1", "label": "x"})]));
        let b = coord.register(schema("beta"), rows(vec![json!({"id": "2", "label": "y"})]));
        coord.unit_mut(a).unwrap().insert().unwrap();
        coord.unit_mut(b).unwrap().insert().unwrap();

        let mut driver = TxDriver::new();
        coord.exec_step(&mut driver, a, ExecOptions::default()).unwrap();

        driver.fail_contains = Some("beta".into());
        let err = coord
            .exec_step(&mut driver, b, ExecOptions::default())
            .unwrap_err();
        assert!(matches!(err, ExecError::StatementFailure { .. }));
        assert_eq!(coord.state(), TxState::RolledBack);
        assert!(driver.committed.is_empty());
        assert!(driver.staged.is_empty());

        // no further steps, no commit
        assert_eq!(
            coord.exec_step(&mut driver, a, ExecOptions::default()).unwrap_err(),
            ExecError::TransactionClosed
        );
        assert_eq!(
            coord.commit(&mut driver).unwrap_err(),
            ExecError::TransactionClosed
        );
    }

    #[test]
    fn test_explicit_rollback_closes_transaction() {
        let mut coord = MultiExec::new(ConnectTarget::Cloud);
        let a = coord.register(schema("alpha"), rows(vec![json!({"id": "1", "label": "x"})]));
        coord.unit_mut(a).unwrap().insert().unwrap();

        let mut driver = TxDriver::new();
        coord.exec_step(&mut driver, a, ExecOptions::default()).unwrap();
        coord.rollback(&mut driver).unwrap();

        assert_eq!(coord.state(), TxState::RolledBack);
        assert!(driver.committed.is_empty());
        assert!(driver.open.values().all(|open| !open));
    }

    #[test]
    fn test_unknown_unit_index() {
        let mut coord = MultiExec::new(ConnectTarget::Cloud);
        assert_eq!(coord.unit_mut(3).unwrap_err(), ExecError::UnknownUnit(3));
    }
}
