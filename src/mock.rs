//! In-memory stand-in for the external database client, used by the unit
//! tests in place of a real driver.

use std::sync::Arc;

use anyhow::{bail, Result};
use parking_lot::Mutex;

use crate::client::{ConnectionPool, PoolTransaction, Queryable, Row, Rows, Value};

/// Snapshot of client-call counts for one pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub begins: usize,
    pub commits: usize,
    pub rollbacks: usize,
}

/// A mock connection pool with injectable begin/commit/rollback failures.
///
/// Every client call is appended to a shared log as `label:op`, so tests
/// can assert both call counts and whether a query went through the pool
/// or through a transaction.
pub struct MockPool {
    label: &'static str,
    fail_begin: Option<&'static str>,
    fail_commit: Option<&'static str>,
    fail_rollback: Option<&'static str>,
    counters: Arc<Mutex<Counters>>,
    log: Arc<Mutex<Vec<String>>>,
}

impl MockPool {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            fail_begin: None,
            fail_commit: None,
            fail_rollback: None,
            counters: Arc::new(Mutex::new(Counters::default())),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Makes `begin` fail with the given message.
    pub fn fail_begin(mut self, msg: &'static str) -> Self {
        self.fail_begin = Some(msg);
        self
    }

    /// Makes `commit` fail with the given message.
    pub fn fail_commit(mut self, msg: &'static str) -> Self {
        self.fail_commit = Some(msg);
        self
    }

    /// Makes `rollback` fail with the given message.
    pub fn fail_rollback(mut self, msg: &'static str) -> Self {
        self.fail_rollback = Some(msg);
        self
    }

    /// Current call counts.
    pub fn counters(&self) -> Counters {
        *self.counters.lock()
    }

    /// The recorded call log.
    pub fn log(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    fn record(&self, op: &str) {
        self.log.lock().push(format!("{}:{}", self.label, op));
    }
}

impl Queryable for MockPool {
    fn query(&self, sql: &str, _params: &[Value]) -> Result<Rows> {
        self.record(&format!("pool:query:{sql}"));
        Ok(Rows::default())
    }

    fn query_row(&self, sql: &str, _params: &[Value]) -> Result<Option<Row>> {
        self.record(&format!("pool:query_row:{sql}"));
        Ok(None)
    }

    fn execute(&self, sql: &str, _params: &[Value]) -> Result<u64> {
        self.record(&format!("pool:execute:{sql}"));
        Ok(1)
    }
}

impl ConnectionPool for MockPool {
    fn begin(&self) -> Result<Box<dyn PoolTransaction>> {
        self.counters.lock().begins += 1;
        self.record("begin");
        if let Some(msg) = self.fail_begin {
            bail!("{msg}");
        }
        Ok(Box::new(MockTransaction {
            label: self.label,
            fail_commit: self.fail_commit,
            fail_rollback: self.fail_rollback,
            counters: self.counters.clone(),
            log: self.log.clone(),
        }))
    }
}

/// Transaction produced by [`MockPool::begin`]; shares the pool's log and
/// counters.
pub struct MockTransaction {
    label: &'static str,
    fail_commit: Option<&'static str>,
    fail_rollback: Option<&'static str>,
    counters: Arc<Mutex<Counters>>,
    log: Arc<Mutex<Vec<String>>>,
}

impl MockTransaction {
    fn record(&self, op: &str) {
        self.log.lock().push(format!("{}:{}", self.label, op));
    }
}

impl Queryable for MockTransaction {
    fn query(&self, sql: &str, _params: &[Value]) -> Result<Rows> {
        self.record(&format!("tx:query:{sql}"));
        Ok(Rows::default())
    }

    fn query_row(&self, sql: &str, _params: &[Value]) -> Result<Option<Row>> {
        self.record(&format!("tx:query_row:{sql}"));
        Ok(None)
    }

    fn execute(&self, sql: &str, _params: &[Value]) -> Result<u64> {
        self.record(&format!("tx:execute:{sql}"));
        Ok(1)
    }
}

impl PoolTransaction for MockTransaction {
    fn commit(&self) -> Result<()> {
        self.counters.lock().commits += 1;
        self.record("commit");
        if let Some(msg) = self.fail_commit {
            bail!("{msg}");
        }
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        self.counters.lock().rollbacks += 1;
        self.record("rollback");
        if let Some(msg) = self.fail_rollback {
            bail!("{msg}");
        }
        Ok(())
    }
}
