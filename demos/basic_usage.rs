//! Basic usage of the transaction scope.
//!
//! Shows the two access modes: a scope without a registry falls through to
//! the bare pool, while an attached registry routes every call site into
//! one shared transaction that commits or rolls back as a unit.
//!
//! Run with: cargo run --example basic_usage

use anyhow::{anyhow, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use txscope::scope;
use txscope::{
    ConnectionPool, PoolTransaction, Queryable, RequestScope, Row, Rows, SharedPool, Value,
};

/// A toy in-memory "database": every executed statement appends its params
/// as a row; transactions buffer rows until commit.
struct MemoryPool {
    name: &'static str,
    storage: Arc<Mutex<Vec<Row>>>,
}

struct MemoryTransaction {
    storage: Arc<Mutex<Vec<Row>>>,
    pending: Mutex<Vec<Row>>,
}

impl MemoryPool {
    fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            storage: Arc::new(Mutex::new(Vec::new())),
        })
    }

    fn row_count(&self) -> usize {
        self.storage.lock().len()
    }
}

impl Queryable for MemoryPool {
    fn query(&self, _sql: &str, _params: &[Value]) -> Result<Rows> {
        Ok(Rows {
            columns: vec!["value".to_string()],
            rows: self.storage.lock().clone(),
        })
    }

    fn query_row(&self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        Ok(self.query(sql, params)?.rows.into_iter().next())
    }

    fn execute(&self, _sql: &str, params: &[Value]) -> Result<u64> {
        self.storage.lock().push(params.to_vec());
        Ok(1)
    }
}

impl ConnectionPool for MemoryPool {
    fn begin(&self) -> Result<Box<dyn PoolTransaction>> {
        Ok(Box::new(MemoryTransaction {
            storage: self.storage.clone(),
            pending: Mutex::new(Vec::new()),
        }))
    }
}

impl Queryable for MemoryTransaction {
    fn query(&self, _sql: &str, _params: &[Value]) -> Result<Rows> {
        let mut rows = self.storage.lock().clone();
        rows.extend(self.pending.lock().iter().cloned());
        Ok(Rows {
            columns: vec!["value".to_string()],
            rows,
        })
    }

    fn query_row(&self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        Ok(self.query(sql, params)?.rows.into_iter().next())
    }

    fn execute(&self, _sql: &str, params: &[Value]) -> Result<u64> {
        self.pending.lock().push(params.to_vec());
        Ok(1)
    }
}

impl PoolTransaction for MemoryTransaction {
    fn commit(&self) -> Result<()> {
        let mut pending = self.pending.lock();
        self.storage.lock().extend(pending.drain(..));
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        self.pending.lock().clear();
        Ok(())
    }
}

fn main() -> Result<()> {
    let users = MemoryPool::new("users");
    let pool: SharedPool = users.clone();

    // Non-transactional mode: a scope with nothing attached hands out the
    // bare pool, and writes land immediately.
    let request = RequestScope::new();
    let handle = scope::acquire(Some(&request), &pool)?;
    handle.execute("insert into users", &[Value::Text("alice".to_string())])?;
    println!(
        "[{}] direct write, transactional = {}, rows = {}",
        users.name,
        handle.is_transactional(),
        users.row_count()
    );

    // Transactional mode: everything inside the closure shares one
    // transaction, committed only because the closure succeeds.
    scope::run(|request| {
        let handle = scope::acquire(Some(request), &pool)?;
        handle.execute("insert into users", &[Value::Text("bob".to_string())])?;
        handle.execute("insert into users", &[Value::Text("carol".to_string())])?;
        println!(
            "[{}] inside transaction, visible rows = {}",
            users.name,
            handle.query("select * from users", &[])?.len()
        );
        Ok(())
    })?;
    println!("[{}] after commit, rows = {}", users.name, users.row_count());

    // A failing closure rolls the same work back.
    let err = scope::run::<(), _>(|request| {
        let handle = scope::acquire(Some(request), &pool)?;
        handle.execute("insert into users", &[Value::Text("mallory".to_string())])?;
        Err(anyhow!("validation failed"))
    })
    .unwrap_err();
    println!(
        "[{}] after failed request ({}), rows = {}",
        users.name,
        err,
        users.row_count()
    );

    Ok(())
}
