//! Two pools, one request: an error reported against either pool rolls
//! back the transactions on both.
//!
//! Run with: cargo run --example transaction_demo

use anyhow::{anyhow, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use txscope::scope;
use txscope::{
    ConnectionPool, PoolTransaction, Queryable, RequestScope, Row, Rows, SharedPool, Value,
};

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

/// A call site that only knows the scope and its own pool.
fn record_order(request: &RequestScope, orders: &SharedPool, customer: &str) -> Result<()> {
    let handle = scope::acquire(Some(request), orders)?;
    handle.execute("insert into orders", &[Value::Text(customer.to_string())])?;
    Ok(())
}

/// Another call site, writing to a different database.
fn record_audit(request: &RequestScope, audit: &SharedPool, entry: &str) -> Result<()> {
    let handle = scope::acquire(Some(request), audit)?;
    handle.execute("insert into audit", &[Value::Text(entry.to_string())])?;
    Ok(())
}

fn print_counts(orders: &MemoryPool, audit: &MemoryPool) {
    println!(
        "  {} = {} rows, {} = {} rows",
        orders.name,
        orders.row_count(),
        audit.name,
        audit.row_count()
    );
}

fn main() -> Result<()> {
    let orders = MemoryPool::new("orders");
    let audit = MemoryPool::new("audit");
    let orders_pool: SharedPool = orders.clone();
    let audit_pool: SharedPool = audit.clone();

    println!("request 1: both writes succeed, both pools commit");
    scope::run(|request| {
        record_order(request, &orders_pool, "alice")?;
        record_audit(request, &audit_pool, "order placed")?;
        Ok(())
    })?;
    print_counts(&orders, &audit);

    println!("request 2: a reported error rolls back both pools");
    let mut request = RequestScope::new();
    let registry = request.attach();
    record_order(&request, &orders_pool, "bob")?;
    record_audit(&request, &audit_pool, "order placed")?;
    // Some participant decides the request is bad; nobody commits.
    scope::report_error(Some(&request), anyhow!("payment declined"));
    if let Some(collected) = scope::collected_error(Some(&request)) {
        println!("  collected: {collected}");
    }
    registry.finalize()?;
    print_counts(&orders, &audit);

    Ok(())
}
