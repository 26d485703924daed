//! Collaborator contract for the underlying database client.
//!
//! The coordinator consumes these traits; it never implements them. A real
//! deployment backs them with an actual driver; tests and demos back them
//! with in-memory implementations.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Values that cross the query surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Boolean(bool),
    Int64(i64),
    Float64(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// A single result row.
pub type Row = Vec<Value>;

/// A result set: column names plus rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rows {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Rows {
    /// Number of rows in the result set.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the result set has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Uniform query surface shared by pools, transactions, and access handles.
pub trait Queryable {
    /// Runs a query and returns the full result set.
    fn query(&self, sql: &str, params: &[Value]) -> Result<Rows>;

    /// Runs a query expected to produce at most one row.
    fn query_row(&self, sql: &str, params: &[Value]) -> Result<Option<Row>>;

    /// Runs a statement and returns the number of affected rows.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64>;
}

/// An open unit of work against one connection pool.
///
/// Handles are shared; implementations must tolerate exactly one
/// commit-or-rollback call (take-on-close or equivalent).
pub trait PoolTransaction: Queryable + Send + Sync {
    /// Commits the transaction.
    fn commit(&self) -> Result<()>;

    /// Rolls the transaction back.
    fn rollback(&self) -> Result<()>;
}

/// One database endpoint / connection pool.
pub trait ConnectionPool: Queryable + Send + Sync {
    /// Opens a new transaction against this pool.
    fn begin(&self) -> Result<Box<dyn PoolTransaction>>;
}

/// Shared handle to a connection pool.
pub type SharedPool = Arc<dyn ConnectionPool>;

/// Shared handle to an open transaction.
pub type SharedTransaction = Arc<dyn PoolTransaction>;

impl fmt::Debug for dyn PoolTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PoolTransaction")
    }
}
