//! Query handles over direct or transactional access.

use std::fmt;

use anyhow::Result;

use crate::client::{Queryable, Row, Rows, SharedPool, SharedTransaction, Value};
use crate::registry::TxnRegistry;

/// A capability handle for query execution.
///
/// `Direct` wraps the bare pool (non-transactional mode); `Transactional`
/// wraps the request's shared transaction for the pool plus the registry
/// that participant errors are reported into. The handle is a view: it
/// owns neither side.
pub enum AccessHandle {
    /// Queries run directly against the pool.
    Direct { pool: SharedPool },
    /// Queries run inside the request transaction for the pool.
    Transactional {
        tx: SharedTransaction,
        registry: TxnRegistry,
    },
}

impl fmt::Debug for AccessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessHandle::Direct { .. } => f.write_str("AccessHandle::Direct"),
            AccessHandle::Transactional { .. } => f.write_str("AccessHandle::Transactional"),
        }
    }
}

impl AccessHandle {
    /// Handle bound directly to a pool.
    pub fn direct(pool: SharedPool) -> Self {
        AccessHandle::Direct { pool }
    }

    /// Handle bound to an open transaction and its registry.
    pub fn transactional(tx: SharedTransaction, registry: TxnRegistry) -> Self {
        AccessHandle::Transactional { tx, registry }
    }

    /// True when queries through this handle run inside a transaction.
    pub fn is_transactional(&self) -> bool {
        matches!(self, AccessHandle::Transactional { .. })
    }

    /// The registry behind a transactional handle.
    pub fn registry(&self) -> Option<&TxnRegistry> {
        match self {
            AccessHandle::Direct { .. } => None,
            AccessHandle::Transactional { registry, .. } => Some(registry),
        }
    }

    /// The transaction behind a transactional handle.
    pub fn transaction(&self) -> Option<&SharedTransaction> {
        match self {
            AccessHandle::Direct { .. } => None,
            AccessHandle::Transactional { tx, .. } => Some(tx),
        }
    }

    /// Reports a participant error into the active registry.
    ///
    /// Returns false (and drops the error) on a direct handle: with no
    /// registry there is nothing to roll back.
    pub fn report_error(&self, err: anyhow::Error) -> bool {
        match self {
            AccessHandle::Direct { .. } => false,
            AccessHandle::Transactional { registry, .. } => registry.report_error(err),
        }
    }
}

impl Queryable for AccessHandle {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Rows> {
        match self {
            AccessHandle::Direct { pool } => pool.query(sql, params),
            AccessHandle::Transactional { tx, .. } => tx.query(sql, params),
        }
    }

    fn query_row(&self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        match self {
            AccessHandle::Direct { pool } => pool.query_row(sql, params),
            AccessHandle::Transactional { tx, .. } => tx.query_row(sql, params),
        }
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        match self {
            AccessHandle::Direct { pool } => pool.execute(sql, params),
            AccessHandle::Transactional { tx, .. } => tx.execute(sql, params),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockPool;
    use anyhow::anyhow;
    use std::sync::Arc;

    #[test]
    fn test_direct_handle_queries_pool() {
        let mock = Arc::new(MockPool::new("a"));
        let pool: SharedPool = mock.clone();

        let handle = AccessHandle::direct(pool);
        assert!(!handle.is_transactional());
        assert!(handle.registry().is_none());
        assert!(handle.transaction().is_none());

        handle.execute("insert", &[]).unwrap();
        assert_eq!(mock.log(), vec!["a:pool:execute:insert"]);
    }

    #[test]
    fn test_direct_handle_report_error_is_a_noop() {
        let mock = Arc::new(MockPool::new("a"));
        let handle = AccessHandle::direct(mock);
        assert!(!handle.report_error(anyhow!("some-error")));
    }

    #[test]
    fn test_transactional_handle_queries_transaction() {
        let mock = Arc::new(MockPool::new("a"));
        let pool: SharedPool = mock.clone();

        let registry = TxnRegistry::new();
        let tx = registry.begin_or_reuse(&pool).unwrap();
        let handle = AccessHandle::transactional(tx, registry.clone());

        assert!(handle.is_transactional());
        handle.query("select", &[]).unwrap();
        assert_eq!(mock.log(), vec!["a:begin", "a:tx:query:select"]);
    }

    #[test]
    fn test_transactional_handle_reports_into_registry() {
        let mock = Arc::new(MockPool::new("a"));
        let pool: SharedPool = mock.clone();

        let registry = TxnRegistry::new();
        let tx = registry.begin_or_reuse(&pool).unwrap();
        let handle = AccessHandle::transactional(tx, registry.clone());

        assert!(handle.report_error(anyhow!("e1")));
        assert!(registry.has_errors());
        assert_eq!(registry.collected_error().unwrap().to_string(), "e1");
    }
}
