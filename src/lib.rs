//! Ambient transaction coordination for shared database access.
//!
//! Independent call sites that each need database access share a single
//! transaction per connection pool within one logical request, without
//! threading a transaction handle through every signature. A request
//! boundary attaches a [`TxnRegistry`] to its [`RequestScope`]; downstream
//! code asks [`scope::acquire`] for a query handle and gets either the
//! request transaction for that pool or the bare pool, transparently. At
//! the end of the request, [`TxnRegistry::finalize`] commits everything if
//! no participant reported an error, and rolls everything back otherwise.

pub mod client;
pub mod error;
pub mod handle;
pub mod registry;
pub mod scope;

#[cfg(test)]
mod mock;

// Re-export commonly used types
pub use client::{
    ConnectionPool, PoolTransaction, Queryable, Row, Rows, SharedPool, SharedTransaction, Value,
};
pub use error::{TxnError, ERR_SEP};
pub use handle::AccessHandle;
pub use registry::{PoolId, TxnRegistry};
pub use scope::RequestScope;
