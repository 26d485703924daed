//! Request-scoped carrier and accessor operations.
//!
//! The carrier is explicit dependency injection: the application owns one
//! [`RequestScope`] per logical request and passes it (or nothing) down
//! its call chains. An unbound scope means non-transactional mode; an
//! absent scope is a programming error for [`acquire`].

use anyhow::anyhow;

use crate::client::SharedPool;
use crate::error::{Result, TxnError, ERR_SEP};
use crate::handle::AccessHandle;
use crate::registry::TxnRegistry;

/// Per-request carrier optionally holding the active transaction registry.
#[derive(Clone, Default)]
pub struct RequestScope {
    registry: Option<TxnRegistry>,
}

impl RequestScope {
    /// A scope with no registry bound: non-transactional mode.
    pub fn new() -> Self {
        Self { registry: None }
    }

    /// Creates a new registry and binds it to this scope, overwriting any
    /// prior binding (there is no nesting).
    ///
    /// Returns a registry handle for the caller to finalize at the end of
    /// the request.
    pub fn attach(&mut self) -> TxnRegistry {
        let registry = TxnRegistry::new();
        self.registry = Some(registry.clone());
        registry
    }

    /// The bound registry, if any.
    pub fn registry(&self) -> Option<&TxnRegistry> {
        self.registry.as_ref()
    }
}

/// Finds the registry bound to `scope`.
///
/// An absent scope and an unbound scope both yield `None`; neither is an
/// error.
pub fn lookup(scope: Option<&RequestScope>) -> Option<TxnRegistry> {
    scope.and_then(|s| s.registry.clone())
}

/// Obtains a query handle for `pool`.
///
/// Without a scope this fails with [`TxnError::MissingScope`] and opens
/// nothing. With a scope but no bound registry the handle wraps the pool
/// directly. With a bound registry the handle wraps the request
/// transaction for the pool, beginning it on first use.
pub fn acquire(scope: Option<&RequestScope>, pool: &SharedPool) -> Result<AccessHandle> {
    let scope = scope.ok_or(TxnError::MissingScope)?;
    match scope.registry() {
        None => Ok(AccessHandle::direct(pool.clone())),
        Some(registry) => {
            let tx = registry.begin_or_reuse(pool)?;
            Ok(AccessHandle::transactional(tx, registry.clone()))
        }
    }
}

/// Reports a participant error into the registry bound to `scope`.
///
/// Returns false (and drops the error) when no registry is active.
pub fn report_error(scope: Option<&RequestScope>, err: anyhow::Error) -> bool {
    match lookup(scope) {
        Some(registry) => registry.report_error(err),
        None => false,
    }
}

/// Accumulated participant errors for `scope`, joined with
/// [`ERR_SEP`](crate::error::ERR_SEP). `None` when no registry is bound
/// or nothing was reported.
pub fn collected_error(scope: Option<&RequestScope>) -> Option<TxnError> {
    lookup(scope).and_then(|registry| registry.collected_error())
}

/// Runs `f` inside a transactional scope, finalizing on every exit path.
///
/// On `Ok` the registry commits everything; a finalize failure becomes
/// the result. On `Err` the error is reported first, forcing rollback of
/// every open transaction, and a finalize failure is merged so both
/// messages survive.
pub fn run<T, F>(f: F) -> anyhow::Result<T>
where
    F: FnOnce(&RequestScope) -> anyhow::Result<T>,
{
    let mut scope = RequestScope::new();
    let registry = scope.attach();

    match f(&scope) {
        Ok(value) => match registry.finalize() {
            Ok(()) => Ok(value),
            Err(fin) => Err(fin.into()),
        },
        Err(err) => {
            registry.report_error(anyhow!("{err}"));
            match registry.finalize() {
                Ok(()) => Err(err),
                Err(fin) => Err(anyhow!("{err}{ERR_SEP}{fin}")),
            }
        }
    }
}
