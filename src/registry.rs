//! Per-request transaction registry.
//!
//! A [`TxnRegistry`] tracks, for one logical request, which connection
//! pools already have an open transaction and which errors participants
//! reported along the way. At the end of the request a single finalize
//! call commits everything if nothing was reported, or rolls everything
//! back otherwise.

use std::collections::HashMap;
use std::fmt;
use std::mem;
use std::sync::Arc;

use anyhow::anyhow;
use parking_lot::Mutex;

use crate::client::{SharedPool, SharedTransaction};
use crate::error::{Result, TxnError, ERR_SEP};

/// Identity of one connection pool.
///
/// Derived from the pointer identity of the pool's shared handle: clones
/// of one handle share an id, distinct pools never collide while either
/// handle is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PoolId(usize);

impl PoolId {
    /// Identity of the given pool handle.
    pub fn of(pool: &SharedPool) -> Self {
        Self(Arc::as_ptr(pool) as *const () as usize)
    }

    /// Returns the inner value.
    pub fn value(&self) -> usize {
        self.0
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pool@{:x}", self.0)
    }
}

#[derive(Default)]
struct RegistryState {
    transactions: HashMap<PoolId, SharedTransaction>,
    errors: Vec<anyhow::Error>,
}

/// Registry of open transactions and reported errors for one logical
/// request.
///
/// Cheap to clone; clones share state, so a handle can be held by the
/// request boundary while access handles carry their own reference for
/// error reporting. Intended for a single logical request, not for
/// sharing across independent requests.
#[derive(Clone)]
pub struct TxnRegistry {
    state: Arc<Mutex<RegistryState>>,
}

impl TxnRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(RegistryState::default())),
        }
    }

    /// Returns the open transaction for `pool`, beginning one on first use.
    ///
    /// The underlying begin runs at most once per pool per registry; later
    /// calls are served from the registry. A begin failure is recorded, so
    /// finalize rolls back even if the caller discards the returned error.
    pub fn begin_or_reuse(&self, pool: &SharedPool) -> Result<SharedTransaction> {
        let id = PoolId::of(pool);
        let mut state = self.state.lock();

        if let Some(tx) = state.transactions.get(&id) {
            return Ok(tx.clone());
        }

        match pool.begin() {
            Ok(tx) => {
                let tx: SharedTransaction = Arc::from(tx);
                state.transactions.insert(id, tx.clone());
                Ok(tx)
            }
            Err(err) => {
                let returned = TxnError::Begin {
                    pool: id,
                    message: err.to_string(),
                };
                state.errors.push(err);
                Err(returned)
            }
        }
    }

    /// Records a participant error.
    ///
    /// Non-fatal: execution continues, but finalize will roll back instead
    /// of committing. Returns true once the error is recorded.
    pub fn report_error(&self, err: anyhow::Error) -> bool {
        self.state.lock().errors.push(err);
        true
    }

    /// Commits every open transaction if no error was reported, rolls
    /// every one back otherwise.
    ///
    /// Each pool is visited exactly once, in registry order (unspecified).
    /// Failures raised while committing or rolling back are collected
    /// separately from the reported errors and joined with [`ERR_SEP`];
    /// the reported errors themselves are never part of the return value.
    /// No retries. The registry's transactions are closed afterwards and
    /// the registry must not be reused.
    pub fn finalize(&self) -> Result<()> {
        let (transactions, rollback) = {
            let mut state = self.state.lock();
            let transactions = mem::take(&mut state.transactions);
            (transactions, !state.errors.is_empty())
        };

        let mut failures = Vec::new();
        for tx in transactions.values() {
            let closed = if rollback { tx.rollback() } else { tx.commit() };
            if let Err(err) = closed {
                failures.push(err.to_string());
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(TxnError::Finalize(failures.join(ERR_SEP)))
        }
    }

    /// Runs [`finalize`](Self::finalize) and merges any failure into
    /// `slot`, keeping both messages when `slot` already holds an error.
    ///
    /// Intended for request-unwind cleanup that must run regardless of how
    /// the request exits.
    pub fn finalize_into(&self, slot: &mut Option<anyhow::Error>) {
        if let Err(fin) = self.finalize() {
            *slot = Some(match slot.take() {
                Some(prev) => anyhow!("{prev}{ERR_SEP}{fin}"),
                None => fin.into(),
            });
        }
    }

    /// Accumulated participant errors joined with [`ERR_SEP`], if any.
    pub fn collected_error(&self) -> Option<TxnError> {
        let state = self.state.lock();
        if state.errors.is_empty() {
            return None;
        }
        let msgs: Vec<String> = state.errors.iter().map(|e| e.to_string()).collect();
        Some(TxnError::Reported(msgs.join(ERR_SEP)))
    }

    /// Number of pools with an open transaction.
    pub fn transaction_count(&self) -> usize {
        self.state.lock().transactions.len()
    }

    /// Returns true if any participant error was reported.
    pub fn has_errors(&self) -> bool {
        !self.state.lock().errors.is_empty()
    }

    /// Number of reported errors.
    pub fn error_count(&self) -> usize {
        self.state.lock().errors.len()
    }
}

impl Default for TxnRegistry {
    fn default() -> Self {
        Self::new()
    }
}
