//! Error types for transaction coordination.

use thiserror::Error;

use crate::registry::PoolId;

/// Separator used when collapsing multiple error messages into one.
pub const ERR_SEP: &str = "; ";

/// Errors surfaced by the coordinator.
///
/// Participant errors reported into a registry are plain `anyhow` errors;
/// this enum covers the coordinator's own failure modes.
#[derive(Error, Debug)]
pub enum TxnError {
    /// The underlying pool could not open a transaction.
    #[error("failed to begin transaction on {pool}: {message}")]
    Begin { pool: PoolId, message: String },

    /// Accumulated participant errors, joined with [`ERR_SEP`].
    #[error("{0}")]
    Reported(String),

    /// Commit or rollback failures raised while finalizing, joined with
    /// [`ERR_SEP`]. Independent of the participant errors that decided
    /// between commit and rollback.
    #[error("{0}")]
    Finalize(String),

    /// A query handle was requested without a request scope.
    #[error("missing request scope")]
    MissingScope,
}

pub type Result<T> = std::result::Result<T, TxnError>;
