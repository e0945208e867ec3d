//! Ledger engine errors.
//!
//! Insufficient funds is deliberately absent: the guarded mutation reports it as
//! `Ok(false)` so callers can drive an "insufficient funds" dialog from a bool.

use thiserror::Error;

use bankledger_core::{AccountKind, DomainError};

use crate::persistence::PersistenceError;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// The mutation named an account kind the snapshot does not contain.
    #[error("no account of kind '{0}' in the ledger")]
    UnknownAccount(AccountKind),

    /// The snapshot could not be written; nothing was changed or broadcast.
    #[error("persistence unavailable: {0}")]
    PersistenceUnavailable(#[from] PersistenceError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}
