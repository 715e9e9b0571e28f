//! Error types for the split ledger

use crate::types::{AccountId, LotId, SplitId, TransactionId};
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Mutator called on a transaction without an open edit session
    #[error("Transaction not open for editing: {0}")]
    NotEditing(TransactionId),

    /// Edit session already held by another caller context
    #[error("Transaction is being edited elsewhere: {0}")]
    SessionBusy(TransactionId),

    /// Transaction not found
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    /// Split not found
    #[error("Split not found: {0}")]
    SplitNotFound(SplitId),

    /// Account not found
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Lot not found
    #[error("Lot not found: {0}")]
    LotNotFound(LotId),

    /// Split already belongs to a different transaction
    #[error("Split {split} already belongs to transaction {owner}")]
    SplitOwned {
        /// Split being appended
        split: SplitId,
        /// Transaction that currently owns it
        owner: TransactionId,
    },

    /// Split is not a member of the given transaction
    #[error("Split {split} is not part of transaction {transaction}")]
    NotMember {
        /// Split in question
        split: SplitId,
        /// Transaction it was expected in
        transaction: TransactionId,
    },

    /// Predicate could not be built for the requested parameter
    #[error("Invalid predicate: {0}")]
    InvalidPredicate(String),

    /// Persistence collaborator rejected a change
    #[error("Backend error: {0}")]
    Backend(String),

    /// Journal encoding error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::InvalidPredicate(err.to_string())
    }
}
