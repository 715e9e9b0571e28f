//! Split Ledger
//!
//! Double-entry ledger core: accounts, transactions and their splits, an
//! edit-session protocol around every transaction mutation, automatic
//! balancing, and a predicate query engine over splits.
//!
//! # Architecture
//!
//! - **Arena**: a [`Book`] owns every entity; entities refer to each other by GUID
//! - **Edit sessions**: mutations happen between `begin_edit` and
//!   `commit_edit`/`rollback_edit`; rollback restores a snapshot
//! - **Balancing**: commit enforces the configured double-entry policy
//! - **Queries**: disjunctive-normal-form [`Query`] run by a [`QueryExecutor`]
//!
//! # Invariants
//!
//! - A committed transaction under the auto-balance policy sums to zero in
//!   its common currency
//! - Rollback restores every field of the transaction and its splits
//! - Running the same query twice on an unchanged book yields the same
//!   ordered result

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, missing_debug_implementations)]

pub mod account;
pub mod backend;
pub mod balancing;
pub mod book;
pub mod config;
pub mod error;
pub mod kvp;
pub mod lot;
pub mod metrics;
pub mod query;
pub mod session;
pub mod split;
pub mod transaction;
pub mod types;

// Re-exports
pub use account::Account;
pub use backend::{Backend, CommitEvent, JournalBackend, NullBackend, RecordingBackend};
pub use book::Book;
pub use config::{Config, DoubleEntryPolicy, Truncation};
pub use error::{Error, Result};
pub use kvp::{KvpFrame, KvpValue};
pub use lot::Lot;
pub use query::{MatchMode, Query, QueryExecutor, QueryOp, Scope, SortKey};
pub use split::Split;
pub use transaction::Transaction;
pub use types::{
    AccountId, AccountType, Amount, Commodity, IdType, LotId, ReconcileSet, ReconcileState,
    SplitId, TransactionId,
};

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Install a `fmt` subscriber filtered by `RUST_LOG`, or by `fallback`
/// when the variable is unset. Later calls are no-ops.
pub fn init_tracing(fallback: &str) {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
        // another subscriber may already be installed by the host
        let _ = fmt().with_env_filter(filter).try_init();
    });
}
