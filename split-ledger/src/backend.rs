//! Persistence collaborator hooks
//!
//! The book never encodes data itself. A [`Backend`] is told when an edit
//! session opens, when a commit produced a net change, and when an edit is
//! abandoned; loaders populate a fresh book through [`Backend::load`].
//!
//! Hooks other than `load` run while the book holds its state lock and must
//! not call back into the [`Book`].

use crate::book::Book;
use crate::split::Split;
use crate::transaction::Transaction;
use crate::types::TransactionId;
use crate::Result;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Net change produced by a commit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CommitEvent {
    /// Transaction was created or changed
    Modified {
        /// Committed transaction
        transaction: Transaction,
        /// Its splits, in transaction order
        splits: Vec<Split>,
    },

    /// Transaction was destroyed; carries its last committed state
    Destroyed {
        /// Transaction as it was before the session
        transaction: Transaction,
        /// Splits freed by the commit
        splits: Vec<Split>,
    },
}

impl CommitEvent {
    /// Transaction the event refers to
    pub fn transaction_id(&self) -> TransactionId {
        match self {
            CommitEvent::Modified { transaction, .. } => transaction.id(),
            CommitEvent::Destroyed { transaction, .. } => transaction.id(),
        }
    }
}

/// Persistence collaborator
pub trait Backend: Send + Sync + fmt::Debug {
    /// Called when an edit session opens on a transaction
    fn begin_edit(&self, _transaction: &Transaction) -> Result<()> {
        Ok(())
    }

    /// Called exactly once per commit that produced a net change.
    ///
    /// An error rolls the in-memory edit back.
    fn commit_edit(&self, _event: &CommitEvent) -> Result<()> {
        Ok(())
    }

    /// Called when an edit session is rolled back
    fn rollback_edit(&self, _transaction: TransactionId) {}

    /// Populate a book at startup
    fn load(&self, _book: &Book) -> Result<()> {
        Ok(())
    }
}

/// Backend that accepts everything and stores nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBackend;

impl Backend for NullBackend {}

/// Backend that records every hook invocation in memory
#[derive(Debug, Default)]
pub struct RecordingBackend {
    begins: Mutex<Vec<TransactionId>>,
    commits: Mutex<Vec<CommitEvent>>,
    rollbacks: Mutex<Vec<TransactionId>>,
    reject_commits: Mutex<bool>,
}

impl RecordingBackend {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent commits fail
    pub fn set_reject_commits(&self, reject: bool) {
        *self.reject_commits.lock() = reject;
    }

    /// Transactions for which a session was opened
    pub fn begins(&self) -> Vec<TransactionId> {
        self.begins.lock().clone()
    }

    /// Commit notifications received
    pub fn commits(&self) -> Vec<CommitEvent> {
        self.commits.lock().clone()
    }

    /// Transactions rolled back
    pub fn rollbacks(&self) -> Vec<TransactionId> {
        self.rollbacks.lock().clone()
    }
}

impl Backend for RecordingBackend {
    fn begin_edit(&self, transaction: &Transaction) -> Result<()> {
        self.begins.lock().push(transaction.id());
        Ok(())
    }

    fn commit_edit(&self, event: &CommitEvent) -> Result<()> {
        if *self.reject_commits.lock() {
            return Err(crate::Error::Backend(format!(
                "commit of {} rejected",
                event.transaction_id()
            )));
        }
        self.commits.lock().push(event.clone());
        Ok(())
    }

    fn rollback_edit(&self, transaction: TransactionId) {
        self.rollbacks.lock().push(transaction);
    }
}

/// Backend appending every commit event to a file as one JSON line
#[derive(Debug)]
pub struct JournalBackend {
    path: PathBuf,
    file: Mutex<File>,
}

impl JournalBackend {
    /// Open (creating if needed) the journal at `path` for appending
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        debug!(path = %path.display(), "Journal opened");
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Journal location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back every event in the journal at `path`, oldest first
    pub fn read_events(path: impl AsRef<Path>) -> Result<Vec<CommitEvent>> {
        let reader = BufReader::new(File::open(path)?);
        let mut events = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            events.push(serde_json::from_str(&line)?);
        }
        Ok(events)
    }
}

impl Backend for JournalBackend {
    fn commit_edit(&self, event: &CommitEvent) -> Result<()> {
        let mut line = serde_json::to_string(event)?;
        line.push('\n');
        let mut file = self.file.lock();
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}
