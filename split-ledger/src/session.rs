//! Edit sessions: the begin/commit/rollback guard around transaction mutation
//!
//! # State machine
//!
//! - **Closed** → `begin_edit` → **Open**
//! - **Open** → `commit_edit` | `rollback_edit` → **Closed**
//!
//! A session belongs to the thread that opened it. Nested `begin_edit` calls
//! from that thread only bump a depth counter; the matching outermost commit
//! or rollback does the work. Another thread trying to open the same
//! transaction gets [`Error::SessionBusy`].
//!
//! # Rollback
//!
//! Opening a session snapshots the transaction and every member split.
//! Rollback unlinks whatever the transaction currently holds, frees splits
//! that were not in the snapshot and reinstates the snapshot, account
//! linkage included. Special accounts the session created and left empty
//! are dropped again.
//!
//! A split removed inside a session stays reserved for that session until it
//! closes; appending it elsewhere fails with [`Error::SplitOwned`].

use crate::book::{Book, BookState};
use crate::config::DoubleEntryPolicy;
use crate::kvp::KvpValue;
use crate::split::{Split, VOID_FORMER_AMOUNT, VOID_FORMER_VALUE};
use crate::transaction::{Transaction, NOTES_SLOT};
use crate::backend::CommitEvent;
use crate::types::{AccountId, Amount, Commodity, LotId, ReconcileState, SplitId, TransactionId};
use crate::{Error, Result};
use chrono::{DateTime, TimeZone, Utc};
use dashmap::mapref::one::RefMut;
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashSet};
use std::thread::{self, ThreadId};
use tracing::{debug, error, warn};

/// State captured when a session opens
#[derive(Debug, Clone)]
pub(crate) struct Snapshot {
    pub(crate) transaction: Transaction,
    pub(crate) splits: Vec<Split>,
}

/// An open edit session on one transaction
#[derive(Debug)]
pub(crate) struct EditSession {
    pub(crate) owner: ThreadId,
    pub(crate) depth: u32,
    pub(crate) defer_balance: bool,
    pub(crate) destroy_pending: bool,
    pub(crate) snapshot: Snapshot,
    /// Splits detached during the session, freed on commit
    pub(crate) removed: Vec<SplitId>,
    /// Special accounts created while balancing inside the session
    pub(crate) created_accounts: Vec<AccountId>,
}

impl EditSession {
    fn new(owner: ThreadId, defer_balance: bool, snapshot: Snapshot) -> Self {
        Self {
            owner,
            depth: 1,
            defer_balance,
            destroy_pending: false,
            snapshot,
            removed: Vec::new(),
            created_accounts: Vec::new(),
        }
    }
}

enum Close {
    NotOpen,
    Nested,
    Outermost(EditSession),
}

impl Book {
    /// Open an edit session on a transaction.
    ///
    /// With `defer_balance` set, amount setters stop rebalancing sibling
    /// splits until the session commits.
    pub fn begin_edit(&self, trans: TransactionId, defer_balance: bool) -> Result<()> {
        let state = self.state.write();
        let caller = thread::current().id();

        if let Some(mut session) = self.editors.get_mut(&trans) {
            if session.owner == caller {
                session.depth += 1;
                debug!(transaction_id = %trans, depth = session.depth, "Nested begin_edit");
                return Ok(());
            }
            warn!(transaction_id = %trans, "Transaction already open in another context");
            self.metrics.record_contract_violation();
            return Err(Error::SessionBusy(trans));
        }

        let snapshot = Snapshot {
            transaction: state.transaction(trans)?.clone(),
            splits: state.transaction_splits(trans)?,
        };
        self.backend.begin_edit(&snapshot.transaction)?;
        self.editors
            .insert(trans, EditSession::new(caller, defer_balance, snapshot));
        self.metrics.record_session_opened();
        debug!(transaction_id = %trans, defer_balance, "Edit session opened");
        Ok(())
    }

    /// True while an edit session is open on the transaction
    pub fn is_open(&self, trans: TransactionId) -> bool {
        self.editors.contains_key(&trans)
    }

    /// Close the session, balancing and notifying the backend.
    ///
    /// Without a matching `begin_edit` this logs a warning and does nothing.
    pub fn commit_edit(&self, trans: TransactionId) -> Result<()> {
        let mut state = self.state.write();
        let session = match self.close(trans, "commit_edit")? {
            Close::NotOpen | Close::Nested => return Ok(()),
            Close::Outermost(session) => session,
        };
        self.finish_commit(&mut state, trans, session)
    }

    /// Close the session, restoring the state captured at `begin_edit`.
    ///
    /// Without a matching `begin_edit` this logs a warning and does nothing.
    pub fn rollback_edit(&self, trans: TransactionId) -> Result<()> {
        let mut state = self.state.write();
        let session = match self.close(trans, "rollback_edit")? {
            Close::NotOpen | Close::Nested => return Ok(()),
            Close::Outermost(session) => session,
        };
        restore_snapshot(&mut state, trans, &session);
        self.backend.rollback_edit(trans);
        self.metrics.record_rollback();
        debug!(transaction_id = %trans, "Edit session rolled back");
        Ok(())
    }

    /// Mark every split for removal; the transaction is freed by the next
    /// commit if it is still empty then.
    pub fn destroy_transaction(&self, trans: TransactionId) -> Result<()> {
        let mut state = self.state.write();
        let mut session = self.open_session(trans, "destroy_transaction")?;
        let members = state.transaction(trans)?.splits.clone();
        for split in members {
            detach(&mut state, &mut session, trans, split)?;
        }
        session.destroy_pending = true;
        debug!(transaction_id = %trans, "Transaction marked for destruction");
        Ok(())
    }

    /// Attach an unowned split to the transaction and file it under its account
    pub fn append_split(&self, trans: TransactionId, split: SplitId) -> Result<()> {
        let mut state = self.state.write();
        if let Some(owner) = self.pending_owner(trans, split) {
            warn!(split_id = %split, owner = %owner, "Split removed in another open session");
            self.metrics.record_contract_violation();
            return Err(Error::SplitOwned { split, owner });
        }
        let mut session = self.open_session(trans, "append_split")?;
        match state.split(split)?.transaction {
            Some(owner) if owner == trans => return Ok(()),
            Some(owner) => {
                warn!(split_id = %split, owner = %owner, "Split already owned by another transaction");
                return Err(Error::SplitOwned { split, owner });
            }
            None => {}
        }

        let currency = state.effective_currency(trans)?;
        let entry = state.split_mut(split)?;
        entry.transaction = Some(trans);
        if let Some(currency) = currency {
            entry.value = currency.round(entry.value);
        }
        state.transaction_mut(trans)?.splits.push(split);
        state.link(split);
        session.removed.retain(|s| *s != split);
        debug!(transaction_id = %trans, split_id = %split, "Split appended");
        Ok(())
    }

    /// Detach a split from the transaction and its account; freed on commit
    pub fn remove_split(&self, trans: TransactionId, split: SplitId) -> Result<()> {
        let mut state = self.state.write();
        let mut session = self.open_session(trans, "remove_split")?;
        if state.split(split)?.transaction != Some(trans) {
            return Err(Error::NotMember {
                split,
                transaction: trans,
            });
        }
        detach(&mut state, &mut session, trans, split)
    }

    /// Destroy a split.
    ///
    /// An attached split is removed from its transaction and account in one
    /// step and freed on the owner's next commit; the owner's session must be
    /// open. An unattached split is freed at once.
    pub fn destroy_split(&self, split: SplitId) -> Result<()> {
        let mut state = self.state.write();
        let Some(trans) = state.split(split)?.transaction else {
            state.splits.remove(&split);
            return Ok(());
        };
        let mut session = self.open_session(trans, "destroy_split")?;
        detach(&mut state, &mut session, trans, split)
    }

    // ----- transaction setters -----

    /// Set the posted date
    pub fn set_date_posted(&self, trans: TransactionId, date: DateTime<Utc>) -> Result<()> {
        self.edit_transaction(trans, "set_date_posted", |t| t.date_posted = date)
    }

    /// Set the posted date from epoch seconds
    pub fn set_date_posted_secs(&self, trans: TransactionId, secs: i64) -> Result<()> {
        let date = Utc
            .timestamp_opt(secs, 0)
            .single()
            .ok_or_else(|| Error::Other(format!("Timestamp out of range: {}", secs)))?;
        self.set_date_posted(trans, date)
    }

    /// Set the posted date to now
    pub fn set_date_posted_today(&self, trans: TransactionId) -> Result<()> {
        self.set_date_posted(trans, Utc::now())
    }

    /// Set the entered date
    pub fn set_date_entered(&self, trans: TransactionId, date: DateTime<Utc>) -> Result<()> {
        self.edit_transaction(trans, "set_date_entered", |t| t.date_entered = date)
    }

    /// Set the check number
    pub fn set_num(&self, trans: TransactionId, num: impl Into<String>) -> Result<()> {
        let num = num.into();
        self.edit_transaction(trans, "set_num", |t| t.num = num)
    }

    /// Set the description
    pub fn set_description(&self, trans: TransactionId, description: impl Into<String>) -> Result<()> {
        let description = description.into();
        self.edit_transaction(trans, "set_description", |t| t.description = description)
    }

    /// Set the currency split values are expressed in
    pub fn set_currency(&self, trans: TransactionId, currency: Commodity) -> Result<()> {
        self.edit_transaction(trans, "set_currency", |t| t.currency = Some(currency))
    }

    /// Set free-form notes
    pub fn set_notes(&self, trans: TransactionId, notes: impl Into<String>) -> Result<()> {
        let notes = notes.into();
        self.edit_transaction(trans, "set_notes", |t| {
            t.kvp.set(NOTES_SLOT, KvpValue::String(notes))
        })
    }

    /// Store a metadata slot on the transaction
    pub fn set_transaction_kvp(&self, trans: TransactionId, path: &str, value: KvpValue) -> Result<()> {
        self.edit_transaction(trans, "set_transaction_kvp", |t| t.kvp.set(path, value))
    }

    // ----- split setters -----

    /// File the split under another account (or none)
    pub fn set_split_account(&self, split: SplitId, account: Option<AccountId>) -> Result<()> {
        self.edit_split(split, "set_split_account", false, |state, id| {
            if let Some(account) = account {
                state.account(account)?;
            }
            state.unlink(id);
            state.split_mut(id)?.account = account;
            state.link(id);
            Ok(())
        })
    }

    /// Set the memo
    pub fn set_memo(&self, split: SplitId, memo: impl Into<String>) -> Result<()> {
        let memo = memo.into();
        self.edit_split(split, "set_memo", false, |state, id| {
            state.split_mut(id)?.memo = memo;
            Ok(())
        })
    }

    /// Set the action
    pub fn set_action(&self, split: SplitId, action: impl Into<String>) -> Result<()> {
        let action = action.into();
        self.edit_split(split, "set_action", false, |state, id| {
            state.split_mut(id)?.action = action;
            Ok(())
        })
    }

    /// Set the reconcile state; reconciling stamps the date if none is set
    pub fn set_reconcile(&self, split: SplitId, reconcile: ReconcileState) -> Result<()> {
        self.edit_split(split, "set_reconcile", false, |state, id| {
            let entry = state.split_mut(id)?;
            entry.reconcile = reconcile;
            if reconcile == ReconcileState::Reconciled && entry.date_reconciled.is_none() {
                entry.date_reconciled = Some(Utc::now());
            }
            Ok(())
        })
    }

    /// Set the reconciled date
    pub fn set_date_reconciled(&self, split: SplitId, date: DateTime<Utc>) -> Result<()> {
        self.edit_split(split, "set_date_reconciled", false, |state, id| {
            state.split_mut(id)?.date_reconciled = Some(date);
            Ok(())
        })
    }

    /// Assign the split to a lot (or none)
    pub fn set_lot(&self, split: SplitId, lot: Option<LotId>) -> Result<()> {
        self.edit_split(split, "set_lot", false, |state, id| {
            if let Some(lot) = lot {
                if !state.lots.contains_key(&lot) {
                    return Err(Error::LotNotFound(lot));
                }
            }
            state.split_mut(id)?.lot = lot;
            Ok(())
        })
    }

    /// Store a metadata slot on the split
    pub fn set_split_kvp(&self, split: SplitId, path: &str, value: KvpValue) -> Result<()> {
        self.edit_split(split, "set_split_kvp", false, |state, id| {
            state.split_mut(id)?.kvp.set(path, value);
            Ok(())
        })
    }

    /// Set the value in the transaction currency
    pub fn set_value(&self, split: SplitId, value: Amount) -> Result<()> {
        self.edit_split(split, "set_value", true, |state, id| {
            let currency = split_currency(state, id)?;
            state.split_mut(id)?.value = round(currency.as_ref(), value);
            Ok(())
        })
    }

    /// Set the amount in the account commodity
    pub fn set_amount(&self, split: SplitId, amount: Amount) -> Result<()> {
        self.edit_split(split, "set_amount", true, |state, id| {
            let commodity = split_commodity(state, id)?;
            state.split_mut(id)?.amount = round(commodity.as_ref(), amount);
            Ok(())
        })
    }

    /// Derive the value from the current amount and a unit price
    pub fn set_share_price(&self, split: SplitId, price: Amount) -> Result<()> {
        self.edit_split(split, "set_share_price", true, |state, id| {
            let currency = split_currency(state, id)?;
            let entry = state.split_mut(id)?;
            entry.value = round(currency.as_ref(), entry.amount * price);
            Ok(())
        })
    }

    /// Set the amount and derive the value from a unit price
    pub fn set_share_price_and_amount(&self, split: SplitId, price: Amount, amount: Amount) -> Result<()> {
        self.edit_split(split, "set_share_price_and_amount", true, |state, id| {
            let currency = split_currency(state, id)?;
            let commodity = split_commodity(state, id)?;
            let entry = state.split_mut(id)?;
            entry.amount = round(commodity.as_ref(), amount);
            entry.value = round(currency.as_ref(), entry.amount * price);
            Ok(())
        })
    }

    /// Set the value, the amount, or both, depending on whether `base` is
    /// the transaction currency and/or the account commodity.
    pub fn set_base_value(&self, split: SplitId, value: Amount, base: &Commodity) -> Result<()> {
        self.edit_split(split, "set_base_value", true, |state, id| {
            if state.split(id)?.account.is_none() {
                return Err(Error::Other(format!("Split {} has no account", id)));
            }
            let currency = split_currency(state, id)?;
            let commodity = split_commodity(state, id)?;
            let is_currency = currency.as_ref() == Some(base);
            let is_commodity = commodity.as_ref() == Some(base);
            if !is_currency && !is_commodity {
                warn!(split_id = %id, base = %base, "Base commodity matches neither currency nor commodity");
                return Err(Error::Other(format!("Inappropriate base commodity {}", base)));
            }
            let entry = state.split_mut(id)?;
            if is_currency {
                entry.value = base.round(value);
            }
            if is_commodity {
                entry.amount = base.round(value);
            }
            Ok(())
        })
    }

    /// Zero a split, remembering its former amount and value
    pub fn void_split(&self, split: SplitId) -> Result<()> {
        self.edit_split(split, "void_split", false, |state, id| {
            let entry = state.split_mut(id)?;
            entry.kvp.set(VOID_FORMER_AMOUNT, KvpValue::Numeric(entry.amount));
            entry.kvp.set(VOID_FORMER_VALUE, KvpValue::Numeric(entry.value));
            entry.amount = Decimal::ZERO;
            entry.value = Decimal::ZERO;
            entry.reconcile = ReconcileState::Voided;
            Ok(())
        })
    }

    /// Restore a voided split's amount and value
    pub fn unvoid_split(&self, split: SplitId) -> Result<()> {
        self.edit_split(split, "unvoid_split", false, |state, id| {
            let entry = state.split_mut(id)?;
            entry.amount = entry.void_former_amount().unwrap_or(Decimal::ZERO);
            entry.value = entry.void_former_value().unwrap_or(Decimal::ZERO);
            entry.reconcile = ReconcileState::NotReconciled;
            entry.kvp.remove(VOID_FORMER_AMOUNT);
            entry.kvp.remove(VOID_FORMER_VALUE);
            Ok(())
        })
    }

    /// Void every split of a transaction and record the reason
    pub fn void_transaction(&self, trans: TransactionId, reason: &str) -> Result<()> {
        self.begin_edit(trans, true)?;
        let result = self.transaction(trans).and_then(|t| {
            for split in t.splits() {
                self.void_split(*split)?;
            }
            self.edit_transaction(trans, "void_transaction", |t| t.set_void_reason(Some(reason)))
        });
        self.close_nested(trans, result)
    }

    /// Undo [`Book::void_transaction`]
    pub fn unvoid_transaction(&self, trans: TransactionId) -> Result<()> {
        self.begin_edit(trans, true)?;
        let result = self.transaction(trans).and_then(|t| {
            for split in t.splits() {
                self.unvoid_split(*split)?;
            }
            self.edit_transaction(trans, "unvoid_transaction", |t| t.set_void_reason(None))
        });
        self.close_nested(trans, result)
    }

    // ----- internals -----

    /// Commit on success, roll back on failure, for operations that open
    /// their own (possibly nested) session
    pub(crate) fn close_nested(&self, trans: TransactionId, result: Result<()>) -> Result<()> {
        match result {
            Ok(()) => self.commit_edit(trans),
            Err(err) => {
                self.rollback_edit(trans)?;
                Err(err)
            }
        }
    }

    /// Another open session holding the split as removed
    fn pending_owner(&self, trans: TransactionId, split: SplitId) -> Option<TransactionId> {
        self.editors
            .iter()
            .find(|entry| *entry.key() != trans && entry.removed.contains(&split))
            .map(|entry| *entry.key())
    }

    /// Record a special account created while the session is open, so that
    /// rollback can drop it
    pub(crate) fn note_created_account(&self, trans: TransactionId, account: Option<AccountId>) {
        if let (Some(account), Some(mut session)) = (account, self.editors.get_mut(&trans)) {
            session.created_accounts.push(account);
        }
    }

    /// Session guard for a mutation by the calling thread
    pub(crate) fn open_session(
        &self,
        trans: TransactionId,
        operation: &'static str,
    ) -> Result<RefMut<'_, TransactionId, EditSession>> {
        match self.editors.get_mut(&trans) {
            Some(session) if session.owner == thread::current().id() => Ok(session),
            Some(_) => {
                warn!(transaction_id = %trans, operation, "Transaction open in another context");
                self.metrics.record_contract_violation();
                Err(Error::SessionBusy(trans))
            }
            None => {
                warn!(transaction_id = %trans, operation, "Mutation outside an edit session");
                self.metrics.record_contract_violation();
                Err(Error::NotEditing(trans))
            }
        }
    }

    fn edit_transaction(
        &self,
        trans: TransactionId,
        operation: &'static str,
        f: impl FnOnce(&mut Transaction),
    ) -> Result<()> {
        let mut state = self.state.write();
        let _session = self.open_session(trans, operation)?;
        f(state.transaction_mut(trans)?);
        Ok(())
    }

    /// Run a split mutation under its owner's session. Unattached splits
    /// need no session.
    fn edit_split(
        &self,
        split: SplitId,
        operation: &'static str,
        rebalance: bool,
        f: impl FnOnce(&mut BookState, SplitId) -> Result<()>,
    ) -> Result<()> {
        let mut state = self.state.write();
        let Some(trans) = state.split(split)?.transaction else {
            return f(&mut *state, split);
        };
        let defer = self.open_session(trans, operation)?.defer_balance;
        f(&mut *state, split)?;
        if rebalance && !defer {
            let created = self.rebalance(&mut state, trans)?;
            self.note_created_account(trans, created);
        }
        Ok(())
    }

    fn close(&self, trans: TransactionId, operation: &'static str) -> Result<Close> {
        let caller = thread::current().id();
        let status = self.editors.get(&trans).map(|s| (s.owner, s.depth));
        match status {
            None => {
                warn!(transaction_id = %trans, operation, "No matching begin_edit");
                Ok(Close::NotOpen)
            }
            Some((owner, _)) if owner != caller => {
                warn!(transaction_id = %trans, operation, "Transaction open in another context");
                self.metrics.record_contract_violation();
                Err(Error::SessionBusy(trans))
            }
            Some((_, depth)) if depth > 1 => {
                if let Some(mut session) = self.editors.get_mut(&trans) {
                    session.depth -= 1;
                }
                Ok(Close::Nested)
            }
            Some(_) => match self.editors.remove(&trans) {
                Some((_, session)) => Ok(Close::Outermost(session)),
                None => Ok(Close::NotOpen),
            },
        }
    }

    fn finish_commit(
        &self,
        state: &mut BookState,
        trans: TransactionId,
        mut session: EditSession,
    ) -> Result<()> {
        if state.transaction(trans)?.currency.is_none() {
            if let Some(currency) = state.common_currency(trans)? {
                state.transaction_mut(trans)?.currency = Some(currency);
            }
        }

        let destroyed = session.destroy_pending && state.transaction(trans)?.splits.is_empty();
        if !destroyed {
            match self.config.double_entry.policy {
                DoubleEntryPolicy::None => {}
                DoubleEntryPolicy::AutoBalance => {
                    if let Some(account) = self.rebalance(state, trans)? {
                        session.created_accounts.push(account);
                    }
                }
                DoubleEntryPolicy::RouteOrphans => {
                    warn!(transaction_id = %trans, "Double-entry policy route_orphans is reserved; not enforced")
                }
            }
        }

        for id in session.removed.drain(..) {
            if state.splits.get(&id).is_some_and(|s| s.transaction.is_none()) {
                state.splits.remove(&id);
            }
        }

        let mut affected: BTreeSet<AccountId> = session
            .snapshot
            .splits
            .iter()
            .filter_map(|s| s.account)
            .collect();

        let event = if destroyed {
            state.transactions.remove(&trans);
            Some(CommitEvent::Destroyed {
                transaction: session.snapshot.transaction.clone(),
                splits: session.snapshot.splits.clone(),
            })
        } else {
            let transaction = state.transaction(trans)?.clone();
            let splits = state.transaction_splits(trans)?;
            affected.extend(splits.iter().filter_map(|s| s.account));
            if transaction != session.snapshot.transaction || splits != session.snapshot.splits {
                Some(CommitEvent::Modified {
                    transaction,
                    splits,
                })
            } else {
                None
            }
        };

        for account in affected {
            state.sort_account(account);
        }

        if let Some(event) = event {
            if let Err(err) = self.backend.commit_edit(&event) {
                error!(transaction_id = %trans, error = %err, "Backend rejected commit; rolling back");
                restore_snapshot(state, trans, &session);
                self.backend.rollback_edit(trans);
                self.metrics.record_rollback();
                return Err(Error::Backend(err.to_string()));
            }
            self.metrics.record_backend_notification();
        }

        self.metrics.record_commit();
        debug!(transaction_id = %trans, destroyed, "Edit session committed");
        Ok(())
    }
}

/// Detach a member split from its transaction and unfile it from its
/// account, queueing it to be freed on commit. The split keeps its account
/// reference so a re-append files it again.
fn detach(
    state: &mut BookState,
    session: &mut EditSession,
    trans: TransactionId,
    split: SplitId,
) -> Result<()> {
    state.unlink(split);
    state.split_mut(split)?.transaction = None;
    let members = &mut state.transaction_mut(trans)?.splits;
    members.retain(|s| *s != split);
    if members.is_empty() {
        session.destroy_pending = true;
    }
    if !session.removed.contains(&split) {
        session.removed.push(split);
    }
    debug!(transaction_id = %trans, split_id = %split, "Split detached");
    Ok(())
}

/// Reinstate the state captured when the session opened
fn restore_snapshot(state: &mut BookState, trans: TransactionId, session: &EditSession) {
    let keep: HashSet<SplitId> = session.snapshot.splits.iter().map(|s| s.id).collect();
    let current: Vec<SplitId> = state
        .transactions
        .get(&trans)
        .map(|t| t.splits.clone())
        .unwrap_or_default();

    let mut affected = BTreeSet::new();
    for id in current.iter().chain(session.removed.iter()) {
        if let Some(account) = state.splits.get(id).and_then(|s| s.account) {
            affected.insert(account);
        }
        state.unlink(*id);
        if !keep.contains(id) {
            state.splits.remove(id);
        }
    }

    for split in &session.snapshot.splits {
        if let Some(account) = split.account {
            affected.insert(account);
        }
        state.splits.insert(split.id, split.clone());
        state.link(split.id);
    }
    state
        .transactions
        .insert(trans, session.snapshot.transaction.clone());

    for account in affected {
        state.sort_account(account);
    }

    for account in &session.created_accounts {
        let unused = state
            .accounts
            .get(account)
            .is_some_and(|a| a.splits.is_empty())
            && !state.accounts.values().any(|a| a.parent == Some(*account));
        if unused {
            state.accounts.remove(account);
            debug!(account_id = %account, "Dropped special account created by the session");
        }
    }
}

fn split_currency(state: &BookState, split: SplitId) -> Result<Option<Commodity>> {
    match state.split(split)?.transaction {
        Some(trans) => state.effective_currency(trans),
        None => Ok(None),
    }
}

fn split_commodity(state: &BookState, split: SplitId) -> Result<Option<Commodity>> {
    match state.split(split)?.account {
        Some(account) => Ok(Some(state.account(account)?.commodity.clone())),
        None => Ok(None),
    }
}

fn round(commodity: Option<&Commodity>, amount: Amount) -> Amount {
    commodity.map_or(amount, |c| c.round(amount))
}
