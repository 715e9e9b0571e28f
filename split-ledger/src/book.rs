//! The book: an arena owning every ledger entity
//!
//! Entities reference each other by GUID. All entity state sits behind one
//! reader/writer lock; the registry of open edit sessions is a concurrent
//! map that is only touched while that lock is held, so the two are always
//! observed together.
//!
//! # Invariants
//!
//! - A split belongs to at most one transaction and at most one account
//! - A split appears in an account's list iff it is attached to a
//!   transaction and references that account
//! - Running balances are recomputed from split amounts on every call

use crate::account::Account;
use crate::backend::{Backend, NullBackend};
use crate::kvp::KvpValue;
use crate::lot::Lot;
use crate::metrics::Metrics;
use crate::session::EditSession;
use crate::split::{split_date_order, Split};
use crate::transaction::Transaction;
use crate::types::{AccountId, AccountType, Amount, Commodity, LotId, SplitId, TransactionId};
use crate::{Config, Error, Result};
use dashmap::DashMap;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Which running balance to compute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BalanceKind {
    /// Every split
    All,
    /// Cleared, reconciled, frozen or voided splits
    Cleared,
    /// Reconciled or frozen splits
    Reconciled,
}

/// Entity storage guarded by the book lock
#[derive(Debug, Default)]
pub(crate) struct BookState {
    pub(crate) accounts: BTreeMap<AccountId, Account>,
    pub(crate) transactions: HashMap<TransactionId, Transaction>,
    pub(crate) splits: HashMap<SplitId, Split>,
    pub(crate) lots: HashMap<LotId, Lot>,
}

impl BookState {
    pub(crate) fn transaction(&self, id: TransactionId) -> Result<&Transaction> {
        self.transactions
            .get(&id)
            .ok_or(Error::TransactionNotFound(id))
    }

    pub(crate) fn transaction_mut(&mut self, id: TransactionId) -> Result<&mut Transaction> {
        self.transactions
            .get_mut(&id)
            .ok_or(Error::TransactionNotFound(id))
    }

    pub(crate) fn split(&self, id: SplitId) -> Result<&Split> {
        self.splits.get(&id).ok_or(Error::SplitNotFound(id))
    }

    pub(crate) fn split_mut(&mut self, id: SplitId) -> Result<&mut Split> {
        self.splits.get_mut(&id).ok_or(Error::SplitNotFound(id))
    }

    pub(crate) fn account(&self, id: AccountId) -> Result<&Account> {
        self.accounts.get(&id).ok_or(Error::AccountNotFound(id))
    }

    /// File an attached split under its account
    pub(crate) fn link(&mut self, id: SplitId) {
        let Some(split) = self.splits.get(&id) else {
            return;
        };
        if split.transaction.is_none() {
            return;
        }
        if let Some(account) = split.account.and_then(|a| self.accounts.get_mut(&a)) {
            account.insert_split(id);
        }
    }

    /// Remove a split from its account's list; the split keeps its reference
    pub(crate) fn unlink(&mut self, id: SplitId) {
        let Some(account_id) = self.splits.get(&id).and_then(|s| s.account) else {
            return;
        };
        if let Some(account) = self.accounts.get_mut(&account_id) {
            account.remove_split(id);
        }
    }

    pub(crate) fn split_order(&self, a: &SplitId, b: &SplitId) -> Ordering {
        match (self.splits.get(a), self.splits.get(b)) {
            (Some(sa), Some(sb)) => {
                let ta = sa.transaction.and_then(|t| self.transactions.get(&t));
                let tb = sb.transaction.and_then(|t| self.transactions.get(&t));
                split_date_order(sa, ta, sb, tb)
            }
            _ => Ordering::Equal,
        }
    }

    /// Re-sort an account's split list into split date order
    pub(crate) fn sort_account(&mut self, id: AccountId) {
        let Some(account) = self.accounts.get_mut(&id) else {
            return;
        };
        let mut list = std::mem::take(&mut account.splits);
        list.sort_by(|a, b| self.split_order(a, b));
        if let Some(account) = self.accounts.get_mut(&id) {
            account.splits = list;
        }
    }

    /// True when `ancestor` is `account` or one of its parents
    pub(crate) fn has_ancestor(&self, account: AccountId, ancestor: AccountId) -> bool {
        let mut current = Some(account);
        let mut hops = 0;
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            if hops > self.accounts.len() {
                return false;
            }
            hops += 1;
            current = self.accounts.get(&id).and_then(|a| a.parent);
        }
        false
    }

    /// Commodity shared by the accounts of every split, if any
    pub(crate) fn common_currency(&self, id: TransactionId) -> Result<Option<Commodity>> {
        let trans = self.transaction(id)?;
        let mut common: Option<&Commodity> = None;
        for split_id in &trans.splits {
            let Some(account_id) = self.split(*split_id)?.account else {
                continue;
            };
            let commodity = &self.account(account_id)?.commodity;
            match common {
                None => common = Some(commodity),
                Some(c) if c == commodity => {}
                Some(_) => return Ok(None),
            }
        }
        Ok(common.cloned())
    }

    /// Currency used for value rounding and balancing
    pub(crate) fn effective_currency(&self, id: TransactionId) -> Result<Option<Commodity>> {
        match &self.transaction(id)?.currency {
            Some(currency) => Ok(Some(currency.clone())),
            None => self.common_currency(id),
        }
    }

    pub(crate) fn imbalance(&self, id: TransactionId) -> Result<Amount> {
        let trans = self.transaction(id)?;
        let mut total = Decimal::ZERO;
        for split_id in &trans.splits {
            total += self.split(*split_id)?.value;
        }
        Ok(total)
    }

    pub(crate) fn transaction_splits(&self, id: TransactionId) -> Result<Vec<Split>> {
        self.transaction(id)?
            .splits
            .iter()
            .map(|s| self.split(*s).cloned())
            .collect()
    }

    pub(crate) fn running_balance(
        &self,
        id: SplitId,
        kind: BalanceKind,
        shares: bool,
    ) -> Result<Amount> {
        let split = self.split(id)?;
        let Some(account_id) = split.account else {
            return Ok(Decimal::ZERO);
        };
        let account = self.account(account_id)?;
        let mut total = Decimal::ZERO;
        for other_id in &account.splits {
            let other = self.split(*other_id)?;
            let counted = match kind {
                BalanceKind::All => true,
                BalanceKind::Cleared => other.reconcile.is_cleared(),
                BalanceKind::Reconciled => other.reconcile.is_reconciled(),
            };
            if counted {
                total += if shares { other.amount } else { other.value };
            }
            if *other_id == id {
                break;
            }
        }
        Ok(total)
    }

    pub(crate) fn find_top_account(&self, name: &str, commodity: &Commodity) -> Option<AccountId> {
        self.accounts
            .values()
            .find(|a| a.parent.is_none() && a.name == name && &a.commodity == commodity)
            .map(|a| a.id)
    }

    pub(crate) fn insert_account(&mut self, account: Account) -> AccountId {
        let id = account.id;
        self.accounts.insert(id, account);
        id
    }

    /// Splits attached to a transaction and referencing the lot
    pub(crate) fn lot_splits(&self, id: LotId) -> Vec<SplitId> {
        let mut splits: Vec<SplitId> = self
            .splits
            .values()
            .filter(|s| s.lot == Some(id) && s.transaction.is_some())
            .map(|s| s.id)
            .collect();
        splits.sort_by(|a, b| self.split_order(a, b));
        splits
    }
}

/// Arena of accounts, transactions, splits and lots
pub struct Book {
    pub(crate) state: RwLock<BookState>,
    pub(crate) editors: DashMap<TransactionId, EditSession>,
    pub(crate) config: Config,
    pub(crate) backend: Arc<dyn Backend>,
    pub(crate) metrics: Metrics,
}

impl fmt::Debug for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("Book")
            .field("accounts", &state.accounts.len())
            .field("transactions", &state.transactions.len())
            .field("splits", &state.splits.len())
            .field("open_sessions", &self.editors.len())
            .field("backend", &self.backend)
            .finish()
    }
}

impl Book {
    /// Create an empty book with no persistence
    pub fn new(config: Config) -> Result<Self> {
        Self::with_backend(config, Arc::new(NullBackend))
    }

    /// Create an empty book wired to a persistence collaborator
    pub fn with_backend(config: Config, backend: Arc<dyn Backend>) -> Result<Self> {
        let metrics = Metrics::new()?;
        info!(
            policy = ?config.double_entry.policy,
            "Book created"
        );
        Ok(Self {
            state: RwLock::new(BookState::default()),
            editors: DashMap::new(),
            config,
            backend,
            metrics,
        })
    }

    /// Ask the backend to populate the book
    pub fn load(&self) -> Result<()> {
        let backend = Arc::clone(&self.backend);
        backend.load(self)?;
        let state = self.state.read();
        info!(
            accounts = state.accounts.len(),
            transactions = state.transactions.len(),
            "Book loaded"
        );
        Ok(())
    }

    /// Configuration in effect
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    // ----- accounts -----

    /// Create an account, optionally under a parent
    pub fn create_account(
        &self,
        name: impl Into<String>,
        commodity: Commodity,
        account_type: AccountType,
        parent: Option<AccountId>,
    ) -> Result<AccountId> {
        let mut state = self.state.write();
        if let Some(parent) = parent {
            state.account(parent)?;
        }
        let account = Account::new(name, commodity, account_type, parent);
        let id = state.insert_account(account);
        debug!(account_id = %id, "Account created");
        Ok(id)
    }

    /// Snapshot of an account
    pub fn account(&self, id: AccountId) -> Result<Account> {
        self.state.read().account(id).cloned()
    }

    /// Every account, ordered by GUID
    pub fn accounts(&self) -> Vec<Account> {
        self.state.read().accounts.values().cloned().collect()
    }

    /// Find an account by name under a parent (`None` for top level)
    pub fn find_account(&self, name: &str, parent: Option<AccountId>) -> Option<AccountId> {
        self.state
            .read()
            .accounts
            .values()
            .find(|a| a.parent == parent && a.name == name)
            .map(|a| a.id)
    }

    /// Splits filed under an account, in split date order
    pub fn account_splits(&self, id: AccountId) -> Result<Vec<SplitId>> {
        Ok(self.state.read().account(id)?.splits.clone())
    }

    /// True when `ancestor` is `account` itself or one of its parents
    pub fn has_ancestor(&self, account: AccountId, ancestor: AccountId) -> bool {
        self.state.read().has_ancestor(account, ancestor)
    }

    /// Store a metadata slot on an account
    pub fn set_account_kvp(&self, id: AccountId, path: &str, value: KvpValue) -> Result<()> {
        let mut state = self.state.write();
        let account = state
            .accounts
            .get_mut(&id)
            .ok_or(Error::AccountNotFound(id))?;
        account.kvp.set(path, value);
        Ok(())
    }

    // ----- transactions -----

    /// Create an empty transaction
    pub fn create_transaction(&self) -> TransactionId {
        let trans = Transaction::new();
        let id = trans.id;
        self.state.write().transactions.insert(id, trans);
        debug!(transaction_id = %id, "Transaction created");
        id
    }

    /// Snapshot of a transaction
    pub fn transaction(&self, id: TransactionId) -> Result<Transaction> {
        self.state.read().transaction(id).cloned()
    }

    /// Every transaction, in canonical order
    pub fn transactions(&self) -> Vec<Transaction> {
        let state = self.state.read();
        let mut all: Vec<Transaction> = state.transactions.values().cloned().collect();
        all.sort_by(crate::transaction::trans_order);
        all
    }

    /// Number of splits in a transaction
    pub fn count_splits(&self, id: TransactionId) -> Result<usize> {
        Ok(self.state.read().transaction(id)?.splits.len())
    }

    /// Split at position `index` of a transaction
    pub fn get_split(&self, id: TransactionId, index: usize) -> Result<Option<SplitId>> {
        Ok(self.state.read().transaction(id)?.split(index))
    }

    /// Snapshots of a transaction's splits, in transaction order
    pub fn transaction_splits(&self, id: TransactionId) -> Result<Vec<Split>> {
        self.state.read().transaction_splits(id)
    }

    /// Commodity shared by every split's account
    pub fn find_common_currency(&self, id: TransactionId) -> Result<Option<Commodity>> {
        self.state.read().common_currency(id)
    }

    /// Sum of split values; zero for a balanced transaction
    pub fn imbalance(&self, id: TransactionId) -> Result<Amount> {
        self.state.read().imbalance(id)
    }

    /// Compare two transactions field by field, including their splits in
    /// order. GUIDs are only compared when `check_guids` is set.
    pub fn transactions_match(
        &self,
        a: TransactionId,
        b: TransactionId,
        check_guids: bool,
    ) -> Result<bool> {
        let state = self.state.read();
        let ta = state.transaction(a)?;
        let tb = state.transaction(b)?;
        if check_guids && ta.id != tb.id {
            return Ok(false);
        }
        if ta.currency != tb.currency
            || ta.date_posted != tb.date_posted
            || ta.date_entered != tb.date_entered
            || ta.num != tb.num
            || ta.description != tb.description
            || ta.kvp != tb.kvp
            || ta.splits.len() != tb.splits.len()
        {
            return Ok(false);
        }
        for (sa, sb) in ta.splits.iter().zip(tb.splits.iter()) {
            let sa = state.split(*sa)?;
            let sb = state.split(*sb)?;
            if check_guids && sa.id != sb.id {
                return Ok(false);
            }
            if sa.account != sb.account
                || sa.memo != sb.memo
                || sa.action != sb.action
                || sa.reconcile != sb.reconcile
                || sa.date_reconciled != sb.date_reconciled
                || sa.amount != sb.amount
                || sa.value != sb.value
                || sa.kvp != sb.kvp
            {
                return Ok(false);
            }
        }
        Ok(true)
    }

    // ----- splits -----

    /// Create an unattached split
    pub fn create_split(&self) -> SplitId {
        let split = Split::new();
        let id = split.id;
        self.state.write().splits.insert(id, split);
        id
    }

    /// Snapshot of a split
    pub fn split(&self, id: SplitId) -> Result<Split> {
        self.state.read().split(id).cloned()
    }

    /// Running value balance of the split's account through this split
    pub fn balance(&self, id: SplitId) -> Result<Amount> {
        self.state.read().running_balance(id, BalanceKind::All, false)
    }

    /// Running value balance over cleared splits
    pub fn cleared_balance(&self, id: SplitId) -> Result<Amount> {
        self.state.read().running_balance(id, BalanceKind::Cleared, false)
    }

    /// Running value balance over reconciled splits
    pub fn reconciled_balance(&self, id: SplitId) -> Result<Amount> {
        self.state.read().running_balance(id, BalanceKind::Reconciled, false)
    }

    /// Running share count through this split
    pub fn share_balance(&self, id: SplitId) -> Result<Amount> {
        self.state.read().running_balance(id, BalanceKind::All, true)
    }

    /// Running share count over cleared splits
    pub fn share_cleared_balance(&self, id: SplitId) -> Result<Amount> {
        self.state.read().running_balance(id, BalanceKind::Cleared, true)
    }

    /// Running share count over reconciled splits
    pub fn share_reconciled_balance(&self, id: SplitId) -> Result<Amount> {
        self.state.read().running_balance(id, BalanceKind::Reconciled, true)
    }

    /// Split quantity expressed in `base`: the value when `base` is the
    /// transaction currency, the amount when it is the account commodity,
    /// zero otherwise.
    pub fn base_value(&self, id: SplitId, base: &Commodity) -> Result<Amount> {
        let state = self.state.read();
        let split = state.split(id)?;
        let (Some(trans_id), Some(account_id)) = (split.transaction, split.account) else {
            return Ok(Decimal::ZERO);
        };
        if state.effective_currency(trans_id)?.as_ref() == Some(base) {
            return Ok(split.value);
        }
        if &state.account(account_id)?.commodity == base {
            return Ok(split.amount);
        }
        warn!(
            split_id = %id,
            base = %base,
            "Base commodity matches neither transaction currency nor account commodity"
        );
        Ok(Decimal::ZERO)
    }

    /// The single sibling split of opposite sign, if there is exactly one
    pub fn other_split(&self, id: SplitId) -> Result<Option<SplitId>> {
        let state = self.state.read();
        let split = state.split(id)?;
        let Some(trans_id) = split.transaction else {
            return Ok(None);
        };
        let positive = split.value.is_sign_positive() && !split.value.is_zero();
        let mut found = None;
        for sibling_id in &state.transaction(trans_id)?.splits {
            if *sibling_id == id {
                continue;
            }
            let sibling = state.split(*sibling_id)?;
            let sibling_positive = sibling.value.is_sign_positive() && !sibling.value.is_zero();
            if positive != sibling_positive {
                if found.is_some() {
                    return Ok(None);
                }
                found = Some(*sibling_id);
            }
        }
        Ok(found)
    }

    // ----- lots -----

    /// Create a lot in an account
    pub fn create_lot(&self, account: AccountId, title: impl Into<String>) -> Result<LotId> {
        let mut state = self.state.write();
        state.account(account)?;
        let lot = Lot::new(account, title);
        let id = lot.id;
        state.lots.insert(id, lot);
        Ok(id)
    }

    /// Snapshot of a lot
    pub fn lot(&self, id: LotId) -> Result<Lot> {
        self.state
            .read()
            .lots
            .get(&id)
            .cloned()
            .ok_or(Error::LotNotFound(id))
    }

    /// Attached splits referencing a lot, in split date order
    pub fn lot_splits(&self, id: LotId) -> Result<Vec<SplitId>> {
        let state = self.state.read();
        if !state.lots.contains_key(&id) {
            return Err(Error::LotNotFound(id));
        }
        Ok(state.lot_splits(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ReconcileState;
    use chrono::{DateTime, TimeZone, Utc};

    fn usd() -> Commodity {
        Commodity::currency("USD")
    }

    fn acme() -> Commodity {
        Commodity::new("ACME", 3)
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 3, d, 0, 0, 0).unwrap()
    }

    type Leg = (AccountId, Amount, Amount);

    /// Post a transaction from (account, value, amount) legs
    fn post(book: &Book, posted: DateTime<Utc>, legs: &[Leg]) -> (TransactionId, Vec<SplitId>) {
        let trans = book.create_transaction();
        book.begin_edit(trans, true).unwrap();
        book.set_currency(trans, usd()).unwrap();
        book.set_date_posted(trans, posted).unwrap();
        book.set_date_entered(trans, posted).unwrap();
        let splits = legs
            .iter()
            .map(|(account, value, amount)| {
                let split = book.create_split();
                book.append_split(trans, split).unwrap();
                book.set_split_account(split, Some(*account)).unwrap();
                book.set_value(split, *value).unwrap();
                book.set_amount(split, *amount).unwrap();
                split
            })
            .collect();
        book.commit_edit(trans).unwrap();
        (trans, splits)
    }

    fn cash(account: AccountId, cents: i64) -> Leg {
        (account, Decimal::new(cents, 2), Decimal::new(cents, 2))
    }

    fn shares(account: AccountId, cents: i64, units: i64) -> Leg {
        (account, Decimal::new(cents, 2), Decimal::new(units, 0))
    }

    #[test]
    fn test_create_account_requires_parent() {
        let book = Book::new(Config::default()).unwrap();
        let missing = AccountId::new();
        assert!(matches!(
            book.create_account("Child", usd(), AccountType::Asset, Some(missing)),
            Err(Error::AccountNotFound(_))
        ));
    }

    #[test]
    fn test_has_ancestor() {
        let book = Book::new(Config::default()).unwrap();
        let assets = book.create_account("Assets", usd(), AccountType::Asset, None).unwrap();
        let bank = book
            .create_account("Bank", usd(), AccountType::Bank, Some(assets))
            .unwrap();
        let checking = book
            .create_account("Checking", usd(), AccountType::Bank, Some(bank))
            .unwrap();
        let other = book.create_account("Income", usd(), AccountType::Income, None).unwrap();

        assert!(book.has_ancestor(checking, assets));
        assert!(book.has_ancestor(checking, checking));
        assert!(!book.has_ancestor(assets, checking));
        assert!(!book.has_ancestor(checking, other));
    }

    #[test]
    fn test_find_account() {
        let book = Book::new(Config::default()).unwrap();
        let assets = book.create_account("Assets", usd(), AccountType::Asset, None).unwrap();
        let cash = book
            .create_account("Cash", usd(), AccountType::Cash, Some(assets))
            .unwrap();
        assert_eq!(book.find_account("Cash", Some(assets)), Some(cash));
        assert_eq!(book.find_account("Cash", None), None);
    }

    #[test]
    fn test_new_transaction_is_empty() {
        let book = Book::new(Config::default()).unwrap();
        let trans = book.create_transaction();
        assert_eq!(book.count_splits(trans).unwrap(), 0);
        assert_eq!(book.imbalance(trans).unwrap(), Decimal::ZERO);
        assert_eq!(book.get_split(trans, 0).unwrap(), None);
        assert!(book.find_common_currency(trans).unwrap().is_none());
    }

    #[test]
    fn test_lookup_missing_entities() {
        let book = Book::new(Config::default()).unwrap();
        assert!(matches!(
            book.transaction(TransactionId::new()),
            Err(Error::TransactionNotFound(_))
        ));
        assert!(matches!(book.split(SplitId::new()), Err(Error::SplitNotFound(_))));
        assert!(matches!(book.lot(LotId::new()), Err(Error::LotNotFound(_))));
    }

    #[test]
    fn test_accounts_ordered_by_id() {
        let book = Book::new(Config::default()).unwrap();
        let mut created: Vec<AccountId> = ["A", "B", "C", "D"]
            .iter()
            .map(|name| book.create_account(*name, usd(), AccountType::Bank, None).unwrap())
            .collect();
        created.sort();
        let listed: Vec<AccountId> = book.accounts().iter().map(|a| a.id()).collect();
        assert_eq!(listed, created);
    }

    #[test]
    fn test_share_balances() {
        let book = Book::new(Config::default()).unwrap();
        let stock = book.create_account("ACME", acme(), AccountType::Stock, None).unwrap();
        let bank = book.create_account("Bank", usd(), AccountType::Bank, None).unwrap();

        let (buy, first) = post(&book, day(1), &[shares(stock, 12500, 10), cash(bank, -12500)]);
        let (top_up, second) = post(&book, day(2), &[shares(stock, 7000, 5), cash(bank, -7000)]);

        book.begin_edit(buy, true).unwrap();
        book.set_reconcile(first[0], ReconcileState::Reconciled).unwrap();
        book.commit_edit(buy).unwrap();
        book.begin_edit(top_up, true).unwrap();
        book.set_reconcile(second[0], ReconcileState::Cleared).unwrap();
        book.commit_edit(top_up).unwrap();

        assert_eq!(book.share_balance(first[0]).unwrap(), Decimal::new(10, 0));
        assert_eq!(book.share_balance(second[0]).unwrap(), Decimal::new(15, 0));
        assert_eq!(book.share_cleared_balance(second[0]).unwrap(), Decimal::new(15, 0));
        assert_eq!(book.share_reconciled_balance(second[0]).unwrap(), Decimal::new(10, 0));
        assert_eq!(book.balance(second[0]).unwrap(), Decimal::new(19500, 2));
        assert_eq!(book.reconciled_balance(second[0]).unwrap(), Decimal::new(12500, 2));
        assert_eq!(book.share_cleared_balance(second[1]).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_other_split() {
        let book = Book::new(Config::default()).unwrap();
        let x = book.create_account("X", usd(), AccountType::Bank, None).unwrap();
        let y = book.create_account("Y", usd(), AccountType::Expense, None).unwrap();
        let z = book.create_account("Z", usd(), AccountType::Expense, None).unwrap();

        let (_, pair) = post(&book, day(1), &[cash(x, 100), cash(y, -100)]);
        assert_eq!(book.other_split(pair[0]).unwrap(), Some(pair[1]));
        assert_eq!(book.other_split(pair[1]).unwrap(), Some(pair[0]));

        // two negative siblings make the counter-split ambiguous
        let (_, three) = post(&book, day(2), &[cash(x, 100), cash(y, -60), cash(z, -40)]);
        assert_eq!(book.other_split(three[0]).unwrap(), None);
        assert_eq!(book.other_split(three[1]).unwrap(), Some(three[0]));

        assert_eq!(book.other_split(book.create_split()).unwrap(), None);
    }

    #[test]
    fn test_base_value() {
        let book = Book::new(Config::default()).unwrap();
        let stock = book.create_account("ACME", acme(), AccountType::Stock, None).unwrap();
        let bank = book.create_account("Bank", usd(), AccountType::Bank, None).unwrap();
        let (_, splits) = post(&book, day(1), &[shares(stock, 3000, 2), cash(bank, -3000)]);

        assert_eq!(book.base_value(splits[0], &usd()).unwrap(), Decimal::new(3000, 2));
        assert_eq!(book.base_value(splits[0], &acme()).unwrap(), Decimal::new(2, 0));
        assert_eq!(
            book.base_value(splits[0], &Commodity::currency("EUR")).unwrap(),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_transactions_match() {
        let book = Book::new(Config::default()).unwrap();
        let x = book.create_account("X", usd(), AccountType::Bank, None).unwrap();
        let y = book.create_account("Y", usd(), AccountType::Expense, None).unwrap();
        let legs = [cash(x, 2500), cash(y, -2500)];

        let (original, _) = post(&book, day(5), &legs);
        let (copy, copy_splits) = post(&book, day(5), &legs);
        assert!(book.transactions_match(original, copy, false).unwrap());
        assert!(!book.transactions_match(original, copy, true).unwrap());
        assert!(book.transactions_match(original, original, true).unwrap());

        book.begin_edit(copy, true).unwrap();
        book.set_memo(copy_splits[1], "different").unwrap();
        book.commit_edit(copy).unwrap();
        assert!(!book.transactions_match(original, copy, false).unwrap());

        let (later, _) = post(&book, day(6), &legs);
        assert!(!book.transactions_match(original, later, false).unwrap());
    }
}
