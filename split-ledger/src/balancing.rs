//! Double-entry enforcement and transaction scrubbing
//!
//! A transaction balances when its split values sum to zero. Auto-balancing
//! books the residual against a top-level `Imbalance-<CUR>` account, reusing
//! the transaction's existing split there when it has one.

use crate::account::Account;
use crate::book::{Book, BookState};
use crate::config::{DoubleEntryConfig, DoubleEntryPolicy};
use crate::split::Split;
use crate::types::{AccountId, AccountType, Commodity, SplitId, TransactionId};
use crate::Result;
use tracing::{debug, warn};

/// Outcome of a balancing pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Balanced {
    /// Balancing split created by this pass
    pub(crate) split: Option<SplitId>,
    /// Imbalance account created by this pass
    pub(crate) account: Option<AccountId>,
}

/// Top-level account named `<prefix>-<mnemonic>` in `commodity`, created on
/// demand. The flag is set when the account is new.
fn special_account(state: &mut BookState, prefix: &str, commodity: &Commodity) -> (AccountId, bool) {
    let name = format!("{}-{}", prefix, commodity.mnemonic);
    match state.find_top_account(&name, commodity) {
        Some(id) => (id, false),
        None => {
            let id = state.insert_account(Account::new(
                name.clone(),
                commodity.clone(),
                AccountType::Bank,
                None,
            ));
            debug!(account_id = %id, name = %name, "Created special account");
            (id, true)
        }
    }
}

/// Book the transaction's residual against the imbalance account.
///
/// Reports the split and account created for it, if any. A balancing split
/// whose value returns to zero is removed again.
pub(crate) fn balance_transaction(
    state: &mut BookState,
    trans: TransactionId,
    config: &DoubleEntryConfig,
) -> Result<Balanced> {
    let imbalance = state.imbalance(trans)?;
    let Some(currency) = state.effective_currency(trans)? else {
        if !imbalance.is_zero() {
            warn!(transaction_id = %trans, %imbalance, "No common currency; imbalance left in place");
        }
        return Ok(Balanced::default());
    };

    let mut outcome = Balanced::default();
    let account = if imbalance.is_zero() {
        match state.find_top_account(
            &format!("{}-{}", config.imbalance_prefix, currency.mnemonic),
            &currency,
        ) {
            Some(account) => account,
            None => return Ok(outcome),
        }
    } else {
        let (account, created) = special_account(state, &config.imbalance_prefix, &currency);
        outcome.account = created.then_some(account);
        account
    };

    let existing = state
        .transaction(trans)?
        .splits
        .iter()
        .copied()
        .find(|s| state.splits.get(s).is_some_and(|s| s.account == Some(account)));

    let (split_id, created) = match existing {
        Some(id) => (id, false),
        None if imbalance.is_zero() => return Ok(outcome),
        None => {
            let mut split = Split::new();
            split.transaction = Some(trans);
            split.account = Some(account);
            let id = split.id;
            state.splits.insert(id, split);
            state.transaction_mut(trans)?.splits.push(id);
            state.link(id);
            (id, true)
        }
    };

    let entry = state.split_mut(split_id)?;
    let value = currency.round(entry.value - imbalance);
    entry.value = value;
    entry.amount = value;

    if value.is_zero() {
        state.unlink(split_id);
        state.transaction_mut(trans)?.splits.retain(|s| *s != split_id);
        state.splits.remove(&split_id);
        debug!(transaction_id = %trans, split_id = %split_id, "Balancing split no longer needed");
        return Ok(outcome);
    }

    debug!(transaction_id = %trans, split_id = %split_id, %value, "Transaction balanced");
    outcome.split = created.then_some(split_id);
    Ok(outcome)
}

/// File every account-less split under `Orphan-<CUR>`. Returns how many were
/// filed and the orphan account if this call created it.
pub(crate) fn route_orphans(
    state: &mut BookState,
    trans: TransactionId,
    config: &DoubleEntryConfig,
) -> Result<(usize, Option<AccountId>)> {
    let orphans: Vec<SplitId> = state
        .transaction(trans)?
        .splits
        .iter()
        .copied()
        .filter(|s| state.splits.get(s).is_some_and(|s| s.account.is_none()))
        .collect();
    if orphans.is_empty() {
        return Ok((0, None));
    }
    let Some(currency) = state.effective_currency(trans)? else {
        warn!(transaction_id = %trans, "No common currency; orphan splits left unfiled");
        return Ok((0, None));
    };
    let (account, created) = special_account(state, &config.orphan_prefix, &currency);
    for id in &orphans {
        let entry = state.split_mut(*id)?;
        entry.account = Some(account);
        entry.amount = entry.value;
        state.link(*id);
    }
    debug!(transaction_id = %trans, count = orphans.len(), "Orphan splits filed");
    Ok((orphans.len(), created.then_some(account)))
}

impl Book {
    /// Rebalance under the configured policy. Returns the imbalance account
    /// if this pass created it.
    pub(crate) fn rebalance(
        &self,
        state: &mut BookState,
        trans: TransactionId,
    ) -> Result<Option<AccountId>> {
        if self.config.double_entry.policy != DoubleEntryPolicy::AutoBalance {
            return Ok(None);
        }
        let outcome = balance_transaction(state, trans, &self.config.double_entry)?;
        if outcome.split.is_some() {
            self.metrics.record_balancing_split();
        }
        Ok(outcome.account)
    }

    /// Balance a transaction against the imbalance account, whatever the
    /// configured policy.
    pub fn scrub_imbalance(&self, trans: TransactionId) -> Result<()> {
        self.begin_edit(trans, true)?;
        let result = {
            let mut state = self.state.write();
            balance_transaction(&mut state, trans, &self.config.double_entry).map(|outcome| {
                if outcome.split.is_some() {
                    self.metrics.record_balancing_split();
                }
                self.note_created_account(trans, outcome.account);
            })
        };
        self.close_nested(trans, result)
    }

    /// File account-less splits of a transaction under the orphan account.
    /// Returns how many splits were filed.
    pub fn scrub_orphans(&self, trans: TransactionId) -> Result<usize> {
        self.begin_edit(trans, true)?;
        let result = {
            let mut state = self.state.write();
            route_orphans(&mut state, trans, &self.config.double_entry).map(|(count, account)| {
                self.note_created_account(trans, account);
                count
            })
        };
        match result {
            Ok(count) => self.commit_edit(trans).map(|_| count),
            Err(err) => {
                self.rollback_edit(trans)?;
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Config, Error};
    use rust_decimal::Decimal;

    fn usd() -> Commodity {
        Commodity::currency("USD")
    }

    fn book(policy: DoubleEntryPolicy) -> Book {
        let mut config = Config::default();
        config.double_entry.policy = policy;
        Book::new(config).unwrap()
    }

    fn leg(book: &Book, trans: TransactionId, account: Option<AccountId>, cents: i64) -> SplitId {
        let split = book.create_split();
        book.append_split(trans, split).unwrap();
        book.set_split_account(split, account).unwrap();
        book.set_value(split, Decimal::new(cents, 2)).unwrap();
        book.set_amount(split, Decimal::new(cents, 2)).unwrap();
        split
    }

    #[test]
    fn test_immediate_rebalance_when_not_deferred() {
        let book = book(DoubleEntryPolicy::AutoBalance);
        let x = book.create_account("X", usd(), AccountType::Bank, None).unwrap();
        let y = book.create_account("Y", usd(), AccountType::Expense, None).unwrap();
        let trans = book.create_transaction();

        book.begin_edit(trans, false).unwrap();
        book.set_currency(trans, usd()).unwrap();
        leg(&book, trans, Some(x), 4200);
        assert_eq!(book.imbalance(trans).unwrap(), Decimal::ZERO);
        assert_eq!(book.count_splits(trans).unwrap(), 2);

        // the counter-leg makes the balancing split redundant
        leg(&book, trans, Some(y), -4200);
        assert_eq!(book.imbalance(trans).unwrap(), Decimal::ZERO);
        assert_eq!(book.count_splits(trans).unwrap(), 2);
        book.commit_edit(trans).unwrap();

        let imbalance = book.find_account("Imbalance-USD", None).unwrap();
        assert!(book.account_splits(imbalance).unwrap().is_empty());
    }

    #[test]
    fn test_rollback_drops_imbalance_account_it_created() {
        let book = book(DoubleEntryPolicy::AutoBalance);
        let x = book.create_account("X", usd(), AccountType::Bank, None).unwrap();
        let trans = book.create_transaction();

        book.begin_edit(trans, false).unwrap();
        book.set_currency(trans, usd()).unwrap();
        leg(&book, trans, Some(x), 4200);
        assert!(book.find_account("Imbalance-USD", None).is_some());
        book.rollback_edit(trans).unwrap();

        assert!(book.find_account("Imbalance-USD", None).is_none());
        assert_eq!(book.accounts().len(), 1);
    }

    #[test]
    fn test_rollback_keeps_existing_imbalance_account() {
        let book = book(DoubleEntryPolicy::AutoBalance);
        let x = book.create_account("X", usd(), AccountType::Bank, None).unwrap();
        let earlier = book.create_transaction();
        book.begin_edit(earlier, true).unwrap();
        leg(&book, earlier, Some(x), 100);
        book.commit_edit(earlier).unwrap();
        let imbalance = book.find_account("Imbalance-USD", None).unwrap();

        let trans = book.create_transaction();
        book.begin_edit(trans, false).unwrap();
        book.set_currency(trans, usd()).unwrap();
        leg(&book, trans, Some(x), 4200);
        book.rollback_edit(trans).unwrap();

        assert_eq!(book.find_account("Imbalance-USD", None), Some(imbalance));
        assert_eq!(book.account_splits(imbalance).unwrap().len(), 1);
    }

    #[test]
    fn test_balancing_split_is_reused() {
        let book = book(DoubleEntryPolicy::AutoBalance);
        let x = book.create_account("X", usd(), AccountType::Bank, None).unwrap();
        let trans = book.create_transaction();

        book.begin_edit(trans, true).unwrap();
        let split = leg(&book, trans, Some(x), 1000);
        book.commit_edit(trans).unwrap();
        assert_eq!(book.count_splits(trans).unwrap(), 2);

        book.begin_edit(trans, true).unwrap();
        book.set_value(split, Decimal::new(1500, 2)).unwrap();
        book.set_amount(split, Decimal::new(1500, 2)).unwrap();
        book.commit_edit(trans).unwrap();

        assert_eq!(book.count_splits(trans).unwrap(), 2);
        assert_eq!(book.imbalance(trans).unwrap(), Decimal::ZERO);
        assert_eq!(book.metrics().balancing_splits_total.get(), 1);
    }

    #[test]
    fn test_no_currency_leaves_imbalance() {
        let book = book(DoubleEntryPolicy::AutoBalance);
        let usd_acct = book.create_account("X", usd(), AccountType::Bank, None).unwrap();
        let eur_acct = book
            .create_account("Y", Commodity::currency("EUR"), AccountType::Bank, None)
            .unwrap();
        let trans = book.create_transaction();

        book.begin_edit(trans, true).unwrap();
        leg(&book, trans, Some(usd_acct), 100);
        leg(&book, trans, Some(eur_acct), -90);
        book.commit_edit(trans).unwrap();

        assert!(book.transaction(trans).unwrap().currency().is_none());
        assert_eq!(book.imbalance(trans).unwrap(), Decimal::new(10, 2));
    }

    #[test]
    fn test_reserved_policy_does_not_balance() {
        let book = book(DoubleEntryPolicy::RouteOrphans);
        let x = book.create_account("X", usd(), AccountType::Bank, None).unwrap();
        let trans = book.create_transaction();
        book.begin_edit(trans, false).unwrap();
        leg(&book, trans, Some(x), 100);
        book.commit_edit(trans).unwrap();
        assert_eq!(book.imbalance(trans).unwrap(), Decimal::new(100, 2));
    }

    #[test]
    fn test_scrub_imbalance_ignores_policy() {
        let book = book(DoubleEntryPolicy::None);
        let x = book.create_account("X", usd(), AccountType::Bank, None).unwrap();
        let trans = book.create_transaction();
        book.begin_edit(trans, true).unwrap();
        leg(&book, trans, Some(x), 700);
        book.commit_edit(trans).unwrap();
        assert_eq!(book.imbalance(trans).unwrap(), Decimal::new(700, 2));

        book.scrub_imbalance(trans).unwrap();
        assert_eq!(book.imbalance(trans).unwrap(), Decimal::ZERO);
        assert!(!book.is_open(trans));
    }

    #[test]
    fn test_scrub_orphans() {
        let book = book(DoubleEntryPolicy::None);
        let x = book.create_account("X", usd(), AccountType::Bank, None).unwrap();
        let trans = book.create_transaction();
        book.begin_edit(trans, true).unwrap();
        leg(&book, trans, Some(x), 300);
        let orphan = leg(&book, trans, None, -300);
        book.commit_edit(trans).unwrap();

        assert_eq!(book.scrub_orphans(trans).unwrap(), 1);
        let account = book.find_account("Orphan-USD", None).unwrap();
        assert_eq!(book.split(orphan).unwrap().account(), Some(account));
        assert_eq!(book.account_splits(account).unwrap(), vec![orphan]);
        assert_eq!(book.scrub_orphans(trans).unwrap(), 0);
    }

    #[test]
    fn test_scrub_requires_free_transaction() {
        let book = book(DoubleEntryPolicy::None);
        assert!(matches!(
            book.scrub_imbalance(TransactionId::new()),
            Err(Error::TransactionNotFound(_))
        ));
    }
}
