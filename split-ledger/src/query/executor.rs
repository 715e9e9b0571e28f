//! Query execution against a book
//!
//! Runs are bounded synchronous scans under the book's read lock.
//! Transactions with an open edit session are treated as inconsistent and
//! skipped, so a run never observes a half-edited transaction.

use super::{Query, SortKey, SortSpec};
use crate::book::{Book, BookState};
use crate::config::Truncation;
use crate::split::{split_date_order, Split};
use crate::transaction::{num_order, Transaction};
use crate::types::{AccountId, LotId, SplitId, TransactionId};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::Instant;
use tracing::debug;

/// Which accounts a run draws splits from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Scope {
    /// Every split attached to a transaction
    #[default]
    All,
    /// Splits in the listed accounts
    Accounts {
        /// Accounts to scan
        accounts: Vec<AccountId>,
        /// Also scan every descendant account
        include_subaccounts: bool,
    },
}

impl Scope {
    /// Scan the whole book
    pub fn all() -> Self {
        Scope::All
    }

    /// Scan only the given accounts
    pub fn accounts(accounts: impl IntoIterator<Item = AccountId>) -> Self {
        Scope::Accounts {
            accounts: accounts.into_iter().collect(),
            include_subaccounts: false,
        }
    }

    /// Include descendants of the scoped accounts
    pub fn with_subaccounts(self) -> Self {
        match self {
            Scope::Accounts { accounts, .. } => Scope::Accounts {
                accounts,
                include_subaccounts: true,
            },
            Scope::All => Scope::All,
        }
    }
}

/// Grouping rule for transaction and lot de-duplication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchMode {
    /// Keep a group only when every one of its splits matched
    All,
    /// Keep a group when at least one of its splits matched
    Any,
}

/// Runs queries against a book
#[derive(Debug, Clone, Copy)]
pub struct QueryExecutor<'a> {
    book: &'a Book,
}

/// Cap `matched` at `max` splits, choosing the survivors by posted date and
/// keeping them in their sorted order
fn truncate(state: &BookState, matched: &mut Vec<&Split>, max: usize, truncation: Truncation) {
    if matched.len() <= max {
        return;
    }
    let mut by_date = matched.clone();
    by_date.sort_by(|a, b| compare_key(state, SortKey::Standard, a, b));
    let survivors = match truncation {
        Truncation::KeepEarliest => &by_date[..max],
        Truncation::KeepLatest => &by_date[by_date.len() - max..],
    };
    let kept: HashSet<SplitId> = survivors.iter().map(|s| s.id).collect();
    matched.retain(|s| kept.contains(&s.id));
}

fn compare_key(state: &BookState, key: SortKey, a: &Split, b: &Split) -> Ordering {
    let trans = |s: &Split| s.transaction.and_then(|t| state.transactions.get(&t));
    let (ta, tb) = (trans(a), trans(b));
    let posted = |t: Option<&Transaction>| t.map(|t| t.date_posted);
    match key {
        SortKey::Standard => split_date_order(a, ta, b, tb),
        SortKey::Date => posted(ta).cmp(&posted(tb)),
        SortKey::Num => num_order(
            ta.map(|t| t.num.as_str()).unwrap_or(""),
            tb.map(|t| t.num.as_str()).unwrap_or(""),
        ),
        SortKey::Amount => a.value.cmp(&b.value),
        SortKey::Memo => a.memo.cmp(&b.memo),
        SortKey::Description => ta
            .map(|t| t.description.as_str())
            .cmp(&tb.map(|t| t.description.as_str())),
        SortKey::None => Ordering::Equal,
    }
}

fn compare_splits(state: &BookState, sort: &[SortSpec; 3], a: &Split, b: &Split) -> Ordering {
    sort.iter().fold(Ordering::Equal, |acc, spec| {
        acc.then_with(|| {
            let ordering = compare_key(state, spec.key, a, b);
            if spec.increasing {
                ordering
            } else {
                ordering.reverse()
            }
        })
    })
}

impl<'a> QueryExecutor<'a> {
    /// Executor over `book`
    pub fn new(book: &'a Book) -> Self {
        Self { book }
    }

    /// Empty query carrying the book's configured result cap and truncation
    pub fn new_query(&self) -> Query {
        Query::with_config(&self.book.config.query)
    }

    fn candidates<'s>(&self, state: &'s BookState, scope: &Scope) -> Vec<&'s Split> {
        let in_scope = |split: &Split| match scope {
            Scope::All => true,
            Scope::Accounts {
                accounts,
                include_subaccounts,
            } => split.account.is_some_and(|account| {
                accounts.iter().any(|scoped| {
                    account == *scoped
                        || (*include_subaccounts && state.has_ancestor(account, *scoped))
                })
            }),
        };

        let mut splits: Vec<&Split> = state
            .splits
            .values()
            .filter(|s| {
                s.transaction.is_some_and(|t| {
                    state.transactions.contains_key(&t) && !self.book.editors.contains_key(&t)
                })
            })
            .filter(|s| in_scope(*s))
            .collect();
        // canonical order first so that ties under the caller's keys are deterministic
        splits.sort_by(|a, b| compare_key(state, SortKey::Standard, a, b));
        splits
    }

    fn matching(&self, state: &BookState, query: &Query, scope: &Scope) -> Vec<SplitId> {
        let mut matched: Vec<&Split> = self
            .candidates(state, scope)
            .into_iter()
            .filter(|split| {
                query.terms.is_empty() || query.terms.iter().any(|t| t.matches(state, split))
            })
            .collect();

        matched.sort_by(|a, b| compare_splits(state, &query.sort, a, b));

        if let Some(max) = query.max_results {
            truncate(state, &mut matched, max, query.truncation);
        }
        matched.into_iter().map(|s| s.id).collect()
    }

    /// Run `query` over the splits in `scope`.
    ///
    /// Results are stably sorted by the query's three keys, then capped at
    /// its maximum, keeping the earliest- or latest-dated splits per its
    /// truncation setting. The result is cached on the query for the date and
    /// grouping helpers.
    pub fn run(&self, query: &mut Query, scope: &Scope) -> Vec<SplitId> {
        let started = Instant::now();
        let result = self.matching(&self.book.state.read(), query, scope);

        let elapsed = started.elapsed().as_secs_f64();
        self.book.metrics.record_query(result.len(), elapsed);
        debug!(
            terms = query.terms.len(),
            results = result.len(),
            elapsed_ms = elapsed * 1000.0,
            "Query run"
        );
        query.last_run = result.clone();
        result
    }

    /// Run and keep only the first split of each transaction
    pub fn get_splits_unique_trans(&self, query: &mut Query, scope: &Scope) -> Vec<SplitId> {
        let splits = self.run(query, scope);
        let state = self.book.state.read();
        let mut seen = BTreeSet::new();
        splits
            .into_iter()
            .filter(|id| match state.splits.get(id).and_then(|s| s.transaction) {
                Some(trans) => seen.insert(trans),
                None => false,
            })
            .collect()
    }

    /// Run and return the transactions of the matched splits
    pub fn get_transactions(
        &self,
        query: &mut Query,
        scope: &Scope,
        mode: MatchMode,
    ) -> Vec<TransactionId> {
        let splits = self.run(query, scope);
        self.unique_transactions(&splits, mode)
    }

    /// Group splits by transaction, in order of first appearance.
    ///
    /// Under [`MatchMode::All`] a transaction is kept only when every one
    /// of its splits is in `splits`.
    pub fn unique_transactions(&self, splits: &[SplitId], mode: MatchMode) -> Vec<TransactionId> {
        let state = self.book.state.read();
        let groups = group_by(splits, |id| state.splits.get(id).and_then(|s| s.transaction));
        groups
            .into_iter()
            .filter(|(trans, count)| match mode {
                MatchMode::Any => true,
                MatchMode::All => state
                    .transactions
                    .get(trans)
                    .is_some_and(|t| t.splits.len() == *count),
            })
            .map(|(trans, _)| trans)
            .collect()
    }

    /// Run and return the lots of the matched splits
    pub fn get_lots(&self, query: &mut Query, scope: &Scope, mode: MatchMode) -> Vec<LotId> {
        let splits = self.run(query, scope);
        self.unique_lots(&splits, mode)
    }

    /// Group splits by lot, in order of first appearance.
    ///
    /// Under [`MatchMode::All`] a lot is kept only when every one of its
    /// splits is in `splits`.
    pub fn unique_lots(&self, splits: &[SplitId], mode: MatchMode) -> Vec<LotId> {
        let state = self.book.state.read();
        let groups = group_by(splits, |id| state.splits.get(id).and_then(|s| s.lot));
        groups
            .into_iter()
            .filter(|(lot, count)| match mode {
                MatchMode::Any => true,
                MatchMode::All => state.lot_splits(*lot).len() == *count,
            })
            .map(|(lot, _)| lot)
            .collect()
    }

    /// Earliest posted date among the last run's transactions, in epoch
    /// seconds; `0` when the last run found nothing
    pub fn earliest_date_found(&self, query: &Query) -> i64 {
        self.posted_dates(query).min().unwrap_or(0)
    }

    /// Latest posted date among the last run's transactions, in epoch
    /// seconds; `0` when the last run found nothing
    pub fn latest_date_found(&self, query: &Query) -> i64 {
        self.posted_dates(query).max().unwrap_or(0)
    }

    fn posted_dates(&self, query: &Query) -> std::vec::IntoIter<i64> {
        let state = self.book.state.read();
        query
            .last_run
            .iter()
            .filter_map(|id| state.splits.get(id))
            .filter_map(|s| s.transaction)
            .filter_map(|t| state.transactions.get(&t))
            .map(|t| t.date_posted.timestamp())
            .collect::<Vec<_>>()
            .into_iter()
    }
}

/// Count members per group, preserving first-appearance order
fn group_by<K, F>(splits: &[SplitId], key: F) -> Vec<(K, usize)>
where
    K: Copy + Eq + std::hash::Hash,
    F: Fn(&SplitId) -> Option<K>,
{
    let mut order = Vec::new();
    let mut counts: HashMap<K, usize> = HashMap::new();
    for id in splits {
        if let Some(k) = key(id) {
            let count = counts.entry(k).or_insert(0);
            if *count == 0 {
                order.push(k);
            }
            *count += 1;
        }
    }
    order
        .into_iter()
        .map(|k| (k, counts.get(&k).copied().unwrap_or(0)))
        .collect()
}
