//! Property-based tests for ledger invariants
//!
//! These tests use proptest to verify:
//! - Balance: committed transactions sum to zero under auto-balancing
//! - Rollback identity: rollback restores every field
//! - Destroy-then-rollback: nothing is freed
//! - Query idempotence and sort stability

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use split_ledger::query::{AmountSign, CompareHow, ParamPath, SplitField};
use split_ledger::{
    AccountId, AccountType, Book, Commodity, Config, DoubleEntryPolicy, Query, QueryExecutor,
    QueryOp, Scope, SortKey, TransactionId,
};

/// Strategy for generating split values (non-zero cents)
fn cents_strategy() -> impl Strategy<Value = i64> {
    prop_oneof![(-1_000_000i64..-1), (1i64..1_000_000)]
}

/// Strategy for generating transaction legs: (account index, cents)
fn legs_strategy() -> impl Strategy<Value = Vec<(usize, i64)>> {
    prop::collection::vec((0usize..3, cents_strategy()), 1..6)
}

/// Strategy for generating memos drawn from a small pool so that ties occur
fn memo_strategy() -> impl Strategy<Value = String> {
    prop_oneof![Just("rent"), Just("food"), Just("fuel"), Just("")].prop_map(String::from)
}

/// Mutations applied inside an edit session before rolling back
#[derive(Debug, Clone)]
enum Mutation {
    Describe(String),
    Revalue(usize, i64),
    Append(i64),
    Remove(usize),
    Destroy,
}

/// Strategy for generating session mutations
fn mutation_strategy() -> impl Strategy<Value = Mutation> {
    prop_oneof![
        "[a-z ]{0,12}".prop_map(Mutation::Describe),
        (0usize..6, cents_strategy()).prop_map(|(i, c)| Mutation::Revalue(i, c)),
        cents_strategy().prop_map(Mutation::Append),
        (0usize..6).prop_map(Mutation::Remove),
        Just(Mutation::Destroy),
    ]
}

fn create_test_book(policy: DoubleEntryPolicy) -> (Book, Vec<AccountId>) {
    let mut config = Config::default();
    config.double_entry.policy = policy;
    let book = Book::new(config).unwrap();
    let usd = Commodity::currency("USD");
    let accounts = ["Checking", "Savings", "Expenses"]
        .iter()
        .map(|name| {
            book.create_account(*name, usd.clone(), AccountType::Bank, None)
                .unwrap()
        })
        .collect();
    (book, accounts)
}

fn post(
    book: &Book,
    accounts: &[AccountId],
    day: u32,
    legs: &[(usize, i64)],
    memo: &str,
) -> TransactionId {
    let trans = book.create_transaction();
    book.begin_edit(trans, true).unwrap();
    book.set_currency(trans, Commodity::currency("USD")).unwrap();
    book.set_date_posted(trans, Utc.with_ymd_and_hms(2020, 1, day, 0, 0, 0).unwrap())
        .unwrap();
    for (account, cents) in legs {
        let split = book.create_split();
        book.append_split(trans, split).unwrap();
        book.set_split_account(split, Some(accounts[*account])).unwrap();
        book.set_value(split, Decimal::new(*cents, 2)).unwrap();
        book.set_amount(split, Decimal::new(*cents, 2)).unwrap();
        book.set_memo(split, memo).unwrap();
    }
    book.commit_edit(trans).unwrap();
    trans
}

fn apply(book: &Book, trans: TransactionId, accounts: &[AccountId], mutation: &Mutation) {
    let splits = book.transaction(trans).map(|t| t.splits().to_vec()).unwrap_or_default();
    // failures are fine here: rollback must restore state either way
    let _ = match mutation {
        Mutation::Describe(text) => book.set_description(trans, text.clone()),
        Mutation::Revalue(i, cents) => match splits.get(*i) {
            Some(split) => book.set_value(*split, Decimal::new(*cents, 2)),
            None => Ok(()),
        },
        Mutation::Append(cents) => {
            let split = book.create_split();
            book.append_split(trans, split)
                .and_then(|_| book.set_split_account(split, Some(accounts[0])))
                .and_then(|_| book.set_value(split, Decimal::new(*cents, 2)))
        }
        Mutation::Remove(i) => match splits.get(*i) {
            Some(split) => book.remove_split(trans, *split),
            None => Ok(()),
        },
        Mutation::Destroy => book.destroy_transaction(trans),
    };
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: auto-balanced commits always sum to zero
    #[test]
    fn prop_committed_transactions_balance(legs in legs_strategy()) {
        let (book, accounts) = create_test_book(DoubleEntryPolicy::AutoBalance);
        let trans = post(&book, &accounts, 1, &legs, "");

        prop_assert_eq!(book.imbalance(trans).unwrap(), Decimal::ZERO);
        let total: Decimal = book
            .transaction_splits(trans)
            .unwrap()
            .iter()
            .map(|s| s.value())
            .sum();
        prop_assert_eq!(total, Decimal::ZERO);
    }

    /// Property: rollback restores the transaction, its splits and account lists
    #[test]
    fn prop_rollback_identity(
        legs in legs_strategy(),
        mutations in prop::collection::vec(mutation_strategy(), 1..8),
    ) {
        let (book, accounts) = create_test_book(DoubleEntryPolicy::AutoBalance);
        let trans = post(&book, &accounts, 1, &legs, "memo");

        let before = book.transaction(trans).unwrap();
        let before_splits = book.transaction_splits(trans).unwrap();
        let before_lists: Vec<_> = accounts
            .iter()
            .map(|a| book.account_splits(*a).unwrap())
            .collect();

        book.begin_edit(trans, false).unwrap();
        for mutation in &mutations {
            apply(&book, trans, &accounts, mutation);
        }
        book.rollback_edit(trans).unwrap();

        prop_assert_eq!(book.transaction(trans).unwrap(), before);
        prop_assert_eq!(book.transaction_splits(trans).unwrap(), before_splits);
        let after_lists: Vec<_> = accounts
            .iter()
            .map(|a| book.account_splits(*a).unwrap())
            .collect();
        prop_assert_eq!(after_lists, before_lists);
    }

    /// Property: destroying and rolling back frees nothing
    #[test]
    fn prop_destroy_then_rollback(legs in legs_strategy()) {
        let (book, accounts) = create_test_book(DoubleEntryPolicy::None);
        let trans = post(&book, &accounts, 1, &legs, "");
        let before_splits = book.transaction_splits(trans).unwrap();

        book.begin_edit(trans, true).unwrap();
        book.destroy_transaction(trans).unwrap();
        prop_assert_eq!(book.count_splits(trans).unwrap(), 0);
        book.rollback_edit(trans).unwrap();

        prop_assert_eq!(book.transaction_splits(trans).unwrap(), before_splits.clone());
        for split in &before_splits {
            prop_assert!(book.split(split.id()).is_ok());
        }
    }

    /// Property: the same query on an unchanged book gives the same result
    #[test]
    fn prop_query_idempotent(
        ledger in prop::collection::vec((1u32..28, legs_strategy(), memo_strategy()), 1..10),
        threshold in 0i64..1_000_000,
    ) {
        let (book, accounts) = create_test_book(DoubleEntryPolicy::AutoBalance);
        for (day, legs, memo) in &ledger {
            post(&book, &accounts, *day, legs, memo);
        }

        let mut query = Query::new();
        query.add_numeric_match(
            ParamPath::Split(SplitField::Value),
            Decimal::new(threshold, 2),
            AmountSign::Any,
            CompareHow::Gte,
            QueryOp::And,
        );
        let executor = QueryExecutor::new(&book);
        let first = executor.run(&mut query, &Scope::all());
        let second = executor.run(&mut query, &Scope::all());
        prop_assert_eq!(first, second);
    }

    /// Property: splits tied on every sort key keep their prior relative order
    #[test]
    fn prop_sort_is_stable(
        ledger in prop::collection::vec((1u32..28, legs_strategy(), memo_strategy()), 1..10),
    ) {
        let (book, accounts) = create_test_book(DoubleEntryPolicy::None);
        for (day, legs, memo) in &ledger {
            post(&book, &accounts, *day, legs, memo);
        }
        let executor = QueryExecutor::new(&book);

        let mut standard = Query::new();
        let baseline = executor.run(&mut standard, &Scope::all());

        let mut by_memo = Query::new();
        by_memo.set_sort_order(SortKey::Memo, SortKey::None, SortKey::None);
        let sorted = executor.run(&mut by_memo, &Scope::all());

        let mut expected = baseline.clone();
        expected.sort_by_key(|id| book.split(*id).unwrap().memo().to_string());
        prop_assert_eq!(&sorted, &expected);
        prop_assert_eq!(executor.run(&mut by_memo, &Scope::all()), sorted);
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use split_ledger::RecordingBackend;
    use std::sync::Arc;

    #[test]
    fn test_full_session_lifecycle() {
        let backend = Arc::new(RecordingBackend::default());
        let book = Book::with_backend(Config::default(), backend.clone()).unwrap();
        let usd = Commodity::currency("USD");
        let checking = book
            .create_account("Checking", usd.clone(), AccountType::Bank, None)
            .unwrap();
        let food = book
            .create_account("Food", usd, AccountType::Expense, None)
            .unwrap();

        let trans = post(&book, &[checking, food], 3, &[(0, -2500), (1, 2500)], "lunch");
        assert_eq!(backend.commits().len(), 1);
        assert_eq!(book.imbalance(trans).unwrap(), Decimal::ZERO);

        let splits = book.account_splits(checking).unwrap();
        assert_eq!(book.balance(splits[0]).unwrap(), Decimal::new(-2500, 2));

        book.begin_edit(trans, true).unwrap();
        book.set_description(trans, "Lunch with team").unwrap();
        book.commit_edit(trans).unwrap();
        assert_eq!(backend.commits().len(), 2);

        book.void_transaction(trans, "duplicate").unwrap();
        assert!(book.transaction(trans).unwrap().is_void());
        assert_eq!(book.balance(splits[0]).unwrap(), Decimal::ZERO);
    }
}
