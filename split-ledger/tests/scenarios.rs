//! End-to-end ledger scenarios: balancing policies, date-scoped queries,
//! de-duplication and truncation

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use split_ledger::query::{CompareHow, GuidMatch, ParamPath, SplitField, StringMode};
use split_ledger::{
    AccountId, AccountType, Book, Commodity, Config, DoubleEntryPolicy, IdType, MatchMode, Query,
    QueryExecutor, QueryOp, ReconcileSet, ReconcileState, Scope, SortKey, SplitId, TransactionId,
    Truncation,
};

fn book(policy: DoubleEntryPolicy) -> Book {
    let mut config = Config::default();
    split_ledger::init_tracing(&config.logging.filter);
    config.double_entry.policy = policy;
    Book::new(config).unwrap()
}

fn usd() -> Commodity {
    Commodity::currency("USD")
}

fn date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
}

/// Post a transaction with one split per (account, cents) leg
fn post(
    book: &Book,
    posted: DateTime<Utc>,
    legs: &[(AccountId, i64)],
) -> (TransactionId, Vec<SplitId>) {
    let trans = book.create_transaction();
    book.begin_edit(trans, true).unwrap();
    book.set_currency(trans, usd()).unwrap();
    book.set_date_posted(trans, posted).unwrap();
    let splits = legs
        .iter()
        .map(|(account, cents)| {
            let split = book.create_split();
            book.append_split(trans, split).unwrap();
            book.set_split_account(split, Some(*account)).unwrap();
            book.set_value(split, Decimal::new(*cents, 2)).unwrap();
            book.set_amount(split, Decimal::new(*cents, 2)).unwrap();
            split
        })
        .collect();
    book.commit_edit(trans).unwrap();
    (trans, splits)
}

fn two_accounts(book: &Book) -> (AccountId, AccountId) {
    (
        book.create_account("X", usd(), AccountType::Bank, None).unwrap(),
        book.create_account("Y", usd(), AccountType::Expense, None).unwrap(),
    )
}

#[test]
fn test_balanced_commit_has_zero_imbalance() {
    let book = book(DoubleEntryPolicy::AutoBalance);
    let (x, y) = two_accounts(&book);
    let (trans, _) = post(&book, date(2020, 3, 1), &[(x, 10000), (y, -10000)]);

    assert_eq!(book.imbalance(trans).unwrap(), Decimal::ZERO);
    assert_eq!(book.count_splits(trans).unwrap(), 2);
    assert!(book.find_account("Imbalance-USD", None).is_none());
}

#[test]
fn test_removed_split_is_auto_balanced() {
    let book = book(DoubleEntryPolicy::AutoBalance);
    let (x, y) = two_accounts(&book);
    let (trans, splits) = post(&book, date(2020, 3, 1), &[(x, 10000), (y, -10000)]);

    book.begin_edit(trans, true).unwrap();
    book.remove_split(trans, splits[1]).unwrap();
    book.commit_edit(trans).unwrap();

    assert_eq!(book.imbalance(trans).unwrap(), Decimal::ZERO);
    assert_eq!(book.count_splits(trans).unwrap(), 2);
    assert!(book.split(splits[1]).is_err());
    let imbalance = book.find_account("Imbalance-USD", None).unwrap();
    let balancing = book.account_splits(imbalance).unwrap();
    assert_eq!(balancing.len(), 1);
    assert_eq!(book.split(balancing[0]).unwrap().value(), Decimal::new(-10000, 2));
}

#[test]
fn test_removed_split_left_unbalanced_without_policy() {
    let book = book(DoubleEntryPolicy::None);
    let (x, y) = two_accounts(&book);
    let (trans, splits) = post(&book, date(2020, 3, 1), &[(x, 10000), (y, -10000)]);

    book.begin_edit(trans, true).unwrap();
    book.remove_split(trans, splits[1]).unwrap();
    book.commit_edit(trans).unwrap();

    assert_eq!(book.imbalance(trans).unwrap(), Decimal::new(10000, 2));
    assert_eq!(book.count_splits(trans).unwrap(), 1);
}

#[test]
fn test_account_and_date_range_query() {
    let book = book(DoubleEntryPolicy::AutoBalance);
    let (x, y) = two_accounts(&book);
    for posted in [
        date(2020, 11, 5),
        date(2019, 12, 31),
        date(2020, 1, 1),
        date(2021, 1, 1),
        date(2020, 6, 15),
    ] {
        post(&book, posted, &[(x, 500), (y, -500)]);
    }

    let mut query = Query::new();
    query.add_single_account_match(x, QueryOp::And);
    query.add_date_range_match(Some((2020, 1, 1)), Some((2020, 12, 31)), QueryOp::And);
    query.set_sort_order(SortKey::Date, SortKey::None, SortKey::None);

    let executor = QueryExecutor::new(&book);
    let result = executor.run(&mut query, &Scope::all());
    let dates: Vec<_> = result
        .iter()
        .map(|id| {
            let trans = book.split(*id).unwrap().transaction().unwrap();
            book.transaction(trans).unwrap().date_posted()
        })
        .collect();
    assert_eq!(dates, vec![date(2020, 1, 1), date(2020, 6, 15), date(2020, 11, 5)]);
    assert_eq!(executor.earliest_date_found(&query), date(2020, 1, 1).timestamp());
    assert_eq!(executor.latest_date_found(&query), date(2020, 11, 5).timestamp());
}

#[test]
fn test_unbounded_date_range_leaves_query_unchanged() {
    let mut query = Query::new();
    query.add_cleared_match(
        ReconcileSet::EMPTY.with(ReconcileState::Cleared),
        split_ledger::query::ClearedMatch::Any,
        QueryOp::And,
    );
    let before = query.clone();
    query.add_date_range_match(None, None, QueryOp::And);
    query.add_date_range_match_tt(None, None, QueryOp::Or);
    assert_eq!(query, before);
}

#[test]
fn test_match_all_versus_match_any() {
    let book = book(DoubleEntryPolicy::None);
    let (x, y) = two_accounts(&book);
    let z = book
        .create_account("Z", usd(), AccountType::Equity, None)
        .unwrap();
    let (trans, splits) = post(&book, date(2020, 2, 1), &[(x, 300), (y, -200), (z, -100)]);

    let executor = QueryExecutor::new(&book);
    let matched = &splits[..2];
    assert!(executor.unique_transactions(matched, MatchMode::All).is_empty());
    assert_eq!(executor.unique_transactions(matched, MatchMode::Any), vec![trans]);
    assert_eq!(executor.unique_transactions(&splits, MatchMode::All), vec![trans]);
}

#[test]
fn test_transaction_touching_all_accounts() {
    let book = book(DoubleEntryPolicy::None);
    let (x, y) = two_accounts(&book);
    let z = book
        .create_account("Z", usd(), AccountType::Equity, None)
        .unwrap();
    let (both, _) = post(&book, date(2020, 2, 1), &[(x, 100), (y, -100)]);
    post(&book, date(2020, 2, 2), &[(x, 100), (z, -100)]);

    let mut query = Query::new();
    query.add_account_match(&[x, y], GuidMatch::All, QueryOp::And);
    let executor = QueryExecutor::new(&book);
    assert_eq!(
        executor.get_transactions(&mut query, &Scope::all(), MatchMode::All),
        vec![both]
    );
}

#[test]
fn test_truncation_keeps_either_end() {
    let book = book(DoubleEntryPolicy::AutoBalance);
    let (x, y) = two_accounts(&book);
    let mut in_x = Vec::new();
    for day in 1..=4 {
        let (_, splits) = post(&book, date(2020, 5, day), &[(x, 100), (y, -100)]);
        in_x.push(splits[0]);
    }
    let executor = QueryExecutor::new(&book);
    let scope = Scope::accounts([x]);

    let mut query = Query::new();
    query.set_max_results(Some(3));
    assert_eq!(executor.run(&mut query, &scope), in_x[1..].to_vec());

    query.set_truncation(Truncation::KeepEarliest);
    assert_eq!(executor.run(&mut query, &scope), in_x[..3].to_vec());
}

#[test]
fn test_string_guid_and_or_combinations() {
    let book = book(DoubleEntryPolicy::AutoBalance);
    let (x, y) = two_accounts(&book);
    let (t1, s1) = post(&book, date(2020, 7, 1), &[(x, 100), (y, -100)]);
    let (t2, s2) = post(&book, date(2020, 7, 2), &[(x, 200), (y, -200)]);
    book.begin_edit(t1, true).unwrap();
    book.set_memo(s1[0], "Coffee beans").unwrap();
    book.commit_edit(t1).unwrap();

    let executor = QueryExecutor::new(&book);
    let mut query = Query::new();
    query.add_string_match(
        ParamPath::Split(SplitField::Memo),
        "coffee",
        StringMode::Literal,
        false,
        CompareHow::Equal,
        QueryOp::And,
    );
    query.add_guid_match(Some(*t2.as_uuid()), IdType::Transaction, QueryOp::Or);
    let result = executor.run(&mut query, &Scope::accounts([x]));
    assert_eq!(result, vec![s1[0], s2[0]]);

    let mut inverted = query.invert();
    let result = executor.run(&mut inverted, &Scope::accounts([x]));
    assert!(result.is_empty());
}

#[test]
fn test_running_balances_follow_account_order() {
    let book = book(DoubleEntryPolicy::AutoBalance);
    let (x, y) = two_accounts(&book);
    let (_, late) = post(&book, date(2020, 8, 20), &[(x, 700), (y, -700)]);
    let (t_early, early) = post(&book, date(2020, 8, 1), &[(x, 300), (y, -300)]);

    assert_eq!(book.account_splits(x).unwrap(), vec![early[0], late[0]]);
    assert_eq!(book.balance(early[0]).unwrap(), Decimal::new(300, 2));
    assert_eq!(book.balance(late[0]).unwrap(), Decimal::new(1000, 2));

    book.begin_edit(t_early, true).unwrap();
    book.set_reconcile(early[0], ReconcileState::Cleared).unwrap();
    book.commit_edit(t_early).unwrap();
    assert_eq!(book.cleared_balance(late[0]).unwrap(), Decimal::new(300, 2));
    assert_eq!(book.reconciled_balance(late[0]).unwrap(), Decimal::ZERO);
}
