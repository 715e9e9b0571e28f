//! Split queries
//!
//! A [`Query`] is a disjunction of [`QueryTerm`]s; each term is a
//! conjunction of [`Condition`]s pairing a [`ParamPath`] with a
//! [`Predicate`]. Terms are added with an explicit [`QueryOp`] that
//! combines the new term with everything already in the query, so the
//! query stays in disjunctive normal form.
//!
//! # Architecture
//!
//! - [`param`]: typed paths from a split to the compared field
//! - [`predicate`]: typed match rules
//! - [`executor`]: runs a query against a [`crate::Book`]
//!
//! Builder methods never fail loudly: a malformed term is logged at `warn`
//! and the query is left unchanged.

pub mod executor;
pub mod param;
pub mod predicate;

pub use executor::{MatchMode, QueryExecutor, Scope};
pub use param::{AccountField, LotField, ParamKind, ParamPath, ParamValue, SplitField, TransField};
pub use predicate::{
    AmountSign, ClearedMatch, CompareHow, DateMatch, GuidMatch, Predicate, StringMode,
    StringPattern,
};

use crate::book::BookState;
use crate::config::{QueryConfig, Truncation};
use crate::kvp::KvpValue;
use crate::split::Split;
use crate::types::{AccountId, Amount, IdType, ReconcileSet, SplitId};
use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

/// How a new term combines with the existing query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryOp {
    /// Both must match
    And,
    /// Either matches
    Or,
    /// Not both
    Nand,
    /// Neither
    Nor,
    /// Exactly one
    Xor,
}

/// Sort key for query results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortKey {
    /// Canonical split order (transaction order, then split fields)
    Standard,
    /// Posted date of the transaction
    Date,
    /// Check number, numeric-aware
    Num,
    /// Split value
    Amount,
    /// Split memo
    Memo,
    /// Transaction description
    Description,
    /// No ordering
    None,
}

/// One sort level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SortSpec {
    /// Key compared at this level
    pub key: SortKey,
    /// Ascending when true
    pub increasing: bool,
}

impl SortSpec {
    fn new(key: SortKey) -> Self {
        Self {
            key,
            increasing: true,
        }
    }
}

/// A path and predicate, optionally negated
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Field the predicate is applied to
    pub path: ParamPath,
    /// Match rule
    pub predicate: Predicate,
    /// Negate the outcome
    pub invert: bool,
}

impl Condition {
    /// Evaluate against a split. A path that cannot be walked does not match.
    pub(crate) fn matches(&self, state: &BookState, split: &Split) -> bool {
        let matched = self
            .path
            .resolve(state, split)
            .is_some_and(|value| self.predicate.matches(&value));
        matched != self.invert
    }

    fn inverted(&self) -> Self {
        Self {
            invert: !self.invert,
            ..self.clone()
        }
    }
}

/// Conjunction of conditions
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryTerm(pub(crate) Vec<Condition>);

impl QueryTerm {
    /// Conditions of the term
    pub fn conditions(&self) -> &[Condition] {
        &self.0
    }

    /// True when every condition holds, stopping at the first failure
    pub(crate) fn matches(&self, state: &BookState, split: &Split) -> bool {
        self.0.iter().all(|c| c.matches(state, split))
    }
}

/// Split query: disjunction of terms plus sort and limit settings
#[derive(Debug, Clone)]
pub struct Query {
    terms: Vec<QueryTerm>,
    sort: [SortSpec; 3],
    max_results: Option<usize>,
    truncation: Truncation,
    pub(crate) last_run: Vec<SplitId>,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            terms: Vec::new(),
            sort: [
                SortSpec::new(SortKey::Standard),
                SortSpec::new(SortKey::None),
                SortSpec::new(SortKey::None),
            ],
            max_results: None,
            truncation: Truncation::KeepLatest,
            last_run: Vec::new(),
        }
    }
}

impl PartialEq for Query {
    fn eq(&self, other: &Self) -> bool {
        self.terms == other.terms
            && self.sort == other.sort
            && self.max_results == other.max_results
            && self.truncation == other.truncation
    }
}

fn day_start(year: i32, month: u32, day: u32) -> Option<DateTime<Utc>> {
    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&naive))
}

fn day_end(year: i32, month: u32, day: u32) -> Option<DateTime<Utc>> {
    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(23, 59, 59)?;
    Some(Utc.from_utc_datetime(&naive))
}

impl Query {
    /// Empty query: matches every split, sorted in standard order
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty query using the configured result cap and truncation
    pub fn with_config(config: &QueryConfig) -> Self {
        Self {
            max_results: config.default_max_results,
            truncation: config.truncation,
            ..Self::default()
        }
    }

    /// Terms of the query
    pub fn terms(&self) -> &[QueryTerm] {
        &self.terms
    }

    /// Number of terms
    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }

    /// True when the query restricts anything
    pub fn has_terms(&self) -> bool {
        !self.terms.is_empty()
    }

    /// Sort levels, primary first
    pub fn sort(&self) -> &[SortSpec; 3] {
        &self.sort
    }

    /// Result cap
    pub fn max_results(&self) -> Option<usize> {
        self.max_results
    }

    /// Which end survives truncation
    pub fn truncation(&self) -> Truncation {
        self.truncation
    }

    /// Splits returned by the most recent run
    pub fn last_run(&self) -> &[SplitId] {
        &self.last_run
    }

    /// Copy of this query with other's terms combined under `op`.
    ///
    /// Sort and limit settings come from `self`. An AND with an empty side
    /// degrades to OR so that queries can be built up from nothing.
    pub fn merge(&self, other: &Query, op: QueryOp) -> Query {
        let op = if op == QueryOp::And && (!self.has_terms() || !other.has_terms()) {
            QueryOp::Or
        } else {
            op
        };

        let terms = match op {
            QueryOp::Or => self.terms.iter().chain(&other.terms).cloned().collect(),
            QueryOp::And => {
                let mut terms = Vec::with_capacity(self.terms.len() * other.terms.len());
                for left in &self.terms {
                    for right in &other.terms {
                        let mut conditions = left.0.clone();
                        conditions.extend(right.0.iter().cloned());
                        terms.push(QueryTerm(conditions));
                    }
                }
                terms
            }
            QueryOp::Nand => self.merge(other, QueryOp::And).invert().terms,
            QueryOp::Nor => self.merge(other, QueryOp::Or).invert().terms,
            QueryOp::Xor => {
                let left = self.merge(&other.invert(), QueryOp::And);
                let right = self.invert().merge(other, QueryOp::And);
                left.merge(&right, QueryOp::Or).terms
            }
        };

        Query {
            terms,
            sort: self.sort,
            max_results: self.max_results,
            truncation: self.truncation,
            last_run: Vec::new(),
        }
    }

    /// Logical complement. The complement of an empty query is empty.
    pub fn invert(&self) -> Query {
        let mut result = Query {
            terms: Vec::new(),
            ..self.settings_only()
        };
        for term in &self.terms {
            // not (a and b) == (not a) or (not b)
            let negated = Query {
                terms: term
                    .0
                    .iter()
                    .map(|c| QueryTerm(vec![c.inverted()]))
                    .collect(),
                ..self.settings_only()
            };
            result = result.merge(&negated, QueryOp::And);
        }
        result
    }

    fn settings_only(&self) -> Query {
        Query {
            terms: Vec::new(),
            sort: self.sort,
            max_results: self.max_results,
            truncation: self.truncation,
            last_run: Vec::new(),
        }
    }

    /// Add a single condition combined with the existing terms under `op`.
    ///
    /// Fails when the predicate cannot be evaluated against the path.
    pub fn add_predicate(&mut self, path: ParamPath, predicate: Predicate, op: QueryOp) -> Result<()> {
        if !predicate.accepts(path.kind()) {
            return Err(Error::InvalidPredicate(format!(
                "{:?} predicate cannot match {:?}",
                path.kind(),
                path
            )));
        }
        let single = Query {
            terms: vec![QueryTerm(vec![Condition {
                path,
                predicate,
                invert: false,
            }])],
            ..self.settings_only()
        };
        self.combine(&single, op);
        Ok(())
    }

    fn combine(&mut self, other: &Query, op: QueryOp) {
        let op = if self.has_terms() { op } else { QueryOp::Or };
        *self = self.merge(other, op);
    }

    fn add_or_warn(&mut self, path: ParamPath, predicate: Result<Predicate>, op: QueryOp) {
        if let Err(err) = predicate.and_then(|p| self.add_predicate(path, p, op)) {
            warn!(?path, error = %err, "Query term not added");
        }
    }

    /// Match splits by account. `Any` and `None` test the split's own
    /// account; `All` requires the transaction to touch every listed
    /// account; `Null` matches account-less splits.
    pub fn add_account_match(&mut self, accounts: &[AccountId], how: GuidMatch, op: QueryOp) {
        let guids: Vec<Uuid> = accounts.iter().map(|a| *a.as_uuid()).collect();
        let path = match how {
            GuidMatch::All => ParamPath::Trans(TransField::SplitAccountGuids),
            _ => ParamPath::Account(AccountField::Guid),
        };
        self.add_or_warn(path, Predicate::guid(how, guids), op);
    }

    /// Match splits in one account
    pub fn add_single_account_match(&mut self, account: AccountId, op: QueryOp) {
        self.add_account_match(&[account], GuidMatch::Any, op);
    }

    /// Replace any account restriction with "split is in one of `accounts`"
    pub fn set_accounts(&mut self, accounts: &[AccountId]) {
        self.purge_terms(ParamPath::Account(AccountField::Guid));
        self.purge_terms(ParamPath::Trans(TransField::SplitAccountGuids));
        self.add_account_match(accounts, GuidMatch::Any, QueryOp::And);
    }

    /// Match posted dates within calendar days given as (year, month, day).
    ///
    /// The start bound is the start of its day and the end bound the last
    /// second of its day, both in UTC. With neither bound the query is left
    /// unchanged.
    pub fn add_date_range_match(
        &mut self,
        start: Option<(i32, u32, u32)>,
        end: Option<(i32, u32, u32)>,
        op: QueryOp,
    ) {
        let start_ts = match start {
            Some((y, m, d)) => match day_start(y, m, d) {
                Some(ts) => Some(ts),
                None => {
                    warn!(year = y, month = m, day = d, "Invalid start date; query unchanged");
                    return;
                }
            },
            None => None,
        };
        let end_ts = match end {
            Some((y, m, d)) => match day_end(y, m, d) {
                Some(ts) => Some(ts),
                None => {
                    warn!(year = y, month = m, day = d, "Invalid end date; query unchanged");
                    return;
                }
            },
            None => None,
        };
        self.add_date_range_match_ts(start_ts, end_ts, op);
    }

    /// Match posted dates between epoch-second bounds
    pub fn add_date_range_match_tt(&mut self, start: Option<i64>, end: Option<i64>, op: QueryOp) {
        let convert = |secs: i64| Utc.timestamp_opt(secs, 0).single();
        let start_ts = match start.map(convert) {
            Some(None) => {
                warn!(?start, "Start timestamp out of range; query unchanged");
                return;
            }
            other => other.flatten(),
        };
        let end_ts = match end.map(convert) {
            Some(None) => {
                warn!(?end, "End timestamp out of range; query unchanged");
                return;
            }
            other => other.flatten(),
        };
        self.add_date_range_match_ts(start_ts, end_ts, op);
    }

    /// Match posted dates between inclusive timestamp bounds
    pub fn add_date_range_match_ts(
        &mut self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        op: QueryOp,
    ) {
        if start.is_none() && end.is_none() {
            debug!("Date range without bounds; query unchanged");
            return;
        }
        let path = ParamPath::Trans(TransField::DatePosted);
        let mut range = self.settings_only();
        if let Some(start) = start {
            range.push_condition(path, Predicate::date(CompareHow::Gte, DateMatch::Normal, start));
        }
        if let Some(end) = end {
            range.push_condition(path, Predicate::date(CompareHow::Lte, DateMatch::Normal, end));
        }
        self.combine(&range, op);
    }

    /// Match posted dates in the closed range `start..=end`
    pub fn add_date_match_closed(&mut self, start: DateTime<Utc>, end: DateTime<Utc>, op: QueryOp) {
        self.add_date_range_match_ts(Some(start), Some(end), op);
    }

    fn push_condition(&mut self, path: ParamPath, predicate: Predicate) {
        let condition = Condition {
            path,
            predicate,
            invert: false,
        };
        match self.terms.first_mut() {
            Some(term) => term.0.push(condition),
            None => self.terms.push(QueryTerm(vec![condition])),
        }
    }

    /// Match a text field, literally (substring) or by regular expression
    pub fn add_string_match(
        &mut self,
        path: ParamPath,
        pattern: &str,
        mode: StringMode,
        case_sensitive: bool,
        how: CompareHow,
        op: QueryOp,
    ) {
        self.add_or_warn(path, Predicate::string(how, pattern, mode, case_sensitive), op);
    }

    /// Match a numeric field against `value`, after the sign filter
    pub fn add_numeric_match(
        &mut self,
        path: ParamPath,
        value: Amount,
        sign: AmountSign,
        how: CompareHow,
        op: QueryOp,
    ) {
        self.add_or_warn(path, Ok(Predicate::numeric(how, sign, value)), op);
    }

    /// Match splits by reconcile state
    pub fn add_cleared_match(&mut self, states: ReconcileSet, how: ClearedMatch, op: QueryOp) {
        self.add_or_warn(
            ParamPath::Split(SplitField::Reconcile),
            Ok(Predicate::cleared(how, states)),
            op,
        );
    }

    /// Match the split, its transaction, account or lot by GUID.
    /// `None` matches splits where that entity is absent.
    pub fn add_guid_match(&mut self, guid: Option<Uuid>, id_type: IdType, op: QueryOp) {
        let path = match id_type {
            IdType::Split => ParamPath::Split(SplitField::Guid),
            IdType::Transaction => ParamPath::Trans(TransField::Guid),
            IdType::Account => ParamPath::Account(AccountField::Guid),
            IdType::Lot => ParamPath::Lot(LotField::Guid),
        };
        let predicate = match guid {
            Some(guid) => Predicate::guid(GuidMatch::Any, vec![guid]),
            None => Predicate::guid(GuidMatch::Null, Vec::new()),
        };
        self.add_or_warn(path, predicate, op);
    }

    /// Match a metadata slot on the split, transaction, account or lot
    pub fn add_kvp_match(
        &mut self,
        slot: &str,
        value: KvpValue,
        how: CompareHow,
        id_type: IdType,
        op: QueryOp,
    ) {
        let path = match id_type {
            IdType::Split => ParamPath::Split(SplitField::Kvp),
            IdType::Transaction => ParamPath::Trans(TransField::Kvp),
            IdType::Account => ParamPath::Account(AccountField::Kvp),
            IdType::Lot => ParamPath::Lot(LotField::Kvp),
        };
        self.add_or_warn(path, Predicate::kvp(how, slot, value), op);
    }

    /// Remove every condition on `path`, dropping terms left empty
    pub fn purge_terms(&mut self, path: ParamPath) {
        for term in &mut self.terms {
            term.0.retain(|c| c.path != path);
        }
        self.terms.retain(|t| !t.0.is_empty());
    }

    /// Remove every term; the query then matches everything
    pub fn clear(&mut self) {
        self.terms.clear();
        self.last_run.clear();
    }

    /// Set the three sort keys, primary first
    pub fn set_sort_order(&mut self, primary: SortKey, secondary: SortKey, tertiary: SortKey) {
        self.sort[0].key = primary;
        self.sort[1].key = secondary;
        self.sort[2].key = tertiary;
    }

    /// Set the direction of each sort key
    pub fn set_sort_increasing(&mut self, primary: bool, secondary: bool, tertiary: bool) {
        self.sort[0].increasing = primary;
        self.sort[1].increasing = secondary;
        self.sort[2].increasing = tertiary;
    }

    /// Cap the number of results; `None` for unlimited
    pub fn set_max_results(&mut self, max: Option<usize>) {
        self.max_results = max;
    }

    /// Choose which end of the sorted result survives the cap
    pub fn set_truncation(&mut self, truncation: Truncation) {
        self.truncation = truncation;
    }
}
