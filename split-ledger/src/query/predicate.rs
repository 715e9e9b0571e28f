//! Typed match rules
//!
//! Each predicate kind carries its own payload, so a predicate can only be
//! evaluated against the value type it was built for. Construction validates
//! the payload; evaluation never fails.

use super::param::{ParamKind, ParamValue};
use crate::kvp::KvpValue;
use crate::types::{Amount, ReconcileSet};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use regex::{Regex, RegexBuilder};
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::fmt;
use uuid::Uuid;

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareHow {
    /// Strictly less
    Lt,
    /// Less or equal
    Lte,
    /// Equal
    Equal,
    /// Greater or equal
    Gte,
    /// Strictly greater
    Gt,
    /// Different from
    Neq,
}

impl CompareHow {
    /// Whether `ordering` (value compared to operand) satisfies the operator
    pub fn test(self, ordering: Ordering) -> bool {
        match self {
            CompareHow::Lt => ordering == Ordering::Less,
            CompareHow::Lte => ordering != Ordering::Greater,
            CompareHow::Equal => ordering == Ordering::Equal,
            CompareHow::Gte => ordering != Ordering::Less,
            CompareHow::Gt => ordering == Ordering::Greater,
            CompareHow::Neq => ordering != Ordering::Equal,
        }
    }
}

/// How a string pattern is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringMode {
    /// Substring match
    Literal,
    /// Regular expression search
    Regex,
}

/// Sign filter applied before a numeric comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AmountSign {
    /// No filter
    #[default]
    Any,
    /// Zero or negative values only
    Credit,
    /// Zero or positive values only
    Debit,
    /// Non-zero values only
    NonZero,
}

impl AmountSign {
    fn admits(self, value: Amount) -> bool {
        match self {
            AmountSign::Any => true,
            AmountSign::Credit => !value.is_sign_positive() || value.is_zero(),
            AmountSign::Debit => !value.is_sign_negative() || value.is_zero(),
            AmountSign::NonZero => !value.is_zero(),
        }
    }
}

/// Date comparison granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DateMatch {
    /// Compare full timestamps
    #[default]
    Normal,
    /// Compare calendar days (UTC)
    Day,
}

/// GUID set semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuidMatch {
    /// The value (or any list member) is in the set
    Any,
    /// The value (or every list member) is outside the set
    None,
    /// The value is absent, or the list is empty
    Null,
    /// Every GUID in the set appears in the value
    All,
}

/// Reconcile-state set semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClearedMatch {
    /// The state is in the set
    Any,
    /// The state is outside the set
    None,
}

/// Compiled string pattern
#[derive(Clone)]
pub struct StringPattern {
    pattern: String,
    mode: StringMode,
    case_sensitive: bool,
    regex: Option<Regex>,
}

impl StringPattern {
    fn new(pattern: &str, mode: StringMode, case_sensitive: bool) -> Result<Self> {
        if pattern.is_empty() {
            return Err(Error::InvalidPredicate("empty string pattern".to_string()));
        }
        let regex = match mode {
            StringMode::Regex => Some(
                RegexBuilder::new(pattern)
                    .case_insensitive(!case_sensitive)
                    .build()?,
            ),
            StringMode::Literal => None,
        };
        let pattern = if case_sensitive || mode == StringMode::Regex {
            pattern.to_string()
        } else {
            pattern.to_lowercase()
        };
        Ok(Self {
            pattern,
            mode,
            case_sensitive,
            regex,
        })
    }

    /// Pattern text
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Interpretation of the pattern
    pub fn mode(&self) -> StringMode {
        self.mode
    }

    fn is_match(&self, text: &str) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(text),
            None if self.case_sensitive => text.contains(self.pattern.as_str()),
            None => text.to_lowercase().contains(self.pattern.as_str()),
        }
    }
}

impl PartialEq for StringPattern {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
            && self.mode == other.mode
            && self.case_sensitive == other.case_sensitive
    }
}

impl fmt::Debug for StringPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StringPattern")
            .field("pattern", &self.pattern)
            .field("mode", &self.mode)
            .field("case_sensitive", &self.case_sensitive)
            .finish()
    }
}

/// A single typed match rule
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Text match; only `Equal` and `Neq` are meaningful
    String {
        /// `Equal` matches, `Neq` rejects
        how: CompareHow,
        /// Compiled pattern
        pattern: StringPattern,
    },
    /// Numeric comparison of the absolute value
    Numeric {
        /// Operator
        how: CompareHow,
        /// Sign filter
        sign: AmountSign,
        /// Operand
        value: Amount,
    },
    /// Timestamp comparison
    Date {
        /// Operator
        how: CompareHow,
        /// Granularity
        granularity: DateMatch,
        /// Operand
        value: DateTime<Utc>,
    },
    /// GUID set membership
    Guid {
        /// Set semantics
        how: GuidMatch,
        /// The set
        guids: Vec<Uuid>,
    },
    /// Reconcile-state set membership
    Cleared {
        /// Set semantics
        how: ClearedMatch,
        /// The set
        states: ReconcileSet,
    },
    /// Comparison of a metadata slot
    Kvp {
        /// Operator
        how: CompareHow,
        /// Slash-separated slot path
        path: String,
        /// Operand; slots of another type never match
        value: KvpValue,
    },
}

/// Numeric equality tolerance
fn numeric_tolerance() -> Decimal {
    Decimal::new(1, 4)
}

impl Predicate {
    /// Build a string predicate
    pub fn string(
        how: CompareHow,
        pattern: &str,
        mode: StringMode,
        case_sensitive: bool,
    ) -> Result<Self> {
        if !matches!(how, CompareHow::Equal | CompareHow::Neq) {
            return Err(Error::InvalidPredicate(format!(
                "string match does not support {:?}",
                how
            )));
        }
        Ok(Predicate::String {
            how,
            pattern: StringPattern::new(pattern, mode, case_sensitive)?,
        })
    }

    /// Build a numeric predicate
    pub fn numeric(how: CompareHow, sign: AmountSign, value: Amount) -> Self {
        Predicate::Numeric { how, sign, value }
    }

    /// Build a date predicate
    pub fn date(how: CompareHow, granularity: DateMatch, value: DateTime<Utc>) -> Self {
        Predicate::Date {
            how,
            granularity,
            value,
        }
    }

    /// Build a GUID predicate. An empty set is only valid for `Null`.
    pub fn guid(how: GuidMatch, guids: Vec<Uuid>) -> Result<Self> {
        if guids.is_empty() && how != GuidMatch::Null {
            return Err(Error::InvalidPredicate(format!(
                "empty GUID set for {:?} match",
                how
            )));
        }
        Ok(Predicate::Guid { how, guids })
    }

    /// Build a reconcile-state predicate
    pub fn cleared(how: ClearedMatch, states: ReconcileSet) -> Self {
        Predicate::Cleared { how, states }
    }

    /// Build a metadata slot predicate
    pub fn kvp(how: CompareHow, path: &str, value: KvpValue) -> Result<Self> {
        if path.trim_matches('/').is_empty() {
            return Err(Error::InvalidPredicate("empty slot path".to_string()));
        }
        Ok(Predicate::Kvp {
            how,
            path: path.to_string(),
            value,
        })
    }

    /// Whether the predicate can be evaluated against values of `kind`
    pub fn accepts(&self, kind: ParamKind) -> bool {
        matches!(
            (self, kind),
            (Predicate::String { .. }, ParamKind::String)
                | (Predicate::Numeric { .. }, ParamKind::Numeric)
                | (Predicate::Date { .. }, ParamKind::Date)
                | (Predicate::Guid { .. }, ParamKind::Guid | ParamKind::GuidList)
                | (Predicate::Cleared { .. }, ParamKind::Reconcile)
                | (Predicate::Kvp { .. }, ParamKind::Kvp)
        )
    }

    /// Evaluate against a resolved value. Mismatched value types never match.
    pub fn matches(&self, value: &ParamValue<'_>) -> bool {
        match (self, value) {
            (Predicate::String { how, pattern }, ParamValue::String(text)) => {
                pattern.is_match(text) == (*how == CompareHow::Equal)
            }
            (Predicate::Numeric { how, sign, value }, ParamValue::Numeric(actual)) => {
                if !sign.admits(*actual) {
                    return false;
                }
                let actual = actual.abs();
                match how {
                    CompareHow::Equal => (actual - value.abs()).abs() < numeric_tolerance(),
                    CompareHow::Neq => (actual - value.abs()).abs() >= numeric_tolerance(),
                    _ => how.test(actual.cmp(value)),
                }
            }
            (
                Predicate::Date {
                    how,
                    granularity,
                    value,
                },
                ParamValue::Date(actual),
            ) => {
                let Some(actual) = actual else {
                    return false;
                };
                let ordering = match granularity {
                    DateMatch::Normal => actual.cmp(value),
                    DateMatch::Day => actual.date_naive().cmp(&value.date_naive()),
                };
                how.test(ordering)
            }
            (Predicate::Guid { how, guids }, ParamValue::Guid(actual)) => match how {
                GuidMatch::Any => actual.is_some_and(|g| guids.contains(&g)),
                GuidMatch::None => !actual.is_some_and(|g| guids.contains(&g)),
                GuidMatch::Null => actual.is_none(),
                GuidMatch::All => actual.is_some_and(|g| guids.iter().all(|p| *p == g)),
            },
            (Predicate::Guid { how, guids }, ParamValue::GuidList(actual)) => match how {
                GuidMatch::Any => actual.iter().any(|g| guids.contains(g)),
                GuidMatch::None => !actual.iter().any(|g| guids.contains(g)),
                GuidMatch::Null => actual.is_empty(),
                GuidMatch::All => guids.iter().all(|g| actual.contains(g)),
            },
            (Predicate::Cleared { how, states }, ParamValue::Reconcile(state)) => match how {
                ClearedMatch::Any => states.contains(*state),
                ClearedMatch::None => !states.contains(*state),
            },
            (Predicate::Kvp { how, path, value }, ParamValue::Kvp(frame)) => frame
                .get(path)
                .and_then(|slot| slot.compare(value))
                .is_some_and(|ordering| how.test(ordering)),
            _ => false,
        }
    }
}
