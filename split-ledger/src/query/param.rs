//! Parameter paths: typed accessors from a split to the field a predicate
//! compares
//!
//! A path starts at a split and may step to its transaction, account or lot
//! before reading a leaf field. Resolution yields a [`ParamValue`] whose
//! variant always matches [`ParamPath::kind`].

use crate::book::BookState;
use crate::kvp::KvpFrame;
use crate::split::Split;
use crate::types::{Amount, ReconcileState};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Leaf fields of a split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SplitField {
    /// Split GUID
    Guid,
    /// Memo
    Memo,
    /// Action
    Action,
    /// Value in the transaction currency
    Value,
    /// Amount in the account commodity
    Amount,
    /// Unit price
    SharePrice,
    /// Reconcile state
    Reconcile,
    /// Reconciled date
    DateReconciled,
    /// Metadata frame
    Kvp,
}

/// Leaf fields of the split's transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransField {
    /// Transaction GUID
    Guid,
    /// Check number
    Num,
    /// Description
    Description,
    /// Notes
    Notes,
    /// Posted date
    DatePosted,
    /// Entered date
    DateEntered,
    /// Metadata frame
    Kvp,
    /// Account GUIDs of every split in the transaction
    SplitAccountGuids,
}

/// Leaf fields of the split's account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountField {
    /// Account GUID
    Guid,
    /// Name
    Name,
    /// Metadata frame
    Kvp,
}

/// Leaf fields of the split's lot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LotField {
    /// Lot GUID
    Guid,
    /// Title
    Title,
    /// Metadata frame
    Kvp,
}

/// Accessor path starting at a split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamPath {
    /// A field of the split itself
    Split(SplitField),
    /// A field of the owning transaction
    Trans(TransField),
    /// A field of the referenced account
    Account(AccountField),
    /// A field of the referenced lot
    Lot(LotField),
}

/// Type of value a path resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Text
    String,
    /// Exact number
    Numeric,
    /// Timestamp
    Date,
    /// Single, possibly absent, GUID
    Guid,
    /// Several GUIDs
    GuidList,
    /// Reconcile state
    Reconcile,
    /// Metadata frame
    Kvp,
}

/// Value produced by resolving a path against a split
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue<'a> {
    /// Text
    String(&'a str),
    /// Exact number
    Numeric(Amount),
    /// Timestamp
    Date(Option<DateTime<Utc>>),
    /// GUID, `None` when the step to the entity found nothing
    Guid(Option<Uuid>),
    /// GUID list
    GuidList(Vec<Uuid>),
    /// Reconcile state
    Reconcile(ReconcileState),
    /// Metadata frame
    Kvp(&'a KvpFrame),
}

impl ParamPath {
    /// Type of value the path resolves to
    pub fn kind(&self) -> ParamKind {
        match self {
            ParamPath::Split(field) => match field {
                SplitField::Guid => ParamKind::Guid,
                SplitField::Memo | SplitField::Action => ParamKind::String,
                SplitField::Value | SplitField::Amount | SplitField::SharePrice => {
                    ParamKind::Numeric
                }
                SplitField::Reconcile => ParamKind::Reconcile,
                SplitField::DateReconciled => ParamKind::Date,
                SplitField::Kvp => ParamKind::Kvp,
            },
            ParamPath::Trans(field) => match field {
                TransField::Guid => ParamKind::Guid,
                TransField::Num | TransField::Description | TransField::Notes => {
                    ParamKind::String
                }
                TransField::DatePosted | TransField::DateEntered => ParamKind::Date,
                TransField::Kvp => ParamKind::Kvp,
                TransField::SplitAccountGuids => ParamKind::GuidList,
            },
            ParamPath::Account(field) => match field {
                AccountField::Guid => ParamKind::Guid,
                AccountField::Name => ParamKind::String,
                AccountField::Kvp => ParamKind::Kvp,
            },
            ParamPath::Lot(field) => match field {
                LotField::Guid => ParamKind::Guid,
                LotField::Title => ParamKind::String,
                LotField::Kvp => ParamKind::Kvp,
            },
        }
    }

    /// Walk the path from `split`.
    ///
    /// GUID paths always resolve (to `Guid(None)` when a step is missing) so
    /// that null matching works; other paths yield `None` when a step is
    /// missing.
    pub(crate) fn resolve<'a>(&self, state: &'a BookState, split: &'a Split) -> Option<ParamValue<'a>> {
        match self {
            ParamPath::Split(field) => Some(match field {
                SplitField::Guid => ParamValue::Guid(Some(*split.id.as_uuid())),
                SplitField::Memo => ParamValue::String(&split.memo),
                SplitField::Action => ParamValue::String(&split.action),
                SplitField::Value => ParamValue::Numeric(split.value),
                SplitField::Amount => ParamValue::Numeric(split.amount),
                SplitField::SharePrice => ParamValue::Numeric(split.share_price()),
                SplitField::Reconcile => ParamValue::Reconcile(split.reconcile),
                SplitField::DateReconciled => ParamValue::Date(split.date_reconciled),
                SplitField::Kvp => ParamValue::Kvp(&split.kvp),
            }),
            ParamPath::Trans(field) => {
                let trans = split.transaction.and_then(|t| state.transactions.get(&t));
                if *field == TransField::Guid {
                    return Some(ParamValue::Guid(trans.map(|t| *t.id.as_uuid())));
                }
                let trans = trans?;
                Some(match field {
                    TransField::Guid => ParamValue::Guid(Some(*trans.id.as_uuid())),
                    TransField::Num => ParamValue::String(&trans.num),
                    TransField::Description => ParamValue::String(&trans.description),
                    TransField::Notes => ParamValue::String(trans.notes().unwrap_or("")),
                    TransField::DatePosted => ParamValue::Date(Some(trans.date_posted)),
                    TransField::DateEntered => ParamValue::Date(Some(trans.date_entered)),
                    TransField::Kvp => ParamValue::Kvp(&trans.kvp),
                    TransField::SplitAccountGuids => ParamValue::GuidList(
                        trans
                            .splits
                            .iter()
                            .filter_map(|s| state.splits.get(s))
                            .filter_map(|s| s.account)
                            .map(|a| *a.as_uuid())
                            .collect(),
                    ),
                })
            }
            ParamPath::Account(field) => {
                let account = split.account.and_then(|a| state.accounts.get(&a));
                if *field == AccountField::Guid {
                    return Some(ParamValue::Guid(account.map(|a| *a.id.as_uuid())));
                }
                let account = account?;
                Some(match field {
                    AccountField::Guid => ParamValue::Guid(Some(*account.id.as_uuid())),
                    AccountField::Name => ParamValue::String(&account.name),
                    AccountField::Kvp => ParamValue::Kvp(&account.kvp),
                })
            }
            ParamPath::Lot(field) => {
                let lot = split.lot.and_then(|l| state.lots.get(&l));
                match field {
                    LotField::Guid => Some(ParamValue::Guid(lot.map(|l| *l.id.as_uuid()))),
                    LotField::Title => lot.map(|l| ParamValue::String(&l.title)),
                    LotField::Kvp => lot.map(|l| ParamValue::Kvp(&l.kvp)),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(ParamPath::Split(SplitField::Memo).kind(), ParamKind::String);
        assert_eq!(ParamPath::Split(SplitField::Value).kind(), ParamKind::Numeric);
        assert_eq!(ParamPath::Trans(TransField::DatePosted).kind(), ParamKind::Date);
        assert_eq!(
            ParamPath::Trans(TransField::SplitAccountGuids).kind(),
            ParamKind::GuidList
        );
        assert_eq!(ParamPath::Account(AccountField::Guid).kind(), ParamKind::Guid);
        assert_eq!(ParamPath::Lot(LotField::Title).kind(), ParamKind::String);
    }

    #[test]
    fn test_resolve_missing_account() {
        let state = BookState::default();
        let split = Split::new();
        assert_eq!(
            ParamPath::Account(AccountField::Guid).resolve(&state, &split),
            Some(ParamValue::Guid(None))
        );
        assert_eq!(ParamPath::Account(AccountField::Name).resolve(&state, &split), None);
        assert_eq!(
            ParamPath::Split(SplitField::Memo).resolve(&state, &split),
            Some(ParamValue::String(""))
        );
    }
}
