//! Splits: single debit/credit legs of a transaction

use crate::kvp::KvpFrame;
use crate::transaction::{trans_order, Transaction};
use crate::types::{AccountId, Amount, LotId, ReconcileState, SplitId, TransactionId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub(crate) const VOID_FORMER_AMOUNT: &str = "void-former-amount";
pub(crate) const VOID_FORMER_VALUE: &str = "void-former-value";

/// One leg of a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Split {
    pub(crate) id: SplitId,
    pub(crate) transaction: Option<TransactionId>,
    pub(crate) account: Option<AccountId>,
    pub(crate) lot: Option<LotId>,
    pub(crate) memo: String,
    pub(crate) action: String,
    pub(crate) reconcile: ReconcileState,
    pub(crate) date_reconciled: Option<DateTime<Utc>>,
    pub(crate) value: Amount,
    pub(crate) amount: Amount,
    pub(crate) kvp: KvpFrame,
}

impl Split {
    pub(crate) fn new() -> Self {
        Self {
            id: SplitId::new(),
            transaction: None,
            account: None,
            lot: None,
            memo: String::new(),
            action: String::new(),
            reconcile: ReconcileState::NotReconciled,
            date_reconciled: None,
            value: Decimal::ZERO,
            amount: Decimal::ZERO,
            kvp: KvpFrame::new(),
        }
    }

    /// Split GUID
    pub fn id(&self) -> SplitId {
        self.id
    }

    /// Owning transaction
    pub fn transaction(&self) -> Option<TransactionId> {
        self.transaction
    }

    /// Account the split is filed under
    pub fn account(&self) -> Option<AccountId> {
        self.account
    }

    /// Lot the split belongs to
    pub fn lot(&self) -> Option<LotId> {
        self.lot
    }

    /// Memo
    pub fn memo(&self) -> &str {
        &self.memo
    }

    /// Action (e.g. "Buy", "Deposit")
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Reconciliation state
    pub fn reconcile(&self) -> ReconcileState {
        self.reconcile
    }

    /// Date the split was reconciled
    pub fn date_reconciled(&self) -> Option<DateTime<Utc>> {
        self.date_reconciled
    }

    /// Amount in the transaction's currency
    pub fn value(&self) -> Amount {
        self.value
    }

    /// Amount in the account's commodity
    pub fn amount(&self) -> Amount {
        self.amount
    }

    /// Price per unit of the account commodity.
    ///
    /// `1` when both amount and value are zero, `0` when only the amount is.
    pub fn share_price(&self) -> Amount {
        if self.amount.is_zero() {
            if self.value.is_zero() {
                return Decimal::ONE;
            }
            return Decimal::ZERO;
        }
        self.value.checked_div(self.amount).unwrap_or(Decimal::ZERO)
    }

    /// Amount held before the split was voided
    pub fn void_former_amount(&self) -> Option<Amount> {
        self.kvp.get_numeric(VOID_FORMER_AMOUNT)
    }

    /// Value held before the split was voided
    pub fn void_former_value(&self) -> Option<Amount> {
        self.kvp.get_numeric(VOID_FORMER_VALUE)
    }

    /// Metadata frame
    pub fn kvp(&self) -> &KvpFrame {
        &self.kvp
    }
}

/// Order splits by their transactions, then by the split's own fields.
///
/// Splits without a transaction sort before those with one. The GUID is
/// the final key so that distinct splits never compare equal.
pub fn split_date_order(
    a: &Split,
    a_trans: Option<&Transaction>,
    b: &Split,
    b_trans: Option<&Transaction>,
) -> Ordering {
    if a.id == b.id {
        return Ordering::Equal;
    }
    let by_trans = match (a_trans, b_trans) {
        (Some(ta), Some(tb)) => trans_order(ta, tb),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_trans
        .then_with(|| a.memo.cmp(&b.memo))
        .then_with(|| a.action.cmp(&b.action))
        .then_with(|| a.reconcile.as_char().cmp(&b.reconcile.as_char()))
        .then_with(|| a.amount.cmp(&b.amount))
        .then_with(|| a.value.cmp(&b.value))
        .then_with(|| a.date_reconciled.cmp(&b.date_reconciled))
        .then_with(|| a.id.cmp(&b.id))
}
