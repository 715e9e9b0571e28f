//! Transactions: atomic economic events owning an ordered set of splits

use crate::kvp::{KvpFrame, KvpValue};
use crate::types::{Commodity, SplitId, TransactionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub(crate) const NOTES_SLOT: &str = "notes";
pub(crate) const VOID_REASON_SLOT: &str = "void-reason";

/// Ledger transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub(crate) id: TransactionId,
    pub(crate) splits: Vec<SplitId>,
    pub(crate) currency: Option<Commodity>,
    pub(crate) num: String,
    pub(crate) description: String,
    pub(crate) date_posted: DateTime<Utc>,
    pub(crate) date_entered: DateTime<Utc>,
    pub(crate) kvp: KvpFrame,
}

impl Transaction {
    pub(crate) fn new() -> Self {
        Self {
            id: TransactionId::new(),
            splits: Vec::new(),
            currency: None,
            num: String::new(),
            description: String::new(),
            date_posted: DateTime::<Utc>::default(),
            date_entered: Utc::now(),
            kvp: KvpFrame::new(),
        }
    }

    /// Transaction GUID
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Member splits, in insertion order
    pub fn splits(&self) -> &[SplitId] {
        &self.splits
    }

    /// Split at position `index`
    pub fn split(&self, index: usize) -> Option<SplitId> {
        self.splits.get(index).copied()
    }

    /// Number of member splits
    pub fn count_splits(&self) -> usize {
        self.splits.len()
    }

    /// Currency split values are denominated in
    pub fn currency(&self) -> Option<&Commodity> {
        self.currency.as_ref()
    }

    /// Check number or other user reference
    pub fn num(&self) -> &str {
        &self.num
    }

    /// Description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Posted date
    pub fn date_posted(&self) -> DateTime<Utc> {
        self.date_posted
    }

    /// Entered date
    pub fn date_entered(&self) -> DateTime<Utc> {
        self.date_entered
    }

    /// Free-form notes
    pub fn notes(&self) -> Option<&str> {
        self.kvp.get_string(NOTES_SLOT)
    }

    /// Reason recorded when the transaction was voided
    pub fn void_reason(&self) -> Option<&str> {
        self.kvp.get_string(VOID_REASON_SLOT)
    }

    /// True when the transaction was voided and not yet restored
    pub fn is_void(&self) -> bool {
        self.void_reason().is_some()
    }

    /// Metadata frame
    pub fn kvp(&self) -> &KvpFrame {
        &self.kvp
    }

    pub(crate) fn set_void_reason(&mut self, reason: Option<&str>) {
        match reason {
            Some(reason) => self
                .kvp
                .set(VOID_REASON_SLOT, KvpValue::String(reason.to_string())),
            None => {
                self.kvp.remove(VOID_REASON_SLOT);
            }
        }
    }
}

/// Leading integer of a check number, `0` when there is none
pub(crate) fn leading_number(num: &str) -> i64 {
    let trimmed = num.trim_start();
    let (sign, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().map(|n| sign * n).unwrap_or(0)
}

/// Compare check numbers numerically, falling back to the text
pub fn num_order(a: &str, b: &str) -> Ordering {
    leading_number(a)
        .cmp(&leading_number(b))
        .then_with(|| a.cmp(b))
}

/// Canonical transaction order: posted date, number, entered date,
/// description, then GUID so that the order is total.
pub fn trans_order(a: &Transaction, b: &Transaction) -> Ordering {
    a.date_posted
        .cmp(&b.date_posted)
        .then_with(|| leading_number(&a.num).cmp(&leading_number(&b.num)))
        .then_with(|| a.date_entered.cmp(&b.date_entered))
        .then_with(|| a.description.cmp(&b.description))
        .then_with(|| a.id.cmp(&b.id))
}
