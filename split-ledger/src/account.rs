//! Accounts: the collaborator splits are filed under
//!
//! An account owns an ordered list of split handles. The list is only
//! mutated by the book while an edit session on the owning transaction is
//! open, and is re-sorted into split date order on commit.

use crate::kvp::KvpFrame;
use crate::types::{AccountId, AccountType, Commodity, SplitId};
use serde::{Deserialize, Serialize};

/// Ledger account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub(crate) id: AccountId,
    pub(crate) name: String,
    pub(crate) commodity: Commodity,
    pub(crate) account_type: AccountType,
    pub(crate) parent: Option<AccountId>,
    pub(crate) kvp: KvpFrame,
    pub(crate) splits: Vec<SplitId>,
}

impl Account {
    pub(crate) fn new(
        name: impl Into<String>,
        commodity: Commodity,
        account_type: AccountType,
        parent: Option<AccountId>,
    ) -> Self {
        Self {
            id: AccountId::new(),
            name: name.into(),
            commodity,
            account_type,
            parent,
            kvp: KvpFrame::new(),
            splits: Vec::new(),
        }
    }

    /// Account GUID
    pub fn id(&self) -> AccountId {
        self.id
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Commodity split amounts are denominated in
    pub fn commodity(&self) -> &Commodity {
        &self.commodity
    }

    /// Account classification
    pub fn account_type(&self) -> AccountType {
        self.account_type
    }

    /// Parent account, `None` for top-level accounts
    pub fn parent(&self) -> Option<AccountId> {
        self.parent
    }

    /// Metadata frame
    pub fn kvp(&self) -> &KvpFrame {
        &self.kvp
    }

    /// Splits filed under this account, in split date order
    pub fn splits(&self) -> &[SplitId] {
        &self.splits
    }

    pub(crate) fn insert_split(&mut self, split: SplitId) {
        if !self.splits.contains(&split) {
            self.splits.push(split);
        }
    }

    pub(crate) fn remove_split(&mut self, split: SplitId) -> bool {
        let before = self.splits.len();
        self.splits.retain(|s| *s != split);
        before != self.splits.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_is_idempotent() {
        let mut account = Account::new("Checking", Commodity::currency("USD"), AccountType::Bank, None);
        let split = SplitId::new();
        account.insert_split(split);
        account.insert_split(split);
        assert_eq!(account.splits(), &[split]);
    }

    #[test]
    fn test_remove_split() {
        let mut account = Account::new("Checking", Commodity::currency("USD"), AccountType::Bank, None);
        let a = SplitId::new();
        let b = SplitId::new();
        account.insert_split(a);
        account.insert_split(b);
        assert!(account.remove_split(a));
        assert!(!account.remove_split(a));
        assert_eq!(account.splits(), &[b]);
    }
}
