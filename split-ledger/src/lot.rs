//! Lots: inventory or tax lots grouping splits within one account

use crate::kvp::KvpFrame;
use crate::types::{AccountId, LotId};
use serde::{Deserialize, Serialize};

/// Split grouping orthogonal to transactions.
///
/// Membership is not stored on the lot; it is derived from each split's
/// lot reference so it cannot drift through rollback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lot {
    pub(crate) id: LotId,
    pub(crate) account: AccountId,
    pub(crate) title: String,
    pub(crate) kvp: KvpFrame,
}

impl Lot {
    pub(crate) fn new(account: AccountId, title: impl Into<String>) -> Self {
        Self {
            id: LotId::new(),
            account,
            title: title.into(),
            kvp: KvpFrame::new(),
        }
    }

    /// Lot GUID
    pub fn id(&self) -> LotId {
        self.id
    }

    /// Account holding the lot
    pub fn account(&self) -> AccountId {
        self.account
    }

    /// Title
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Metadata frame
    pub fn kvp(&self) -> &KvpFrame {
        &self.kvp
    }
}
