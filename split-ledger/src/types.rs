//! Core value types shared by the ledger entities
//!
//! All types are designed for:
//! - Stable identity (GUIDs, never raw references)
//! - Exact arithmetic (Decimal for money)
//! - Cheap copies of handles across the book arena

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Exact monetary quantity
pub type Amount = Decimal;

macro_rules! guid_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh identifier (UUIDv7 for time-ordering)
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Wrap an existing UUID
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Underlying UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }
    };
}

guid_type!(
    /// Split identifier
    SplitId
);
guid_type!(
    /// Transaction identifier
    TransactionId
);
guid_type!(
    /// Account identifier
    AccountId
);
guid_type!(
    /// Lot identifier
    LotId
);

/// Entity kind a GUID refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdType {
    /// Split GUID
    Split,
    /// Transaction GUID
    Transaction,
    /// Account GUID
    Account,
    /// Lot GUID
    Lot,
}

/// Currency or security held by an account
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Commodity {
    /// Ticker or ISO 4217 code
    pub mnemonic: String,

    /// Number of decimal places in the smallest unit
    pub scale: u32,
}

impl Commodity {
    /// Create a commodity with the given smallest-unit scale
    pub fn new(mnemonic: impl Into<String>, scale: u32) -> Self {
        Self {
            mnemonic: mnemonic.into(),
            scale,
        }
    }

    /// Two-decimal ISO currency
    pub fn currency(code: impl Into<String>) -> Self {
        Self::new(code, 2)
    }

    /// Round an amount to the commodity's smallest unit
    pub fn round(&self, amount: Amount) -> Amount {
        amount.round_dp_with_strategy(self.scale, RoundingStrategy::MidpointAwayFromZero)
    }
}

impl fmt::Display for Commodity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic)
    }
}

/// Reconciliation state of a split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileState {
    /// Entered but not seen on a statement
    #[default]
    NotReconciled,
    /// Seen on a statement
    Cleared,
    /// Balanced against a statement
    Reconciled,
    /// Locked after reconciliation
    Frozen,
    /// Voided
    Voided,
}

impl ReconcileState {
    /// All states, in flag order
    pub const ALL: [ReconcileState; 5] = [
        ReconcileState::NotReconciled,
        ReconcileState::Cleared,
        ReconcileState::Reconciled,
        ReconcileState::Frozen,
        ReconcileState::Voided,
    ];

    /// Single-character code used by register displays and file formats
    pub fn as_char(&self) -> char {
        match self {
            ReconcileState::NotReconciled => 'n',
            ReconcileState::Cleared => 'c',
            ReconcileState::Reconciled => 'y',
            ReconcileState::Frozen => 'f',
            ReconcileState::Voided => 'v',
        }
    }

    /// Parse from the single-character code
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'n' => Some(ReconcileState::NotReconciled),
            'c' => Some(ReconcileState::Cleared),
            'y' => Some(ReconcileState::Reconciled),
            'f' => Some(ReconcileState::Frozen),
            'v' => Some(ReconcileState::Voided),
            _ => None,
        }
    }

    /// Contributes to the cleared balance
    pub fn is_cleared(&self) -> bool {
        !matches!(self, ReconcileState::NotReconciled)
    }

    /// Contributes to the reconciled balance
    pub fn is_reconciled(&self) -> bool {
        matches!(self, ReconcileState::Reconciled | ReconcileState::Frozen)
    }
}

impl fmt::Display for ReconcileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Set of reconcile states, used by cleared-flag matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ReconcileSet(u8);

impl ReconcileSet {
    /// Empty set
    pub const EMPTY: ReconcileSet = ReconcileSet(0);

    /// Every state
    pub const ALL: ReconcileSet = ReconcileSet(0b1_1111);

    fn bit(state: ReconcileState) -> u8 {
        match state {
            ReconcileState::NotReconciled => 1,
            ReconcileState::Cleared => 1 << 1,
            ReconcileState::Reconciled => 1 << 2,
            ReconcileState::Frozen => 1 << 3,
            ReconcileState::Voided => 1 << 4,
        }
    }

    /// Add a state to the set
    pub fn with(mut self, state: ReconcileState) -> Self {
        self.0 |= Self::bit(state);
        self
    }

    /// Membership test
    pub fn contains(&self, state: ReconcileState) -> bool {
        self.0 & Self::bit(state) != 0
    }

    /// True when no state is selected
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl FromIterator<ReconcileState> for ReconcileSet {
    fn from_iter<I: IntoIterator<Item = ReconcileState>>(iter: I) -> Self {
        iter.into_iter().fold(ReconcileSet::EMPTY, ReconcileSet::with)
    }
}

/// Account classification; only surrounding UI code interprets it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    /// Checking or savings
    #[default]
    Bank,
    /// Cash on hand
    Cash,
    /// Generic asset
    Asset,
    /// Credit card
    Credit,
    /// Generic liability
    Liability,
    /// Stock holding
    Stock,
    /// Mutual fund holding
    Mutual,
    /// Currency trading
    Currency,
    /// Income
    Income,
    /// Expense
    Expense,
    /// Equity
    Equity,
    /// Accounts receivable
    Receivable,
    /// Accounts payable
    Payable,
}
