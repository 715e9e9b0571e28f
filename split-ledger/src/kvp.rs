//! Key/value metadata frames attached to ledger entities
//!
//! A frame maps slot names to typed values; nested frames are addressed
//! with slash-separated paths (`"void/former-amount"`).

use crate::types::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Typed slot value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum KvpValue {
    /// 64-bit integer
    Int64(i64),
    /// Floating point
    Double(f64),
    /// Exact numeric
    Numeric(Amount),
    /// UTF-8 string
    String(String),
    /// GUID
    Guid(Uuid),
    /// Timestamp
    Timespec(DateTime<Utc>),
    /// Nested frame
    Frame(KvpFrame),
}

impl KvpValue {
    /// Name of the variant, used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            KvpValue::Int64(_) => "int64",
            KvpValue::Double(_) => "double",
            KvpValue::Numeric(_) => "numeric",
            KvpValue::String(_) => "string",
            KvpValue::Guid(_) => "guid",
            KvpValue::Timespec(_) => "timespec",
            KvpValue::Frame(_) => "frame",
        }
    }

    /// Compare two values of the same type.
    ///
    /// Values of different types are unordered. Frames only compare equal
    /// or unordered.
    pub fn compare(&self, other: &KvpValue) -> Option<Ordering> {
        match (self, other) {
            (KvpValue::Int64(a), KvpValue::Int64(b)) => Some(a.cmp(b)),
            (KvpValue::Double(a), KvpValue::Double(b)) => a.partial_cmp(b),
            (KvpValue::Numeric(a), KvpValue::Numeric(b)) => Some(a.cmp(b)),
            (KvpValue::String(a), KvpValue::String(b)) => Some(a.cmp(b)),
            (KvpValue::Guid(a), KvpValue::Guid(b)) => Some(a.cmp(b)),
            (KvpValue::Timespec(a), KvpValue::Timespec(b)) => Some(a.cmp(b)),
            (KvpValue::Frame(a), KvpValue::Frame(b)) if a == b => Some(Ordering::Equal),
            _ => None,
        }
    }
}

/// Nested key/value frame
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KvpFrame(BTreeMap<String, KvpValue>);

impl KvpFrame {
    /// Empty frame
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the frame holds no slots
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Look up a value by slash-separated path
    pub fn get(&self, path: &str) -> Option<&KvpValue> {
        let mut keys = split_path(path);
        let last = keys.pop()?;
        let mut frame = self;
        for key in keys {
            match frame.0.get(key) {
                Some(KvpValue::Frame(inner)) => frame = inner,
                _ => return None,
            }
        }
        frame.0.get(last)
    }

    /// Numeric slot, if present with that type
    pub fn get_numeric(&self, path: &str) -> Option<Amount> {
        match self.get(path) {
            Some(KvpValue::Numeric(n)) => Some(*n),
            _ => None,
        }
    }

    /// String slot, if present with that type
    pub fn get_string(&self, path: &str) -> Option<&str> {
        match self.get(path) {
            Some(KvpValue::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Store a value, creating intermediate frames as needed.
    ///
    /// A non-frame value sitting on an intermediate key is replaced.
    pub fn set(&mut self, path: &str, value: KvpValue) {
        let mut keys = split_path(path);
        let Some(last) = keys.pop() else {
            return;
        };
        let mut frame = self;
        for key in keys {
            let slot = frame
                .0
                .entry(key.to_string())
                .or_insert_with(|| KvpValue::Frame(KvpFrame::new()));
            if !matches!(slot, KvpValue::Frame(_)) {
                *slot = KvpValue::Frame(KvpFrame::new());
            }
            frame = match slot {
                KvpValue::Frame(inner) => inner,
                _ => return,
            };
        }
        frame.0.insert(last.to_string(), value);
    }

    /// Remove a slot, returning its previous value
    pub fn remove(&mut self, path: &str) -> Option<KvpValue> {
        let mut keys = split_path(path);
        let last = keys.pop()?;
        let mut frame = self;
        for key in keys {
            match frame.0.get_mut(key) {
                Some(KvpValue::Frame(inner)) => frame = inner,
                _ => return None,
            }
        }
        frame.0.remove(last)
    }
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|k| !k.is_empty()).collect()
}
