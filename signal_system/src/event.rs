//! Change event types and definitions
//!
//! A `ChangeEvent` carries which table changed and how. Subscribers treat it
//! as a trigger only; the record payload is informational.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of row-level change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Insert => "insert",
            ChangeKind::Update => "update",
            ChangeKind::Delete => "delete",
        }
    }
}

/// Row-level change notification for one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Table name
    pub table: String,
    /// Event type
    pub kind: ChangeKind,
    /// Identifier of the changed row, when known
    #[serde(default)]
    pub record_id: Option<String>,
    /// Row contents after the change (before it, for deletes)
    #[serde(default)]
    pub record: Option<Value>,
    /// Event timestamp (UTC)
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            kind,
            record_id: None,
            record: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_record_id(mut self, record_id: impl Into<String>) -> Self {
        self.record_id = Some(record_id.into());
        self
    }

    pub fn with_record(mut self, record: Value) -> Self {
        self.record = Some(record);
        self
    }

    /// Parse a NOTIFY payload produced by the change trigger
    pub fn from_payload(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}
