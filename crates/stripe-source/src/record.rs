//! Records emitted by the change iterator.

use serde::{Deserialize, Serialize};

use crate::position::Position;

/// What a record says happened to the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOp {
    /// Object read during the initial snapshot.
    Snapshot,
    Create,
    Update,
    Delete,
}

impl ChangeOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeOp::Snapshot => "snapshot",
            ChangeOp::Create => "create",
            ChangeOp::Update => "update",
            ChangeOp::Delete => "delete",
        }
    }
}

impl std::fmt::Display for ChangeOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordKey {
    pub id: String,
}

/// A single change, together with the position to resume from after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    /// Position right after this record.
    pub position: Position,
    pub op: ChangeOp,
    pub key: RecordKey,
    /// Object JSON; `None` for deletes.
    pub payload: Option<Vec<u8>>,
    /// Unix seconds: object creation time for snapshot records, event
    /// creation time for incremental records.
    pub timestamp: i64,
    pub resource: String,
}

impl ChangeRecord {
    pub fn position_token(&self) -> Vec<u8> {
        self.position.encode()
    }

    pub fn id(&self) -> &str {
        &self.key.id
    }
}

/// Outcome of one `next()` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Next {
    Record(ChangeRecord),
    /// Nothing new right now; call again later.
    RetryLater,
}

impl Next {
    pub fn into_record(self) -> Option<ChangeRecord> {
        match self {
            Next::Record(record) => Some(record),
            Next::RetryLater => None,
        }
    }

    pub fn is_retry_later(&self) -> bool {
        matches!(self, Next::RetryLater)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_op_wire_names() {
        assert_eq!(serde_json::to_string(&ChangeOp::Snapshot).unwrap(), "\"snapshot\"");
        assert_eq!(serde_json::to_string(&ChangeOp::Delete).unwrap(), "\"delete\"");
        assert_eq!(ChangeOp::Create.to_string(), "create");
    }

    #[test]
    fn test_position_token_matches_position() {
        let record = ChangeRecord {
            position: Position::start(1652790765),
            op: ChangeOp::Snapshot,
            key: RecordKey {
                id: "plan_1".to_string(),
            },
            payload: Some(b"{}".to_vec()),
            timestamp: 1652790700,
            resource: "plan".to_string(),
        };
        assert_eq!(record.position_token(), record.position.encode());
        assert_eq!(record.id(), "plan_1");
        assert_eq!(Next::Record(record.clone()).into_record(), Some(record));
        assert!(Next::RetryLater.into_record().is_none());
    }
}
