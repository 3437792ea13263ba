//! Wire types for the pull half of the sync protocol.
//!
//! The server serializes changes as JSON with camelCase field names; the
//! watermark is an opaque cursor the client persists and hands back on the
//! next pull.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{EntityKind, Operation};

/// One remote mutation delivered by a pull.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    pub entity_type: EntityKind,
    pub operation: Operation,
    pub entity_id: Uuid,
    pub payload: serde_json::Value,
    pub server_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullResponse {
    pub changes: Vec<Change>,
    pub watermark: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_json_roundtrip() {
        let change = Change {
            entity_type: EntityKind::Garment,
            operation: Operation::Create,
            entity_id: Uuid::new_v4(),
            payload: serde_json::json!({"sub_category": "parka"}),
            server_timestamp: Utc::now(),
        };

        let json = serde_json::to_string(&change).unwrap();
        let parsed: Change = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.entity_id, change.entity_id);
        assert_eq!(parsed.operation, Operation::Create);
        assert_eq!(parsed.payload, change.payload);
    }

    #[test]
    fn test_change_field_names_are_camel_case() {
        let change = Change {
            entity_type: EntityKind::Outfit,
            operation: Operation::Delete,
            entity_id: Uuid::new_v4(),
            payload: serde_json::Value::Null,
            server_timestamp: Utc::now(),
        };

        let json = serde_json::to_value(&change).unwrap();
        assert!(json.get("entityType").is_some());
        assert!(json.get("serverTimestamp").is_some());
        assert!(json.get("entity_type").is_none());
    }

    #[test]
    fn test_pull_response_roundtrip() {
        let resp = PullResponse {
            changes: vec![],
            watermark: "2025-06-01T00:00:00Z".to_string(),
        };

        let json = serde_json::to_string(&resp).unwrap();
        let parsed: PullResponse = serde_json::from_str(&json).unwrap();

        assert!(parsed.changes.is_empty());
        assert_eq!(parsed.watermark, resp.watermark);
    }
}
