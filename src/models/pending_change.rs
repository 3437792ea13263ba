use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Garment,
    Outfit,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Garment => write!(f, "garment"),
            EntityKind::Outfit => write!(f, "outfit"),
        }
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "garment" => Ok(EntityKind::Garment),
            "outfit" => Ok(EntityKind::Outfit),
            _ => Err(format!("Invalid entity type '{}'", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Create => write!(f, "create"),
            Operation::Update => write!(f, "update"),
            Operation::Delete => write!(f, "delete"),
        }
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Operation::Create),
            "update" => Ok(Operation::Update),
            "delete" => Ok(Operation::Delete),
            _ => Err(format!("Invalid operation '{}'", s)),
        }
    }
}

/// One mutation awaiting remote confirmation.
///
/// Entries are appended when a write cannot be confirmed against the remote
/// and removed only after a successful replay, giving at-least-once delivery.
#[derive(Debug, Clone)]
pub struct PendingChange {
    pub id: i64,
    pub entity: EntityKind,
    pub operation: Operation,
    pub entity_id: Uuid,
    pub payload: serde_json::Value,
    pub enqueued_at: DateTime<Utc>,
}

impl PendingChange {
    pub fn new(
        entity: EntityKind,
        operation: Operation,
        entity_id: Uuid,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: 0,
            entity,
            operation,
            entity_id,
            payload,
            enqueued_at: Utc::now(),
        }
    }
}
