use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Per-record synchronization state.
///
/// A record in `PendingDelete` stays in the local store until the remote
/// confirms the delete, but must never appear in list reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Synced,
    PendingCreate,
    PendingUpdate,
    PendingDelete,
}

impl SyncState {
    /// True when the record carries a local write the remote has not confirmed.
    pub fn is_pending(&self) -> bool {
        !matches!(self, SyncState::Synced)
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncState::Synced => write!(f, "synced"),
            SyncState::PendingCreate => write!(f, "pending_create"),
            SyncState::PendingUpdate => write!(f, "pending_update"),
            SyncState::PendingDelete => write!(f, "pending_delete"),
        }
    }
}

impl FromStr for SyncState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "synced" => Ok(SyncState::Synced),
            "pending_create" => Ok(SyncState::PendingCreate),
            "pending_update" => Ok(SyncState::PendingUpdate),
            "pending_delete" => Ok(SyncState::PendingDelete),
            _ => Err(format!("Invalid sync state '{}'", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_state_roundtrip() {
        for state in [
            SyncState::Synced,
            SyncState::PendingCreate,
            SyncState::PendingUpdate,
            SyncState::PendingDelete,
        ] {
            let parsed = SyncState::from_str(&state.to_string()).unwrap();
            assert_eq!(parsed, state);
        }
    }

    #[test]
    fn test_is_pending() {
        assert!(!SyncState::Synced.is_pending());
        assert!(SyncState::PendingCreate.is_pending());
        assert!(SyncState::PendingDelete.is_pending());
    }
}
