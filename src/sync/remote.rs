use async_trait::async_trait;
use uuid::Uuid;

use super::protocol::PullResponse;
use crate::models::{Garment, Outfit};

/// Errors from the remote entity API, split by how the orchestrator must
/// react to them.
#[derive(Debug)]
pub enum RemoteError {
    /// Network unreachable, timeout, or server-side failure. The operation
    /// is worth retrying on a later cycle.
    Transient(String),
    /// The server understood the request and refused it. Retrying the same
    /// request will never succeed.
    Rejected(String),
}

impl RemoteError {
    pub fn is_transient(&self) -> bool {
        matches!(self, RemoteError::Transient(_))
    }
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteError::Transient(e) => write!(f, "Transient remote failure: {}", e),
            RemoteError::Rejected(e) => write!(f, "Rejected by server: {}", e),
        }
    }
}

impl std::error::Error for RemoteError {}

/// The server's entity API plus the pull half of the sync protocol.
///
/// All write operations are idempotent: creates and updates are upserts
/// keyed by entity id, and deleting an entity the server no longer has is
/// success. Replaying the same call twice must leave the same end state.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    async fn create_garment(&self, garment: &Garment) -> Result<(), RemoteError>;
    async fn delete_garment(&self, id: Uuid) -> Result<(), RemoteError>;
    async fn garments_by_owner(&self, owner_id: &str) -> Result<Vec<Garment>, RemoteError>;

    async fn create_outfit(&self, outfit: &Outfit) -> Result<(), RemoteError>;
    async fn update_outfit(&self, outfit: &Outfit) -> Result<(), RemoteError>;
    async fn delete_outfit(&self, id: Uuid) -> Result<(), RemoteError>;
    async fn outfits_by_owner(&self, owner_id: &str) -> Result<Vec<Outfit>, RemoteError>;

    /// All changes for `owner_id` since `watermark`, oldest first, along
    /// with the cursor to persist once every change has been applied.
    async fn pull(&self, owner_id: &str, watermark: Option<&str>)
        -> Result<PullResponse, RemoteError>;
}
