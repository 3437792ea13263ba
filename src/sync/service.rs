//! Sync orchestrator: reconciles the local store with the remote server.
//!
//! Every write lands in the local store first and the caller sees it
//! succeed; the remote is brought up to date either inline (when online)
//! or later by replaying the pending-change ledger. Pulls apply remote
//! changes under whole-record last-writer-wins and advance a persisted
//! watermark only once a pull has been applied in full.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use tokio::sync::{broadcast, watch};
use uuid::Uuid;

use super::protocol::Change;
use super::remote::{RemoteApi, RemoteError};
use crate::canvas::{self, CanvasError, Direction};
use crate::db::{
    GarmentRepository, LedgerRepository, LocalMeta, OutfitRepository, SyncMetaRepository,
};
use crate::models::{
    Category, EntityKind, Garment, Operation, Outfit, OutfitLayer, PendingChange, SyncState,
};

/// Broadcast to presentation layers whenever a pull refreshed the local
/// store, so they can re-read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    Refreshed,
}

#[derive(Debug)]
pub enum SyncServiceError {
    /// The local store failed; this is fatal to the operation and always
    /// surfaced to the caller.
    Storage(sqlx::Error),
    Serialization(serde_json::Error),
    NotFound(String),
    /// An outfit already exists for this owner and date.
    DateTaken(NaiveDate),
    Canvas(CanvasError),
}

impl std::fmt::Display for SyncServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncServiceError::Storage(e) => write!(f, "Storage error: {}", e),
            SyncServiceError::Serialization(e) => write!(f, "Serialization error: {}", e),
            SyncServiceError::NotFound(what) => write!(f, "Not found: {}", what),
            SyncServiceError::DateTaken(date) => {
                write!(f, "An outfit already exists for {}", date)
            }
            SyncServiceError::Canvas(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SyncServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncServiceError::Storage(e) => Some(e),
            SyncServiceError::Serialization(e) => Some(e),
            SyncServiceError::Canvas(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for SyncServiceError {
    fn from(e: sqlx::Error) -> Self {
        SyncServiceError::Storage(e)
    }
}

impl From<serde_json::Error> for SyncServiceError {
    fn from(e: serde_json::Error) -> Self {
        SyncServiceError::Serialization(e)
    }
}

impl From<CanvasError> for SyncServiceError {
    fn from(e: CanvasError) -> Self {
        SyncServiceError::Canvas(e)
    }
}

/// Outcome of one `synchronize` cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub offline: bool,
    /// Remote changes applied to the local store.
    pub pulled: usize,
    /// Ledger entries confirmed and removed.
    pub pushed: usize,
    /// Ledger entries kept for the next cycle after a transient failure.
    pub deferred: usize,
    /// Ledger entries dropped after a permanent rejection.
    pub dropped: usize,
}

impl SyncReport {
    fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }
}

enum ReplayStatus {
    Done,
    Failed(RemoteError),
}

/// Coordinates the local store, the pending-change ledger, and the remote
/// client. Explicitly constructed; tests build isolated instances around a
/// fake remote.
pub struct SyncService {
    pool: SqlitePool,
    garments: GarmentRepository,
    outfits: OutfitRepository,
    ledger: LedgerRepository,
    meta: SyncMetaRepository,
    remote: Arc<dyn RemoteApi>,
    online: watch::Receiver<bool>,
    events: broadcast::Sender<StoreEvent>,
}

impl SyncService {
    pub fn new(pool: SqlitePool, remote: Arc<dyn RemoteApi>, online: watch::Receiver<bool>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            garments: GarmentRepository::new(pool.clone()),
            outfits: OutfitRepository::new(pool.clone()),
            ledger: LedgerRepository::new(pool.clone()),
            meta: SyncMetaRepository::new(pool.clone()),
            pool,
            remote,
            online,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub fn is_online(&self) -> bool {
        *self.online.borrow()
    }

    pub fn garments(&self) -> &GarmentRepository {
        &self.garments
    }

    pub fn outfits(&self) -> &OutfitRepository {
        &self.outfits
    }

    pub fn ledger(&self) -> &LedgerRepository {
        &self.ledger
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ========== Write path ==========

    /// Records a garment locally and confirms it against the remote when
    /// possible. The local write is the operation; remote trouble never
    /// reaches the caller.
    pub async fn create_garment(&self, garment: &Garment) -> Result<(), SyncServiceError> {
        self.garments
            .create(garment, SyncState::PendingCreate)
            .await?;

        if self.is_online() {
            match self.remote.create_garment(garment).await {
                Ok(()) => {
                    self.garments
                        .set_sync_state(garment.id, SyncState::Synced)
                        .await?;
                    return Ok(());
                }
                Err(e) if e.is_transient() => {
                    tracing::debug!(garment = %garment.id, "create deferred: {}", e);
                }
                Err(e) => {
                    tracing::warn!(garment = %garment.id, "create rejected, keeping local copy: {}", e);
                    return Ok(());
                }
            }
        }

        self.enqueue(
            EntityKind::Garment,
            Operation::Create,
            garment.id,
            serde_json::to_value(garment)?,
        )
        .await
    }

    pub async fn delete_garment(&self, id: Uuid) -> Result<(), SyncServiceError> {
        if self.garments.get_by_id(id).await?.is_none() {
            return Err(SyncServiceError::NotFound(format!("garment {}", id)));
        }

        // Hide the record immediately; the row goes away once the remote
        // confirms.
        self.garments
            .set_sync_state(id, SyncState::PendingDelete)
            .await?;

        if self.is_online() {
            match self.remote.delete_garment(id).await {
                Ok(()) => {
                    self.garments.remove(id).await?;
                    return Ok(());
                }
                Err(e) if e.is_transient() => {
                    tracing::debug!(garment = %id, "delete deferred: {}", e);
                }
                Err(e) => {
                    tracing::warn!(garment = %id, "delete rejected: {}", e);
                    self.garments.remove(id).await?;
                    return Ok(());
                }
            }
        }

        self.enqueue(
            EntityKind::Garment,
            Operation::Delete,
            id,
            serde_json::json!({ "id": id }),
        )
        .await
    }

    pub async fn create_outfit(&self, outfit: &Outfit) -> Result<(), SyncServiceError> {
        if let Err(e) = self.outfits.create(outfit, SyncState::PendingCreate).await {
            if !is_unique_violation(&e) {
                return Err(e.into());
            }
            // The date may be held by a row hidden behind an unconfirmed
            // delete. Its delete intent is already queued, so the local row
            // can make way for the new outfit.
            match self
                .outfits
                .pending_delete_at(&outfit.owner_id, outfit.date_worn)
                .await?
            {
                Some(hidden) => {
                    self.outfits.remove(hidden).await?;
                    self.outfits
                        .create(outfit, SyncState::PendingCreate)
                        .await?;
                }
                None => return Err(SyncServiceError::DateTaken(outfit.date_worn)),
            }
        }

        if self.is_online() {
            match self.remote.create_outfit(outfit).await {
                Ok(()) => {
                    self.outfits
                        .set_sync_state(outfit.id, SyncState::Synced)
                        .await?;
                    return Ok(());
                }
                Err(e) if e.is_transient() => {
                    tracing::debug!(outfit = %outfit.id, "create deferred: {}", e);
                }
                Err(e) => {
                    tracing::warn!(outfit = %outfit.id, "create rejected, keeping local copy: {}", e);
                    return Ok(());
                }
            }
        }

        self.enqueue(
            EntityKind::Outfit,
            Operation::Create,
            outfit.id,
            serde_json::to_value(outfit)?,
        )
        .await
    }

    pub async fn update_outfit(&self, outfit: &Outfit) -> Result<Outfit, SyncServiceError> {
        let mut updated = outfit.clone();
        updated.updated_at = Utc::now();

        self.outfits
            .update(&updated, SyncState::PendingUpdate)
            .await?;

        if self.is_online() {
            match self.remote.update_outfit(&updated).await {
                Ok(()) => {
                    self.outfits
                        .set_sync_state(updated.id, SyncState::Synced)
                        .await?;
                    return Ok(updated);
                }
                Err(e) if e.is_transient() => {
                    tracing::debug!(outfit = %updated.id, "update deferred: {}", e);
                }
                Err(e) => {
                    tracing::warn!(outfit = %updated.id, "update rejected, keeping local copy: {}", e);
                    return Ok(updated);
                }
            }
        }

        self.enqueue(
            EntityKind::Outfit,
            Operation::Update,
            updated.id,
            serde_json::to_value(&updated)?,
        )
        .await?;
        Ok(updated)
    }

    pub async fn delete_outfit(&self, id: Uuid) -> Result<(), SyncServiceError> {
        if self.outfits.get_by_id(id).await?.is_none() {
            return Err(SyncServiceError::NotFound(format!("outfit {}", id)));
        }

        self.outfits
            .set_sync_state(id, SyncState::PendingDelete)
            .await?;

        if self.is_online() {
            match self.remote.delete_outfit(id).await {
                Ok(()) => {
                    self.outfits.remove(id).await?;
                    return Ok(());
                }
                Err(e) if e.is_transient() => {
                    tracing::debug!(outfit = %id, "delete deferred: {}", e);
                }
                Err(e) => {
                    tracing::warn!(outfit = %id, "delete rejected: {}", e);
                    self.outfits.remove(id).await?;
                    return Ok(());
                }
            }
        }

        self.enqueue(
            EntityKind::Outfit,
            Operation::Delete,
            id,
            serde_json::json!({ "id": id }),
        )
        .await
    }

    async fn enqueue(
        &self,
        entity: EntityKind,
        operation: Operation,
        entity_id: Uuid,
        payload: serde_json::Value,
    ) -> Result<(), SyncServiceError> {
        self.ledger
            .enqueue(&PendingChange::new(entity, operation, entity_id, payload))
            .await?;
        Ok(())
    }

    // ========== Canvas operations ==========

    /// Places a garment on the outfit's first free slot for its category.
    pub async fn add_layer(
        &self,
        outfit_id: Uuid,
        garment_id: Uuid,
    ) -> Result<Outfit, SyncServiceError> {
        let mut outfit = self
            .outfits
            .get_by_id(outfit_id)
            .await?
            .ok_or_else(|| SyncServiceError::NotFound(format!("outfit {}", outfit_id)))?;
        let garment = self
            .garments
            .get_by_id(garment_id)
            .await?
            .ok_or_else(|| SyncServiceError::NotFound(format!("garment {}", garment_id)))?;

        let mut categories = self.category_map(&outfit).await?;
        categories.insert(garment.id, garment.category);

        let slot = canvas::assign_slot(garment.category, &outfit.layers, &categories)?;

        let z_index = outfit.max_z_index() + 1;
        outfit
            .layers
            .push(OutfitLayer::new(garment_id, z_index, slot.x, slot.y));

        self.update_outfit(&outfit).await
    }

    pub async fn remove_layer(
        &self,
        outfit_id: Uuid,
        garment_id: Uuid,
    ) -> Result<Outfit, SyncServiceError> {
        let mut outfit = self
            .outfits
            .get_by_id(outfit_id)
            .await?
            .ok_or_else(|| SyncServiceError::NotFound(format!("outfit {}", outfit_id)))?;

        let before = outfit.layers.len();
        outfit.layers.retain(|l| l.garment_id != garment_id);
        if outfit.layers.len() == before {
            return Err(SyncServiceError::NotFound(format!(
                "layer for garment {}",
                garment_id
            )));
        }

        self.update_outfit(&outfit).await
    }

    /// Cycles the outfit's layers of one category through their slots and
    /// persists the result through the optimistic write path.
    pub async fn rotate_outfit(
        &self,
        outfit_id: Uuid,
        category: Category,
        direction: Direction,
    ) -> Result<Outfit, SyncServiceError> {
        let mut outfit = self
            .outfits
            .get_by_id(outfit_id)
            .await?
            .ok_or_else(|| SyncServiceError::NotFound(format!("outfit {}", outfit_id)))?;

        let categories = self.category_map(&outfit).await?;
        let rotated = canvas::rotate(category, &outfit.layers, &categories, direction);
        if rotated == outfit.layers {
            return Ok(outfit);
        }

        outfit.layers = rotated;
        self.update_outfit(&outfit).await
    }

    /// Garment categories for every layer in the outfit. Layers whose
    /// garment no longer exists locally are simply not in the map.
    async fn category_map(
        &self,
        outfit: &Outfit,
    ) -> Result<HashMap<Uuid, Category>, SyncServiceError> {
        let mut map = HashMap::new();
        for layer in &outfit.layers {
            if let Some(garment) = self.garments.get_by_id(layer.garment_id).await? {
                map.insert(garment.id, garment.category);
            }
        }
        Ok(map)
    }

    // ========== Synchronization ==========

    /// One pull-then-push cycle. Being offline is an expected state, not an
    /// error; remote failures are absorbed into the ledger. Only local
    /// storage failures surface.
    pub async fn synchronize(&self, owner_id: &str) -> Result<SyncReport, SyncServiceError> {
        if !self.is_online() {
            tracing::debug!("offline, skipping sync cycle");
            return Ok(SyncReport::offline());
        }

        let mut report = SyncReport::default();
        self.pull_phase(owner_id, &mut report).await?;
        self.push_phase(&mut report).await?;

        tracing::debug!(
            pulled = report.pulled,
            pushed = report.pushed,
            deferred = report.deferred,
            dropped = report.dropped,
            "sync cycle finished"
        );
        Ok(report)
    }

    async fn pull_phase(
        &self,
        owner_id: &str,
        report: &mut SyncReport,
    ) -> Result<(), SyncServiceError> {
        let watermark = self.meta.watermark(owner_id).await?;

        let response = match self.remote.pull(owner_id, watermark.as_deref()).await {
            Ok(response) => response,
            Err(e) if e.is_transient() => {
                tracing::debug!("pull unavailable: {}", e);
                return Ok(());
            }
            Err(e) => {
                tracing::warn!("pull rejected: {}", e);
                return Ok(());
            }
        };

        let mut applied = 0;
        for change in &response.changes {
            if self.apply_change(change).await? {
                applied += 1;
            }
        }

        // Watermark moves only after the whole batch landed; a failure
        // above leaves it behind so the next pull re-delivers everything.
        self.meta
            .set_watermark(owner_id, &response.watermark)
            .await?;

        if applied > 0 {
            tracing::info!(applied, "local store refreshed from remote");
            let _ = self.events.send(StoreEvent::Refreshed);
        }
        report.pulled = applied;
        Ok(())
    }

    /// Applies one remote change under whole-record last-writer-wins.
    /// Returns false when the local record won.
    async fn apply_change(&self, change: &Change) -> Result<bool, SyncServiceError> {
        match change.entity_type {
            EntityKind::Garment => {
                let meta = self.garments.meta(change.entity_id).await?;
                if !lww_allows(meta.as_ref(), change.server_timestamp) {
                    return Ok(false);
                }
                match change.operation {
                    Operation::Create | Operation::Update => {
                        let garment: Garment = match decode_payload(change) {
                            Some(garment) => garment,
                            None => return Ok(false),
                        };
                        self.garments.apply_remote(&garment).await?;
                    }
                    Operation::Delete => {
                        self.garments.remove(change.entity_id).await?;
                    }
                }
            }
            EntityKind::Outfit => {
                let meta = self.outfits.meta(change.entity_id).await?;
                if !lww_allows(meta.as_ref(), change.server_timestamp) {
                    return Ok(false);
                }
                match change.operation {
                    Operation::Create | Operation::Update => {
                        let outfit: Outfit = match decode_payload(change) {
                            Some(outfit) => outfit,
                            None => return Ok(false),
                        };
                        self.outfits.apply_remote(&outfit).await?;
                    }
                    Operation::Delete => {
                        self.outfits.remove(change.entity_id).await?;
                    }
                }
            }
        }
        Ok(true)
    }

    async fn push_phase(&self, report: &mut SyncReport) -> Result<(), SyncServiceError> {
        for entry in self.ledger.pending().await? {
            match self.replay(&entry).await? {
                ReplayStatus::Done => {
                    self.ledger.remove(entry.id).await?;
                    report.pushed += 1;
                }
                ReplayStatus::Failed(e) if e.is_transient() => {
                    tracing::debug!(entry = entry.id, "replay deferred: {}", e);
                    report.deferred += 1;
                }
                ReplayStatus::Failed(e) => {
                    // Retrying a structurally invalid request can never
                    // succeed; drop it so it cannot block the queue.
                    tracing::warn!(entry = entry.id, "replay rejected, dropping: {}", e);
                    self.finalize_rejected(&entry).await?;
                    self.ledger.remove(entry.id).await?;
                    report.dropped += 1;
                }
            }
        }
        Ok(())
    }

    async fn replay(&self, entry: &PendingChange) -> Result<ReplayStatus, SyncServiceError> {
        let result = match (entry.entity, entry.operation) {
            (EntityKind::Garment, Operation::Create) | (EntityKind::Garment, Operation::Update) => {
                let garment: Garment = serde_json::from_value(entry.payload.clone())?;
                self.remote.create_garment(&garment).await
            }
            (EntityKind::Garment, Operation::Delete) => {
                self.remote.delete_garment(entry.entity_id).await
            }
            (EntityKind::Outfit, Operation::Create) => {
                let outfit: Outfit = serde_json::from_value(entry.payload.clone())?;
                self.remote.create_outfit(&outfit).await
            }
            (EntityKind::Outfit, Operation::Update) => {
                let outfit: Outfit = serde_json::from_value(entry.payload.clone())?;
                self.remote.update_outfit(&outfit).await
            }
            (EntityKind::Outfit, Operation::Delete) => {
                self.remote.delete_outfit(entry.entity_id).await
            }
        };

        match result {
            Ok(()) => {
                self.confirm(entry).await?;
                Ok(ReplayStatus::Done)
            }
            Err(e) => Ok(ReplayStatus::Failed(e)),
        }
    }

    /// Settles the local record after the remote confirmed a replay.
    async fn confirm(&self, entry: &PendingChange) -> Result<(), SyncServiceError> {
        match (entry.entity, entry.operation) {
            (EntityKind::Garment, Operation::Delete) => {
                self.garments.remove(entry.entity_id).await?;
            }
            (EntityKind::Garment, _) => {
                self.garments
                    .set_sync_state(entry.entity_id, SyncState::Synced)
                    .await?;
            }
            (EntityKind::Outfit, Operation::Delete) => {
                self.outfits.remove(entry.entity_id).await?;
            }
            (EntityKind::Outfit, _) => {
                self.outfits
                    .set_sync_state(entry.entity_id, SyncState::Synced)
                    .await?;
            }
        }
        Ok(())
    }

    /// A rejected delete still stands locally: the hidden row is removed.
    /// Rejected creates and updates keep their local copy as-is.
    async fn finalize_rejected(&self, entry: &PendingChange) -> Result<(), SyncServiceError> {
        match (entry.entity, entry.operation) {
            (EntityKind::Garment, Operation::Delete) => {
                self.garments.remove(entry.entity_id).await?;
            }
            (EntityKind::Outfit, Operation::Delete) => {
                self.outfits.remove(entry.entity_id).await?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Full re-fetch of an owner's entities, applied under the same LWW
    /// guard as a pull. Used for first-run seeding and explicit refresh.
    pub async fn refresh_from_remote(&self, owner_id: &str) -> Result<usize, SyncServiceError> {
        if !self.is_online() {
            return Ok(0);
        }

        let mut applied = 0;

        match self.remote.garments_by_owner(owner_id).await {
            Ok(garments) => {
                for garment in garments {
                    let meta = self.garments.meta(garment.id).await?;
                    if lww_allows(meta.as_ref(), garment.updated_at) {
                        self.garments.apply_remote(&garment).await?;
                        applied += 1;
                    }
                }
            }
            Err(e) => tracing::warn!("garment refresh failed: {}", e),
        }

        match self.remote.outfits_by_owner(owner_id).await {
            Ok(outfits) => {
                for outfit in outfits {
                    let meta = self.outfits.meta(outfit.id).await?;
                    if lww_allows(meta.as_ref(), outfit.updated_at) {
                        self.outfits.apply_remote(&outfit).await?;
                        applied += 1;
                    }
                }
            }
            Err(e) => tracing::warn!("outfit refresh failed: {}", e),
        }

        if applied > 0 {
            let _ = self.events.send(StoreEvent::Refreshed);
        }
        Ok(applied)
    }

    /// Background loop: a cycle on every tick, plus an immediate cycle when
    /// connectivity comes back. The first tick fires right away, covering
    /// the session-start trigger.
    pub fn spawn(self: Arc<Self>, owner_id: impl Into<String>, period: Duration) -> tokio::task::JoinHandle<()> {
        let service = self;
        let owner = owner_id.into();
        tokio::spawn(async move {
            let mut online = service.online.clone();
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    changed = online.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        if !*online.borrow_and_update() {
                            continue;
                        }
                        tracing::info!("connectivity restored, syncing");
                    }
                }
                if let Err(e) = service.synchronize(&owner).await {
                    tracing::warn!("background sync failed: {}", e);
                }
            }
        })
    }
}

/// A payload that does not decode will not decode on a retry either; it
/// is logged and skipped so one unreadable record cannot hold back the
/// watermark or the push phase behind it.
fn decode_payload<T: serde::de::DeserializeOwned>(change: &Change) -> Option<T> {
    match serde_json::from_value(change.payload.clone()) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(entity = %change.entity_id, "dropping undecodable change: {}", e);
            None
        }
    }
}

/// Whole-record last-writer-wins: a remote change lands only when the
/// local record is absent, fully synced, or older than the change.
fn lww_allows(meta: Option<&LocalMeta>, server_timestamp: DateTime<Utc>) -> bool {
    match meta {
        None => true,
        Some(meta) => !meta.sync_state.is_pending() || server_timestamp > meta.updated_at,
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => db.message().contains("UNIQUE constraint failed"),
        _ => false,
    }
}
