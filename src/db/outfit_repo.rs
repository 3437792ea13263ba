use chrono::NaiveDate;
use sqlx::SqlitePool;
use std::str::FromStr;
use uuid::Uuid;

use super::garment_repo::parse_timestamp;
use super::LocalMeta;
use crate::models::{Outfit, OutfitLayer, SyncState};

pub struct OutfitRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct OutfitRow {
    id: String,
    owner_id: String,
    date_worn: String,
    created_at: String,
    updated_at: String,
}

#[derive(sqlx::FromRow)]
struct LayerRow {
    garment_id: String,
    z_index: i32,
    position_x: f64,
    position_y: f64,
    scale: f64,
    rotation: f64,
}

impl OutfitRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, outfit: &Outfit, state: SyncState) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let id = outfit.id.to_string();
        sqlx::query(
            r#"
            INSERT INTO outfits (id, owner_id, date_worn, sync_state, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&outfit.owner_id)
        .bind(outfit.date_worn.to_string())
        .bind(state.to_string())
        .bind(outfit.created_at.to_rfc3339())
        .bind(outfit.updated_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        insert_layers(&mut tx, &id, &outfit.layers).await?;

        tx.commit().await
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Outfit>, sqlx::Error> {
        let row: Option<OutfitRow> = sqlx::query_as(
            "SELECT id, owner_id, date_worn, created_at, updated_at FROM outfits WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => self.hydrate_outfit(row).await.map(Some),
            None => Ok(None),
        }
    }

    /// Looks up the outfit scheduled for an owner on a date. Outfits awaiting
    /// remote delete confirmation are invisible here.
    pub async fn get_by_date(
        &self,
        owner_id: &str,
        date: NaiveDate,
    ) -> Result<Option<Outfit>, sqlx::Error> {
        let row: Option<OutfitRow> = sqlx::query_as(
            r#"
            SELECT id, owner_id, date_worn, created_at, updated_at
            FROM outfits
            WHERE owner_id = ? AND date_worn = ? AND sync_state != 'pending_delete'
            "#,
        )
        .bind(owner_id)
        .bind(date.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => self.hydrate_outfit(row).await.map(Some),
            None => Ok(None),
        }
    }

    /// Id of the row holding this (owner, date) behind an unconfirmed
    /// delete, if any. Such a row blocks the date's UNIQUE index while
    /// being invisible to `get_by_date`.
    pub async fn pending_delete_at(
        &self,
        owner_id: &str,
        date: NaiveDate,
    ) -> Result<Option<Uuid>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT id FROM outfits WHERE owner_id = ? AND date_worn = ? AND sync_state = 'pending_delete'",
        )
        .bind(owner_id)
        .bind(date.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(id,)| Uuid::parse_str(&id).map_err(|e| sqlx::Error::Protocol(e.to_string())))
            .transpose()
    }

    pub async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Outfit>, sqlx::Error> {
        let rows: Vec<OutfitRow> = sqlx::query_as(
            r#"
            SELECT id, owner_id, date_worn, created_at, updated_at
            FROM outfits
            WHERE owner_id = ? AND sync_state != 'pending_delete'
            ORDER BY date_worn
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        let mut outfits = Vec::with_capacity(rows.len());
        for row in rows {
            outfits.push(self.hydrate_outfit(row).await?);
        }
        Ok(outfits)
    }

    pub async fn update(&self, outfit: &Outfit, state: SyncState) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let id = outfit.id.to_string();
        sqlx::query(
            r#"
            UPDATE outfits
            SET date_worn = ?, sync_state = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(outfit.date_worn.to_string())
        .bind(state.to_string())
        .bind(outfit.updated_at.to_rfc3339())
        .bind(&id)
        .execute(&mut *tx)
        .await?;

        // Replace layers
        sqlx::query("DELETE FROM outfit_layers WHERE outfit_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await?;

        insert_layers(&mut tx, &id, &outfit.layers).await?;

        tx.commit().await
    }

    pub async fn sync_state(&self, id: Uuid) -> Result<Option<SyncState>, sqlx::Error> {
        Ok(self.meta(id).await?.map(|m| m.sync_state))
    }

    pub async fn set_sync_state(&self, id: Uuid, state: SyncState) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE outfits SET sync_state = ? WHERE id = ?")
            .bind(state.to_string())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn meta(&self, id: Uuid) -> Result<Option<LocalMeta>, sqlx::Error> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT sync_state, updated_at FROM outfits WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(state, updated_at)| {
            Ok(LocalMeta {
                sync_state: SyncState::from_str(&state).map_err(sqlx::Error::Protocol)?,
                updated_at: parse_timestamp(&updated_at),
            })
        })
        .transpose()
    }

    /// Overwrites the local record with a remote copy and marks it synced.
    pub async fn apply_remote(&self, outfit: &Outfit) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let id = outfit.id.to_string();
        sqlx::query(
            r#"
            INSERT INTO outfits (id, owner_id, date_worn, sync_state, created_at, updated_at)
            VALUES (?, ?, ?, 'synced', ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                owner_id = excluded.owner_id,
                date_worn = excluded.date_worn,
                sync_state = 'synced',
                created_at = excluded.created_at,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&id)
        .bind(&outfit.owner_id)
        .bind(outfit.date_worn.to_string())
        .bind(outfit.created_at.to_rfc3339())
        .bind(outfit.updated_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM outfit_layers WHERE outfit_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await?;

        insert_layers(&mut tx, &id, &outfit.layers).await?;

        tx.commit().await
    }

    pub async fn remove(&self, id: Uuid) -> Result<(), sqlx::Error> {
        // CASCADE removes the layers
        sqlx::query("DELETE FROM outfits WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn hydrate_outfit(&self, row: OutfitRow) -> Result<Outfit, sqlx::Error> {
        let layers: Vec<LayerRow> = sqlx::query_as(
            r#"
            SELECT garment_id, z_index, position_x, position_y, scale, rotation
            FROM outfit_layers
            WHERE outfit_id = ?
            ORDER BY rowid
            "#,
        )
        .bind(&row.id)
        .fetch_all(&self.pool)
        .await?;

        let layers = layers
            .into_iter()
            .map(|l| {
                Ok(OutfitLayer {
                    garment_id: Uuid::parse_str(&l.garment_id)
                        .map_err(|e| sqlx::Error::Protocol(e.to_string()))?,
                    z_index: l.z_index,
                    position_x: l.position_x,
                    position_y: l.position_y,
                    scale: l.scale,
                    rotation: l.rotation,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        Ok(Outfit {
            id: Uuid::parse_str(&row.id).map_err(|e| sqlx::Error::Protocol(e.to_string()))?,
            owner_id: row.owner_id,
            date_worn: NaiveDate::from_str(&row.date_worn)
                .map_err(|e| sqlx::Error::Protocol(e.to_string()))?,
            layers,
            created_at: parse_timestamp(&row.created_at),
            updated_at: parse_timestamp(&row.updated_at),
        })
    }
}

async fn insert_layers(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    outfit_id: &str,
    layers: &[OutfitLayer],
) -> Result<(), sqlx::Error> {
    for layer in layers {
        sqlx::query(
            r#"
            INSERT INTO outfit_layers (outfit_id, garment_id, z_index, position_x, position_y, scale, rotation)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(outfit_id)
        .bind(layer.garment_id.to_string())
        .bind(layer.z_index)
        .bind(layer.position_x)
        .bind(layer.position_y)
        .bind(layer.scale)
        .bind(layer.rotation)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use tempfile::TempDir;

    struct TestContext {
        repo: OutfitRepository,
        _temp_dir: TempDir,
    }

    async fn setup_repo() -> TestContext {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let pool = init_db(Some(db_path)).await.unwrap();
        TestContext {
            repo: OutfitRepository::new(pool),
            _temp_dir: temp_dir,
        }
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get_outfit_with_layers() {
        let ctx = setup_repo().await;
        let repo = &ctx.repo;

        let outfit = Outfit::new("user1", date(1)).with_layers(vec![
            OutfitLayer::new(Uuid::new_v4(), 1, 50.0, 30.0),
            OutfitLayer::new(Uuid::new_v4(), 2, 28.0, 32.0),
        ]);
        repo.create(&outfit, SyncState::Synced).await.unwrap();

        let fetched = repo.get_by_id(outfit.id).await.unwrap().unwrap();
        assert_eq!(fetched.date_worn, date(1));
        assert_eq!(fetched.layers.len(), 2);
        assert_eq!(fetched.layers, outfit.layers);
    }

    #[tokio::test]
    async fn test_unique_owner_date() {
        let ctx = setup_repo().await;
        let repo = &ctx.repo;

        repo.create(&Outfit::new("user1", date(2)), SyncState::Synced)
            .await
            .unwrap();

        let result = repo.create(&Outfit::new("user1", date(2)), SyncState::Synced).await;
        assert!(result.is_err());

        // Same date for another owner is fine
        repo.create(&Outfit::new("user2", date(2)), SyncState::Synced)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_get_by_date_skips_pending_delete() {
        let ctx = setup_repo().await;
        let repo = &ctx.repo;

        let outfit = Outfit::new("user1", date(3));
        repo.create(&outfit, SyncState::PendingDelete).await.unwrap();

        assert!(repo.get_by_date("user1", date(3)).await.unwrap().is_none());
        assert!(repo.get_by_id(outfit.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_pending_delete_at() {
        let ctx = setup_repo().await;
        let repo = &ctx.repo;

        let outfit = Outfit::new("user1", date(7));
        repo.create(&outfit, SyncState::Synced).await.unwrap();
        assert!(repo
            .pending_delete_at("user1", date(7))
            .await
            .unwrap()
            .is_none());

        repo.set_sync_state(outfit.id, SyncState::PendingDelete)
            .await
            .unwrap();
        assert_eq!(
            repo.pending_delete_at("user1", date(7)).await.unwrap(),
            Some(outfit.id)
        );
    }

    #[tokio::test]
    async fn test_update_replaces_layers() {
        let ctx = setup_repo().await;
        let repo = &ctx.repo;

        let mut outfit = Outfit::new("user1", date(4))
            .with_layers(vec![OutfitLayer::new(Uuid::new_v4(), 1, 50.0, 30.0)]);
        repo.create(&outfit, SyncState::Synced).await.unwrap();

        outfit.layers = vec![
            OutfitLayer::new(Uuid::new_v4(), 1, 28.0, 32.0),
            OutfitLayer::new(Uuid::new_v4(), 2, 72.0, 32.0),
        ];
        repo.update(&outfit, SyncState::PendingUpdate).await.unwrap();

        let fetched = repo.get_by_id(outfit.id).await.unwrap().unwrap();
        assert_eq!(fetched.layers.len(), 2);
        assert_eq!(fetched.layers, outfit.layers);
        assert_eq!(
            repo.sync_state(outfit.id).await.unwrap(),
            Some(SyncState::PendingUpdate)
        );
    }

    #[tokio::test]
    async fn test_apply_remote_upserts_and_replaces_layers() {
        let ctx = setup_repo().await;
        let repo = &ctx.repo;

        let mut outfit = Outfit::new("user1", date(5))
            .with_layers(vec![OutfitLayer::new(Uuid::new_v4(), 1, 50.0, 30.0)]);
        repo.apply_remote(&outfit).await.unwrap();

        outfit.layers = vec![OutfitLayer::new(Uuid::new_v4(), 3, 38.0, 62.0)];
        repo.apply_remote(&outfit).await.unwrap();

        let fetched = repo.get_by_id(outfit.id).await.unwrap().unwrap();
        assert_eq!(fetched.layers.len(), 1);
        assert_eq!(fetched.layers[0].z_index, 3);
        assert_eq!(
            repo.sync_state(outfit.id).await.unwrap(),
            Some(SyncState::Synced)
        );
    }

    #[tokio::test]
    async fn test_remove_cascades_layers() {
        let ctx = setup_repo().await;
        let repo = &ctx.repo;

        let outfit = Outfit::new("user1", date(6))
            .with_layers(vec![OutfitLayer::new(Uuid::new_v4(), 1, 50.0, 30.0)]);
        repo.create(&outfit, SyncState::Synced).await.unwrap();
        repo.remove(outfit.id).await.unwrap();

        assert!(repo.get_by_id(outfit.id).await.unwrap().is_none());
    }
}
