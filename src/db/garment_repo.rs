use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::str::FromStr;
use uuid::Uuid;

use super::LocalMeta;
use crate::models::{Category, Garment, SyncState};

pub struct GarmentRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct GarmentRow {
    id: String,
    owner_id: String,
    category: String,
    sub_category: String,
    image_ref: String,
    created_at: String,
    updated_at: String,
}

impl GarmentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, garment: &Garment, state: SyncState) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO garments (id, owner_id, category, sub_category, image_ref, sync_state, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(garment.id.to_string())
        .bind(&garment.owner_id)
        .bind(garment.category.to_string())
        .bind(&garment.sub_category)
        .bind(&garment.image_ref)
        .bind(state.to_string())
        .bind(garment.created_at.to_rfc3339())
        .bind(garment.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Garment>, sqlx::Error> {
        let row: Option<GarmentRow> = sqlx::query_as(
            "SELECT id, owner_id, category, sub_category, image_ref, created_at, updated_at FROM garments WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(hydrate_garment).transpose()
    }

    /// Lists an owner's garments for display. Records awaiting remote delete
    /// confirmation are excluded.
    pub async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Garment>, sqlx::Error> {
        let rows: Vec<GarmentRow> = sqlx::query_as(
            r#"
            SELECT id, owner_id, category, sub_category, image_ref, created_at, updated_at
            FROM garments
            WHERE owner_id = ? AND sync_state != 'pending_delete'
            ORDER BY created_at
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(hydrate_garment).collect()
    }

    pub async fn sync_state(&self, id: Uuid) -> Result<Option<SyncState>, sqlx::Error> {
        Ok(self.meta(id).await?.map(|m| m.sync_state))
    }

    pub async fn set_sync_state(&self, id: Uuid, state: SyncState) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE garments SET sync_state = ? WHERE id = ?")
            .bind(state.to_string())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn meta(&self, id: Uuid) -> Result<Option<LocalMeta>, sqlx::Error> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT sync_state, updated_at FROM garments WHERE id = ?")
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
    /// Insert and update share one statement so pull replays stay idempotent.
    pub async fn apply_remote(&self, garment: &Garment) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO garments (id, owner_id, category, sub_category, image_ref, sync_state, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 'synced', ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                owner_id = excluded.owner_id,
                category = excluded.category,
                sub_category = excluded.sub_category,
                image_ref = excluded.image_ref,
                sync_state = 'synced',
                created_at = excluded.created_at,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(garment.id.to_string())
        .bind(&garment.owner_id)
        .bind(garment.category.to_string())
        .bind(&garment.sub_category)
        .bind(&garment.image_ref)
        .bind(garment.created_at.to_rfc3339())
        .bind(garment.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn remove(&self, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM garments WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn hydrate_garment(row: GarmentRow) -> Result<Garment, sqlx::Error> {
    Ok(Garment {
        id: Uuid::parse_str(&row.id).map_err(|e| sqlx::Error::Protocol(e.to_string()))?,
        owner_id: row.owner_id,
        category: Category::from_str(&row.category).map_err(sqlx::Error::Protocol)?,
        sub_category: row.sub_category,
        image_ref: row.image_ref,
        created_at: parse_timestamp(&row.created_at),
        updated_at: parse_timestamp(&row.updated_at),
    })
}

pub(super) fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
