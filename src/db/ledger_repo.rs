use sqlx::SqlitePool;
use std::str::FromStr;
use uuid::Uuid;

use super::garment_repo::parse_timestamp;
use crate::models::{EntityKind, Operation, PendingChange};

/// Durable queue of mutations awaiting remote confirmation.
///
/// Append-only; entries leave the queue one at a time, and only after the
/// corresponding remote operation succeeded or was permanently rejected.
pub struct LedgerRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct PendingChangeRow {
    id: i64,
    entity_type: String,
    operation: String,
    entity_id: String,
    payload: String,
    enqueued_at: String,
}

impl LedgerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn enqueue(&self, change: &PendingChange) -> Result<i64, sqlx::Error> {
        let payload = serde_json::to_string(&change.payload)
            .map_err(|e| sqlx::Error::Protocol(e.to_string()))?;

        let result = sqlx::query(
            r#"
            INSERT INTO pending_changes (entity_type, operation, entity_id, payload, enqueued_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(change.entity.to_string())
        .bind(change.operation.to_string())
        .bind(change.entity_id.to_string())
        .bind(&payload)
        .bind(change.enqueued_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// All pending entries in enqueue order.
    pub async fn pending(&self) -> Result<Vec<PendingChange>, sqlx::Error> {
        let rows: Vec<PendingChangeRow> = sqlx::query_as(
            "SELECT id, entity_type, operation, entity_id, payload, enqueued_at FROM pending_changes ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(hydrate_change).collect()
    }

    pub async fn remove(&self, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM pending_changes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn len(&self) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pending_changes")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn hydrate_change(row: PendingChangeRow) -> Result<PendingChange, sqlx::Error> {
    Ok(PendingChange {
        id: row.id,
        entity: EntityKind::from_str(&row.entity_type).map_err(sqlx::Error::Protocol)?,
        operation: Operation::from_str(&row.operation).map_err(sqlx::Error::Protocol)?,
        entity_id: Uuid::parse_str(&row.entity_id)
            .map_err(|e| sqlx::Error::Protocol(e.to_string()))?,
        payload: serde_json::from_str(&row.payload)
            .map_err(|e| sqlx::Error::Protocol(e.to_string()))?,
        enqueued_at: parse_timestamp(&row.enqueued_at),
    })
}
