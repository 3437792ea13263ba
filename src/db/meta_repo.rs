use sqlx::SqlitePool;

/// Persists the per-owner pull watermark.
///
/// The watermark is an opaque cursor handed back by the server; it only
/// advances after a pull has been applied in full.
pub struct SyncMetaRepository {
    pool: SqlitePool,
}

impl SyncMetaRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn watermark(&self, owner_id: &str) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT watermark FROM sync_meta WHERE owner_id = ?")
                .bind(owner_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(w,)| w))
    }

    pub async fn set_watermark(&self, owner_id: &str, watermark: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO sync_meta (owner_id, watermark) VALUES (?, ?)
            ON CONFLICT(owner_id) DO UPDATE SET watermark = excluded.watermark
            "#,
        )
        .bind(owner_id)
        .bind(watermark)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use tempfile::TempDir;

    async fn setup_repo() -> (SyncMetaRepository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let pool = init_db(Some(db_path)).await.unwrap();
        (SyncMetaRepository::new(pool), temp_dir)
    }

    #[tokio::test]
    async fn test_watermark_missing() {
        let (repo, _temp) = setup_repo().await;
        assert!(repo.watermark("user1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_and_advance_watermark() {
        let (repo, _temp) = setup_repo().await;

        repo.set_watermark("user1", "2025-06-01T00:00:00Z").await.unwrap();
        assert_eq!(
            repo.watermark("user1").await.unwrap().as_deref(),
            Some("2025-06-01T00:00:00Z")
        );

        repo.set_watermark("user1", "2025-06-02T12:30:00Z").await.unwrap();
        assert_eq!(
            repo.watermark("user1").await.unwrap().as_deref(),
            Some("2025-06-02T12:30:00Z")
        );
    }

    #[tokio::test]
    async fn test_watermarks_scoped_per_owner() {
        let (repo, _temp) = setup_repo().await;

        repo.set_watermark("user1", "a").await.unwrap();
        assert!(repo.watermark("user2").await.unwrap().is_none());
    }
}
