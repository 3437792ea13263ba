mod garment_repo;
mod ledger_repo;
mod meta_repo;
mod outfit_repo;

pub use garment_repo::GarmentRepository;
pub use ledger_repo::LedgerRepository;
pub use meta_repo::SyncMetaRepository;
pub use outfit_repo::OutfitRepository;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::PathBuf;
use std::str::FromStr;

use crate::models::SyncState;

/// Local bookkeeping read alongside a record for last-writer-wins decisions.
#[derive(Debug, Clone)]
pub struct LocalMeta {
    pub sync_state: SyncState,
    pub updated_at: DateTime<Utc>,
}

/// Initialize the database connection pool and run migrations
pub async fn init_db(db_path: Option<PathBuf>) -> Result<SqlitePool, sqlx::Error> {
    let path = db_path.expect("database_path must be provided");

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create database directory");
    }

    let db_url = format!("sqlite:{}?mode=rwc", path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .foreign_keys(true)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // Run migrations
    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}
