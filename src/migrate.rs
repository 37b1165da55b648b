use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Apply the schema to an open pool. Idempotent, so stores can run it on
/// startup without a separate init step.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    // Create statements table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS statements (
            id TEXT PRIMARY KEY,
            file_name TEXT NOT NULL UNIQUE,
            byte_size INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            last_name TEXT NOT NULL,
            birth_year INTEGER NOT NULL,
            contact_digits TEXT NOT NULL,
            blob_key TEXT NOT NULL,
            blob_url TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_statements_identity ON statements(last_name, birth_year)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_statements_created_at ON statements(created_at DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
