//! Database schema migrations.
//!
//! Creates the product and summary tables named in `[containers]`, the FTS5
//! mirror used for keyword search, and the summary partition index. Safe to
//! run repeatedly.

use anyhow::Result;
use sqlx::SqlitePool;
use tracing::info;

use catalog_harness_core::search::TOKEN_CHARS;

use crate::config::{Config, ContainersConfig};
use crate::db;

/// Connect, apply the schema, and close the pool.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool, &config.containers).await?;
    pool.close().await;
    info!(path = %config.db.path.display(), "database initialized");
    Ok(())
}

/// Apply the schema on an existing pool.
pub async fn apply_schema(pool: &SqlitePool, containers: &ContainersConfig) -> Result<()> {
    let products = &containers.products;
    let summaries = &containers.summaries;

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {products} (
            id TEXT PRIMARY KEY,
            category_id TEXT NOT NULL,
            category_name TEXT NOT NULL,
            sku TEXT NOT NULL,
            name TEXT NOT NULL,
            description TEXT NOT NULL,
            price REAL NOT NULL,
            tags_json TEXT NOT NULL DEFAULT '[]',
            embedding BLOB
        )
        "#
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {summaries} (
            id TEXT PRIMARY KEY,
            product_id TEXT NOT NULL,
            title TEXT NOT NULL,
            short_description TEXT NOT NULL,
            marketing_copy TEXT NOT NULL,
            key_features_json TEXT NOT NULL DEFAULT '[]',
            target_audience_json TEXT NOT NULL DEFAULT '[]',
            use_case TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#
    ))
    .execute(pool)
    .await?;

    // FTS5 CREATE is not idempotent natively, so we check first
    let fts_table = format!("{products}_fts");
    let fts_exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name = ?",
    )
    .bind(&fts_table)
    .fetch_one(pool)
    .await?;

    // Word boundaries must match `search::words`.
    if !fts_exists {
        sqlx::query(&format!(
            r#"
            CREATE VIRTUAL TABLE {fts_table} USING fts5(
                product_id UNINDEXED,
                description,
                tags,
                tokenize = "unicode61 remove_diacritics 0 tokenchars '{TOKEN_CHARS}'"
            )
            "#
        ))
        .execute(pool)
        .await?;
    }

    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS idx_{summaries}_product_id ON {summaries}(product_id)"
    ))
    .execute(pool)
    .await?;

    Ok(())
}
