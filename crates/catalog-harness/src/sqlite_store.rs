//! SQLite-backed [`Store`] implementation.
//!
//! Products live in the `[containers].products` table with a parallel FTS5
//! table (`<products>_fts`) indexing description and tags. Embeddings are
//! little-endian f32 BLOBs compared in process. Summaries live in the
//! `[containers].summaries` table; `product_id` acts as the partition key.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use catalog_harness_core::embedding::{
    blob_to_vec, cosine_similarity, ensure_same_dims, vec_to_blob,
};
use catalog_harness_core::models::{Product, ProductSummary};
use catalog_harness_core::store::{ProductCandidate, Store, TextField};

use crate::config::ContainersConfig;

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
    products: String,
    products_fts: String,
    summaries: String,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool, containers: &ContainersConfig) -> Self {
        Self {
            pool,
            products: containers.products.clone(),
            products_fts: format!("{}_fts", containers.products),
            summaries: containers.summaries.clone(),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

const PRODUCT_COLUMNS: &str =
    "id, category_id, category_name, sku, name, description, price, tags_json, embedding";

const SUMMARY_COLUMNS: &str = "id, product_id, title, short_description, marketing_copy, \
     key_features_json, target_audience_json, use_case, created_at, updated_at";

fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("invalid stored timestamp: {}", raw))?
        .with_timezone(&Utc))
}

fn product_from_row(row: &SqliteRow) -> Result<Product> {
    let tags_json: String = row.get("tags_json");
    let embedding: Option<Vec<u8>> = row.get("embedding");
    Ok(Product {
        id: row.get("id"),
        category_id: row.get("category_id"),
        category_name: row.get("category_name"),
        sku: row.get("sku"),
        name: row.get("name"),
        description: row.get("description"),
        price: row.get("price"),
        tags: serde_json::from_str(&tags_json).context("invalid stored tags")?,
        embedding: embedding.map(|blob| blob_to_vec(&blob)),
    })
}

fn summary_from_row(row: &SqliteRow) -> Result<ProductSummary> {
    let key_features: String = row.get("key_features_json");
    let target_audience: String = row.get("target_audience_json");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");
    Ok(ProductSummary {
        id: row.get("id"),
        product_id: row.get("product_id"),
        title: row.get("title"),
        short_description: row.get("short_description"),
        marketing_copy: row.get("marketing_copy"),
        key_features: serde_json::from_str(&key_features).context("invalid stored keyFeatures")?,
        target_audience: serde_json::from_str(&target_audience)
            .context("invalid stored targetAudience")?,
        use_case: row.get("use_case"),
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}

/// Build an FTS5 MATCH expression: any of `terms`, restricted to `field`.
///
/// Each term is quoted as an FTS5 string so punctuation inside a term is
/// never parsed as query syntax.
pub fn fts_match_expression(terms: &[String], field: TextField) -> String {
    let any_of = terms
        .iter()
        .map(|t| format!("\"{}\"", t.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(" OR ");
    let columns = match field {
        TextField::Description => "description",
        TextField::Tags => "tags",
        TextField::Any => "{description tags}",
    };
    format!("{} : ({})", columns, any_of)
}

#[async_trait]
impl Store for SqliteStore {
    async fn upsert_product(&self, product: &Product) -> Result<()> {
        let tags_json = serde_json::to_string(&product.tags)?;
        let embedding = product.embedding.as_deref().map(vec_to_blob);

        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!(
            r#"
            INSERT INTO {} ({PRODUCT_COLUMNS})
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                category_id = excluded.category_id,
                category_name = excluded.category_name,
                sku = excluded.sku,
                name = excluded.name,
                description = excluded.description,
                price = excluded.price,
                tags_json = excluded.tags_json,
                embedding = excluded.embedding
            "#,
            self.products
        ))
        .bind(&product.id)
        .bind(&product.category_id)
        .bind(&product.category_name)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(&tags_json)
        .bind(&embedding)
        .execute(&mut *tx)
        .await?;

        sqlx::query(&format!(
            "DELETE FROM {} WHERE product_id = ?",
            self.products_fts
        ))
        .bind(&product.id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(&format!(
            "INSERT INTO {} (product_id, description, tags) VALUES (?, ?, ?)",
            self.products_fts
        ))
        .bind(&product.id)
        .bind(&product.description)
        .bind(product.tags.join(" "))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_product(&self, id: &str) -> Result<Option<Product>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM {} WHERE id = ?",
            self.products
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(product_from_row).transpose()
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM {}",
            self.products
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(product_from_row).collect()
    }

    async fn text_search(
        &self,
        terms: &[String],
        field: TextField,
        limit: usize,
    ) -> Result<Vec<ProductCandidate>> {
        if terms.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let expression = fts_match_expression(terms, field);
        debug!(%expression, "fts query");

        let rows = sqlx::query(&format!(
            r#"
            SELECT product_id, rank
            FROM {fts}
            WHERE {fts} MATCH ?
            ORDER BY rank, product_id
            LIMIT ?
            "#,
            fts = self.products_fts
        ))
        .bind(&expression)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let rank: f64 = row.get("rank");
                ProductCandidate {
                    product_id: row.get("product_id"),
                    raw_score: -rank,
                }
            })
            .collect())
    }

    async fn vector_search(
        &self,
        query_vec: &[f32],
        limit: usize,
    ) -> Result<Vec<ProductCandidate>> {
        let rows = sqlx::query(&format!(
            "SELECT id, embedding FROM {} WHERE embedding IS NOT NULL",
            self.products
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut candidates = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: String = row.get("id");
            let blob: Vec<u8> = row.get("embedding");
            let stored = blob_to_vec(&blob);
            ensure_same_dims(query_vec, &stored, &id)?;
            candidates.push(ProductCandidate {
                raw_score: cosine_similarity(query_vec, &stored) as f64,
                product_id: id,
            });
        }

        candidates.sort_by(|a, b| {
            b.raw_score
                .partial_cmp(&a.raw_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.product_id.cmp(&b.product_id))
        });
        candidates.truncate(limit);
        Ok(candidates)
    }

    async fn upsert_summary(&self, summary: &ProductSummary) -> Result<()> {
        sqlx::query(&format!(
            r#"
            INSERT INTO {} ({SUMMARY_COLUMNS})
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                short_description = excluded.short_description,
                marketing_copy = excluded.marketing_copy,
                key_features_json = excluded.key_features_json,
                target_audience_json = excluded.target_audience_json,
                use_case = excluded.use_case,
                updated_at = excluded.updated_at
            "#,
            self.summaries
        ))
        .bind(&summary.id)
        .bind(&summary.product_id)
        .bind(&summary.title)
        .bind(&summary.short_description)
        .bind(&summary.marketing_copy)
        .bind(serde_json::to_string(&summary.key_features)?)
        .bind(serde_json::to_string(&summary.target_audience)?)
        .bind(&summary.use_case)
        .bind(format_ts(&summary.created_at))
        .bind(format_ts(&summary.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn summaries_for_product(&self, product_id: &str) -> Result<Vec<ProductSummary>> {
        let rows = sqlx::query(&format!(
            "SELECT {SUMMARY_COLUMNS} FROM {} WHERE product_id = ?",
            self.summaries
        ))
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(summary_from_row).collect()
    }

    async fn delete_summary(&self, id: &str, partition_key: &str) -> Result<()> {
        sqlx::query(&format!(
            "DELETE FROM {} WHERE id = ? AND product_id = ?",
            self.summaries
        ))
        .bind(id)
        .bind(partition_key)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_summaries(&self) -> Result<Vec<ProductSummary>> {
        let rows = sqlx::query(&format!(
            "SELECT {SUMMARY_COLUMNS} FROM {}",
            self.summaries
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(summary_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_expression_quotes_terms() {
        let terms = vec!["mountain".to_string(), "22-speed".to_string()];
        assert_eq!(
            fts_match_expression(&terms, TextField::Description),
            "description : (\"mountain\" OR \"22-speed\")"
        );
        assert_eq!(
            fts_match_expression(&terms[..1], TextField::Any),
            "{description tags} : (\"mountain\")"
        );
    }

    #[test]
    fn test_match_expression_escapes_quotes() {
        let terms = vec!["say\"hi".to_string()];
        assert_eq!(
            fts_match_expression(&terms, TextField::Tags),
            "tags : (\"say\"\"hi\")"
        );
    }

    #[test]
    fn test_timestamp_roundtrip_keeps_precision() {
        let now = Utc::now();
        assert_eq!(parse_ts(&format_ts(&now)).unwrap(), now);
    }
}
