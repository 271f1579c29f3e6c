use anyhow::{bail, Result};
use tracing::warn;

use catalog_harness_core::store::Store;
use catalog_harness_core::Product;

use crate::config::Config;
use crate::db;
use crate::embedding;
use crate::sqlite_store::SqliteStore;

/// Products that still need an embedding, in id order.
pub fn pending_products(products: Vec<Product>, limit: Option<usize>) -> Vec<Product> {
    let mut pending: Vec<Product> = products
        .into_iter()
        .filter(|p| p.embedding.is_none())
        .collect();
    pending.sort_by(|a, b| a.id.cmp(&b.id));
    if let Some(lim) = limit {
        pending.truncate(lim);
    }
    pending
}

/// Embed products that have no embedding yet.
pub async fn run_embed_pending(
    config: &Config,
    limit: Option<usize>,
    batch_size_override: Option<usize>,
    dry_run: bool,
) -> Result<()> {
    if !config.embedding.is_enabled() {
        bail!("Embedding provider is disabled. Set [embedding] provider in config.");
    }

    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone(), &config.containers);
    let batch_size = batch_size_override.unwrap_or(config.embedding.batch_size).max(1);

    let pending = pending_products(store.list_products().await?, limit);

    if dry_run {
        println!("embed pending (dry-run)");
        println!("  products needing embeddings: {}", pending.len());
        pool.close().await;
        return Ok(());
    }

    if pending.is_empty() {
        println!("embed pending");
        println!("  all products up to date");
        pool.close().await;
        return Ok(());
    }

    let total = pending.len();
    let mut embedded = 0u64;
    let mut failed = 0u64;

    for batch in pending.chunks(batch_size) {
        let texts: Vec<String> = batch.iter().map(Product::embedding_text).collect();

        match embedding::embed_texts(&config.embedding, &texts).await {
            Ok(vectors) => {
                for (product, vec) in batch.iter().zip(vectors) {
                    let mut updated = product.clone();
                    updated.embedding = Some(vec);
                    store.upsert_product(&updated).await?;
                    embedded += 1;
                }
            }
            Err(e) => {
                warn!(error = %e, size = batch.len(), "embedding batch failed");
                failed += batch.len() as u64;
            }
        }
    }

    println!("embed pending");
    println!("  total pending: {}", total);
    println!("  embedded: {}", embedded);
    println!("  failed: {}", failed);

    pool.close().await;
    Ok(())
}
