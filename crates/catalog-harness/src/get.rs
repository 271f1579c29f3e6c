//! `catalog get <productId>`: print one product.

use anyhow::Result;

use catalog_harness_core::{search, CatalogError};

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

pub async fn run_get(config: &Config, id: &str) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone(), &config.containers);
    let product = search::get_product(&store, id).await?;
    pool.close().await;

    let p = product.ok_or_else(|| CatalogError::product_not_found(id))?;

    println!("--- Product ---");
    println!("id:        {}", p.id);
    println!("name:      {}", p.name);
    println!("sku:       {}", p.sku);
    println!("category:  {} ({})", p.category_name, p.category_id);
    println!("price:     {:.2}", p.price);
    println!("tags:      {}", p.tags.join(", "));
    println!(
        "embedding: {}",
        p.embedding
            .as_ref()
            .map(|v| format!("{} dims", v.len()))
            .unwrap_or_else(|| "none".to_string())
    );
    println!();
    println!("--- Description ---");
    println!("{}", p.description);

    Ok(())
}
