//! `catalog load <file.json>`: bulk product import.
//!
//! The file holds a JSON array of products in the wire format
//! (`categoryId`, `categoryName`, …; `embedding` optional). Every record is
//! validated before anything is written, then upserted by `id`.

use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

use catalog_harness_core::store::Store;
use catalog_harness_core::Product;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

/// Parse and validate a product file.
pub fn read_products(path: &Path, dims: usize) -> Result<Vec<Product>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read product file: {}", path.display()))?;
    let products: Vec<Product> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse product file: {}", path.display()))?;
    validate_products(&products, dims)?;
    Ok(products)
}

fn validate_products(products: &[Product], dims: usize) -> Result<()> {
    let mut seen = HashSet::new();
    for (i, p) in products.iter().enumerate() {
        if p.id.trim().is_empty() {
            bail!("product #{} has an empty id", i);
        }
        if !seen.insert(p.id.as_str()) {
            bail!("duplicate product id: {}", p.id);
        }
        if !p.price.is_finite() || p.price < 0.0 {
            bail!("product {} has an invalid price: {}", p.id, p.price);
        }
        if let Some(ref v) = p.embedding {
            if v.len() != dims {
                bail!(
                    "product {} embedding has {} dimensions, config expects {}",
                    p.id,
                    v.len(),
                    dims
                );
            }
        }
    }
    Ok(())
}

pub async fn run_load(config: &Config, path: &Path, dry_run: bool) -> Result<()> {
    let products = read_products(path, config.embedding.dims)?;
    let with_embedding = products.iter().filter(|p| p.embedding.is_some()).count();

    if dry_run {
        println!("load (dry-run)");
        println!("  products: {}", products.len());
        println!("  with embedding: {}", with_embedding);
        return Ok(());
    }

    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone(), &config.containers);
    for p in &products {
        store.upsert_product(p).await?;
    }
    pool.close().await;

    info!(count = products.len(), file = %path.display(), "products loaded");
    println!("load");
    println!("  products upserted: {}", products.len());
    println!("  with embedding: {}", with_embedding);
    println!("  without embedding: {}", products.len() - with_embedding);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(body: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(body.as_bytes()).unwrap();
        f
    }

    const ONE: &str = r#"[{
        "id": "p1", "categoryId": "c1", "categoryName": "Road Bikes",
        "sku": "RB-1", "name": "Swift", "description": "Fast road bike",
        "price": 899.0, "tags": ["aero"], "embedding": [0.1, 0.2]
    }]"#;

    #[test]
    fn test_reads_wire_format() {
        let f = write_file(ONE);
        let products = read_products(f.path(), 2).unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].category_name, "Road Bikes");
        assert_eq!(products[0].embedding.as_deref(), Some(&[0.1f32, 0.2][..]));
    }

    #[test]
    fn test_rejects_wrong_dims() {
        let f = write_file(ONE);
        let err = read_products(f.path(), 3).unwrap_err();
        assert!(err.to_string().contains("2 dimensions"));
    }

    #[test]
    fn test_rejects_duplicates() {
        let p = ONE.trim().trim_start_matches('[').trim_end_matches(']');
        let f = write_file(&format!("[{},{}]", p, p));
        let err = read_products(f.path(), 2).unwrap_err();
        assert!(err.to_string().contains("duplicate product id: p1"));
    }
}
