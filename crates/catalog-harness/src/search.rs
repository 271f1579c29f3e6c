//! `catalog search`: keyword or hybrid product search from the command line.
//!
//! The ranking itself lives in `catalog_harness_core::search`. This wrapper
//! connects to the database, embeds the query for hybrid mode and prints
//! the results.
//!
//! # Search Modes
//!
//! - **keyword**: FTS5 match on description and tags.
//! - **hybrid**: reciprocal-rank fusion of description, tags and vector
//!   rankings. Requires an enabled `[embedding]` provider.

use anyhow::{bail, Result};

use catalog_harness_core::search::{self, SearchParams};
use catalog_harness_core::Product;

use crate::config::Config;
use crate::db;
use crate::embedding;
use crate::sqlite_store::SqliteStore;

/// Run a search and return matching products, best first.
pub async fn search_products(
    config: &Config,
    query: &str,
    mode: &str,
    limit: Option<usize>,
) -> Result<Vec<Product>> {
    match mode {
        "keyword" | "hybrid" => {}
        _ => bail!("Unknown search mode: {}. Use keyword or hybrid.", mode),
    }

    if mode == "hybrid" && !config.embedding.is_enabled() {
        bail!("Mode 'hybrid' requires embeddings. Set [embedding] provider in config.");
    }

    let limit = limit.unwrap_or(config.retrieval.default_limit);
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone(), &config.containers);

    let products = if mode == "hybrid" {
        let query_vec = embedding::embed_query(&config.embedding, query).await?;
        let params = SearchParams {
            candidate_k: config.retrieval.candidate_k,
            rrf_k: config.retrieval.rrf_k,
        };
        search::hybrid_search(&store, query, &query_vec, limit, &params).await?
    } else {
        search::full_text_search(&store, query, limit).await?
    };

    pool.close().await;
    Ok(products)
}

/// CLI entry point for `catalog search`.
pub async fn run_search(config: &Config, query: &str, mode: &str, limit: Option<usize>) -> Result<()> {
    let products = search_products(config, query, mode, limit).await?;

    if products.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, p) in products.iter().enumerate() {
        println!("{}. {} ({})", i + 1, p.name, p.sku);
        println!("    category: {}", p.category_name);
        println!("    price: {:.2}", p.price);
        if !p.tags.is_empty() {
            println!("    tags: {}", p.tags.join(", "));
        }
        println!("    {}", p.description.replace('\n', " ").trim());
        println!("    id: {}", p.id);
        println!();
    }

    Ok(())
}
