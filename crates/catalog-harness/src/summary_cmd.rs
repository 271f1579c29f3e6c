//! `catalog summary …`: marketing-summary lifecycle from the shell.
//!
//! Each subcommand prints the resulting record as pretty JSON, the same
//! shape the HTTP tools return.

use anyhow::Result;

use catalog_harness_core::{summary, CatalogError, ProductSummary, SummaryContent};

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

/// Summary operation requested on the command line.
pub enum SummaryAction<'a> {
    Generate(SummaryContent<'a>),
    Get,
    Update(SummaryContent<'a>),
    Delete,
}

fn print_summary(summary: &ProductSummary) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(summary)?);
    Ok(())
}

pub async fn run_summary(config: &Config, product_id: &str, action: SummaryAction<'_>) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone(), &config.containers);

    let outcome = match action {
        SummaryAction::Generate(content) => summary::generate(&store, product_id, content)
            .await
            .map(Some),
        SummaryAction::Update(content) => summary::update(&store, product_id, content)
            .await
            .map(Some),
        SummaryAction::Get => summary::get(&store, product_id)
            .await
            .and_then(|s| s.map(Some).ok_or_else(|| CatalogError::summary_not_found(product_id))),
        SummaryAction::Delete => summary::delete(&store, product_id).await.map(|_| None),
    };
    pool.close().await;

    match outcome? {
        Some(s) => print_summary(&s)?,
        None => println!("deleted summary for product {}", product_id),
    }
    Ok(())
}

pub async fn run_summary_list(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone(), &config.containers);
    let summaries = summary::list(&store).await?;
    pool.close().await;

    if summaries.is_empty() {
        println!("No summaries.");
        return Ok(());
    }
    for s in &summaries {
        println!("{}  {}  {}", s.product_id, s.updated_at.to_rfc3339(), s.title);
    }
    Ok(())
}
