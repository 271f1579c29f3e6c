//! Storage abstraction for Catalog Harness.
//!
//! The [`Store`] trait defines every record-store operation the search and
//! summary components need, so backends are pluggable (SQLite in the
//! application crate, [`memory::InMemoryStore`] for tests).
//!
//! Backends own ranking: keyword candidates come back in engine relevance
//! order and vector candidates in similarity order. Implementations must be
//! `Send + Sync` to be shared across request handlers.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Product, ProductSummary};

/// Which product text a keyword query is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    Description,
    Tags,
    /// Description or tags.
    Any,
}

/// A ranked product returned from keyword or vector search.
#[derive(Debug, Clone)]
pub struct ProductCandidate {
    pub product_id: String,
    /// Raw engine score, higher is better (term hits or cosine similarity).
    pub raw_score: f64,
}

/// Abstract record store.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`upsert_product`](Store::upsert_product) | Insert or replace a product (bulk load) |
/// | [`get_product`](Store::get_product) | Point lookup |
/// | [`list_products`](Store::list_products) | Full scan |
/// | [`text_search`](Store::text_search) | Keyword match over description/tags |
/// | [`vector_search`](Store::vector_search) | Similarity over stored embeddings |
/// | [`upsert_summary`](Store::upsert_summary) | Insert or replace a summary |
/// | [`summaries_for_product`](Store::summaries_for_product) | Summaries by product id |
/// | [`delete_summary`](Store::delete_summary) | Remove by id + partition key |
/// | [`list_summaries`](Store::list_summaries) | Full scan |
#[async_trait]
pub trait Store: Send + Sync {
    async fn upsert_product(&self, product: &Product) -> Result<()>;

    async fn get_product(&self, id: &str) -> Result<Option<Product>>;

    async fn list_products(&self) -> Result<Vec<Product>>;

    /// Products matching any of `terms` in `field`, best match first.
    ///
    /// `terms` are already tokenized and lower-cased. An empty slice yields
    /// no candidates.
    async fn text_search(
        &self,
        terms: &[String],
        field: TextField,
        limit: usize,
    ) -> Result<Vec<ProductCandidate>>;

    /// Products with an embedding, most similar first.
    ///
    /// Fails when `query_vec` does not have the stored dimensionality.
    async fn vector_search(&self, query_vec: &[f32], limit: usize)
        -> Result<Vec<ProductCandidate>>;

    async fn upsert_summary(&self, summary: &ProductSummary) -> Result<()>;

    /// Every summary whose `product_id` equals `product_id`, in no
    /// particular order.
    async fn summaries_for_product(&self, product_id: &str) -> Result<Vec<ProductSummary>>;

    /// Delete a summary by its id within the `partition_key` partition
    /// (the product id). Deleting a missing document is not an error.
    async fn delete_summary(&self, id: &str, partition_key: &str) -> Result<()>;

    async fn list_summaries(&self) -> Result<Vec<ProductSummary>>;
}
