//! In-memory [`Store`] implementation for tests.
//!
//! Uses `HashMap`s behind `std::sync::RwLock`. Keyword search counts term
//! occurrences among the words of each field; vector search is brute-force
//! cosine similarity over every product with an embedding.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::embedding::{cosine_similarity, ensure_same_dims};
use crate::models::{Product, ProductSummary};
use crate::search::words;

use super::{ProductCandidate, Store, TextField};

/// In-memory store keyed by product id and summary id.
pub struct InMemoryStore {
    products: RwLock<HashMap<String, Product>>,
    summaries: RwLock<HashMap<String, ProductSummary>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            products: RwLock::new(HashMap::new()),
            summaries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory store lock poisoned")
}

/// Number of words in `text` equal to one of `terms`.
fn term_hits(text: &str, terms: &[String]) -> usize {
    words(text).filter(|w| terms.contains(w)).count()
}

fn field_hits(product: &Product, terms: &[String], field: TextField) -> usize {
    let description = || term_hits(&product.description, terms);
    let tags = || {
        product
            .tags
            .iter()
            .map(|t| term_hits(t, terms))
            .sum::<usize>()
    };
    match field {
        TextField::Description => description(),
        TextField::Tags => tags(),
        TextField::Any => description() + tags(),
    }
}

fn sort_candidates(candidates: &mut [ProductCandidate]) {
    candidates.sort_by(|a, b| {
        b.raw_score
            .partial_cmp(&a.raw_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.product_id.cmp(&b.product_id))
    });
}

#[async_trait]
impl Store for InMemoryStore {
    async fn upsert_product(&self, product: &Product) -> Result<()> {
        let mut products = self.products.write().map_err(poisoned)?;
        products.insert(product.id.clone(), product.clone());
        Ok(())
    }

    async fn get_product(&self, id: &str) -> Result<Option<Product>> {
        let products = self.products.read().map_err(poisoned)?;
        Ok(products.get(id).cloned())
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let products = self.products.read().map_err(poisoned)?;
        Ok(products.values().cloned().collect())
    }

    async fn text_search(
        &self,
        terms: &[String],
        field: TextField,
        limit: usize,
    ) -> Result<Vec<ProductCandidate>> {
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        let products = self.products.read().map_err(poisoned)?;
        let mut candidates: Vec<ProductCandidate> = products
            .values()
            .filter_map(|p| {
                let hits = field_hits(p, terms, field);
                (hits > 0).then(|| ProductCandidate {
                    product_id: p.id.clone(),
                    raw_score: hits as f64,
                })
            })
            .collect();
        sort_candidates(&mut candidates);
        candidates.truncate(limit);
        Ok(candidates)
    }

    async fn vector_search(
        &self,
        query_vec: &[f32],
        limit: usize,
    ) -> Result<Vec<ProductCandidate>> {
        let products = self.products.read().map_err(poisoned)?;
        let mut candidates = Vec::new();
        for p in products.values() {
            if let Some(ref embedding) = p.embedding {
                ensure_same_dims(query_vec, embedding, &p.id)?;
                candidates.push(ProductCandidate {
                    product_id: p.id.clone(),
                    raw_score: cosine_similarity(query_vec, embedding) as f64,
                });
            }
        }
        sort_candidates(&mut candidates);
        candidates.truncate(limit);
        Ok(candidates)
    }

    async fn upsert_summary(&self, summary: &ProductSummary) -> Result<()> {
        let mut summaries = self.summaries.write().map_err(poisoned)?;
        summaries.insert(summary.id.clone(), summary.clone());
        Ok(())
    }

    async fn summaries_for_product(&self, product_id: &str) -> Result<Vec<ProductSummary>> {
        let summaries = self.summaries.read().map_err(poisoned)?;
        Ok(summaries
            .values()
            .filter(|s| s.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn delete_summary(&self, id: &str, partition_key: &str) -> Result<()> {
        let mut summaries = self.summaries.write().map_err(poisoned)?;
        if summaries
            .get(id)
            .is_some_and(|s| s.product_id == partition_key)
        {
            summaries.remove(id);
        }
        Ok(())
    }

    async fn list_summaries(&self) -> Result<Vec<ProductSummary>> {
        let summaries = self.summaries.read().map_err(poisoned)?;
        Ok(summaries.values().cloned().collect())
    }
}
