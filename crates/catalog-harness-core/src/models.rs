//! Core data models for Catalog Harness.
//!
//! These are the two record kinds held by the record store. Both serialize
//! with camelCase keys, which is the shape tool callers and bulk-load files
//! use.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A catalog item.
///
/// Products are bulk-loaded and read-only from the search and summary
/// components. The `embedding` is absent until the product has been indexed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub category_id: String,
    pub category_name: String,
    pub sku: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Product {
    /// Returns a copy without the embedding vector, for tool responses.
    pub fn without_embedding(&self) -> Self {
        Self {
            embedding: None,
            ..self.clone()
        }
    }

    /// Text used to compute the product's embedding.
    pub fn embedding_text(&self) -> String {
        format!(
            "{} ({}). {} Tags: {}",
            self.name,
            self.category_name,
            self.description,
            self.tags.join(", ")
        )
    }
}

/// A generated marketing summary tied to one [`Product`].
///
/// `product_id` is a lookup key, not an ownership link, and doubles as the
/// partition key in the summary store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: String,
    pub product_id: String,
    pub title: String,
    pub short_description: String,
    pub marketing_copy: String,
    pub key_features: Vec<String>,
    pub target_audience: Vec<String>,
    pub use_case: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-authored summary content, shared by generate and update.
#[derive(Debug, Clone, Copy)]
pub struct SummaryContent<'a> {
    pub title: &'a str,
    pub short_description: &'a str,
    pub marketing_copy: &'a str,
}
