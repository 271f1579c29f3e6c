//! Product search and retrieval.
//!
//! All functions operate through the [`Store`] trait and never mutate state.
//! The caller supplies any query embedding; nothing here calls an embedding
//! model.
//!
//! # Hybrid Ranking
//!
//! 1. Tokenize the query text (see [`tokenize`]).
//! 2. Fetch `candidate_k` keyword candidates against descriptions.
//! 3. Fetch `candidate_k` keyword candidates against tags.
//! 4. Fetch `candidate_k` vector candidates by embedding similarity.
//! 5. Merge the three rankings with reciprocal rank fusion.
//! 6. Resolve product records and truncate to the result limit.

use tracing::debug;

use crate::error::Result;
use crate::fusion::{reciprocal_rank_fusion, RRF_K};
use crate::models::Product;
use crate::store::{ProductCandidate, Store, TextField};

/// Retrieval tuning parameters, decoupled from application config.
#[derive(Debug, Clone)]
pub struct SearchParams {
    /// Candidates fetched per ranking before fusion. Raised to the result
    /// limit when smaller.
    pub candidate_k: usize,
    /// RRF `k` constant.
    pub rrf_k: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            candidate_k: 50,
            rrf_k: RRF_K,
        }
    }
}

/// Punctuation that stays inside a word, so `22-speed` is one term.
///
/// The SQLite full-text index declares these as its `tokenchars`.
pub const TOKEN_CHARS: &str = "-_";

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || TOKEN_CHARS.contains(c)
}

/// Lower-cased words of `text`, in order, duplicates included.
///
/// A word is a run of alphanumerics and [`TOKEN_CHARS`]; every other
/// character separates words. Runs with no alphanumeric are dropped.
pub fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !is_word_char(c))
        .filter(|w| w.chars().any(char::is_alphanumeric))
        .map(str::to_lowercase)
}

/// Split query text into distinct lower-cased search terms.
///
/// See [`words`] for what counts as a word: `"carbon,aero"` is two terms,
/// `"22-speed"` is one.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for token in words(text) {
        if !terms.contains(&token) {
            terms.push(token);
        }
    }
    terms
}

/// Keyword search over description and tags.
///
/// Returns at most `limit` products, best match first. A query with no
/// usable tokens, or one that matches nothing, yields an empty vector.
pub async fn full_text_search<S: Store + ?Sized>(
    store: &S,
    query: &str,
    limit: usize,
) -> Result<Vec<Product>> {
    let terms = tokenize(query);
    if terms.is_empty() || limit == 0 {
        return Ok(Vec::new());
    }

    let candidates = store.text_search(&terms, TextField::Any, limit).await?;
    debug!(terms = terms.len(), hits = candidates.len(), "full-text search");

    let ids: Vec<String> = candidates.into_iter().map(|c| c.product_id).collect();
    resolve_products(store, &ids, limit).await
}

/// Hybrid keyword + vector search fused by reciprocal rank.
///
/// `query_vec` must match the store's embedding dimensionality; a mismatch
/// is reported by the store as an error.
pub async fn hybrid_search<S: Store + ?Sized>(
    store: &S,
    query: &str,
    query_vec: &[f32],
    limit: usize,
    params: &SearchParams,
) -> Result<Vec<Product>> {
    if limit == 0 {
        return Ok(Vec::new());
    }

    let terms = tokenize(query);
    let k = params.candidate_k.max(limit);

    let (by_description, by_tags) = if terms.is_empty() {
        (Vec::new(), Vec::new())
    } else {
        (
            store.text_search(&terms, TextField::Description, k).await?,
            store.text_search(&terms, TextField::Tags, k).await?,
        )
    };
    let by_vector = store.vector_search(query_vec, k).await?;

    debug!(
        description = by_description.len(),
        tags = by_tags.len(),
        vector = by_vector.len(),
        "hybrid search candidates"
    );

    let rankings = [
        candidate_ids(by_description),
        candidate_ids(by_tags),
        candidate_ids(by_vector),
    ];
    let fused = reciprocal_rank_fusion(&rankings, params.rrf_k);

    let ids: Vec<String> = fused.into_iter().map(|(id, _)| id).collect();
    resolve_products(store, &ids, limit).await
}

/// Point lookup. A missing product is `Ok(None)`.
pub async fn get_product<S: Store + ?Sized>(store: &S, id: &str) -> Result<Option<Product>> {
    Ok(store.get_product(id).await?)
}

/// Every product, unordered. Intended for small catalogs.
pub async fn list_products<S: Store + ?Sized>(store: &S) -> Result<Vec<Product>> {
    Ok(store.list_products().await?)
}

fn candidate_ids(candidates: Vec<ProductCandidate>) -> Vec<String> {
    candidates.into_iter().map(|c| c.product_id).collect()
}

/// Load products for ranked ids, keeping order and skipping ids that
/// vanished between the ranking and the lookup.
async fn resolve_products<S: Store + ?Sized>(
    store: &S,
    ids: &[String],
    limit: usize,
) -> Result<Vec<Product>> {
    let mut products = Vec::with_capacity(ids.len().min(limit));
    for id in ids {
        if products.len() >= limit {
            break;
        }
        if let Some(product) = store.get_product(id).await? {
            products.push(product);
        }
    }
    Ok(products)
}
