//! Product summary lifecycle and derived-field rules.
//!
//! A summary carries three caller-authored fields (title, short description,
//! marketing copy) and three fields derived from the associated product:
//!
//! | Field | Rule |
//! |-------|------|
//! | `keyFeatures` | first three tags + price label + `"<category> Specialized"` |
//! | `targetAudience` | price audience + first matching category audience |
//! | `useCase` | first matching category sentence, or a generic fallback |
//!
//! Price tiers are strict (`> 1000`, `> 500`). Category matches are
//! case-insensitive substring tests evaluated in table order.
//!
//! When several summaries exist for one product id, the one with the most
//! recent `updatedAt` wins (ties: greatest id). Get, update and delete all
//! resolve the summary this way.

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{CatalogError, Result};
use crate::models::{Product, ProductSummary, SummaryContent};
use crate::store::Store;

/// Price tiers, highest first: `(exclusive lower bound, feature, audience)`.
const PRICE_TIERS: &[(f64, &str, &str)] = &[
    (1000.0, "Premium Quality", "Professional Users"),
    (500.0, "Professional Grade", "Enthusiasts"),
];

const BASE_TIER: (&str, &str) = ("Great Value", "Beginners");

/// Category rules in priority order: `(needle, audience, use case)`.
const CATEGORY_RULES: &[(&str, &str, &str)] = &[
    (
        "mountain",
        "Adventure Seekers",
        "Perfect for off-road adventures, trail riding, and mountain biking excursions.",
    ),
    (
        "road",
        "Speed Enthusiasts",
        "Ideal for road cycling, long-distance rides, and competitive racing.",
    ),
    (
        "city",
        "Urban Commuters",
        "Designed for daily commuting, urban errands, and city riding.",
    ),
];

const GENERIC_USE_CASE: &str =
    "Versatile design suitable for various cycling activities and terrains.";

/// Number of leading tags copied into `keyFeatures`.
const FEATURED_TAGS: usize = 3;

fn price_tier(price: f64) -> (&'static str, &'static str) {
    PRICE_TIERS
        .iter()
        .find(|(floor, _, _)| price > *floor)
        .map(|(_, feature, audience)| (*feature, *audience))
        .unwrap_or(BASE_TIER)
}

fn category_rule(category_name: &str) -> Option<&'static (&'static str, &'static str, &'static str)> {
    let lowered = category_name.to_lowercase();
    CATEGORY_RULES
        .iter()
        .find(|(needle, _, _)| lowered.contains(needle))
}

fn push_unique(out: &mut Vec<String>, value: &str) {
    if !out.iter().any(|v| v == value) {
        out.push(value.to_string());
    }
}

/// Key features: first three tags, price label, category label; deduplicated.
pub fn derive_key_features(product: &Product) -> Vec<String> {
    let mut features = Vec::with_capacity(FEATURED_TAGS + 2);
    for tag in product.tags.iter().take(FEATURED_TAGS) {
        push_unique(&mut features, tag);
    }
    push_unique(&mut features, price_tier(product.price).0);
    push_unique(
        &mut features,
        &format!("{} Specialized", product.category_name),
    );
    features
}

/// Target audience: price audience plus at most one category audience.
pub fn derive_target_audience(product: &Product) -> Vec<String> {
    let mut audience = Vec::with_capacity(2);
    push_unique(&mut audience, price_tier(product.price).1);
    if let Some((_, label, _)) = category_rule(&product.category_name) {
        push_unique(&mut audience, label);
    }
    audience
}

pub fn derive_use_case(product: &Product) -> String {
    category_rule(&product.category_name)
        .map(|(_, _, sentence)| *sentence)
        .unwrap_or(GENERIC_USE_CASE)
        .to_string()
}

/// Pick the summary that represents a product when duplicates exist.
fn most_recent(mut summaries: Vec<ProductSummary>) -> Option<ProductSummary> {
    summaries.sort_by(|a, b| {
        b.updated_at
            .cmp(&a.updated_at)
            .then_with(|| b.id.cmp(&a.id))
    });
    summaries.into_iter().next()
}

async fn require_product<S: Store + ?Sized>(store: &S, product_id: &str) -> Result<Product> {
    store
        .get_product(product_id)
        .await?
        .ok_or_else(|| CatalogError::product_not_found(product_id))
}

/// Create and persist a new summary for an existing product.
///
/// Fails with [`CatalogError::NotFound`] if the product does not exist, in
/// which case nothing is written.
pub async fn generate<S: Store + ?Sized>(
    store: &S,
    product_id: &str,
    content: SummaryContent<'_>,
) -> Result<ProductSummary> {
    let product = require_product(store, product_id).await?;
    let now = Utc::now();

    let summary = ProductSummary {
        id: Uuid::new_v4().to_string(),
        product_id: product.id.clone(),
        title: content.title.to_string(),
        short_description: content.short_description.to_string(),
        marketing_copy: content.marketing_copy.to_string(),
        key_features: derive_key_features(&product),
        target_audience: derive_target_audience(&product),
        use_case: derive_use_case(&product),
        created_at: now,
        updated_at: now,
    };

    store.upsert_summary(&summary).await?;
    info!(summary_id = %summary.id, product_id, "generated product summary");
    Ok(summary)
}

/// The current summary for a product, or `None`.
pub async fn get<S: Store + ?Sized>(store: &S, product_id: &str) -> Result<Option<ProductSummary>> {
    let summaries = store.summaries_for_product(product_id).await?;
    if summaries.len() > 1 {
        debug!(
            product_id,
            count = summaries.len(),
            "multiple summaries for product, using most recent"
        );
    }
    Ok(most_recent(summaries))
}

/// Overwrite the authored fields of an existing summary and recompute the
/// derived ones from the current product.
///
/// `id` and `createdAt` are preserved; `updatedAt` never moves backwards.
pub async fn update<S: Store + ?Sized>(
    store: &S,
    product_id: &str,
    content: SummaryContent<'_>,
) -> Result<ProductSummary> {
    let existing = get(store, product_id)
        .await?
        .ok_or_else(|| CatalogError::summary_not_found(product_id))?;
    let product = require_product(store, product_id).await?;

    let summary = ProductSummary {
        title: content.title.to_string(),
        short_description: content.short_description.to_string(),
        marketing_copy: content.marketing_copy.to_string(),
        key_features: derive_key_features(&product),
        target_audience: derive_target_audience(&product),
        use_case: derive_use_case(&product),
        updated_at: Utc::now().max(existing.updated_at),
        ..existing
    };

    store.upsert_summary(&summary).await?;
    info!(summary_id = %summary.id, product_id, "updated product summary");
    Ok(summary)
}

/// Remove the current summary for a product. Succeeds when there is none.
pub async fn delete<S: Store + ?Sized>(store: &S, product_id: &str) -> Result<()> {
    match get(store, product_id).await? {
        Some(existing) => {
            store
                .delete_summary(&existing.id, &existing.product_id)
                .await?;
            info!(summary_id = %existing.id, product_id, "deleted product summary");
        }
        None => debug!(product_id, "no summary to delete"),
    }
    Ok(())
}

/// Every summary, unordered.
pub async fn list<S: Store + ?Sized>(store: &S) -> Result<Vec<ProductSummary>> {
    Ok(store.list_summaries().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;
    use chrono::Duration;

    fn product(id: &str, category: &str, price: f64, tags: &[&str]) -> Product {
        Product {
            id: id.to_string(),
            category_id: "cat".to_string(),
            category_name: category.to_string(),
            sku: "SKU".to_string(),
            name: "Bike".to_string(),
            description: "A bike".to_string(),
            price,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            embedding: None,
        }
    }

    fn content<'a>(title: &'a str) -> SummaryContent<'a> {
        SummaryContent {
            title,
            short_description: "A rugged ride.",
            marketing_copy: "Conquer any trail.",
        }
    }

    #[test]
    fn test_mountain_scenario() {
        let p = product("p1", "Mountain Bikes", 1200.0, &["trail", "carbon", "22-speed"]);
        assert_eq!(
            derive_key_features(&p),
            vec![
                "trail",
                "carbon",
                "22-speed",
                "Premium Quality",
                "Mountain Bikes Specialized"
            ]
        );
        assert_eq!(
            derive_target_audience(&p),
            vec!["Professional Users", "Adventure Seekers"]
        );
        assert_eq!(
            derive_use_case(&p),
            "Perfect for off-road adventures, trail riding, and mountain biking excursions."
        );
    }

    #[test]
    fn test_price_boundaries_are_strict() {
        let at_1000 = product("p", "Touring", 1000.0, &[]);
        assert!(derive_key_features(&at_1000).contains(&"Professional Grade".to_string()));
        assert_eq!(derive_target_audience(&at_1000), vec!["Enthusiasts"]);

        let at_500 = product("p", "Touring", 500.0, &[]);
        assert!(derive_key_features(&at_500).contains(&"Great Value".to_string()));
        assert_eq!(derive_target_audience(&at_500), vec!["Beginners"]);

        let above = product("p", "Touring", 1000.01, &[]);
        assert!(derive_key_features(&above).contains(&"Premium Quality".to_string()));
    }

    #[test]
    fn test_only_first_three_tags_and_dedup() {
        let p = product("p", "Road Bikes", 100.0, &["aero", "aero", "light", "fast", "red"]);
        assert_eq!(
            derive_key_features(&p),
            vec!["aero", "light", "Great Value", "Road Bikes Specialized"]
        );

        // A tag equal to a derived label collapses into one entry.
        let p = product("p", "Road Bikes", 100.0, &["Great Value"]);
        assert_eq!(
            derive_key_features(&p),
            vec!["Great Value", "Road Bikes Specialized"]
        );
    }

    #[test]
    fn test_key_features_shape_with_three_distinct_tags() {
        let p = product("p", "Kids", 50.0, &["small", "safe", "bright", "bell"]);
        let features = derive_key_features(&p);
        assert_eq!(features.len(), 5);
        assert_eq!(&features[..3], &["small", "safe", "bright"]);
    }

    #[test]
    fn test_category_priority_and_case() {
        let p = product("p", "city ROAD mountain hybrids", 10.0, &[]);
        assert_eq!(derive_target_audience(&p), vec!["Beginners", "Adventure Seekers"]);

        let p = product("p", "ROAD bikes", 10.0, &[]);
        assert_eq!(derive_target_audience(&p), vec!["Beginners", "Speed Enthusiasts"]);
        assert!(derive_use_case(&p).starts_with("Ideal for road cycling"));

        let p = product("p", "Citybikes", 10.0, &[]);
        assert_eq!(derive_target_audience(&p), vec!["Beginners", "Urban Commuters"]);

        let p = product("p", "Accessories", 10.0, &[]);
        assert_eq!(derive_target_audience(&p), vec!["Beginners"]);
        assert_eq!(derive_use_case(&p), GENERIC_USE_CASE);
    }

    #[tokio::test]
    async fn test_generate_then_get() {
        let store = InMemoryStore::new();
        store
            .upsert_product(&product("p1", "Mountain Bikes", 1200.0, &["trail"]))
            .await
            .unwrap();

        let first = generate(&store, "p1", content("Trail Blazer")).await.unwrap();
        let fetched = get(&store, "p1").await.unwrap().unwrap();
        assert_eq!(fetched.product_id, "p1");
        assert_eq!(fetched.title, "Trail Blazer");
        assert_eq!(fetched.short_description, "A rugged ride.");
        assert_eq!(fetched.marketing_copy, "Conquer any trail.");
        assert!(!first.id.is_empty());
        assert_eq!(first.created_at, first.updated_at);

        let second = generate(&store, "p1", content("Again")).await.unwrap();
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_generate_missing_product_persists_nothing() {
        let store = InMemoryStore::new();
        let err = generate(&store, "ghost", content("x")).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("ghost"));
        assert!(list(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_preserves_identity_and_recomputes() {
        let store = InMemoryStore::new();
        store
            .upsert_product(&product("p1", "Mountain Bikes", 1200.0, &["trail"]))
            .await
            .unwrap();
        let created = generate(&store, "p1", content("v1")).await.unwrap();

        // Product data changes after generation.
        store
            .upsert_product(&product("p1", "City Bikes", 300.0, &["basket"]))
            .await
            .unwrap();

        let updated = update(
            &store,
            "p1",
            SummaryContent {
                title: "v2",
                short_description: "new short",
                marketing_copy: "new copy",
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(updated.title, "v2");
        assert_eq!(
            updated.key_features,
            vec!["basket", "Great Value", "City Bikes Specialized"]
        );
        assert_eq!(updated.target_audience, vec!["Beginners", "Urban Commuters"]);
        assert_eq!(list(&store).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_requires_summary_and_product() {
        let store = InMemoryStore::new();
        store
            .upsert_product(&product("p1", "Road", 100.0, &[]))
            .await
            .unwrap();
        let err = update(&store, "p1", content("x")).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().starts_with("product summary not found"));

        // Summary exists but the product it points to does not.
        let orphan = ProductSummary {
            id: "s-orphan".into(),
            product_id: "gone".into(),
            title: "t".into(),
            short_description: "s".into(),
            marketing_copy: "m".into(),
            key_features: vec![],
            target_audience: vec![],
            use_case: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        store.upsert_summary(&orphan).await.unwrap();
        let err = update(&store, "gone", content("x")).await.unwrap_err();
        assert!(err.to_string().starts_with("product not found"));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = InMemoryStore::new();
        delete(&store, "nobody").await.unwrap();
        assert!(get(&store, "nobody").await.unwrap().is_none());

        store
            .upsert_product(&product("p1", "Road", 100.0, &[]))
            .await
            .unwrap();
        generate(&store, "p1", content("x")).await.unwrap();
        delete(&store, "p1").await.unwrap();
        assert!(get(&store, "p1").await.unwrap().is_none());
        delete(&store, "p1").await.unwrap();
    }

    #[tokio::test]
    async fn test_get_prefers_most_recent_duplicate() {
        let store = InMemoryStore::new();
        let base = Utc::now();
        let mut older = ProductSummary {
            id: "z-old".into(),
            product_id: "p1".into(),
            title: "old".into(),
            short_description: String::new(),
            marketing_copy: String::new(),
            key_features: vec![],
            target_audience: vec![],
            use_case: String::new(),
            created_at: base,
            updated_at: base,
        };
        store.upsert_summary(&older).await.unwrap();
        older.id = "a-new".into();
        older.title = "new".into();
        older.updated_at = base + Duration::seconds(5);
        store.upsert_summary(&older).await.unwrap();

        assert_eq!(get(&store, "p1").await.unwrap().unwrap().title, "new");
    }
}
