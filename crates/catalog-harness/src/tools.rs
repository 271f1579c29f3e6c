//! Tool registry and the built-in catalog tools.
//!
//! Every operation an agent can call is a [`Tool`]: a name, a description,
//! a JSON Schema for its parameters, and an async handler. Tools are
//! collected into a [`ToolRegistry`] once at startup and shared by the HTTP
//! API and the MCP bridge.
//!
//! ```text
//! ┌───────────────────────────────────────────┐
//! │               ToolRegistry                │
//! │  hybrid_search_products   get_product_…   │
//! │  generate_product_summary  …              │
//! └──────────────┬────────────────────────────┘
//!                ▼
//!   ToolContext { store: Arc<dyn Store>, config }
//!                ▼
//!   catalog_harness_core::{search, summary}
//! ```
//!
//! Handlers receive parameters that already passed [`validate_params`]
//! (required keys present, JSON types checked, defaults injected).

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use catalog_harness_core::search::{self, SearchParams};
use catalog_harness_core::store::Store;
use catalog_harness_core::summary;
use catalog_harness_core::{CatalogError, Product, SummaryContent};

use crate::config::Config;

// ═══════════════════════════════════════════════════════════════════════
// Tool Trait
// ═══════════════════════════════════════════════════════════════════════

/// A named operation that agents can discover and call.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Route name (`POST /tools/{name}`) and MCP tool name.
    fn name(&self) -> &str;

    /// One-line description for agent discovery.
    fn description(&self) -> &str;

    /// Whether the tool leaves the record store untouched.
    fn is_read_only(&self) -> bool {
        true
    }

    /// JSON Schema (`type: "object"`) for the parameters.
    fn parameters_schema(&self) -> Value;

    /// Run the tool with validated parameters.
    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value>;
}

/// Serializable tool info for `GET /tools/list`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    #[serde(rename = "readOnly")]
    pub read_only: bool,
    pub parameters: Value,
}

impl ToolInfo {
    pub fn from_tool(tool: &dyn Tool) -> Self {
        Self {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            read_only: tool.is_read_only(),
            parameters: tool.parameters_schema(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// ToolContext
// ═══════════════════════════════════════════════════════════════════════

/// Dependencies handed to every tool invocation.
///
/// Built once at startup and shared; holds the record store handle and the
/// application config.
#[derive(Clone)]
pub struct ToolContext {
    store: Arc<dyn Store>,
    config: Arc<Config>,
}

impl ToolContext {
    pub fn new(store: Arc<dyn Store>, config: Arc<Config>) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn search_params(&self) -> SearchParams {
        SearchParams {
            candidate_k: self.config.retrieval.candidate_k,
            rrf_k: self.config.retrieval.rrf_k,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Parameter handling
// ═══════════════════════════════════════════════════════════════════════

/// Validate `params` against a tool's schema.
///
/// Checks required keys, JSON types and `enum` membership, and injects
/// `default` values for absent optional properties. A non-object `params`
/// is treated as an empty object.
pub fn validate_params(schema: &Value, params: &Value) -> Result<Value> {
    let params_obj = params.as_object().cloned().unwrap_or_default();

    let properties = schema
        .get("properties")
        .and_then(|p| p.as_object())
        .cloned()
        .unwrap_or_default();

    let required: Vec<&str> = schema
        .get("required")
        .and_then(|r| r.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default();

    for req_field in &required {
        if !params_obj.contains_key(*req_field) {
            bail!(CatalogError::InvalidInput(format!(
                "missing required parameter: {}",
                req_field
            )));
        }
    }

    let mut result = params_obj.clone();

    for (prop_name, prop_schema) in &properties {
        match params_obj.get(prop_name) {
            Some(value) => {
                if let Some(expected_type) = prop_schema.get("type").and_then(|t| t.as_str()) {
                    let type_ok = match expected_type {
                        "string" => value.is_string(),
                        "integer" => value.is_i64() || value.is_u64(),
                        "number" => value.is_number(),
                        "boolean" => value.is_boolean(),
                        "array" => value.is_array(),
                        "object" => value.is_object(),
                        _ => true,
                    };
                    if !type_ok {
                        bail!(CatalogError::InvalidInput(format!(
                            "parameter '{}' must be of type '{}', got {}",
                            prop_name,
                            expected_type,
                            json_type_name(value)
                        )));
                    }
                }

                if let Some(enum_values) = prop_schema.get("enum").and_then(|e| e.as_array()) {
                    if !enum_values.contains(value) {
                        bail!(CatalogError::InvalidInput(format!(
                            "parameter '{}' must be one of {:?}",
                            prop_name, enum_values
                        )));
                    }
                }
            }
            None => {
                if let Some(default) = prop_schema.get("default") {
                    result.insert(prop_name.clone(), default.clone());
                }
            }
        }
    }

    Ok(Value::Object(result))
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn str_param<'a>(params: &'a Value, key: &str) -> Result<&'a str> {
    let value = params[key].as_str().unwrap_or("");
    if value.trim().is_empty() {
        bail!(CatalogError::InvalidInput(format!("{} must not be empty", key)));
    }
    Ok(value)
}

/// A positive count; values beyond `usize::MAX` saturate.
fn limit_param(params: &Value, key: &str, default: usize) -> Result<usize> {
    let Some(value) = params.get(key) else {
        return Ok(default);
    };
    match value.as_u64() {
        Some(n) if n >= 1 => Ok(usize::try_from(n).unwrap_or(usize::MAX)),
        Some(_) => bail!(CatalogError::InvalidInput(format!(
            "{} must be >= 1, got {}",
            key, value
        ))),
        None if value.is_i64() => bail!(CatalogError::InvalidInput(format!(
            "{} must be >= 1, got {}",
            key, value
        ))),
        None => Ok(default),
    }
}

fn vector_param(params: &Value, key: &str) -> Result<Vec<f32>> {
    let items = params[key].as_array().map(Vec::as_slice).unwrap_or(&[]);
    items
        .iter()
        .map(|v| {
            v.as_f64().map(|f| f as f32).ok_or_else(|| {
                CatalogError::InvalidInput(format!("{} must contain only numbers", key)).into()
            })
        })
        .collect()
}

fn summary_content(params: &Value) -> SummaryContent<'_> {
    SummaryContent {
        title: params["title"].as_str().unwrap_or(""),
        short_description: params["shortDescription"].as_str().unwrap_or(""),
        marketing_copy: params["marketingCopy"].as_str().unwrap_or(""),
    }
}

fn products_json(products: &[Product]) -> Value {
    let stripped: Vec<Product> = products.iter().map(Product::without_embedding).collect();
    json!({ "products": stripped })
}

fn summary_content_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "productId": { "type": "string", "description": "Product identifier" },
            "title": { "type": "string", "description": description },
            "shortDescription": { "type": "string", "description": "One or two sentence description" },
            "marketingCopy": { "type": "string", "description": "Long-form marketing copy" }
        },
        "required": ["productId", "title", "shortDescription", "marketingCopy"]
    })
}

fn product_id_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "productId": { "type": "string", "description": "Product identifier" }
        },
        "required": ["productId"]
    })
}

// ═══════════════════════════════════════════════════════════════════════
// Built-in tools
// ═══════════════════════════════════════════════════════════════════════

/// Hybrid keyword + vector product search with a caller-supplied embedding.
pub struct HybridSearchProductsTool {
    default_limit: usize,
}

#[async_trait]
impl Tool for HybridSearchProductsTool {
    fn name(&self) -> &str {
        "hybrid_search_products"
    }

    fn description(&self) -> &str {
        "Search products by combining text relevance on description and tags with vector similarity"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "searchText": { "type": "string", "description": "Natural-language search text" },
                "vectors": {
                    "type": "array",
                    "items": { "type": "number" },
                    "description": "Embedding of searchText, same dimensionality as the catalog"
                },
                "maxResults": {
                    "type": "integer",
                    "description": "Maximum number of products",
                    "default": self.default_limit
                }
            },
            "required": ["searchText", "vectors"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let text = params["searchText"].as_str().unwrap_or("");
        let vectors = vector_param(&params, "vectors")?;
        let limit = limit_param(&params, "maxResults", self.default_limit)?;

        let products =
            search::hybrid_search(ctx.store(), text, &vectors, limit, &ctx.search_params()).await?;
        Ok(products_json(&products))
    }
}

/// Keyword-only product search over description and tags.
pub struct FullTextSearchProductsTool {
    default_limit: usize,
}

#[async_trait]
impl Tool for FullTextSearchProductsTool {
    fn name(&self) -> &str {
        "full_text_search_products"
    }

    fn description(&self) -> &str {
        "Search products whose description or tags contain any word of the search text"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "searchText": { "type": "string", "description": "Search words" },
                "maxResults": {
                    "type": "integer",
                    "description": "Maximum number of products",
                    "default": self.default_limit
                }
            },
            "required": ["searchText"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let text = params["searchText"].as_str().unwrap_or("");
        let limit = limit_param(&params, "maxResults", self.default_limit)?;
        let products = search::full_text_search(ctx.store(), text, limit).await?;
        Ok(products_json(&products))
    }
}

pub struct GetProductByIdTool;

#[async_trait]
impl Tool for GetProductByIdTool {
    fn name(&self) -> &str {
        "get_product_by_id"
    }

    fn description(&self) -> &str {
        "Retrieve a product by its identifier; returns null when it does not exist"
    }

    fn parameters_schema(&self) -> Value {
        product_id_schema()
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let id = str_param(&params, "productId")?;
        let product = search::get_product(ctx.store(), id).await?;
        Ok(serde_json::to_value(product.map(|p| p.without_embedding()))?)
    }
}

pub struct ListProductsTool;

#[async_trait]
impl Tool for ListProductsTool {
    fn name(&self) -> &str {
        "list_products"
    }

    fn description(&self) -> &str {
        "List every product in the catalog"
    }

    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _params: Value, ctx: &ToolContext) -> Result<Value> {
        let products = search::list_products(ctx.store()).await?;
        Ok(products_json(&products))
    }
}

pub struct GenerateProductSummaryTool;

#[async_trait]
impl Tool for GenerateProductSummaryTool {
    fn name(&self) -> &str {
        "generate_product_summary"
    }

    fn description(&self) -> &str {
        "Create a marketing summary for a product; key features, audience and use case are derived from the product"
    }

    fn is_read_only(&self) -> bool {
        false
    }

    fn parameters_schema(&self) -> Value {
        summary_content_schema("Summary title")
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let id = str_param(&params, "productId")?;
        let summary = summary::generate(ctx.store(), id, summary_content(&params)).await?;
        Ok(serde_json::to_value(summary)?)
    }
}

pub struct GetProductSummaryTool;

#[async_trait]
impl Tool for GetProductSummaryTool {
    fn name(&self) -> &str {
        "get_product_summary"
    }

    fn description(&self) -> &str {
        "Retrieve the marketing summary for a product; returns null when none exists"
    }

    fn parameters_schema(&self) -> Value {
        product_id_schema()
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let id = str_param(&params, "productId")?;
        Ok(serde_json::to_value(summary::get(ctx.store(), id).await?)?)
    }
}

pub struct UpdateProductSummaryTool;

#[async_trait]
impl Tool for UpdateProductSummaryTool {
    fn name(&self) -> &str {
        "update_product_summary"
    }

    fn description(&self) -> &str {
        "Replace the title, short description and marketing copy of an existing product summary"
    }

    fn is_read_only(&self) -> bool {
        false
    }

    fn parameters_schema(&self) -> Value {
        summary_content_schema("New summary title")
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let id = str_param(&params, "productId")?;
        let summary = summary::update(ctx.store(), id, summary_content(&params)).await?;
        Ok(serde_json::to_value(summary)?)
    }
}

pub struct DeleteProductSummaryTool;

#[async_trait]
impl Tool for DeleteProductSummaryTool {
    fn name(&self) -> &str {
        "delete_product_summary"
    }

    fn description(&self) -> &str {
        "Delete the marketing summary for a product; succeeds when none exists"
    }

    fn is_read_only(&self) -> bool {
        false
    }

    fn parameters_schema(&self) -> Value {
        product_id_schema()
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let id = str_param(&params, "productId")?;
        summary::delete(ctx.store(), id).await?;
        Ok(json!({ "deleted": true }))
    }
}

pub struct ListProductSummariesTool;

#[async_trait]
impl Tool for ListProductSummariesTool {
    fn name(&self) -> &str {
        "list_product_summaries"
    }

    fn description(&self) -> &str {
        "List every product marketing summary"
    }

    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _params: Value, ctx: &ToolContext) -> Result<Value> {
        let summaries = summary::list(ctx.store()).await?;
        Ok(json!({ "summaries": summaries }))
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════

/// Name → tool mapping, in registration order.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Registry with every built-in catalog tool.
    pub fn with_builtins(config: &Config) -> Self {
        let default_limit = config.retrieval.default_limit;
        let mut registry = Self::new();
        registry.register(Box::new(HybridSearchProductsTool { default_limit }));
        registry.register(Box::new(FullTextSearchProductsTool { default_limit }));
        registry.register(Box::new(GetProductByIdTool));
        registry.register(Box::new(ListProductsTool));
        registry.register(Box::new(GenerateProductSummaryTool));
        registry.register(Box::new(GetProductSummaryTool));
        registry.register(Box::new(UpdateProductSummaryTool));
        registry.register(Box::new(DeleteProductSummaryTool));
        registry.register(Box::new(ListProductSummariesTool));
        registry
    }

    /// Register a tool. A later tool with the same name replaces the
    /// earlier one.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(tool);
    }

    pub fn tools(&self) -> &[Box<dyn Tool>] {
        &self.tools
    }

    pub fn find(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    pub fn infos(&self) -> Vec<ToolInfo> {
        self.tools
            .iter()
            .map(|t| ToolInfo::from_tool(t.as_ref()))
            .collect()
    }

    /// Validate `params` against the tool's schema and run it.
    pub async fn call(&self, name: &str, params: Value, ctx: &ToolContext) -> Result<Value> {
        let tool = self
            .find(name)
            .ok_or_else(|| CatalogError::NotFound {
                kind: catalog_harness_core::RecordKind::Tool,
                id: name.to_string(),
            })?;
        let validated = validate_params(&tool.parameters_schema(), &params)?;
        tool.execute(validated, ctx).await
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_harness_core::store::memory::InMemoryStore;

    fn test_config() -> Config {
        toml::from_str("[db]\npath = \"unused.sqlite\"\n\n[server]\nbind = \"127.0.0.1:0\"\n")
            .unwrap()
    }

    async fn context() -> ToolContext {
        let store = InMemoryStore::new();
        store
            .upsert_product(&Product {
                id: "p1".into(),
                category_id: "c1".into(),
                category_name: "Mountain Bikes".into(),
                sku: "MB-1".into(),
                name: "Trail One".into(),
                description: "A rugged trail bike".into(),
                price: 1200.0,
                tags: vec!["trail".into(), "carbon".into(), "22-speed".into()],
                embedding: Some(vec![1.0, 0.0]),
            })
            .await
            .unwrap();
        ToolContext::new(Arc::new(store), Arc::new(test_config()))
    }

    #[test]
    fn test_validate_injects_defaults() {
        let schema = json!({
            "type": "object",
            "properties": {
                "q": { "type": "string" },
                "n": { "type": "integer", "default": 10 }
            },
            "required": ["q"]
        });
        let out = validate_params(&schema, &json!({ "q": "x" })).unwrap();
        assert_eq!(out["n"], 10);
    }

    #[test]
    fn test_validate_rejects_missing_and_wrong_type() {
        let schema = product_id_schema();
        let err = validate_params(&schema, &json!({})).unwrap_err();
        assert!(err.to_string().contains("missing required parameter: productId"));
        assert!(matches!(
            err.downcast_ref::<CatalogError>(),
            Some(CatalogError::InvalidInput(_))
        ));

        let err = validate_params(&schema, &json!({ "productId": 5 })).unwrap_err();
        assert!(err.to_string().contains("must be of type 'string'"));
    }

    #[test]
    fn test_registry_lists_declared_tools_in_order() {
        let registry = ToolRegistry::with_builtins(&test_config());
        let names: Vec<&str> = registry.tools().iter().map(|t| t.name()).collect();
        assert_eq!(
            names,
            vec![
                "hybrid_search_products",
                "full_text_search_products",
                "get_product_by_id",
                "list_products",
                "generate_product_summary",
                "get_product_summary",
                "update_product_summary",
                "delete_product_summary",
                "list_product_summaries",
            ]
        );
        let hybrid = registry.find("hybrid_search_products").unwrap();
        assert_eq!(hybrid.parameters_schema()["properties"]["maxResults"]["default"], 10);
    }

    #[tokio::test]
    async fn test_summary_lifecycle_through_registry() {
        let ctx = context().await;
        let registry = ToolRegistry::with_builtins(ctx.config());

        let created = registry
            .call(
                "generate_product_summary",
                json!({
                    "productId": "p1",
                    "title": "Trail Blazer",
                    "shortDescription": "A rugged ride.",
                    "marketingCopy": "Conquer any trail."
                }),
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(
            created["keyFeatures"],
            json!(["trail", "carbon", "22-speed", "Premium Quality", "Mountain Bikes Specialized"])
        );
        assert_eq!(created["targetAudience"], json!(["Professional Users", "Adventure Seekers"]));

        let fetched = registry
            .call("get_product_summary", json!({ "productId": "p1" }), &ctx)
            .await
            .unwrap();
        assert_eq!(fetched["id"], created["id"]);

        registry
            .call("delete_product_summary", json!({ "productId": "p1" }), &ctx)
            .await
            .unwrap();
        let fetched = registry
            .call("get_product_summary", json!({ "productId": "p1" }), &ctx)
            .await
            .unwrap();
        assert!(fetched.is_null());
    }

    #[tokio::test]
    async fn test_generate_for_missing_product_is_not_found() {
        let ctx = context().await;
        let registry = ToolRegistry::with_builtins(ctx.config());
        let err = registry
            .call(
                "generate_product_summary",
                json!({
                    "productId": "nope",
                    "title": "t",
                    "shortDescription": "s",
                    "marketingCopy": "m"
                }),
                &ctx,
            )
            .await
            .unwrap_err();
        let catalog_err = err.downcast_ref::<CatalogError>().unwrap();
        assert!(catalog_err.is_not_found());
    }

    #[tokio::test]
    async fn test_hybrid_search_omits_embeddings() {
        let ctx = context().await;
        let registry = ToolRegistry::with_builtins(ctx.config());
        let out = registry
            .call(
                "hybrid_search_products",
                json!({ "searchText": "trail", "vectors": [1.0, 0.0] }),
                &ctx,
            )
            .await
            .unwrap();
        let products = out["products"].as_array().unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0]["id"], "p1");
        assert!(products[0].get("embedding").is_none());
    }

    #[tokio::test]
    async fn test_get_product_missing_is_null() {
        let ctx = context().await;
        let registry = ToolRegistry::with_builtins(ctx.config());
        let out = registry
            .call("get_product_by_id", json!({ "productId": "ghost" }), &ctx)
            .await
            .unwrap();
        assert!(out.is_null());
    }

    #[tokio::test]
    async fn test_invalid_max_results() {
        let ctx = context().await;
        let registry = ToolRegistry::with_builtins(ctx.config());
        let err = registry
            .call(
                "full_text_search_products",
                json!({ "searchText": "trail", "maxResults": 0 }),
                &ctx,
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("maxResults must be >= 1"));
    }

    #[tokio::test]
    async fn test_huge_max_results_is_not_the_default() {
        let ctx = context().await;
        let config: Config = toml::from_str(
            "[db]\npath = \"unused.sqlite\"\n\n[retrieval]\ndefault_limit = 1\n\n[server]\nbind = \"127.0.0.1:0\"\n",
        )
        .unwrap();
        let registry = ToolRegistry::with_builtins(&config);
        for product in ["p2", "p3"] {
            let mut p = ctx.store().get_product("p1").await.unwrap().unwrap();
            p.id = product.to_string();
            ctx.store().upsert_product(&p).await.unwrap();
        }

        let out = registry
            .call(
                "full_text_search_products",
                json!({ "searchText": "trail", "maxResults": u64::MAX }),
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(out["products"].as_array().unwrap().len(), 3);

        let err = registry
            .call(
                "full_text_search_products",
                json!({ "searchText": "trail", "maxResults": -3 }),
                &ctx,
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("maxResults must be >= 1, got -3"));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let ctx = context().await;
        let registry = ToolRegistry::with_builtins(ctx.config());
        let err = registry.call("nope", json!({}), &ctx).await.unwrap_err();
        assert!(err.to_string().contains("tool not found: nope"));
    }
}
