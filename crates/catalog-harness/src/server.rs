//! HTTP server exposing the catalog tools.
//!
//! Every tool in the [`ToolRegistry`] is callable over a plain JSON API and
//! over MCP Streamable HTTP. Both paths go through [`AppState::invoke`], so
//! they share parameter validation, the per-call timeout and error
//! classification.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/tools/list` | List all registered tools with schemas |
//! | `POST` | `/tools/{name}` | Call a tool; body is its parameter object |
//! | `GET`  | `/health` | Health check (returns version) |
//! | `*`    | `/mcp` | MCP JSON-RPC endpoint ([`crate::mcp::McpBridge`]) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "get_product_summary: product summary not found: p9" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `timeout` (408),
//! `tool_error` (500).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};

use catalog_harness_core::store::Store;
use catalog_harness_core::CatalogError;

use crate::config::Config;
use crate::db;
use crate::mcp::McpBridge;
use crate::sqlite_store::SqliteStore;
use crate::tools::{ToolContext, ToolInfo, ToolRegistry};

/// Shared state for route handlers and MCP sessions.
#[derive(Clone)]
pub struct AppState {
    registry: Arc<ToolRegistry>,
    ctx: ToolContext,
    timeout: Duration,
}

impl AppState {
    pub fn new(config: Arc<Config>, store: Arc<dyn Store>) -> Self {
        let registry = ToolRegistry::with_builtins(&config);
        let timeout = Duration::from_secs(config.server.request_timeout_secs);
        Self {
            registry: Arc::new(registry),
            ctx: ToolContext::new(store, config),
            timeout,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Validate and run a tool, bounded by `[server].request_timeout_secs`.
    pub async fn invoke(&self, name: &str, params: Value) -> Result<Value, AppError> {
        debug!(tool = name, "tool call");
        let call = self.registry.call(name, params, &self.ctx);
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => {
                let err = classify_tool_error(name, e);
                if err.status.is_server_error() {
                    warn!(tool = name, error = %err.message, "tool call failed");
                }
                Err(err)
            }
            Err(_) => {
                warn!(tool = name, timeout_secs = self.timeout.as_secs(), "tool call timed out");
                Err(timeout_error(format!(
                    "{}: timed out after {}s",
                    name,
                    self.timeout.as_secs()
                )))
            }
        }
    }
}

/// Build the full router: JSON tool API, `/health` and `/mcp`.
pub fn router(state: AppState) -> Router {
    let bridge = McpBridge::new(state.clone());
    let mcp_service = StreamableHttpService::new(
        move || Ok(bridge.clone()),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig::default(),
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/tools/list", get(handle_list_tools))
        .route("/tools/{name}", post(handle_tool_call))
        .route("/health", get(handle_health))
        .nest_service("/mcp", mcp_service)
        .layer(cors)
        .with_state(state)
}

/// Connect to the configured database and serve until the process exits.
///
/// Used by `catalog serve mcp`.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    let store: Arc<dyn Store> = Arc::new(SqliteStore::new(pool, &config.containers));
    run_server_with_store(config, store).await
}

/// Serve with a caller-supplied store.
pub async fn run_server_with_store(config: &Config, store: Arc<dyn Store>) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let state = AppState::new(Arc::new(config.clone()), store);

    for t in state.registry().tools() {
        debug!(tool = t.name(), read_only = t.is_read_only(), "registered tool");
    }
    let tool_count = state.registry().len();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, tools = tool_count, "catalog server listening");
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// A tool failure carrying its HTTP status and machine-readable code.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

fn timeout_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::REQUEST_TIMEOUT,
        code: "timeout",
        message: message.into(),
    }
}

fn tool_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "tool_error",
        message: message.into(),
    }
}

/// Map a tool failure to a status by its [`CatalogError`] variant.
/// Anything that is not a `CatalogError` is a store or engine failure.
fn classify_tool_error(tool_name: &str, err: anyhow::Error) -> AppError {
    let message = format!("{}: {}", tool_name, err);
    match err.downcast_ref::<CatalogError>() {
        Some(CatalogError::NotFound { .. }) => not_found(message),
        Some(CatalogError::InvalidInput(_)) => bad_request(message),
        _ => tool_error(message),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /tools/list ============

#[derive(Serialize)]
struct ToolListResponse {
    tools: Vec<ToolInfo>,
}

async fn handle_list_tools(State(state): State<AppState>) -> Json<ToolListResponse> {
    Json(ToolListResponse {
        tools: state.registry().infos(),
    })
}

// ============ POST /tools/{name} ============

/// Returns `{"result": ...}` on success. Unknown tool and missing record
/// are `404`, parameter errors `400`, timeout `408`, store failures `500`.
async fn handle_tool_call(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(params): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let result = state.invoke(&name, params).await?;
    Ok(Json(serde_json::json!({ "result": result })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use catalog_harness_core::store::{ProductCandidate, TextField};
    use catalog_harness_core::{Product, ProductSummary};
    use serde_json::json;

    /// A store whose product scan never finishes in time.
    struct StalledStore;

    #[async_trait]
    impl Store for StalledStore {
        async fn upsert_product(&self, _product: &Product) -> anyhow::Result<()> {
            Ok(())
        }
        async fn get_product(&self, _id: &str) -> anyhow::Result<Option<Product>> {
            Ok(None)
        }
        async fn list_products(&self) -> anyhow::Result<Vec<Product>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Vec::new())
        }
        async fn text_search(
            &self,
            _terms: &[String],
            _field: TextField,
            _limit: usize,
        ) -> anyhow::Result<Vec<ProductCandidate>> {
            Ok(Vec::new())
        }
        async fn vector_search(
            &self,
            _query_vec: &[f32],
            _limit: usize,
        ) -> anyhow::Result<Vec<ProductCandidate>> {
            Ok(Vec::new())
        }
        async fn upsert_summary(&self, _summary: &ProductSummary) -> anyhow::Result<()> {
            Ok(())
        }
        async fn summaries_for_product(
            &self,
            _product_id: &str,
        ) -> anyhow::Result<Vec<ProductSummary>> {
            Ok(Vec::new())
        }
        async fn delete_summary(&self, _id: &str, _partition_key: &str) -> anyhow::Result<()> {
            Ok(())
        }
        async fn list_summaries(&self) -> anyhow::Result<Vec<ProductSummary>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_slow_tool_call_times_out() {
        let config: Config = toml::from_str(
            "[db]\npath = \"unused.sqlite\"\n\n[server]\nbind = \"127.0.0.1:0\"\nrequest_timeout_secs = 1\n",
        )
        .unwrap();
        let state = AppState::new(Arc::new(config), Arc::new(StalledStore));

        let started = std::time::Instant::now();
        let err = state.invoke("list_products", json!({})).await.unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(err.status, StatusCode::REQUEST_TIMEOUT);
        assert_eq!(err.code, "timeout");
        assert_eq!(err.message, "list_products: timed out after 1s");

        // Calls that don't touch the stalled scan still answer.
        let ok = state.invoke("list_product_summaries", json!({})).await.unwrap();
        assert_eq!(ok, json!({ "summaries": [] }));
    }

    #[test]
    fn test_classify_by_variant() {
        let err = classify_tool_error(
            "get_product_summary",
            CatalogError::summary_not_found("p9").into(),
        );
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.code, "not_found");
        assert_eq!(
            err.message,
            "get_product_summary: product summary not found: p9"
        );

        let err = classify_tool_error(
            "hybrid_search_products",
            CatalogError::InvalidInput("vectors must contain only numbers".into()).into(),
        );
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "bad_request");
    }

    #[test]
    fn test_store_failures_are_tool_errors() {
        let err = classify_tool_error(
            "list_products",
            anyhow::anyhow!("database is locked, record not found in cache"),
        );
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code, "tool_error");
    }
}
