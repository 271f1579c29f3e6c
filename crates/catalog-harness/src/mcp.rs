//! MCP JSON-RPC protocol bridge.
//!
//! Exposes the [`ToolRegistry`](crate::tools::ToolRegistry) as MCP tools over
//! Streamable HTTP at `/mcp`, so agent hosts can discover and call the
//! catalog tools with the standard protocol. Calls are dispatched through
//! [`AppState::invoke`] and share its timeout and error mapping; a failed
//! call becomes an MCP tool result with `is_error` set and the
//! `{"error": {code, message}}` body as text.

use std::borrow::Cow;
use std::sync::Arc;

use rmcp::model::*;
use rmcp::{ErrorData as McpError, ServerHandler};

use crate::server::AppState;

/// Per-session MCP handler. Cloning is cheap; every session shares the
/// same registry and store.
#[derive(Clone)]
pub struct McpBridge {
    state: AppState,
}

impl McpBridge {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Convert a catalog tool into an rmcp `Tool` descriptor.
    fn to_mcp_tool(tool: &dyn crate::tools::Tool) -> Tool {
        let input_schema: Arc<serde_json::Map<String, serde_json::Value>> =
            match tool.parameters_schema() {
                serde_json::Value::Object(map) => Arc::new(map),
                _ => Arc::new(serde_json::Map::new()),
            };

        let annotations = ToolAnnotations::new().read_only(tool.is_read_only());

        Tool {
            name: Cow::Owned(tool.name().to_string()),
            title: None,
            description: Some(Cow::Owned(tool.description().to_string())),
            input_schema,
            output_schema: None,
            annotations: Some(annotations),
            execution: None,
            icons: None,
            meta: None,
        }
    }
}

impl ServerHandler for McpBridge {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "catalog-harness".to_string(),
                title: Some("Catalog Harness".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Product catalog tools. Use full_text_search_products or \
                 hybrid_search_products to find products, get_product_by_id for \
                 details, and the *_product_summary tools to manage marketing summaries."
                    .to_string(),
            ),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let tools: Vec<Tool> = self
            .state
            .registry()
            .tools()
            .iter()
            .map(|t| Self::to_mcp_tool(t.as_ref()))
            .collect();
        std::future::ready(Ok(ListToolsResult::with_all_items(tools)))
    }

    fn get_tool(&self, name: &str) -> Option<Tool> {
        self.state.registry().find(name).map(Self::to_mcp_tool)
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        if self.state.registry().find(&request.name).is_none() {
            return Err(McpError::new(
                ErrorCode::METHOD_NOT_FOUND,
                format!("no tool registered with name: {}", request.name),
                None,
            ));
        }

        let params = request
            .arguments
            .map(serde_json::Value::Object)
            .unwrap_or(serde_json::Value::Object(serde_json::Map::new()));

        match self.state.invoke(&request.name, params).await {
            Ok(result) => {
                let text = serde_json::to_string_pretty(&result).unwrap_or_default();
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(e) => {
                let body = serde_json::json!({
                    "error": { "code": e.code, "message": e.message }
                });
                Ok(CallToolResult::error(vec![Content::text(body.to_string())]))
            }
        }
    }
}
