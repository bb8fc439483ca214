pub mod component_docs;
pub mod health;
pub mod list_components;

use serde::de::DeserializeOwned;

use crate::manifest::{ComponentManifestMap, ManifestContext};
use crate::protocol::{
    ComponentDocsParams, InitializeParams, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
    ListComponentsParams, McpErrorCode, McpErrorResponse, RunStoryTestsParams, ToolCallParams,
    ToolResult,
};
use crate::state::AppState;

/// Dispatch a JSON-RPC request to the appropriate handler.
///
/// Returns `None` for notifications (no response required).
pub async fn dispatch(req: &JsonRpcRequest, state: &AppState) -> Option<JsonRpcResponse> {
    match req.method.as_str() {
        "initialize" => {
            let params: InitializeParams = req
                .params
                .as_ref()
                .and_then(|v| serde_json::from_value(v.clone()).ok())
                .unwrap_or_default();
            let client = params.client_info.as_ref().and_then(|c| c.name.as_deref());
            tracing::info!(client, protocol = params.protocol_version.as_deref(), "client initializing");

            let result = serde_json::json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": "mcp-component-server",
                    "version": env!("CARGO_PKG_VERSION")
                }
            });
            Some(JsonRpcResponse::success(req.id.clone(), result))
        }

        "notifications/initialized" => None,

        "notifications/cancelled" => {
            let cancelled = req.params.as_ref().and_then(|p| p.get("requestId"));
            tracing::debug!(?cancelled, "ignoring cancellation notice");
            None
        }

        "ping" => Some(JsonRpcResponse::success(req.id.clone(), serde_json::json!({}))),

        "tools/list" => Some(JsonRpcResponse::success(req.id.clone(), tool_list())),

        "tools/call" => {
            let params: ToolCallParams = match &req.params {
                Some(v) => match serde_json::from_value(v.clone()) {
                    Ok(p) => p,
                    Err(e) => {
                        return Some(JsonRpcResponse::error(
                            req.id.clone(),
                            JsonRpcError::invalid_params(format!("Invalid tools/call params: {e}")),
                        ));
                    }
                },
                None => {
                    return Some(JsonRpcResponse::error(
                        req.id.clone(),
                        JsonRpcError::invalid_params("Missing params for tools/call"),
                    ));
                }
            };

            let tool_result = dispatch_tool_call(&params, state).await;
            match serde_json::to_value(&tool_result) {
                Ok(result_json) => Some(JsonRpcResponse::success(req.id.clone(), result_json)),
                Err(e) => Some(JsonRpcResponse::error(
                    req.id.clone(),
                    JsonRpcError::internal_error(format!("Cannot encode tool result: {e}")),
                )),
            }
        }

        _ => Some(JsonRpcResponse::error(
            req.id.clone(),
            JsonRpcError::method_not_found(&req.method),
        )),
    }
}

async fn dispatch_tool_call(params: &ToolCallParams, state: &AppState) -> ToolResult {
    match params.name.as_str() {
        "list-all-components" => match parse_arguments::<ListComponentsParams>(params) {
            Ok(args) => list_components::handle(args, state).await,
            Err(err) => err,
        },

        "get-component-documentation" => match parse_arguments::<ComponentDocsParams>(params) {
            Ok(args) => component_docs::handle(args, state).await,
            Err(err) => err,
        },

        "run-story-tests" => match parse_arguments::<RunStoryTestsParams>(params) {
            Ok(args) => run_story_tests::handle(args, state).await,
            Err(err) => err,
        },

        "health" => health::handle(state).await,

        _ => ToolResult::error(format!("Unknown tool: {}", params.name)),
    }
}

/// Missing arguments are treated as `{}` so tools with only optional
/// parameters can be called bare.
fn parse_arguments<T: DeserializeOwned>(params: &ToolCallParams) -> Result<T, ToolResult> {
    let arguments = params
        .arguments
        .clone()
        .unwrap_or_else(|| serde_json::Value::Object(Default::default()));

    serde_json::from_value(arguments).map_err(|e| {
        McpErrorResponse::with_detail(
            McpErrorCode::InvalidArguments,
            format!("{}: {e}", params.name),
        )
        .into()
    })
}

/// Resolve a manifest within the configured tool timeout.
pub(crate) async fn resolve_manifest(
    state: &AppState,
    context: &ManifestContext,
) -> Result<ComponentManifestMap, McpErrorResponse> {
    let timeout = state.config.tool_timeout;
    match tokio::time::timeout(timeout, state.resolver.resolve(context)).await {
        Ok(Ok(manifest)) => Ok(manifest),
        Ok(Err(err)) => Err(err.into()),
        Err(_) => {
            tracing::warn!(source = ?context.source, "manifest resolution timed out after {} seconds", timeout.as_secs());
            Err(McpErrorResponse::with_detail(
                McpErrorCode::ManifestMissing,
                format!("timed out after {} seconds", timeout.as_secs()),
            ))
        }
    }
}

fn tool_list() -> serde_json::Value {
    let source = serde_json::json!({
        "type": "string",
        "description": "URL of a component manifest to use instead of the server's default"
    });

    serde_json::json!({
        "tools": [
            {
                "name": "list-all-components",
                "description": "List every documented UI component with its id, name and summary",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "source": source.clone()
                    }
                }
            },
            {
                "name": "get-component-documentation",
                "description": "Get documentation, import statement and story snippets for UI components",
                "inputSchema": {
                    "type": "object",
                    "required": ["componentIds"],
                    "properties": {
                        "componentIds": {
                            "type": "array",
                            "items": { "type": "string" },
                            "minItems": 1,
                            "description": "Component ids as returned by list-all-components"
                        },
                        "source": source.clone()
                    }
                }
            },
            {
                "name": "run-story-tests",
                "description": "Run component tests and accessibility checks for stories and report the results",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "storyIds": {
                            "type": "array",
                            "items": { "type": "string" },
                            "description": "Story ids to test; omit to run every story"
                        }
                    }
                }
            }
        ]
    })
}
