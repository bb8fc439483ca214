use crate::manifest::{docs, ManifestContext};
use crate::protocol::{ComponentDocsParams, McpErrorCode, McpErrorResponse, ToolResult};
use crate::state::AppState;

use super::resolve_manifest;

/// Handle a `get-component-documentation` tool call.
///
/// Renders the requested components as Markdown, in request order with
/// duplicates dropped. Any unknown id fails the whole call.
pub async fn handle(params: ComponentDocsParams, state: &AppState) -> ToolResult {
    let mut ids: Vec<String> = Vec::with_capacity(params.component_ids.len());
    for id in params.component_ids {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    if ids.is_empty() {
        return McpErrorResponse::with_detail(
            McpErrorCode::InvalidArguments,
            "componentIds must not be empty",
        )
        .into();
    }

    let context = ManifestContext {
        source: params.source,
    };
    let manifest = match resolve_manifest(state, &context).await {
        Ok(m) => m,
        Err(err) => return err.into(),
    };

    let unknown: Vec<&str> = ids
        .iter()
        .filter(|id| manifest.get(id).is_none())
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        return McpErrorResponse::with_detail(McpErrorCode::UnknownComponent, unknown.join(", ")).into();
    }

    let components = ids.iter().filter_map(|id| manifest.get(id));
    ToolResult::text(docs::render_components(components))
}
