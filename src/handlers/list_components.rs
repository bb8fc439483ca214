use serde::Serialize;

use crate::manifest::ManifestContext;
use crate::protocol::{ListComponentsParams, McpErrorCode, McpErrorResponse, ToolResult};
use crate::state::AppState;

use super::resolve_manifest;

#[derive(Debug, Serialize)]
struct ListComponentsResponse {
    components: Vec<ComponentEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ComponentEntry {
    id: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
    story_count: usize,
}

/// Handle a `list-all-components` tool call.
///
/// Results are sorted by component id for determinism.
pub async fn handle(params: ListComponentsParams, state: &AppState) -> ToolResult {
    let context = ManifestContext {
        source: params.source,
    };
    let manifest = match resolve_manifest(state, &context).await {
        Ok(m) => m,
        Err(err) => return err.into(),
    };

    // BTreeMap iteration is already ordered by id.
    let components = manifest
        .components
        .values()
        .map(|c| ComponentEntry {
            id: c.id.clone(),
            name: c.name().to_string(),
            summary: c.summary.clone(),
            story_count: c.stories().len(),
        })
        .collect();

    match serde_json::to_string(&ListComponentsResponse { components }) {
        Ok(json) => ToolResult::text(json),
        Err(e) => {
            tracing::error!(error = %e, "serialization failed");
            McpErrorResponse::canonical(McpErrorCode::InternalError).into()
        }
    }
}
