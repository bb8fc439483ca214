use serde_json::json;

use crate::protocol::ToolResult;
use crate::state::AppState;

/// Liveness plus what the server is wired to.
pub async fn handle(state: &AppState) -> ToolResult {
    let body = json!({
        "status": "ok",
        "defaultManifest": state.config.default_manifest.is_some(),
        "testRunner": state.runner.is_some(),
        "runsInFlight": state.runner.as_ref().map_or(0, |r| r.in_flight()),
    });
    ToolResult::text(body.to_string())
}
