//! Integration tests for the component and test-run tool handlers.
//!
//! Tests exercise the handler functions directly with a test AppState, and
//! verify the full dispatch flow for tool calls.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use mcp_component_server::config::ServerConfig;
use mcp_component_server::handlers;
use mcp_component_server::manifest::{HttpFetcher, ManifestResolver};
use mcp_component_server::protocol::{
    ComponentDocsParams, JsonRpcRequest, ListComponentsParams, RpcId, RunStoryTestsParams,
};
use mcp_component_server::server::McpServer;
use mcp_component_server::state::AppState;
use mcp_component_server::testrun::{
    A11yCount, PendingRuns, QueueChannel, RunCoordinator, TestCount, TestRunResult,
    TriggerTestRunRequestPayload, TriggerTestRunResponsePayload, UnhandledError,
};
use serde_json::Value;
use tokio::sync::mpsc::UnboundedReceiver;

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/manifest.json")
}

fn test_config(default_manifest: Option<&Path>) -> ServerConfig {
    ServerConfig {
        default_manifest: default_manifest.map(Path::to_path_buf),
        tool_timeout: Duration::from_secs(30),
        test_run_timeout: Duration::from_secs(10),
        test_runner_cmd: None,
        actor: "handler-tests".to_string(),
    }
}

fn test_state(
    default_manifest: Option<&Path>,
) -> (Arc<AppState>, UnboundedReceiver<TriggerTestRunRequestPayload>) {
    let config = test_config(default_manifest);
    let fetcher = HttpFetcher::new(config.tool_timeout).unwrap();
    let resolver = ManifestResolver::new(Arc::new(fetcher), config.default_manifest.clone());

    let (channel, requests) = QueueChannel::new();
    let runner = RunCoordinator::new(Arc::new(channel), PendingRuns::new());

    (Arc::new(AppState::new(config, resolver, Some(runner))), requests)
}

fn tool_error(text: &str) -> Value {
    let value: Value = serde_json::from_str(text).unwrap();
    value["error"].clone()
}

// ---------------------------------------------------------------------------
// list-all-components
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_components_from_default_manifest() {
    let (state, _requests) = test_state(Some(&fixture_path()));

    let result = handlers::list_components::handle(ListComponentsParams::default(), &state).await;
    assert!(!result.is_error, "list-all-components should succeed");

    let value: Value = serde_json::from_str(&result.content[0].text).unwrap();
    let components = value["components"].as_array().unwrap();

    assert_eq!(components.len(), 2);
    assert_eq!(components[0]["id"], "button");
    assert_eq!(components[0]["name"], "Button");
    assert_eq!(components[0]["summary"], "Primary action trigger.");
    assert_eq!(components[0]["storyCount"], 2);
    assert_eq!(components[1]["id"], "card");
    assert!(components[1].get("summary").is_none());
}

#[tokio::test]
async fn list_components_deterministic() {
    let (state, _requests) = test_state(Some(&fixture_path()));

    let a = handlers::list_components::handle(ListComponentsParams::default(), &state).await;
    let b = handlers::list_components::handle(ListComponentsParams::default(), &state).await;

    assert_eq!(
        a.content[0].text, b.content[0].text,
        "list-all-components must produce byte-identical output across runs"
    );
}

#[tokio::test]
async fn list_components_without_any_manifest() {
    let (state, _requests) = test_state(None);

    let result = handlers::list_components::handle(ListComponentsParams::default(), &state).await;
    assert!(result.is_error);
    assert_eq!(tool_error(&result.content[0].text)["code"], "manifest_missing");
}

#[tokio::test]
async fn list_components_with_unusable_source_url() {
    let (state, _requests) = test_state(Some(&fixture_path()));
    let params = ListComponentsParams {
        source: Some("file:///etc/manifest.json".to_string()),
    };

    let result = handlers::list_components::handle(params, &state).await;
    assert!(result.is_error);
    assert_eq!(tool_error(&result.content[0].text)["code"], "invalid_arguments");
}

#[tokio::test]
async fn list_components_with_malformed_manifest() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("manifest.json");
    std::fs::write(&path, r#"{"v":1,"components":{"a":{"id":"a"}}}"#).unwrap();

    let (state, _requests) = test_state(Some(&path));
    let result = handlers::list_components::handle(ListComponentsParams::default(), &state).await;

    assert!(result.is_error);
    let error = tool_error(&result.content[0].text);
    assert_eq!(error["code"], "manifest_invalid");
    assert!(error["message"].as_str().unwrap().contains("/components/a"));
}

// ---------------------------------------------------------------------------
// get-component-documentation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn component_docs_render_stories_in_order() {
    let (state, _requests) = test_state(Some(&fixture_path()));
    let params = ComponentDocsParams {
        component_ids: vec!["button".to_string()],
        source: None,
    };

    let result = handlers::component_docs::handle(params, &state).await;
    assert!(!result.is_error);

    let text = &result.content[0].text;
    assert!(text.starts_with("# Button\n"));
    assert!(text.contains("import { Button } from '@acme/ui';"));
    assert!(text.contains("- @since: 1.2.0"));
    assert!(text.contains("- @deprecated: false"));
    assert!(!text.contains("@summary"), "summary tag is shown as a paragraph instead");

    let primary = text.find("### Primary").unwrap();
    let disabled = text.find("### Disabled").unwrap();
    assert!(primary < disabled);
    assert!(text.contains("<Button disabled>Save</Button>"));
    assert!(!text.contains("variant\": {"), "props are not rendered");
}

#[tokio::test]
async fn component_docs_keep_summary_tag_without_summary_field() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("manifest.json");
    let manifest = serde_json::json!({
        "v": 1,
        "components": {
            "badge": {
                "id": "badge",
                "name": "Badge",
                "jsDocTags": [{ "key": "summary", "value": "Only here" }]
            }
        }
    });
    std::fs::write(&path, manifest.to_string()).unwrap();

    let (state, _requests) = test_state(Some(&path));
    let params = ComponentDocsParams {
        component_ids: vec!["badge".to_string()],
        source: None,
    };

    let result = handlers::component_docs::handle(params, &state).await;
    assert!(!result.is_error);
    assert!(result.content[0].text.contains("- @summary: Only here"));
}

#[tokio::test]
async fn component_docs_for_several_components() {
    let (state, _requests) = test_state(Some(&fixture_path()));
    let params = ComponentDocsParams {
        component_ids: vec!["card".into(), "button".into(), "card".into()],
        source: None,
    };

    let result = handlers::component_docs::handle(params, &state).await;
    assert!(!result.is_error);

    let text = &result.content[0].text;
    assert_eq!(text.matches("# Card\n").count(), 1, "duplicates are dropped");
    assert!(text.find("# Card").unwrap() < text.find("# Button").unwrap());
    assert!(text.contains("\n---\n"));
}

#[tokio::test]
async fn component_docs_unknown_id() {
    let (state, _requests) = test_state(Some(&fixture_path()));
    let params = ComponentDocsParams {
        component_ids: vec!["button".into(), "tooltip".into()],
        source: None,
    };

    let result = handlers::component_docs::handle(params, &state).await;
    assert!(result.is_error);

    let error = tool_error(&result.content[0].text);
    assert_eq!(error["code"], "unknown_component");
    assert!(error["message"].as_str().unwrap().ends_with("tooltip"));
}

#[tokio::test]
async fn component_docs_requires_ids() {
    let (state, _requests) = test_state(Some(&fixture_path()));
    let params = ComponentDocsParams {
        component_ids: vec![],
        source: None,
    };

    let result = handlers::component_docs::handle(params, &state).await;
    assert!(result.is_error);
    assert_eq!(tool_error(&result.content[0].text)["code"], "invalid_arguments");
}

// ---------------------------------------------------------------------------
// run-story-tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn run_story_tests_reports_runner_result() {
    let (state, mut requests) = test_state(Some(&fixture_path()));

    let caller = Arc::clone(&state);
    let call = tokio::spawn(async move {
        let params = RunStoryTestsParams {
            story_ids: Some(vec!["button--primary".into()]),
        };
        handlers::run_story_tests::handle(params, &caller).await
    });

    let request = requests.recv().await.unwrap();
    assert_eq!(request.actor, "handler-tests");

    let result = TestRunResult {
        component_test_count: TestCount { success: 1, error: 0 },
        a11y_count: A11yCount { success: 0, warning: 1, error: 0 },
        unhandled_errors: vec![UnhandledError {
            message: Some("ResizeObserver loop limit exceeded".into()),
            ..Default::default()
        }],
        ..Default::default()
    };
    state
        .runner
        .as_ref()
        .unwrap()
        .handle_response(TriggerTestRunResponsePayload::completed(request.request_id, result))
        .unwrap();

    let tool_result = call.await.unwrap();
    assert!(!tool_result.is_error);

    let value: Value = serde_json::from_str(&tool_result.content[0].text).unwrap();
    assert_eq!(value["status"], "failed", "unhandled errors count as failures");
    assert_eq!(value["componentTestCount"]["success"], 1);
    assert_eq!(value["a11yCount"]["warning"], 1);
    assert_eq!(
        value["unhandledErrors"][0]["message"],
        "ResizeObserver loop limit exceeded"
    );
}

#[tokio::test]
async fn run_story_tests_runner_error_is_passed_through() {
    let (state, mut requests) = test_state(None);

    let caller = Arc::clone(&state);
    let call = tokio::spawn(async move {
        handlers::run_story_tests::handle(RunStoryTestsParams::default(), &caller).await
    });

    let request = requests.recv().await.unwrap();
    assert!(request.story_ids.is_none());
    state
        .runner
        .as_ref()
        .unwrap()
        .handle_response(TriggerTestRunResponsePayload::errored(
            request.request_id,
            "No test files found",
        ))
        .unwrap();

    let tool_result = call.await.unwrap();
    assert!(tool_result.is_error);
    let error = tool_error(&tool_result.content[0].text);
    assert_eq!(error["code"], "test_run_failed");
    assert!(error["message"].as_str().unwrap().ends_with("No test files found"));
}

#[tokio::test]
async fn run_story_tests_cancelled() {
    let (state, mut requests) = test_state(None);

    let caller = Arc::clone(&state);
    let call = tokio::spawn(async move {
        handlers::run_story_tests::handle(RunStoryTestsParams::default(), &caller).await
    });

    let request = requests.recv().await.unwrap();
    state.runner.as_ref().unwrap().cancel(&request.request_id);

    let tool_result = call.await.unwrap();
    assert_eq!(tool_error(&tool_result.content[0].text)["code"], "test_run_cancelled");
}

#[tokio::test]
async fn run_story_tests_without_runner() {
    let config = test_config(None);
    let fetcher = HttpFetcher::new(config.tool_timeout).unwrap();
    let resolver = ManifestResolver::new(Arc::new(fetcher), None);
    let state = AppState::new(config, resolver, None);

    let result = handlers::run_story_tests::handle(RunStoryTestsParams::default(), &state).await;
    assert!(result.is_error);
    assert_eq!(tool_error(&result.content[0].text)["code"], "runner_unavailable");
}

// ---------------------------------------------------------------------------
// dispatch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dispatch_tools_list_advertises_all_tools() {
    let (state, _requests) = test_state(None);

    let req = JsonRpcRequest {
        jsonrpc: "2.0".into(),
        id: Some(RpcId::Number(1)),
        method: "tools/list".into(),
        params: None,
    };

    let response = handlers::dispatch(&req, &state).await.unwrap();
    let result = response.result.unwrap();
    let tools = result["tools"].as_array().unwrap();

    let tool_names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();

    assert!(tool_names.contains(&"list-all-components"));
    assert!(tool_names.contains(&"get-component-documentation"));
    assert!(tool_names.contains(&"run-story-tests"));
    assert_eq!(tools.len(), 3, "Should advertise exactly 3 tools");
}

#[tokio::test]
async fn dispatch_list_components_via_tools_call() {
    let (state, _requests) = test_state(Some(&fixture_path()));

    // Bare call: no arguments at all.
    let req = JsonRpcRequest {
        jsonrpc: "2.0".into(),
        id: Some(RpcId::Number(2)),
        method: "tools/call".into(),
        params: Some(serde_json::json!({ "name": "list-all-components" })),
    };

    let response = handlers::dispatch(&req, &state).await.unwrap();
    let result = response.result.unwrap();

    let text = result["content"][0]["text"].as_str().unwrap();
    let parsed: Value = serde_json::from_str(text).unwrap();
    assert_eq!(parsed["components"].as_array().unwrap().len(), 2);
    assert!(result.get("isError").is_none());
}

#[tokio::test]
async fn dispatch_rejects_bad_arguments() {
    let (state, _requests) = test_state(Some(&fixture_path()));

    let req = JsonRpcRequest {
        jsonrpc: "2.0".into(),
        id: Some(RpcId::Str("docs".into())),
        method: "tools/call".into(),
        params: Some(serde_json::json!({
            "name": "get-component-documentation",
            "arguments": { "componentIds": "button" }
        })),
    };

    let response = handlers::dispatch(&req, &state).await.unwrap();
    let result = response.result.unwrap();
    assert_eq!(result["isError"], true);

    let text = result["content"][0]["text"].as_str().unwrap();
    assert_eq!(tool_error(text)["code"], "invalid_arguments");
}

#[tokio::test]
async fn dispatch_cancel_notification_gets_no_reply() {
    let (state, _requests) = test_state(Some(&fixture_path()));

    let req = JsonRpcRequest {
        jsonrpc: "2.0".into(),
        id: None,
        method: "notifications/cancelled".into(),
        params: Some(serde_json::json!({ "requestId": 3, "reason": "user aborted" })),
    };

    assert!(handlers::dispatch(&req, &state).await.is_none());
}

#[tokio::test]
async fn dispatch_health() {
    let (state, _requests) = test_state(Some(&fixture_path()));

    let req = JsonRpcRequest {
        jsonrpc: "2.0".into(),
        id: Some(RpcId::Number(4)),
        method: "tools/call".into(),
        params: Some(serde_json::json!({ "name": "health", "arguments": {} })),
    };

    let response = handlers::dispatch(&req, &state).await.unwrap();
    let text = response.result.unwrap()["content"][0]["text"].as_str().unwrap().to_string();
    let parsed: Value = serde_json::from_str(&text).unwrap();

    assert_eq!(parsed["status"], "ok");
    assert_eq!(parsed["testRunner"], true);
    assert_eq!(parsed["runsInFlight"], 0);
}

#[tokio::test]
async fn server_enforces_initialize_handshake() {
    let (state, _requests) = test_state(Some(&fixture_path()));
    let state = Arc::try_unwrap(state).ok().unwrap();
    let mut server = McpServer::new(state);

    let input = concat!(
        r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#, "\n",
        r#"{"jsonrpc":"2.0","id":2,"method":"initialize","params":{"protocolVersion":"2024-11-05","clientInfo":{"name":"test"}}}"#, "\n",
        r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#, "\n",
        "{ broken\n",
        r#"{"jsonrpc":"2.0","id":3,"method":"ping"}"#, "\n",
    );
    let mut output = Vec::new();
    server.serve(input.as_bytes(), &mut output).await.unwrap();

    let lines: Vec<Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0]["id"], 1);
    assert_eq!(lines[0]["error"]["code"], -32600);
    assert_eq!(lines[1]["result"]["serverInfo"]["name"], "mcp-component-server");
    assert_eq!(lines[2]["error"]["code"], -32700);
    assert_eq!(lines[3]["id"], 3);
    assert!(lines[3]["result"].is_object());
}
