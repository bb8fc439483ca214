//! Line-oriented bridge to the external test runner.

use std::time::Duration;

use mcp_component_server::testrun::process::pump_responses;
use mcp_component_server::testrun::{
    ChannelError, PendingRuns, ProcessChannel, TestRunFailure, TestRunOutcome,
};

#[tokio::test]
async fn responses_are_routed_and_junk_is_skipped() {
    let pending = PendingRuns::new();
    let done = pending.register("r1").unwrap();
    let cancelled = pending.register("r3").unwrap();

    let stream = concat!(
        "not json at all\n",
        "\n",
        r#"{"type":"storybook/test/trigger-test-run-request","payload":{"requestId":"r9","actor":"agent"}}"#, "\n",
        r#"{"type":"storybook/test/trigger-test-run-response","payload":{"requestId":"r1","status":"completed","result":{"componentTestCount":{"success":2,"error":1},"a11yCount":{"success":1,"warning":1,"error":0},"componentTestStatuses":[],"a11yStatuses":[],"unhandledErrors":[]}}}"#, "\n",
        r#"{"type":"storybook/test/trigger-test-run-response","payload":{"requestId":"r1","status":"cancelled"}}"#, "\n",
        r#"{"type":"storybook/test/trigger-test-run-response","payload":{"requestId":"r3","status":"cancelled"}}"#, "\n",
    );
    pump_responses(stream.as_bytes(), &pending).await;

    match done.wait(Duration::from_secs(1)).await {
        Ok(TestRunOutcome::Completed(result)) => {
            assert_eq!(result.component_test_count.success, 2);
            assert_eq!(result.component_test_count.error, 1);
            assert_eq!(result.a11y_count.warning, 1);
        }
        other => panic!("expected completed outcome, got {other:?}"),
    }
    assert_eq!(
        cancelled.wait(Duration::from_secs(1)).await,
        Ok(TestRunOutcome::Cancelled)
    );
    assert_eq!(pending.pending_count(), 0);
}

#[tokio::test]
async fn malformed_response_reaches_its_waiter() {
    let pending = PendingRuns::new();
    let waiter = pending.register("r5").unwrap();

    let stream = concat!(
        r#"{"type":"storybook/test/trigger-test-run-response","payload":{"requestId":"r5","status":"error"}}"#,
        "\n"
    );
    pump_responses(stream.as_bytes(), &pending).await;

    assert!(matches!(
        waiter.wait(Duration::from_secs(1)).await,
        Err(TestRunFailure::ProtocolViolation { .. })
    ));
}

#[tokio::test]
async fn undecodable_result_reaches_its_waiter() {
    let pending = PendingRuns::new();
    let waiter = pending.register("r7").unwrap();

    let stream = concat!(
        r#"{"type":"storybook/test/trigger-test-run-response","payload":{"requestId":"r7","status":"completed","result":{"componentTestCount":{"success":0,"error":0},"a11yCount":{"success":0,"warning":0,"error":0},"componentTestStatuses":[{"storyId":"btn--primary","typeId":"storybook/component-test","value":"status-value:skipped","description":""}]}}}"#,
        "\n"
    );
    pump_responses(stream.as_bytes(), &pending).await;

    match waiter.wait(Duration::from_millis(200)).await {
        Err(TestRunFailure::ProtocolViolation { request_id, .. }) => assert_eq!(request_id, "r7"),
        other => panic!("expected protocol violation, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_status_reaches_its_waiter() {
    let pending = PendingRuns::new();
    let waiter = pending.register("r8").unwrap();

    let stream = concat!(
        r#"{"type":"storybook/test/trigger-test-run-response","payload":{"requestId":"r8","status":"aborted"}}"#,
        "\n"
    );
    pump_responses(stream.as_bytes(), &pending).await;

    assert!(matches!(
        waiter.wait(Duration::from_millis(200)).await,
        Err(TestRunFailure::ProtocolViolation { .. })
    ));
}

#[test]
fn empty_command_is_rejected() {
    let result = ProcessChannel::spawn("   ", PendingRuns::new());
    assert!(matches!(result, Err(ChannelError::EmptyCommand)));
}
