//! Message shapes of the trigger-test-run exchange.
//!
//! On the wire a response is a loose record (`status` plus optional `result`
//! and `error`), kept as raw JSON until it has been correlated. Inside the
//! crate it is a [`TestRunOutcome`], converted on receipt; bodies that do not
//! decode or do not fit the status never get past that conversion.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::TestRunFailure;

pub const TRIGGER_TEST_RUN_REQUEST: &str = "storybook/test/trigger-test-run-request";
pub const TRIGGER_TEST_RUN_RESPONSE: &str = "storybook/test/trigger-test-run-response";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerTestRunRequestPayload {
    pub request_id: String,
    pub actor: String,
    /// `None` runs every story; `Some(vec![])` runs none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestRunStatus {
    Completed,
    Error,
    Cancelled,
}

impl TestRunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        }
    }
}

/// A response as it arrives: only `requestId` is required to be well formed,
/// so that any response for a pending request can reach its waiter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerTestRunResponsePayload {
    pub request_id: String,
    #[serde(default)]
    pub status: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl TriggerTestRunResponsePayload {
    pub fn completed(request_id: impl Into<String>, result: TestRunResult) -> Self {
        TestRunOutcome::Completed(result).into_payload(request_id)
    }

    pub fn errored(request_id: impl Into<String>, message: impl Into<String>) -> Self {
        TestRunOutcome::Error(TestRunErrorInfo {
            message: message.into(),
            stack: None,
        })
        .into_payload(request_id)
    }

    pub fn cancelled(request_id: impl Into<String>) -> Self {
        TestRunOutcome::Cancelled.into_payload(request_id)
    }

    /// The declared status, if it is one of the known values.
    pub fn status(&self) -> Option<TestRunStatus> {
        TestRunStatus::deserialize(&self.status).ok()
    }

    /// Check the status/body contract and convert to the tagged form.
    ///
    /// Any body that does not decode is a protocol violation.
    pub fn into_outcome(self) -> Result<TestRunOutcome, TestRunFailure> {
        let request_id = self.request_id;
        let violation = |detail: String| TestRunFailure::ProtocolViolation {
            request_id: request_id.clone(),
            detail,
        };

        let status = TestRunStatus::deserialize(&self.status)
            .map_err(|_| violation(format!("unknown status {}", self.status)))?;

        match (status, self.result, self.error) {
            (TestRunStatus::Completed, Some(result), None) => TestRunResult::deserialize(result)
                .map(TestRunOutcome::Completed)
                .map_err(|e| violation(format!("malformed result: {e}"))),
            (TestRunStatus::Error, None, Some(error)) => TestRunErrorInfo::deserialize(error)
                .map(TestRunOutcome::Error)
                .map_err(|e| violation(format!("malformed error: {e}"))),
            // A cancelled run carries nothing meaningful; stray bodies are ignored.
            (TestRunStatus::Cancelled, _, _) => Ok(TestRunOutcome::Cancelled),
            (TestRunStatus::Completed, None, _) => {
                Err(violation("status completed without a result".to_string()))
            }
            (TestRunStatus::Completed, Some(_), Some(_)) => {
                Err(violation("status completed with an error".to_string()))
            }
            (TestRunStatus::Error, _, None) => Err(violation("status error without an error".to_string())),
            (TestRunStatus::Error, Some(_), Some(_)) => {
                Err(violation("status error with a result".to_string()))
            }
        }
    }
}

/// Terminal state of one run, as delivered to its waiter.
#[derive(Debug, Clone, PartialEq)]
pub enum TestRunOutcome {
    Completed(TestRunResult),
    Error(TestRunErrorInfo),
    Cancelled,
}

impl TestRunOutcome {
    pub fn status(&self) -> TestRunStatus {
        match self {
            Self::Completed(_) => TestRunStatus::Completed,
            Self::Error(_) => TestRunStatus::Error,
            Self::Cancelled => TestRunStatus::Cancelled,
        }
    }

    pub fn into_payload(self, request_id: impl Into<String>) -> TriggerTestRunResponsePayload {
        let status = Value::from(self.status().as_str());
        let (result, error) = match self {
            Self::Completed(result) => (serde_json::to_value(result).ok(), None),
            Self::Error(error) => (None, serde_json::to_value(error).ok()),
            Self::Cancelled => (None, None),
        };
        TriggerTestRunResponsePayload {
            request_id: request_id.into(),
            status,
            result,
            error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRunErrorInfo {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRunResult {
    pub component_test_count: TestCount,
    pub a11y_count: A11yCount,
    #[serde(default)]
    pub component_test_statuses: Vec<StoryStatus>,
    #[serde(default)]
    pub a11y_statuses: Vec<StoryStatus>,
    /// Failures the runner could not attribute to a story. Passed through as-is.
    #[serde(default)]
    pub unhandled_errors: Vec<UnhandledError>,
}

impl TestRunResult {
    pub fn has_failures(&self) -> bool {
        self.component_test_count.error > 0
            || self.a11y_count.error > 0
            || !self.unhandled_errors.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCount {
    pub success: u64,
    pub error: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct A11yCount {
    pub success: u64,
    pub warning: u64,
    pub error: u64,
}

/// Status of one check type for one story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryStatus {
    pub story_id: String,
    pub type_id: String,
    pub value: StatusValue,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusValue {
    #[serde(rename = "status-value:pending")]
    Pending,
    #[serde(rename = "status-value:success")]
    Success,
    #[serde(rename = "status-value:error")]
    Error,
    #[serde(rename = "status-value:warning")]
    Warning,
    #[serde(rename = "status-value:unknown")]
    Unknown,
}

/// A raw error record from the test runner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnhandledError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(rename = "VITEST_TEST_PATH", default, skip_serializing_if = "Option::is_none")]
    pub test_path: Option<String>,
    #[serde(rename = "VITEST_TEST_NAME", default, skip_serializing_if = "Option::is_none")]
    pub test_name: Option<String>,
    /// Any other fields the runner attached.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
