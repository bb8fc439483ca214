use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::error::TestRunFailure;
use super::protocol::{TriggerTestRunRequestPayload, TriggerTestRunResponsePayload};

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Test runner channel is closed")]
    Closed,
    #[error("Test runner command is empty")]
    EmptyCommand,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<ChannelError> for TestRunFailure {
    fn from(err: ChannelError) -> Self {
        Self::Channel(err.to_string())
    }
}

/// One message on the duplex channel shared with the test runner.
///
/// Encoded as `{"type": <event name>, "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ChannelEvent {
    #[serde(rename = "storybook/test/trigger-test-run-request")]
    TriggerTestRunRequest(TriggerTestRunRequestPayload),
    #[serde(rename = "storybook/test/trigger-test-run-response")]
    TriggerTestRunResponse(TriggerTestRunResponsePayload),
}

/// Outbound half of the channel: hands trigger requests to the runner.
/// Responses come back through [`super::PendingRuns::resolve`].
#[async_trait]
pub trait TestRunChannel: Send + Sync {
    async fn emit(&self, request: TriggerTestRunRequestPayload) -> Result<(), ChannelError>;
}

/// In-process channel backed by an unbounded queue.
pub struct QueueChannel {
    tx: mpsc::UnboundedSender<TriggerTestRunRequestPayload>,
}

impl QueueChannel {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TriggerTestRunRequestPayload>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl TestRunChannel for QueueChannel {
    async fn emit(&self, request: TriggerTestRunRequestPayload) -> Result<(), ChannelError> {
        self.tx.send(request).map_err(|_| ChannelError::Closed)
    }
}
