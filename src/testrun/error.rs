use std::time::Duration;

/// Why a test run produced no result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TestRunFailure {
    /// The runner reported `status=error`.
    #[error("Test run failed: {message}")]
    Error { request_id: String, message: String },
    #[error("Test run {request_id} was cancelled")]
    Cancelled { request_id: String },
    #[error("Test run {request_id} timed out after {}s", elapsed.as_secs())]
    Timeout { request_id: String, elapsed: Duration },
    #[error("Protocol violation for {request_id}: {detail}")]
    ProtocolViolation { request_id: String, detail: String },
    /// The trigger could not be handed to the runner.
    #[error("Test runner channel error: {0}")]
    Channel(String),
}

impl TestRunFailure {
    /// Cancellation and timeout say nothing about the tests themselves.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Cancelled { .. } | Self::Timeout { .. })
    }
}
