use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use super::channel::TestRunChannel;
use super::error::TestRunFailure;
use super::protocol::{TestRunOutcome, TestRunResult, TriggerTestRunRequestPayload, TriggerTestRunResponsePayload};
use super::registry::{Delivery, PendingRuns};

/// Triggers test runs and waits for their correlated results.
///
/// Any number of runs may be in flight; each is keyed by a fresh request id.
pub struct RunCoordinator {
    channel: Arc<dyn TestRunChannel>,
    pending: Arc<PendingRuns>,
}

impl RunCoordinator {
    pub fn new(channel: Arc<dyn TestRunChannel>, pending: Arc<PendingRuns>) -> Self {
        Self { channel, pending }
    }

    /// Run the tests of `story_ids` (all stories when `None`) and return the
    /// runner's result exactly as reported.
    pub async fn run_tests(
        &self,
        actor: &str,
        story_ids: Option<Vec<String>>,
        timeout: Duration,
    ) -> Result<TestRunResult, TestRunFailure> {
        let request_id = Uuid::new_v4().to_string();

        // Registered before emitting so an immediate response has a waiter.
        let waiter = self.pending.register(request_id.clone())?;

        let request = TriggerTestRunRequestPayload {
            request_id: request_id.clone(),
            actor: actor.to_string(),
            story_ids,
        };
        tracing::info!(
            %request_id,
            actor,
            stories = request.story_ids.as_ref().map(Vec::len),
            "triggering test run"
        );
        self.channel.emit(request).await?;

        match waiter.wait(timeout).await? {
            TestRunOutcome::Completed(result) => {
                tracing::info!(
                    %request_id,
                    tests_failed = result.component_test_count.error,
                    a11y_failed = result.a11y_count.error,
                    unhandled = result.unhandled_errors.len(),
                    "test run completed"
                );
                Ok(result)
            }
            TestRunOutcome::Error(error) => Err(TestRunFailure::Error {
                request_id,
                message: error.message,
            }),
            TestRunOutcome::Cancelled => Err(TestRunFailure::Cancelled { request_id }),
        }
    }

    /// Feed a response received from the runner.
    pub fn handle_response(
        &self,
        response: TriggerTestRunResponsePayload,
    ) -> Result<Delivery, TestRunFailure> {
        self.pending.resolve(response)
    }

    /// Translate an external abort of `request_id` into a cancelled outcome.
    pub fn cancel(&self, request_id: &str) -> Delivery {
        self.pending.cancel(request_id)
    }

    pub fn in_flight(&self) -> usize {
        self.pending.pending_count()
    }
}
