//! Trigger-test-run protocol: request/response shapes, correlation by
//! request id, and the coordinator the tool layer calls.

pub mod channel;
pub mod coordinator;
pub mod error;
pub mod process;
pub mod protocol;
pub mod registry;

pub use channel::{ChannelError, ChannelEvent, QueueChannel, TestRunChannel};
pub use coordinator::RunCoordinator;
pub use error::TestRunFailure;
pub use process::ProcessChannel;
pub use protocol::{
    A11yCount, StatusValue, StoryStatus, TestCount, TestRunErrorInfo, TestRunOutcome,
    TestRunResult, TestRunStatus, TriggerTestRunRequestPayload, TriggerTestRunResponsePayload,
    UnhandledError, TRIGGER_TEST_RUN_REQUEST, TRIGGER_TEST_RUN_RESPONSE,
};
pub use registry::{Delivery, PendingRun, PendingRuns};
