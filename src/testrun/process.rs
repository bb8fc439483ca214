//! Bridge to an external test-runner process.
//!
//! The child reads one [`ChannelEvent`] per line on stdin and writes one per
//! line on stdout. Its stderr is inherited.

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::Mutex;

use super::channel::{ChannelError, ChannelEvent, TestRunChannel};
use super::protocol::TriggerTestRunRequestPayload;
use super::registry::PendingRuns;

pub struct ProcessChannel {
    stdin: Mutex<ChildStdin>,
    _child: Child,
}

impl ProcessChannel {
    /// Spawn `command_line` (whitespace-separated program and arguments) and
    /// start feeding its responses into `pending`. Must be called inside a
    /// tokio runtime.
    pub fn spawn(command_line: &str, pending: Arc<PendingRuns>) -> Result<Self, ChannelError> {
        let mut parts = command_line.split_whitespace();
        let program = parts.next().ok_or(ChannelError::EmptyCommand)?;

        let mut child = Command::new(program)
            .args(parts)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child.stdin.take().ok_or(ChannelError::Closed)?;
        let stdout = child.stdout.take().ok_or(ChannelError::Closed)?;

        tracing::info!(program, "test runner started");
        tokio::spawn(async move {
            pump_responses(BufReader::new(stdout), &pending).await;
            let failed = pending.fail_all("test runner exited");
            if failed > 0 {
                tracing::warn!(failed, "test runner exited with runs in flight");
            }
        });

        Ok(Self {
            stdin: Mutex::new(stdin),
            _child: child,
        })
    }
}

#[async_trait]
impl TestRunChannel for ProcessChannel {
    async fn emit(&self, request: TriggerTestRunRequestPayload) -> Result<(), ChannelError> {
        let mut line = serde_json::to_vec(&ChannelEvent::TriggerTestRunRequest(request))?;
        line.push(b'\n');

        let mut stdin = self.stdin.lock().await;
        stdin.write_all(&line).await?;
        stdin.flush().await?;
        Ok(())
    }
}

/// Read response events line by line until EOF and route them to waiters.
///
/// Bad lines are logged and skipped.
pub async fn pump_responses<R>(reader: R, pending: &PendingRuns)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => route_line(&line, pending),
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "cannot read from test runner");
                break;
            }
        }
    }
}

fn route_line(line: &str, pending: &PendingRuns) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    match serde_json::from_str::<ChannelEvent>(line) {
        Ok(ChannelEvent::TriggerTestRunResponse(response)) => {
            // Violations are already logged by the registry.
            let _ = pending.resolve(response);
        }
        Ok(ChannelEvent::TriggerTestRunRequest(request)) => {
            tracing::debug!(request_id = %request.request_id, "ignoring echoed trigger request");
        }
        Err(e) => {
            tracing::warn!(error = %e, "unparseable test runner message");
        }
    }
}
