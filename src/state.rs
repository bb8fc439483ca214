use std::sync::Arc;

use crate::config::ServerConfig;
use crate::manifest::{HttpFetcher, ManifestResolver};
use crate::testrun::{PendingRuns, ProcessChannel, RunCoordinator};

/// Everything a tool call needs, built once at startup.
pub struct AppState {
    pub config: ServerConfig,
    pub resolver: ManifestResolver,
    /// `None` when no test runner is configured.
    pub runner: Option<RunCoordinator>,
}

impl AppState {
    pub fn new(config: ServerConfig, resolver: ManifestResolver, runner: Option<RunCoordinator>) -> Self {
        Self {
            config,
            resolver,
            runner,
        }
    }

    /// Wire up the HTTP fetcher and, if configured, the test-runner process.
    ///
    /// Spawns the runner, so it must be called inside a tokio runtime.
    pub fn from_config(config: ServerConfig) -> Result<Self, String> {
        let fetcher = HttpFetcher::new(config.tool_timeout).map_err(|e| e.to_string())?;
        let resolver = ManifestResolver::new(Arc::new(fetcher), config.default_manifest.clone());

        let runner = match &config.test_runner_cmd {
            Some(cmd) => {
                let pending = PendingRuns::new();
                let channel = ProcessChannel::spawn(cmd, Arc::clone(&pending))
                    .map_err(|e| format!("cannot start test runner {cmd:?}: {e}"))?;
                Some(RunCoordinator::new(Arc::new(channel), pending))
            }
            None => {
                tracing::info!("no test runner configured; run-story-tests is unavailable");
                None
            }
        };

        Ok(Self::new(config, resolver, runner))
    }
}
