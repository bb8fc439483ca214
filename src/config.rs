use std::path::PathBuf;
use std::time::Duration;

/// Default timeout for manifest tools and fetches (30 seconds).
const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 30;

/// Default deadline for a whole test run (5 minutes).
const DEFAULT_TEST_RUN_TIMEOUT_SECS: u64 = 300;

const DEFAULT_ACTOR: &str = "mcp-component-server";

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub default_manifest: Option<PathBuf>,
    pub tool_timeout: Duration,
    pub test_run_timeout: Duration,
    pub test_runner_cmd: Option<String>,
    pub actor: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            default_manifest: None,
            tool_timeout: Duration::from_secs(DEFAULT_TOOL_TIMEOUT_SECS),
            test_run_timeout: Duration::from_secs(DEFAULT_TEST_RUN_TIMEOUT_SECS),
            test_runner_cmd: None,
            actor: DEFAULT_ACTOR.to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment.
    ///
    /// - `COMPONENT_MANIFEST_PATH` (optional): default manifest used when a tool call names no `source`
    /// - `COMPONENT_TOOL_TIMEOUT_SECS` (optional, default 30): max seconds per manifest tool call
    /// - `COMPONENT_TEST_RUN_TIMEOUT_SECS` (optional, default 300): max seconds to wait for a test run
    /// - `COMPONENT_TEST_RUNNER_CMD` (optional): test-runner bridge command line
    /// - `COMPONENT_TEST_ACTOR` (optional): actor recorded on trigger requests
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        let default_manifest = non_empty_var("COMPONENT_MANIFEST_PATH").map(PathBuf::from);
        let tool_timeout = secs_var("COMPONENT_TOOL_TIMEOUT_SECS", defaults.tool_timeout)?;
        let test_run_timeout = secs_var("COMPONENT_TEST_RUN_TIMEOUT_SECS", defaults.test_run_timeout)?;

        Ok(Self {
            default_manifest,
            tool_timeout,
            test_run_timeout,
            test_runner_cmd: non_empty_var("COMPONENT_TEST_RUNNER_CMD"),
            actor: non_empty_var("COMPONENT_TEST_ACTOR").unwrap_or(defaults.actor),
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn secs_var(name: &str, default: Duration) -> Result<Duration, String> {
    match std::env::var(name) {
        Ok(val) => match val.parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
            _ => Err(format!("{name} must be a positive integer")),
        },
        Err(_) => Ok(default),
    }
}
