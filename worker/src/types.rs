//! Public types consumed by the linter bridge and the CLI.
//!
//! Callers construct a [`WorkerConfig`], observe [`SupervisorState`] and
//! receive [`SupervisorEvent`]s.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::codec::DEFAULT_MAX_FRAME_BYTES;

const DEFAULT_RESTART_DELAY_MS: u64 = 1000;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 2000;

fn default_restart_delay_ms() -> u64 {
    DEFAULT_RESTART_DELAY_MS
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

fn default_shutdown_grace_ms() -> u64 {
    DEFAULT_SHUTDOWN_GRACE_MS
}

fn default_max_frame_bytes() -> usize {
    DEFAULT_MAX_FRAME_BYTES
}

/// How to launch and supervise the worker process.
///
/// ```toml
/// [worker]
/// command = "lintd-stub-worker"
/// restart_delay_ms = 1000
/// request_timeout_ms = 30000
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Executable, resolved through `PATH` when not a path.
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Cooldown between a crash and the respawn.
    #[serde(default = "default_restart_delay_ms")]
    pub restart_delay_ms: u64,
    /// Per-request deadline. `0` waits indefinitely.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// How long `stop()` waits for the worker to exit after closing its stdin.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
    /// Pass the worker's stderr through instead of discarding it.
    #[serde(default)]
    pub inherit_stderr: bool,
}

impl WorkerConfig {
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            restart_delay_ms: DEFAULT_RESTART_DELAY_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            shutdown_grace_ms: DEFAULT_SHUTDOWN_GRACE_MS,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            inherit_stderr: false,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_restart_delay(mut self, delay: Duration) -> Self {
        self.restart_delay_ms = delay.as_millis() as u64;
        self
    }

    /// `None` waits indefinitely.
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout_ms = timeout.map_or(0, |t| t.as_millis() as u64);
        self
    }

    #[must_use]
    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }

    #[must_use]
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

/// Lifecycle of the supervised worker.
///
/// `Starting → Running → Crashed → Restarting → Running → … → ShuttingDown → Stopped`.
/// Jobs are only dispatched in `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupervisorState {
    Starting,
    Running,
    Crashed,
    Restarting,
    ShuttingDown,
    Stopped,
}

impl SupervisorState {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Crashed => "crashed",
            Self::Restarting => "restarting",
            Self::ShuttingDown => "shutting down",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Why a worker's output stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// The worker closed its stdout.
    Exited,
    /// Reading from the worker failed.
    Failed(String),
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited => f.write_str("worker exited"),
            Self::Failed(msg) => write!(f, "worker stream failed: {msg}"),
        }
    }
}

/// Lifecycle notifications published by the supervisor.
///
/// Delivery is fire-and-forget; a slow or absent subscriber never delays a restart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorEvent {
    Started {
        generation: u64,
        pid: Option<u32>,
    },
    /// The worker died unexpectedly; `rejected` pending jobs failed with `WorkerCrashed`.
    Crashed {
        generation: u64,
        reason: ExitReason,
        rejected: usize,
    },
    Restarted {
        generation: u64,
        pid: Option<u32>,
    },
    /// Respawning failed; another attempt follows after the restart delay.
    RestartFailed { error: String },
    Stopped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_config_defaults() {
        let config: WorkerConfig =
            serde_json::from_value(serde_json::json!({"command": "eslint-worker"})).unwrap();
        assert_eq!(config.command, "eslint-worker");
        assert!(config.args.is_empty());
        assert_eq!(config.restart_delay(), Duration::from_millis(1000));
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.max_frame_bytes, DEFAULT_MAX_FRAME_BYTES);
        assert!(!config.inherit_stderr);
    }

    #[test]
    fn test_zero_timeout_waits_indefinitely() {
        let config: WorkerConfig = serde_json::from_value(serde_json::json!({
            "command": "w",
            "request_timeout_ms": 0
        }))
        .unwrap();
        assert_eq!(config.request_timeout(), None);
    }

    #[test]
    fn test_builder_round_trips_durations() {
        let config = WorkerConfig::new("w")
            .with_args(["--stdio"])
            .with_restart_delay(Duration::from_millis(250))
            .with_request_timeout(Some(Duration::from_millis(1500)));
        assert_eq!(config.args, vec!["--stdio"]);
        assert_eq!(config.restart_delay(), Duration::from_millis(250));
        assert_eq!(config.request_timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(config.with_request_timeout(None).request_timeout(), None);
    }

    #[test]
    fn test_state_labels() {
        assert_eq!(SupervisorState::Running.to_string(), "running");
        assert_eq!(SupervisorState::ShuttingDown.to_string(), "shutting down");
    }
}
