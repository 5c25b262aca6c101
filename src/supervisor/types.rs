use super::error::SupervisorError;
use crate::unit::UnitExit;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_GRACEFUL_SHUTDOWN: Duration = Duration::from_secs(30);
pub const DEFAULT_STOP_WAIT: Duration = Duration::from_secs(35);

fn default_true() -> bool {
    true
}

/// Static description of one worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub name: String,
    pub port: u16,
    /// Handler artifact served by this worker.
    pub artifact_path: PathBuf,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Adds `GET /health` unless the handler declares its own.
    #[serde(default = "default_true")]
    pub health_check: bool,
    #[serde(default)]
    pub prefix: Option<String>,
    /// Exposed to the handler through the request's worker identity.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl WorkerConfig {
    pub fn new(name: impl Into<String>, port: u16, artifact_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            port,
            artifact_path: artifact_path.into(),
            enabled: true,
            health_check: true,
            prefix: None,
            env: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Starting,
    Running,
    Stopped,
    Error,
}

impl WorkerStatus {
    pub fn can_transition_to(self, next: WorkerStatus) -> bool {
        matches!(
            (self, next),
            (WorkerStatus::Starting, WorkerStatus::Running)
                | (WorkerStatus::Starting, WorkerStatus::Error)
                | (WorkerStatus::Running, WorkerStatus::Stopped)
        )
    }
}

/// Live state of a worker that has been started at least once.
#[derive(Debug, Clone)]
pub struct WorkerRecord {
    pub status: WorkerStatus,
    pub port: u16,
    pub started_at: Instant,
    pub running_since: Option<Instant>,
}

impl WorkerRecord {
    pub fn starting(port: u16) -> Self {
        Self {
            status: WorkerStatus::Starting,
            port,
            started_at: Instant::now(),
            running_since: None,
        }
    }

    pub fn transition(&mut self, next: WorkerStatus) -> Result<(), SupervisorError> {
        if !self.status.can_transition_to(next) {
            return Err(SupervisorError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }

        if next == WorkerStatus::Running {
            self.running_since = Some(Instant::now());
        }
        self.status = next;
        Ok(())
    }

    pub fn uptime(&self) -> Option<Duration> {
        match self.status {
            WorkerStatus::Running => self.running_since.map(|since| since.elapsed()),
            _ => None,
        }
    }
}

/// One row of the status listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerSummary {
    pub name: String,
    pub port: u16,
    pub status: WorkerStatus,
    /// Seconds since the worker reached `running`. Only in detailed listings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorTimeouts {
    /// Unit-side bound on draining the listener.
    pub graceful_shutdown: Duration,
    /// Coordinator-side bound on waiting for a stop. Must exceed `graceful_shutdown`.
    pub stop_wait: Duration,
    /// Optional bound on waiting for `started`.
    pub start: Option<Duration>,
}

impl Default for SupervisorTimeouts {
    fn default() -> Self {
        Self {
            graceful_shutdown: DEFAULT_GRACEFUL_SHUTDOWN,
            stop_wait: DEFAULT_STOP_WAIT,
            start: None,
        }
    }
}

impl SupervisorTimeouts {
    pub fn validate(&self) -> Result<(), SupervisorError> {
        if self.stop_wait <= self.graceful_shutdown {
            return Err(SupervisorError::InvalidTimeouts(format!(
                "stop wait ({:?}) must be greater than graceful shutdown ({:?})",
                self.stop_wait, self.graceful_shutdown
            )));
        }
        Ok(())
    }
}

/// How a stop request ended. Stopping never fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    /// No live unit under that name.
    NotRunning,
    /// A start still waiting for its handshake was cancelled and its unit killed.
    StartCancelled,
    /// `shutdown{message}` received.
    Graceful(String),
    /// `shutdown-error{error}` received.
    ShutdownFailed(String),
    /// The unit ended without a shutdown message (including its own forced exit).
    Exited(UnitExit),
    /// The unit panicked while stopping.
    Crashed(String),
    /// The stop-wait bound fired; the unit was hard-terminated.
    ForceTerminated,
}
