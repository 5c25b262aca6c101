//! Worker Supervisor
//!
//! Starts and stops a fixed set of named, long-running workers, each serving one
//! handler artifact on its own port inside an isolated unit.
//!
//! ## Core Concepts
//! - **Configs**: registered once, never mutated. Registering a name twice appends;
//!   lookups resolve to the first registration.
//! - **Records**: at most one live [`WorkerRecord`] per name, moving
//!   `starting → running | error` and `running → stopped`.
//! - **Per-name slots**: every start and stop of one name runs under that name's async
//!   mutex, so the two can never interleave. A stop first cancels a start that is still
//!   waiting for its handshake, so it never queues behind a silent unit.
//!
//! ## Protocols
//! - **Start**: `start{...}` in, `started{message}` or `error{error}` out.
//! - **Stop**: `terminate{}` in, `shutdown{message}` or `shutdown-error{error}` out, or a
//!   silent forced exit once the unit's own graceful bound (30 s) fires. The supervisor
//!   waits at most its stop-wait bound (35 s) before hard-terminating the unit.
//!
//! ## Submodules
//! - **`types`**: configs, statuses, records, timeouts.
//! - **`error`**: [`SupervisorError`] and its HTTP mapping.
//! - **`protocol`**: messages exchanged with the runner unit.
//! - **`runner`**: the unit side: load, bind, serve, drain.
//! - **`supervisor`**: the coordinator side: [`WorkerSupervisor`].
//! - **`handlers`**: the `/workers` HTTP endpoints.

pub mod error;
pub mod handlers;
pub mod protocol;
pub mod runner;
pub mod supervisor;
pub mod types;

pub use error::SupervisorError;
pub use protocol::{RunnerCommand, RunnerEvent, StartPayload};
pub use runner::{RunnerLauncher, WorkerLauncher, run_worker};
pub use supervisor::WorkerSupervisor;
pub use types::{
    StopOutcome, SupervisorTimeouts, WorkerConfig, WorkerRecord, WorkerStatus, WorkerSummary,
};

#[cfg(test)]
mod tests;
