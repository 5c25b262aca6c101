use super::error::SupervisorError;
use super::protocol::{RunnerCommand, RunnerEvent, StartPayload};
use super::runner::{RunnerLauncher, WorkerLauncher};
use super::types::{
    StopOutcome, SupervisorTimeouts, WorkerConfig, WorkerRecord, WorkerStatus, WorkerSummary,
};
use crate::plugin::Loader;
use crate::unit::{UnitExit, UnitHandle, UnitSignal};

use dashmap::DashMap;
use futures::future::{join_all, try_join_all};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, oneshot};

type WorkerUnit = UnitHandle<RunnerCommand, RunnerEvent>;
type Slot = Arc<Mutex<Option<WorkerUnit>>>;
type CancelMap = DashMap<String, oneshot::Sender<()>>;

const CANCEL_RETRY: Duration = Duration::from_millis(50);

enum Handshake {
    Reply(Option<UnitSignal<RunnerEvent>>),
    TimedOut(Duration),
    Cancelled,
}

pub struct WorkerSupervisor {
    configs: RwLock<Vec<WorkerConfig>>,
    records: DashMap<String, WorkerRecord>,
    slots: DashMap<String, Slot>,
    /// Cancels a start that is still waiting for its handshake. Lives outside the
    /// slot lock, which the pending start holds.
    cancels: CancelMap,
    launcher: Arc<dyn WorkerLauncher>,
    timeouts: SupervisorTimeouts,
}

impl WorkerSupervisor {
    pub fn new(
        launcher: Arc<dyn WorkerLauncher>,
        timeouts: SupervisorTimeouts,
    ) -> Result<Arc<Self>, SupervisorError> {
        timeouts.validate()?;

        Ok(Arc::new(Self {
            configs: RwLock::new(Vec::new()),
            records: DashMap::new(),
            slots: DashMap::new(),
            cancels: DashMap::new(),
            launcher,
            timeouts,
        }))
    }

    /// Supervisor backed by the default runner, sharing its graceful bound.
    pub fn with_runner(
        loader: Arc<dyn Loader>,
        timeouts: SupervisorTimeouts,
    ) -> Result<Arc<Self>, SupervisorError> {
        let launcher = RunnerLauncher::new(loader, timeouts.graceful_shutdown);
        Self::new(launcher, timeouts)
    }

    pub async fn register_worker(&self, config: WorkerConfig) {
        tracing::info!("Registered worker {} on port {}", config.name, config.port);
        self.configs.write().await.push(config);
    }

    pub async fn register_all(&self, configs: impl IntoIterator<Item = WorkerConfig>) {
        for config in configs {
            self.register_worker(config).await;
        }
    }

    /// First registration under `name`.
    pub async fn config(&self, name: &str) -> Option<WorkerConfig> {
        self.configs
            .read()
            .await
            .iter()
            .find(|config| config.name == name)
            .cloned()
    }

    pub async fn configs(&self) -> Vec<WorkerConfig> {
        self.configs.read().await.clone()
    }

    fn slot(&self, name: &str) -> Slot {
        self.slots.entry(name.to_string()).or_default().value().clone()
    }

    fn set_status(&self, name: &str, next: WorkerStatus) {
        if let Some(mut record) = self.records.get_mut(name) {
            if let Err(e) = record.transition(next) {
                tracing::warn!("Worker {}: {}", name, e);
            }
        }
    }

    /// Starts `name` and waits for its handshake. Returns the `started` message.
    pub async fn start_worker(&self, name: &str) -> Result<String, SupervisorError> {
        let config = self
            .config(name)
            .await
            .ok_or_else(|| SupervisorError::NotFound(name.to_string()))?;
        if !config.enabled {
            return Err(SupervisorError::Disabled(name.to_string()));
        }

        let slot = self.slot(name);
        let mut live = slot.lock().await;
        if live.is_some() {
            return Err(SupervisorError::AlreadyRunning(name.to_string()));
        }

        let mut unit = self.launcher.launch(&config).map_err(|e| SupervisorError::Launch {
            name: name.to_string(),
            message: e.to_string(),
        })?;

        let (pending, cancelled) = PendingStart::begin(&self.records, &self.cancels, name, config.port);

        if let Err(e) = unit.send(RunnerCommand::Start(StartPayload::from(&config))) {
            pending.settle(WorkerStatus::Error);
            unit.terminate();
            return Err(SupervisorError::UnitCrash {
                name: name.to_string(),
                message: e.to_string(),
            });
        }

        let handshake = {
            let reply = async {
                match self.timeouts.start {
                    Some(limit) => match tokio::time::timeout(limit, unit.recv()).await {
                        Ok(reply) => Handshake::Reply(reply),
                        Err(_) => Handshake::TimedOut(limit),
                    },
                    None => Handshake::Reply(unit.recv().await),
                }
            };

            tokio::select! {
                handshake = reply => handshake,
                _ = cancelled => Handshake::Cancelled,
            }
        };

        let reply = match handshake {
            Handshake::Reply(reply) => reply,
            Handshake::TimedOut(limit) => {
                pending.settle(WorkerStatus::Error);
                unit.terminate();
                return Err(SupervisorError::Timeout {
                    name: name.to_string(),
                    limit,
                });
            }
            Handshake::Cancelled => {
                tracing::warn!("Start of worker {} cancelled by a stop", name);
                unit.terminate();
                // Dropping the unsettled start removes its record.
                drop(pending);
                return Err(SupervisorError::StartCancelled(name.to_string()));
            }
        };

        let failure = match reply {
            Some(UnitSignal::Message(RunnerEvent::Started { message })) => {
                pending.settle(WorkerStatus::Running);
                tracing::info!("{}", message);
                *live = Some(unit);
                return Ok(message);
            }
            Some(UnitSignal::Message(RunnerEvent::Error { error })) => SupervisorError::StartFailed {
                name: name.to_string(),
                error,
            },
            Some(UnitSignal::Message(other)) => SupervisorError::StartFailed {
                name: name.to_string(),
                error: format!("unexpected reply {:?}", other),
            },
            Some(UnitSignal::Exited(exit)) => SupervisorError::UnitCrash {
                name: name.to_string(),
                message: format!("unit exited ({:?})", exit),
            },
            Some(UnitSignal::Crashed(message)) => SupervisorError::UnitCrash {
                name: name.to_string(),
                message,
            },
            None => SupervisorError::UnitCrash {
                name: name.to_string(),
                message: "unit disconnected".to_string(),
            },
        };

        tracing::error!("{}", failure);
        pending.settle(WorkerStatus::Error);
        unit.terminate();
        Err(failure)
    }

    /// Stops `name`. Never fails: an unknown or stopped worker resolves immediately.
    pub async fn stop_worker(&self, name: &str) -> StopOutcome {
        let mut cancelled = self.cancel_pending_start(name);

        let Some(slot) = self.slots.get(name).map(|slot| slot.value().clone()) else {
            tracing::warn!("Worker {} not found", name);
            return StopOutcome::NotRunning;
        };

        // A start that took the lock but had not registered its cancel yet is
        // cancelled on a later retry.
        let lock = slot.lock();
        tokio::pin!(lock);
        let mut live = loop {
            tokio::select! {
                guard = &mut lock => break guard,
                _ = tokio::time::sleep(CANCEL_RETRY) => {
                    cancelled |= self.cancel_pending_start(name);
                }
            }
        };
        let Some(mut unit) = live.take() else {
            // Clears a leftover `error` record.
            self.records.remove(name);
            if cancelled {
                return StopOutcome::StartCancelled;
            }
            tracing::warn!("Worker {} is not running", name);
            return StopOutcome::NotRunning;
        };

        let outcome = self.await_shutdown(name, &mut unit).await;
        unit.terminate();

        self.set_status(name, WorkerStatus::Stopped);
        self.records.remove(name);
        tracing::info!("Worker {} stopped ({:?})", name, outcome);
        outcome
    }

    fn cancel_pending_start(&self, name: &str) -> bool {
        match self.cancels.remove(name) {
            Some((_, cancel)) => {
                tracing::info!("Cancelling pending start of worker {}", name);
                // The start may have settled meanwhile; then nothing listens.
                let _ = cancel.send(());
                true
            }
            None => false,
        }
    }

    async fn await_shutdown(&self, name: &str, unit: &mut WorkerUnit) -> StopOutcome {
        if unit.send(RunnerCommand::Terminate).is_err() {
            // Already gone: its terminal signal is still queued.
            tracing::debug!("Worker {} no longer reads commands", name);
        }

        let deadline = tokio::time::sleep(self.timeouts.stop_wait);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => {
                    tracing::warn!("Force terminating worker {}", name);
                    return StopOutcome::ForceTerminated;
                }
                signal = unit.recv() => match signal {
                    Some(UnitSignal::Message(RunnerEvent::Shutdown { message })) => {
                        tracing::info!("Worker {} shutdown message: {}", name, message);
                        return StopOutcome::Graceful(message);
                    }
                    Some(UnitSignal::Message(RunnerEvent::ShutdownError { error })) => {
                        tracing::error!("Worker {} shutdown error: {}", name, error);
                        return StopOutcome::ShutdownFailed(error);
                    }
                    Some(UnitSignal::Message(other)) => {
                        tracing::debug!("Worker {} sent {:?} while stopping", name, other);
                    }
                    Some(UnitSignal::Exited(exit)) => return StopOutcome::Exited(exit),
                    Some(UnitSignal::Crashed(message)) => return StopOutcome::Crashed(message),
                    None => return StopOutcome::Exited(UnitExit::Killed),
                }
            }
        }
    }

    /// Starts every enabled worker concurrently, failing on the first rejection.
    pub async fn start_all(&self) -> Result<Vec<String>, SupervisorError> {
        let configs = self.configs().await;
        let mut seen = HashSet::new();
        let names: Vec<String> = configs
            .into_iter()
            .filter(|config| {
                if !config.enabled {
                    tracing::info!("Worker {} is disabled, skipping...", config.name);
                }
                config.enabled
            })
            .filter(|config| seen.insert(config.name.clone()))
            .map(|config| config.name)
            .collect();

        tracing::info!("Starting {} workers...", names.len());
        let started = try_join_all(names.iter().map(|name| self.start_worker(name))).await?;
        tracing::info!("All workers started successfully");
        Ok(started)
    }

    /// Stops every live worker concurrently and waits for all of them.
    pub async fn stop_all(&self) -> Vec<(String, StopOutcome)> {
        let names: Vec<String> = self.records.iter().map(|entry| entry.key().clone()).collect();
        tracing::info!("Stopping {} workers...", names.len());

        let outcomes = join_all(names.iter().map(|name| self.stop_worker(name))).await;
        tracing::info!("All workers stopped");
        names.into_iter().zip(outcomes).collect()
    }

    pub async fn status(&self) -> Vec<WorkerSummary> {
        self.summaries(false).await
    }

    /// Like [`status`](Self::status), plus uptime in seconds for running workers.
    pub async fn status_detailed(&self) -> Vec<WorkerSummary> {
        self.summaries(true).await
    }

    pub async fn worker_status(&self, name: &str) -> Option<WorkerSummary> {
        let config = self.config(name).await?;
        Some(self.summary(&config, false))
    }

    pub fn running_count(&self) -> usize {
        self.records
            .iter()
            .filter(|entry| entry.value().status == WorkerStatus::Running)
            .count()
    }

    async fn summaries(&self, detailed: bool) -> Vec<WorkerSummary> {
        self.configs
            .read()
            .await
            .iter()
            .map(|config| self.summary(config, detailed))
            .collect()
    }

    fn summary(&self, config: &WorkerConfig, detailed: bool) -> WorkerSummary {
        let record = self.records.get(&config.name);
        let status = record
            .as_ref()
            .map(|record| record.status)
            .unwrap_or(WorkerStatus::Stopped);
        let uptime = if detailed {
            record.as_ref().and_then(|record| record.uptime()).map(|d| d.as_secs())
        } else {
            None
        };

        WorkerSummary {
            name: config.name.clone(),
            port: config.port,
            status,
            uptime,
        }
    }
}

/// A `starting` record that is removed again if the start is abandoned midway,
/// e.g. when a fail-fast batch drops the future or a stop cancels it. Also owns the
/// start's cancel registration.
struct PendingStart<'a> {
    records: &'a DashMap<String, WorkerRecord>,
    cancels: &'a CancelMap,
    name: String,
    settled: bool,
}

impl<'a> PendingStart<'a> {
    fn begin(
        records: &'a DashMap<String, WorkerRecord>,
        cancels: &'a CancelMap,
        name: &str,
        port: u16,
    ) -> (Self, oneshot::Receiver<()>) {
        let (cancel, cancelled) = oneshot::channel();
        // Cancellable before the record becomes visible as `starting`.
        cancels.insert(name.to_string(), cancel);
        records.insert(name.to_string(), WorkerRecord::starting(port));

        let pending = Self {
            records,
            cancels,
            name: name.to_string(),
            settled: false,
        };
        (pending, cancelled)
    }

    fn settle(mut self, status: WorkerStatus) {
        if let Some(mut record) = self.records.get_mut(&self.name) {
            if let Err(e) = record.transition(status) {
                tracing::warn!("Worker {}: {}", self.name, e);
            }
        }
        self.settled = true;
    }
}

impl Drop for PendingStart<'_> {
    fn drop(&mut self) {
        // Starts for one name are serialized, so this entry is ours if still present.
        self.cancels.remove(&self.name);
        if !self.settled {
            self.records.remove(&self.name);
        }
    }
}
