use super::protocol::{RunnerCommand, RunnerEvent, StartPayload};
use super::types::WorkerConfig;
use crate::plugin::{Loader, Mount, WorkerIdentity, load_handler};
use crate::unit::{IsolatedUnit, UnitContext, UnitError, UnitExit, UnitHandle};

use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Spawns the unit backing one worker.
pub trait WorkerLauncher: Send + Sync {
    fn launch(&self, config: &WorkerConfig) -> Result<UnitHandle<RunnerCommand, RunnerEvent>, UnitError>;
}

/// Default launcher: a unit running [`run_worker`].
pub struct RunnerLauncher {
    loader: Arc<dyn Loader>,
    graceful_timeout: Duration,
}

impl RunnerLauncher {
    pub fn new(loader: Arc<dyn Loader>, graceful_timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            loader,
            graceful_timeout,
        })
    }
}

impl WorkerLauncher for RunnerLauncher {
    fn launch(&self, config: &WorkerConfig) -> Result<UnitHandle<RunnerCommand, RunnerEvent>, UnitError> {
        let loader = self.loader.clone();
        let graceful_timeout = self.graceful_timeout;
        IsolatedUnit::spawn(format!("worker-{}", config.name), move |ctx| {
            run_worker(ctx, loader, graceful_timeout)
        })
    }
}

struct RunningServer {
    name: String,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
}

/// Entry of a worker unit.
pub async fn run_worker(
    mut ctx: UnitContext<RunnerCommand, RunnerEvent>,
    loader: Arc<dyn Loader>,
    graceful_timeout: Duration,
) -> UnitExit {
    let mut server: Option<RunningServer> = None;

    while let Some(command) = ctx.recv().await {
        match command {
            RunnerCommand::Start(payload) => {
                if server.is_some() {
                    ctx.emit(RunnerEvent::Error {
                        error: format!("Worker {} is already serving", payload.name),
                    });
                    continue;
                }

                match serve(&payload, loader.as_ref()).await {
                    Ok(running) => {
                        ctx.emit(RunnerEvent::Started {
                            message: started_message(&payload),
                        });
                        server = Some(running);
                    }
                    Err(error) => {
                        tracing::error!("Worker {} failed to start: {}", payload.name, error);
                        ctx.emit(RunnerEvent::Error { error });
                    }
                }
            }
            RunnerCommand::Terminate => {
                return shutdown(&ctx, server.take(), graceful_timeout).await;
            }
        }
    }

    // Coordinator hung up; the runtime teardown closes the listener.
    UnitExit::Clean
}

async fn serve(payload: &StartPayload, loader: &dyn Loader) -> Result<RunningServer, String> {
    let handler = load_handler(loader, &payload.artifact_path).map_err(|e| e.to_string())?;

    let mut mount = Mount::new(handler.clone()).with_identity(WorkerIdentity {
        name: payload.name.clone(),
        env: payload.env.clone(),
    });
    if let Some(prefix) = &payload.prefix {
        mount = mount.with_prefix(prefix);
    }
    if payload.health_check && !handler.has_route("/health") {
        mount = mount.with_health_route(&payload.name);
    }

    let listener = TcpListener::bind(("0.0.0.0", payload.port))
        .await
        .map_err(|e| format!("Failed to bind port {}: {}", payload.port, e))?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let app = mount.into_router();
    let task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
    });

    Ok(RunningServer {
        name: payload.name.clone(),
        shutdown: shutdown_tx,
        task,
    })
}

fn started_message(payload: &StartPayload) -> String {
    match &payload.prefix {
        Some(prefix) => format!(
            "Worker {} with prefix {} started on port {}",
            payload.name, prefix, payload.port
        ),
        None => format!("Worker {} started on port {}", payload.name, payload.port),
    }
}

/// Drains the listener within `graceful_timeout`. A server that does not drain in
/// time is abandoned without a message.
async fn shutdown(
    ctx: &UnitContext<RunnerCommand, RunnerEvent>,
    server: Option<RunningServer>,
    graceful_timeout: Duration,
) -> UnitExit {
    let Some(running) = server else {
        return UnitExit::Clean;
    };

    let _ = running.shutdown.send(());

    match tokio::time::timeout(graceful_timeout, running.task).await {
        Ok(Ok(Ok(()))) => {
            ctx.emit(RunnerEvent::Shutdown {
                message: format!("Worker {} shutdown completed.", running.name),
            });
            UnitExit::Clean
        }
        Ok(Ok(Err(e))) => {
            ctx.emit(RunnerEvent::ShutdownError {
                error: e.to_string(),
            });
            UnitExit::Failed
        }
        Ok(Err(join_error)) => {
            ctx.emit(RunnerEvent::ShutdownError {
                error: join_error.to_string(),
            });
            UnitExit::Failed
        }
        Err(_) => {
            tracing::warn!(
                "Worker {} did not drain within {:?}, forcing exit",
                running.name,
                graceful_timeout
            );
            UnitExit::Forced
        }
    }
}
