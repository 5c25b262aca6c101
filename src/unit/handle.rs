use super::types::{UnitError, UnitExit, UnitSignal};

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::thread::JoinHandle;
use tokio::sync::{mpsc, oneshot};

/// Factory for isolated units.
pub struct IsolatedUnit;

impl IsolatedUnit {
    /// Spawns a unit running `entry` on its own thread and runtime.
    ///
    /// The entry receives a [`UnitContext`] to read commands and emit events. Its
    /// future does not need to be `Send`: it never leaves the unit's thread.
    pub fn spawn<C, E, F, Fut>(
        label: impl Into<String>,
        entry: F,
    ) -> Result<UnitHandle<C, E>, UnitError>
    where
        C: Send + 'static,
        E: Send + 'static,
        F: FnOnce(UnitContext<C, E>) -> Fut + Send + 'static,
        Fut: Future<Output = UnitExit> + 'static,
    {
        let label = label.into();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (kill_tx, kill_rx) = oneshot::channel();

        let context = UnitContext {
            label: label.clone(),
            inbox: command_rx,
            outbox: signal_tx.clone(),
        };

        let thread_label = label.clone();
        let thread = std::thread::Builder::new()
            .name(format!("unit-{}", label))
            .spawn(move || run_unit(thread_label, context, entry, kill_rx, signal_tx))
            .map_err(|source| UnitError::Spawn {
                label: label.clone(),
                source,
            })?;

        tracing::debug!("Spawned isolated unit {}", label);

        Ok(UnitHandle {
            label,
            commands: command_tx,
            signals: signal_rx,
            kill: Some(kill_tx),
            thread,
        })
    }
}

/// Body of the unit thread: drive the entry until it returns or the kill switch
/// fires, then report exactly one terminal signal.
fn run_unit<C, E, F, Fut>(
    label: String,
    context: UnitContext<C, E>,
    entry: F,
    kill_rx: oneshot::Receiver<()>,
    signal_tx: mpsc::UnboundedSender<UnitSignal<E>>,
) where
    F: FnOnce(UnitContext<C, E>) -> Fut,
    Fut: Future<Output = UnitExit>,
{
    let outcome = panic::catch_unwind(AssertUnwindSafe(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let exit = runtime.block_on(async move {
            tokio::select! {
                biased;
                // A dropped sender counts as a kill: the handle is gone.
                _ = kill_rx => UnitExit::Killed,
                exit = entry(context) => exit,
            }
        });

        // Dropping the runtime cancels every task the unit spawned.
        drop(runtime);
        Ok::<_, std::io::Error>(exit)
    }));

    let signal = match outcome {
        Ok(Ok(exit)) => {
            tracing::debug!("Unit {} exited ({:?})", label, exit);
            UnitSignal::Exited(exit)
        }
        Ok(Err(e)) => {
            tracing::error!("Unit {} could not start its runtime: {}", label, e);
            UnitSignal::Crashed(format!("failed to start unit runtime: {}", e))
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!("Unit {} crashed: {}", label, message);
            UnitSignal::Crashed(message)
        }
    };

    // The coordinator may already have dropped its handle.
    let _ = signal_tx.send(signal);
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unit panicked".to_string()
    }
}

/// Coordinator-side handle to a running unit.
///
/// Dropping the handle terminates the unit.
pub struct UnitHandle<C, E> {
    label: String,
    commands: mpsc::UnboundedSender<C>,
    signals: mpsc::UnboundedReceiver<UnitSignal<E>>,
    kill: Option<oneshot::Sender<()>>,
    thread: JoinHandle<()>,
}

impl<C, E> UnitHandle<C, E> {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Posts a command to the unit. Fails once the unit has stopped reading.
    pub fn send(&self, command: C) -> Result<(), UnitError> {
        self.commands
            .send(command)
            .map_err(|_| UnitError::Disconnected(self.label.clone()))
    }

    /// Waits for the next signal. Returns `None` after the terminal signal was consumed.
    pub async fn recv(&mut self) -> Option<UnitSignal<E>> {
        self.signals.recv().await
    }

    /// Hard, unconditional termination. Idempotent.
    pub fn terminate(&mut self) {
        if let Some(kill) = self.kill.take() {
            tracing::debug!("Terminating unit {}", self.label);
            let _ = kill.send(());
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.kill.is_none()
    }

    /// True once the unit's thread has fully exited.
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }
}

/// Unit-side view of the channels.
pub struct UnitContext<C, E> {
    label: String,
    inbox: mpsc::UnboundedReceiver<C>,
    outbox: mpsc::UnboundedSender<UnitSignal<E>>,
}

impl<C, E> UnitContext<C, E> {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Next command from the coordinator; `None` when the coordinator hung up.
    pub async fn recv(&mut self) -> Option<C> {
        self.inbox.recv().await
    }

    /// Emits an event to the coordinator. Returns `false` if nobody is listening.
    pub fn emit(&self, event: E) -> bool {
        let delivered = self.outbox.send(UnitSignal::Message(event)).is_ok();
        if !delivered {
            tracing::debug!("Unit {} emitted an event after its coordinator left", self.label);
        }
        delivered
    }
}
