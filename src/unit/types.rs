use serde::{Deserialize, Serialize};

/// How a unit's entry ended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum UnitExit {
    /// The entry returned after finishing its work.
    Clean,
    /// The entry returned after reporting a failure (non-zero exit).
    Failed,
    /// The entry gave up on its own, e.g. its hard-exit timer fired.
    Forced,
    /// The coordinator fired the kill switch (or dropped the handle).
    Killed,
}

impl UnitExit {
    pub fn is_success(self) -> bool {
        matches!(self, UnitExit::Clean)
    }
}

/// Everything a coordinator can observe from a unit.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitSignal<E> {
    /// A typed message emitted by the unit.
    Message(E),
    /// Terminal: the unit's entry finished or was killed.
    Exited(UnitExit),
    /// Terminal: the unit panicked. Carries the panic payload when it was a string.
    Crashed(String),
}

impl<E> UnitSignal<E> {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, UnitSignal::Message(_))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UnitError {
    #[error("failed to spawn unit {label}: {source}")]
    Spawn {
        label: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unit {0} is no longer accepting messages")]
    Disconnected(String),
}
