use super::protocol::{ValidatorCommand, ValidatorEvent};
use super::unit::run_validation;
use crate::error::HostError;
use crate::plugin::Loader;
use crate::unit::{IsolatedUnit, UnitSignal};

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_VALIDATE_TIMEOUT: Duration = Duration::from_secs(5);

const TIMEOUT_MESSAGE: &str = "Validation timeout";

/// Everything a validation can end with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    /// Loaded but violates the contract.
    Invalid(String),
    /// The load itself failed.
    LoadFailed(String),
    TimedOut,
    /// The unit exited or panicked without answering.
    Crashed(String),
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid)
    }

    pub fn into_error(self) -> Option<HostError> {
        match self {
            Verdict::Valid => None,
            Verdict::Invalid(message) => Some(HostError::ValidationFailure(message)),
            Verdict::LoadFailed(error) => Some(HostError::ValidationError(error)),
            Verdict::TimedOut => Some(HostError::Timeout(TIMEOUT_MESSAGE.to_string())),
            Verdict::Crashed(message) => Some(HostError::UnitCrash(message)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Verdict> for ValidationResult {
    fn from(verdict: Verdict) -> Self {
        let error = match verdict {
            Verdict::Valid => None,
            Verdict::Invalid(message) | Verdict::LoadFailed(message) | Verdict::Crashed(message) => {
                Some(message)
            }
            Verdict::TimedOut => Some(TIMEOUT_MESSAGE.to_string()),
        };

        ValidationResult {
            success: error.is_none(),
            error,
        }
    }
}

pub struct Validator {
    loader: Arc<dyn Loader>,
    timeout: Duration,
}

impl Validator {
    pub fn new(loader: Arc<dyn Loader>, timeout: Duration) -> Arc<Self> {
        Arc::new(Self { loader, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Validates the artifact at `path` in a fresh unit.
    pub async fn verdict(&self, path: &Path) -> Verdict {
        let loader = self.loader.clone();
        let mut unit = match IsolatedUnit::spawn("validator", move |ctx| run_validation(ctx, loader)) {
            Ok(unit) => unit,
            Err(e) => return Verdict::Crashed(e.to_string()),
        };

        let command = ValidatorCommand::Validate {
            module_path: path.to_path_buf(),
        };
        if let Err(e) = unit.send(command) {
            unit.terminate();
            return Verdict::Crashed(e.to_string());
        }

        let verdict = match tokio::time::timeout(self.timeout, unit.recv()).await {
            Err(_) => Verdict::TimedOut,
            Ok(Some(UnitSignal::Message(event))) => match event {
                ValidatorEvent::ValidationSuccess => Verdict::Valid,
                ValidatorEvent::ValidationFailed { message } => Verdict::Invalid(message),
                ValidatorEvent::ValidationError { error } => Verdict::LoadFailed(error),
            },
            Ok(Some(UnitSignal::Exited(exit))) => {
                Verdict::Crashed(format!("Validator exited ({:?}) without a verdict", exit))
            }
            Ok(Some(UnitSignal::Crashed(message))) => Verdict::Crashed(message),
            Ok(None) => Verdict::Crashed("Validator disconnected without a verdict".to_string()),
        };

        // Always reclaimed, whatever the outcome.
        unit.terminate();

        tracing::info!("Validation of {}: {:?}", path.display(), verdict);
        verdict
    }

    pub async fn validate(&self, path: &Path) -> ValidationResult {
        self.verdict(path).await.into()
    }
}
