use super::types::WorkerStatus;
use crate::error::ErrorBody;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("Worker {0} not found")]
    NotFound(String),

    #[error("Worker {0} is disabled")]
    Disabled(String),

    #[error("Worker {0} is already running")]
    AlreadyRunning(String),

    /// The unit answered `error{error}`.
    #[error("Failed to start worker {name}: {error}")]
    StartFailed { name: String, error: String },

    /// The unit exited or panicked before answering.
    #[error("Worker {name} exited before starting: {message}")]
    UnitCrash { name: String, message: String },

    #[error("Failed to launch worker {name}: {message}")]
    Launch { name: String, message: String },

    /// A stop arrived while the start was waiting for its handshake.
    #[error("Worker {0} was stopped while starting")]
    StartCancelled(String),

    #[error("Worker {name} did not start within {limit:?}")]
    Timeout { name: String, limit: Duration },

    #[error("Invalid worker transition {from:?} -> {to:?}")]
    InvalidTransition { from: WorkerStatus, to: WorkerStatus },

    #[error("Invalid supervisor timeouts: {0}")]
    InvalidTimeouts(String),
}

impl SupervisorError {
    pub fn status(&self) -> StatusCode {
        match self {
            SupervisorError::NotFound(_) => StatusCode::NOT_FOUND,
            SupervisorError::Disabled(_)
            | SupervisorError::AlreadyRunning(_)
            | SupervisorError::StartCancelled(_) => StatusCode::CONFLICT,
            SupervisorError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            SupervisorError::StartFailed { .. }
            | SupervisorError::UnitCrash { .. }
            | SupervisorError::Launch { .. }
            | SupervisorError::InvalidTransition { .. }
            | SupervisorError::InvalidTimeouts(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for SupervisorError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Worker request failed ({}): {}", status, self);
        }
        (status, Json(ErrorBody::new(self.to_string()))).into_response()
    }
}
