//! Host Error Taxonomy
//!
//! Every failure that can reach the management or proxy HTTP surface is expressed
//! as a [`HostError`]. Each variant maps to exactly one HTTP status and is rendered
//! as a JSON body of the form `{"error": "..."}`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

/// Errors raised by the registry, upload pipeline and proxy.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// Missing project, version or artifact.
    #[error("{0}")]
    NotFound(String),

    /// The (name, version) pair already exists in the registry.
    #[error("{0}")]
    Conflict(String),

    /// A project name or version is not a safe single path segment.
    #[error("{0}")]
    InvalidName(String),

    /// Malformed request (missing multipart field, unreadable archive...).
    #[error("{0}")]
    BadRequest(String),

    /// The artifact loaded but does not satisfy the handler contract.
    #[error("{0}")]
    ValidationFailure(String),

    /// The artifact failed while loading.
    #[error("{0}")]
    ValidationError(String),

    /// A bounded wait (validation) expired.
    #[error("{0}")]
    Timeout(String),

    /// An isolated unit vanished or panicked without a verdict.
    #[error("{0}")]
    UnitCrash(String),

    /// A stored artifact could not be loaded for serving.
    #[error("{0}")]
    Load(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Internal(String),
}

impl HostError {
    pub fn status(&self) -> StatusCode {
        match self {
            HostError::NotFound(_) => StatusCode::NOT_FOUND,
            // Uploads over an existing version are refused, not merged.
            HostError::Conflict(_) => StatusCode::FORBIDDEN,
            HostError::InvalidName(_)
            | HostError::BadRequest(_)
            | HostError::ValidationFailure(_)
            | HostError::ValidationError(_)
            | HostError::Timeout(_)
            | HostError::UnitCrash(_) => StatusCode::BAD_REQUEST,
            HostError::Load(_) => StatusCode::BAD_GATEWAY,
            HostError::Io(_) | HostError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON body used for every user-visible failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// JSON body used for successful mutations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl IntoResponse for HostError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed ({}): {}", status, self);
        } else {
            tracing::debug!("Request rejected ({}): {}", status, self);
        }
        (status, Json(ErrorBody::new(self.to_string()))).into_response()
    }
}

pub type HostResult<T> = Result<T, HostError>;
