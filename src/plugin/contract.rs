//! Handler Contract
//!
//! Defines what a servable artifact must look like once loaded, and the capability
//! used to load it.

use async_trait::async_trait;
use axum::extract::Request;
use axum::response::Response;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Versioned marker a module must declare to be accepted.
pub const CONTRACT_MARKER: &str = "app-host.handler/v1";

/// One entry of a handler's route table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSpec {
    pub method: String,
    pub path: String,
}

/// A loaded request handler.
///
/// Paths seen by `handle` are relative to the handler's own root: whoever mounts it
/// strips the mount prefix first.
#[async_trait]
pub trait Handler: Send + Sync {
    /// The routes this handler declares.
    fn routes(&self) -> Vec<RouteSpec>;

    /// Serves one request.
    async fn handle(&self, request: Request) -> Response;

    fn has_route(&self, path: &str) -> bool {
        self.routes().iter().any(|route| route.path == path)
    }
}

/// The raw result of loading an artifact, before the contract check.
pub struct Module {
    /// Where the module was loaded from.
    pub source: PathBuf,
    /// Contract marker declared by the module, if any.
    pub marker: Option<String>,
    /// The exported app, if any.
    pub app: Option<Arc<dyn Handler>>,
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("source", &self.source)
            .field("marker", &self.marker)
            .field("app", &self.app.as_ref().map(|app| app.routes()))
            .finish()
    }
}

/// Turns an artifact path into a [`Module`].
pub trait Loader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Module, LoadError>;
}

/// The artifact could not be loaded at all.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Cannot read module {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse module {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// The module was readable but failed while initialising.
    #[error("{0}")]
    Init(String),
}

/// The artifact loaded but does not satisfy the handler contract.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractViolation {
    #[error("Module does not declare the {expected} contract")]
    MissingMarker { expected: String },

    #[error("Module declares contract {found}, expected {expected}")]
    WrongMarker { found: String, expected: String },

    #[error("Module does not export a valid app instance")]
    MissingApp,
}

/// Either way a stored artifact can fail to become a handler.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Contract(#[from] ContractViolation),
}

/// Structural contract check: versioned marker plus an exported app.
pub fn check_contract(module: Module) -> Result<Arc<dyn Handler>, ContractViolation> {
    match module.marker.as_deref() {
        None => {
            return Err(ContractViolation::MissingMarker {
                expected: CONTRACT_MARKER.to_string(),
            });
        }
        Some(found) if found != CONTRACT_MARKER => {
            return Err(ContractViolation::WrongMarker {
                found: found.to_string(),
                expected: CONTRACT_MARKER.to_string(),
            });
        }
        Some(_) => {}
    }

    module.app.ok_or(ContractViolation::MissingApp)
}

/// Loads `path` and checks the contract in one step.
pub fn load_handler(loader: &dyn Loader, path: &Path) -> Result<Arc<dyn Handler>, HandlerError> {
    let module = loader.load(path)?;
    Ok(check_contract(module)?)
}

/// Identity of the worker serving a request, attached to request extensions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerIdentity {
    pub name: String,
    pub env: BTreeMap<String, String>,
}
