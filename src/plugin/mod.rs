//! Handler Plugins
//!
//! Everything needed to turn a stored artifact into something that can serve HTTP.
//!
//! ## Core Concepts
//! - **Handler contract**: an app exposes a route table and a `handle(request) -> response`
//!   operation ([`Handler`]).
//! - **Loader capability**: [`Loader::load`] turns a path into a [`Module`]. It is injected
//!   into the validator, the worker runner and the proxy, so a failing load is a typed
//!   `LoadError` instead of a panic crossing layers.
//! - **Structural check**: [`check_contract`] accepts a module when it carries the versioned
//!   marker and exports an app. No type identity has to survive a unit boundary.
//! - **Mounting**: [`Mount`] serves a handler under a prefix so its own routes stay relative
//!   to its root, optionally adding a default `/health` route.
//!
//! ## Submodules
//! - **`contract`**: the `Handler`/`Loader` traits, `Module`, marker and errors.
//! - **`manifest`**: the JSON route-table artifact format and its loader.
//! - **`mount`**: prefix stripping, health route and axum integration.

pub mod contract;
pub mod manifest;
pub mod mount;

pub use contract::{
    CONTRACT_MARKER, ContractViolation, Handler, HandlerError, LoadError, Loader, Module,
    RouteSpec, WorkerIdentity, check_contract, load_handler,
};
pub use manifest::{ManifestHandler, ManifestLoader};
pub use mount::{HealthBody, Mount};
