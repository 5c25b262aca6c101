//! App Host Library
//!
//! A coordinator process that stores versioned handler artifacts, validates them in
//! isolation, serves them behind a versioned proxy and supervises long-running
//! worker servers.
//!
//! ## Architecture Modules
//! - **`unit`**: Isolated execution contexts (thread + runtime) reached only through
//!   typed channels and a kill switch.
//! - **`plugin`**: The handler contract, the loader capability, the JSON manifest
//!   loader and the prefix mount shared by workers and the proxy.
//! - **`registry`**: The on-disk catalog of `(project, version)` artifacts.
//! - **`validator`**: One-shot contract checks of uploaded artifacts inside a unit.
//! - **`upload`**: Persists uploads, validates them and rolls back on failure.
//! - **`supervisor`**: Start/stop state machine and handshake of worker servers.
//! - **`proxy`**: Resolves versions and delegates requests to cached handlers.
//! - **`server`** / **`config`**: HTTP surface assembly and environment configuration.

pub mod config;
pub mod error;
pub mod plugin;
pub mod proxy;
pub mod registry;
pub mod server;
pub mod supervisor;
pub mod unit;
pub mod upload;
pub mod validator;
