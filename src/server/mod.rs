//! HTTP Surface
//!
//! Assembles the management API, the upload endpoint and the versioned proxy into a
//! single axum [`Router`]. Shared services travel as `Extension<Arc<T>>` layers.
//!
//! ## Routes
//! - `GET /` host summary
//! - `GET /workers`, `GET /workers/:name`, `POST /workers/:name/{start,stop}`
//! - `GET /app`, `GET|POST|DELETE /app/:name`
//! - any method on `/app/:name/:version` and `/app/:name/:version/*rest` (proxy)

use crate::config::HostConfig;
use crate::plugin::{Loader, ManifestLoader};
use crate::proxy::Proxy;
use crate::proxy::handlers::handle_proxy;
use crate::registry::Registry;
use crate::registry::handlers::{handle_delete, handle_list_projects, handle_list_versions};
use crate::supervisor::WorkerSupervisor;
use crate::supervisor::handlers::{
    handle_list_workers, handle_start_worker, handle_stop_worker, handle_summary,
    handle_worker_status,
};
use crate::upload::handlers::handle_upload;
use crate::upload::{Unpacker, UnzipCommand, UploadPipeline};
use crate::validator::Validator;

use anyhow::Context;
use axum::extract::{DefaultBodyLimit, Extension};
use axum::routing::{any, get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Long-lived services shared by every request.
#[derive(Clone)]
pub struct HostServices {
    pub registry: Arc<Registry>,
    pub proxy: Arc<Proxy>,
    pub uploads: Arc<UploadPipeline>,
    pub supervisor: Arc<WorkerSupervisor>,
    pub upload_limit: usize,
}

impl HostServices {
    /// Wires the default services (manifest loader, `unzip` extraction) for `config`.
    pub async fn from_config(config: &HostConfig) -> anyhow::Result<Self> {
        Self::assemble(config, ManifestLoader::new(), UnzipCommand::new()).await
    }

    pub async fn assemble(
        config: &HostConfig,
        loader: Arc<dyn Loader>,
        unpacker: Arc<dyn Unpacker>,
    ) -> anyhow::Result<Self> {
        let registry = Registry::open(&config.app_root)
            .await
            .with_context(|| format!("failed to open registry at {}", config.app_root.display()))?;

        let validator = Validator::new(loader.clone(), config.validate_timeout());
        let uploads = UploadPipeline::new(registry.clone(), validator, unpacker);
        let proxy = Proxy::new(registry.clone(), loader.clone());
        let supervisor = WorkerSupervisor::with_runner(loader, config.supervisor_timeouts())
            .context("invalid supervisor timeouts")?;

        Ok(Self {
            registry,
            proxy,
            uploads,
            supervisor,
            upload_limit: config.upload_limit_bytes,
        })
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(handle_summary))
            .route("/workers", get(handle_list_workers))
            .route("/workers/:name", get(handle_worker_status))
            .route("/workers/:name/start", post(handle_start_worker))
            .route("/workers/:name/stop", post(handle_stop_worker))
            .route("/app", get(handle_list_projects))
            .route(
                "/app/:name",
                get(handle_list_versions)
                    .delete(handle_delete)
                    .post(handle_upload),
            )
            .route("/app/:name/:version", any(handle_proxy))
            .route("/app/:name/:version/*rest", any(handle_proxy))
            .layer(DefaultBodyLimit::max(self.upload_limit))
            .layer(Extension(self.registry.clone()))
            .layer(Extension(self.proxy.clone()))
            .layer(Extension(self.uploads.clone()))
            .layer(Extension(self.supervisor.clone()))
            .layer(TraceLayer::new_for_http())
    }
}
