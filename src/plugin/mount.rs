//! Prefix Mounting
//!
//! Serves a [`Handler`] under a URL prefix. The handler only ever sees paths
//! relative to its own root, with the query string preserved.

use super::contract::{Handler, WorkerIdentity};
use crate::error::ErrorBody;

use axum::Router;
use axum::extract::Request;
use axum::http::{Method, StatusCode, Uri, uri::PathAndQuery};
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Body of the default health route.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthBody {
    pub status: String,
    pub worker: String,
    pub timestamp: String,
}

#[derive(Clone)]
pub struct Mount {
    prefix: String,
    handler: Arc<dyn Handler>,
    health: Option<String>,
    identity: Option<WorkerIdentity>,
}

impl Mount {
    pub fn new(handler: Arc<dyn Handler>) -> Self {
        Self {
            prefix: String::new(),
            handler,
            health: None,
            identity: None,
        }
    }

    /// Mounts under `prefix`. `""` and `"/"` both mean the root.
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = normalize_prefix(prefix);
        self
    }

    /// Adds `GET /health` reporting `worker`, shadowing nothing the handler declares.
    pub fn with_health_route(mut self, worker: &str) -> Self {
        self.health = Some(worker.to_string());
        self
    }

    pub fn with_identity(mut self, identity: WorkerIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn serves_health(&self) -> bool {
        self.health.is_some()
    }

    pub async fn dispatch(&self, mut request: Request) -> Response {
        let Some(relative) = strip_prefix(&self.prefix, request.uri().path()) else {
            return not_found();
        };

        if let Some(worker) = &self.health {
            if relative == "/health" && request.method() == Method::GET {
                return Json(HealthBody {
                    status: "ok".to_string(),
                    worker: worker.clone(),
                    timestamp: chrono::Utc::now().to_rfc3339(),
                })
                .into_response();
            }
        }

        let rewritten = rewrite_path(request.uri(), &relative);
        *request.uri_mut() = rewritten;

        if let Some(identity) = &self.identity {
            request.extensions_mut().insert(identity.clone());
        }

        self.handler.handle(request).await
    }

    /// Axum router sending every request through [`Mount::dispatch`].
    pub fn into_router(self) -> Router {
        let mount = Arc::new(self);
        Router::new().fallback(move |request: Request| {
            let mount = mount.clone();
            async move { mount.dispatch(request).await }
        })
    }
}

/// 404 for paths no route answers, in the host's `{"error": ...}` shape.
pub(crate) fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(ErrorBody::new("Not found"))).into_response()
}

pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

/// Path relative to `prefix`, or `None` when `path` lies outside it.
pub fn strip_prefix(prefix: &str, path: &str) -> Option<String> {
    if prefix.is_empty() {
        return Some(if path.is_empty() { "/".to_string() } else { path.to_string() });
    }

    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() {
        Some("/".to_string())
    } else if rest.starts_with('/') {
        Some(rest.to_string())
    } else {
        // "/app/a" must not match "/app/abc"
        None
    }
}

fn rewrite_path(uri: &Uri, path: &str) -> Uri {
    let path_and_query = match uri.query() {
        Some(query) => format!("{}?{}", path, query),
        None => path.to_string(),
    };

    let mut parts = uri.clone().into_parts();
    match PathAndQuery::try_from(path_and_query) {
        Ok(value) => parts.path_and_query = Some(value),
        Err(_) => return uri.clone(),
    }

    Uri::from_parts(parts).unwrap_or_else(|_| uri.clone())
}
