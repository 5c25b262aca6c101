//! Manifest Artifacts
//!
//! The artifact format hosted by default: a JSON document declaring the contract
//! marker and a route table. Each route answers with a static (templated) response.
//!
//! ```json
//! {
//!   "contract": "app-host.handler/v1",
//!   "app": {
//!     "routes": [
//!       { "method": "GET", "path": "/ping", "body": "pong" },
//!       { "method": "GET", "path": "/users/:id", "json": { "id": "{id}" } }
//!     ]
//!   }
//! }
//! ```
//!
//! Paths accept `:param` segments and a trailing `*`, routed by axum. Response bodies
//! and header values may reference `{param}`, `{*}`, `{worker}` and `{env.KEY}`.
//! Unmatched paths answer 404 and a known path with another method answers 405.

use super::contract::{Handler, LoadError, Loader, Module, RouteSpec, WorkerIdentity};

use super::mount::not_found;
use crate::unit::handle::panic_message;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::extract::{Path, Request};
use axum::http::{HeaderName, HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodFilter, MethodRouter, any, on};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

#[derive(Debug, Deserialize)]
struct ManifestFile {
    contract: Option<String>,
    app: Option<AppManifest>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppManifest {
    #[serde(default)]
    pub routes: Vec<RouteManifest>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteManifest {
    #[serde(default = "default_method")]
    pub method: String,
    pub path: String,
    #[serde(default = "default_status")]
    pub status: u16,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub json: Option<serde_json::Value>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub delay_ms: Option<u64>,
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_status() -> u16 {
    200
}

/// Reads manifest artifacts from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestLoader;

impl ManifestLoader {
    pub fn new() -> Arc<Self> {
        Arc::new(Self)
    }
}

impl Loader for ManifestLoader {
    fn load(&self, path: &std::path::Path) -> Result<Module, LoadError> {
        let raw = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let file: ManifestFile = serde_json::from_str(&raw).map_err(|e| LoadError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let app = match file.app {
            Some(manifest) => Some(Arc::new(ManifestHandler::from_manifest(manifest)?) as Arc<dyn Handler>),
            None => None,
        };

        Ok(Module {
            source: path.to_path_buf(),
            marker: file.contract,
            app,
        })
    }
}

/// Axum name of the trailing `*` capture, exposed to templates as `{*}`.
const WILDCARD_PARAM: &str = "__wildcard";

#[derive(Debug, Clone)]
enum Payload {
    Empty,
    Text(String),
    Json(serde_json::Value),
}

#[derive(Debug, Clone)]
struct CompiledRoute {
    spec: RouteSpec,
    any_method: bool,
    status: StatusCode,
    headers: Vec<(HeaderName, String)>,
    payload: Payload,
    delay: Option<Duration>,
}

impl CompiledRoute {
    async fn respond(&self, params: Option<Path<HashMap<String, String>>>, request: Request) -> Response {
        let identity = request.extensions().get::<WorkerIdentity>().cloned();

        let mut params = params.map(|Path(params)| params).unwrap_or_default();
        if let Some(rest) = params.remove(WILDCARD_PARAM) {
            params.insert("*".to_string(), rest.trim_start_matches('/').to_string());
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        render(self, &params, identity.as_ref())
    }
}

/// Serves the route table of a manifest artifact through an axum [`Router`].
#[derive(Clone)]
pub struct ManifestHandler {
    routes: Vec<RouteSpec>,
    router: Router,
}

impl fmt::Debug for ManifestHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManifestHandler")
            .field("routes", &self.routes)
            .finish_non_exhaustive()
    }
}

impl ManifestHandler {
    /// Compiles a manifest. Invalid or conflicting paths, statuses and header names
    /// fail here, at load time.
    pub fn from_manifest(manifest: AppManifest) -> Result<Self, LoadError> {
        let mut routes = Vec::with_capacity(manifest.routes.len());
        let mut router = Router::new();

        for route in manifest.routes {
            let compiled = Arc::new(compile_route(route)?);
            let path = router_path(&compiled.spec.path)?;
            routes.push(compiled.spec.clone());
            router = add_route(router, &path, endpoint(compiled)?)?;
        }

        Ok(Self {
            routes,
            router: router.fallback(|| async { not_found() }),
        })
    }
}

#[async_trait]
impl Handler for ManifestHandler {
    fn routes(&self) -> Vec<RouteSpec> {
        self.routes.clone()
    }

    async fn handle(&self, request: Request) -> Response {
        match self.router.clone().oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        }
    }
}

fn compile_route(route: RouteManifest) -> Result<CompiledRoute, LoadError> {
    if !route.path.starts_with('/') {
        return Err(LoadError::Init(format!(
            "Route path must start with '/': {}",
            route.path
        )));
    }

    let status = StatusCode::from_u16(route.status)
        .map_err(|_| LoadError::Init(format!("Invalid status code {} for {}", route.status, route.path)))?;

    let method = route.method.trim().to_ascii_uppercase();
    let any_method = method == "ANY" || method == "*";

    let headers = route
        .headers
        .into_iter()
        .map(|(name, value)| {
            HeaderName::from_bytes(name.as_bytes())
                .map(|name| (name, value))
                .map_err(|_| LoadError::Init(format!("Invalid header name {}", name)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let payload = match (route.json, route.body) {
        (Some(_), Some(_)) => {
            return Err(LoadError::Init(format!(
                "Route {} declares both body and json",
                route.path
            )));
        }
        (Some(json), None) => Payload::Json(json),
        (None, Some(text)) => Payload::Text(text),
        (None, None) => Payload::Empty,
    };

    Ok(CompiledRoute {
        spec: RouteSpec {
            method,
            path: route.path,
        },
        any_method,
        status,
        headers,
        payload,
        delay: route.delay_ms.map(Duration::from_millis),
    })
}

/// Manifest path to axum syntax: a trailing `*` becomes a named capture.
fn router_path(path: &str) -> Result<String, LoadError> {
    let segments: Vec<&str> = path.split('/').collect();
    let last = segments.len() - 1;

    segments
        .iter()
        .enumerate()
        .map(|(index, segment)| {
            if *segment == "*" {
                if index != last {
                    return Err(LoadError::Init(format!("Wildcard must be the last segment: {}", path)));
                }
                Ok(format!("*{}", WILDCARD_PARAM))
            } else if segment.starts_with('*') {
                Err(LoadError::Init(format!("Named wildcards are not supported: {}", path)))
            } else if *segment == ":" {
                Err(LoadError::Init(format!("Unnamed parameter in {}", path)))
            } else {
                Ok((*segment).to_string())
            }
        })
        .collect::<Result<Vec<_>, _>>()
        .map(|segments| segments.join("/"))
}

fn endpoint(route: Arc<CompiledRoute>) -> Result<MethodRouter, LoadError> {
    let filter = if route.any_method {
        None
    } else {
        let method = Method::from_bytes(route.spec.method.as_bytes())
            .map_err(|_| LoadError::Init(format!("Invalid method {} for {}", route.spec.method, route.spec.path)))?;
        let filter = MethodFilter::try_from(method)
            .map_err(|e| LoadError::Init(format!("{} for {}", e, route.spec.path)))?;
        Some(filter)
    };

    let serve = move |params: Option<Path<HashMap<String, String>>>, request: Request| {
        let route = route.clone();
        async move { route.respond(params, request).await }
    };

    Ok(match filter {
        Some(filter) => on(filter, serve),
        None => any(serve),
    })
}

/// Axum rejects invalid and overlapping routes by panicking; that is a load failure here.
fn add_route(router: Router, path: &str, endpoint: MethodRouter) -> Result<Router, LoadError> {
    panic::catch_unwind(AssertUnwindSafe(move || router.route(path, endpoint)))
        .map_err(|payload| LoadError::Init(format!("Route {} rejected: {}", path, panic_message(payload.as_ref()))))
}

fn render(
    route: &CompiledRoute,
    params: &HashMap<String, String>,
    identity: Option<&WorkerIdentity>,
) -> Response {
    let mut response = match &route.payload {
        Payload::Empty => Response::new(Body::empty()),
        Payload::Text(text) => {
            let mut response = Response::new(Body::from(substitute(text, params, identity)));
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            );
            response
        }
        Payload::Json(value) => {
            let rendered = substitute_json(value, params, identity);
            match serde_json::to_vec(&rendered) {
                Ok(bytes) => {
                    let mut response = Response::new(Body::from(bytes));
                    response
                        .headers_mut()
                        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
                    response
                }
                Err(e) => {
                    tracing::error!("Failed to encode response for {}: {}", route.spec.path, e);
                    return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                }
            }
        }
    };

    *response.status_mut() = route.status;

    for (name, template) in &route.headers {
        let value = substitute(template, params, identity);
        match HeaderValue::from_str(&value) {
            Ok(value) => {
                response.headers_mut().insert(name.clone(), value);
            }
            Err(_) => tracing::warn!("Skipping invalid value for header {}", name),
        }
    }

    response
}

/// Expands `{param}`, `{worker}` and `{env.KEY}`. Unknown placeholders are kept as-is.
fn substitute(
    template: &str,
    params: &HashMap<String, String>,
    identity: Option<&WorkerIdentity>,
) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        output.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let Some(close) = after.find('}') else {
            output.push_str(&rest[open..]);
            return output;
        };

        let key = &after[..close];
        match lookup(key, params, identity) {
            Some(value) => output.push_str(&value),
            None => {
                output.push('{');
                output.push_str(key);
                output.push('}');
            }
        }
        rest = &after[close + 1..];
    }

    output.push_str(rest);
    output
}

fn lookup(
    key: &str,
    params: &HashMap<String, String>,
    identity: Option<&WorkerIdentity>,
) -> Option<String> {
    if let Some(value) = params.get(key) {
        return Some(value.clone());
    }

    let identity = identity?;
    if key == "worker" {
        return Some(identity.name.clone());
    }
    key.strip_prefix("env.")
        .and_then(|name| identity.env.get(name))
        .cloned()
}

fn substitute_json(
    value: &serde_json::Value,
    params: &HashMap<String, String>,
    identity: Option<&WorkerIdentity>,
) -> serde_json::Value {
    use serde_json::Value;

    match value {
        Value::String(text) => Value::String(substitute(text, params, identity)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| substitute_json(item, params, identity))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| (key.clone(), substitute_json(item, params, identity)))
                .collect(),
        ),
        other => other.clone(),
    }
}
