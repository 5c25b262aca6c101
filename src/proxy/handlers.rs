use super::Proxy;
use crate::error::HostResult;
use crate::plugin::Mount;

use axum::extract::{Path, Request};
use axum::response::Response;
use axum::Extension;
use std::collections::HashMap;
use std::sync::Arc;

pub async fn handle_proxy(
    Path(params): Path<HashMap<String, String>>,
    Extension(proxy): Extension<Arc<Proxy>>,
    request: Request,
) -> HostResult<Response> {
    let name = params.get("name").cloned().unwrap_or_default();
    let version = params.get("version").cloned().unwrap_or_default();

    let handler = proxy.handler(&name, &version).await?;

    // The prefix keeps the segment as requested, so `latest` paths strip cleanly.
    let mount = Mount::new(handler).with_prefix(&format!("/app/{}/{}", name, version));
    Ok(mount.dispatch(request).await)
}
