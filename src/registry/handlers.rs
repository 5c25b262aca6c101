use super::store::{Registry, VersionSelector};
use crate::error::{HostError, HostResult, MessageBody};
use crate::proxy::Proxy;

use axum::extract::{Path, Query};
use axum::{Extension, Json};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct VersionQuery {
    pub version: Option<String>,
}

pub async fn handle_list_projects(
    Extension(registry): Extension<Arc<Registry>>,
) -> HostResult<Json<Vec<String>>> {
    Ok(Json(registry.list_projects().await?))
}

pub async fn handle_list_versions(
    Path(name): Path<String>,
    Extension(registry): Extension<Arc<Registry>>,
) -> HostResult<Json<Vec<String>>> {
    Ok(Json(registry.list_versions(&name).await?))
}

pub async fn handle_delete(
    Path(name): Path<String>,
    Query(query): Query<VersionQuery>,
    Extension(registry): Extension<Arc<Registry>>,
    Extension(proxy): Extension<Arc<Proxy>>,
) -> HostResult<Json<MessageBody>> {
    let version = query
        .version
        .ok_or_else(|| HostError::BadRequest("Missing version query parameter".to_string()))?;
    let selector = VersionSelector::parse(&version);

    registry.delete(&name, &selector).await?;
    proxy.evict(&name, &selector);

    let message = match selector {
        VersionSelector::All => format!("{} deleted", name),
        VersionSelector::Version(version) => format!("{}/{} deleted", name, version),
    };
    Ok(Json(MessageBody::new(message)))
}
