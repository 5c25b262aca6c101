use super::error::SupervisorError;
use super::supervisor::WorkerSupervisor;
use super::types::WorkerSummary;
use crate::error::MessageBody;

use axum::extract::{Path, Query};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HostSummary {
    pub message: String,
    pub workers_count: usize,
    pub running_workers: usize,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

pub async fn handle_summary(
    Extension(supervisor): Extension<Arc<WorkerSupervisor>>,
) -> Json<HostSummary> {
    Json(HostSummary {
        message: "App Host Worker Manager".to_string(),
        workers_count: supervisor.status().await.len(),
        running_workers: supervisor.running_count(),
    })
}

pub async fn handle_list_workers(
    Query(query): Query<StatusQuery>,
    Extension(supervisor): Extension<Arc<WorkerSupervisor>>,
) -> Json<Vec<WorkerSummary>> {
    let workers = match query.status.as_deref() {
        Some("detailed") => supervisor.status_detailed().await,
        _ => supervisor.status().await,
    };
    Json(workers)
}

pub async fn handle_worker_status(
    Path(name): Path<String>,
    Extension(supervisor): Extension<Arc<WorkerSupervisor>>,
) -> Result<Json<WorkerSummary>, SupervisorError> {
    supervisor
        .worker_status(&name)
        .await
        .map(Json)
        .ok_or(SupervisorError::NotFound(name))
}

pub async fn handle_start_worker(
    Path(name): Path<String>,
    Extension(supervisor): Extension<Arc<WorkerSupervisor>>,
) -> Result<Json<MessageBody>, SupervisorError> {
    supervisor.start_worker(&name).await?;
    Ok(Json(MessageBody::new(format!(
        "Worker {} started successfully",
        name
    ))))
}

pub async fn handle_stop_worker(
    Path(name): Path<String>,
    Extension(supervisor): Extension<Arc<WorkerSupervisor>>,
) -> Json<MessageBody> {
    let outcome = supervisor.stop_worker(&name).await;
    tracing::debug!("Stop of {} via API: {:?}", name, outcome);
    Json(MessageBody::new(format!("Worker {} stopped", name)))
}
