use super::pipeline::{SUCCESS_MESSAGE, UploadPayload, UploadPipeline};
use crate::error::{HostError, HostResult, MessageBody};
use crate::registry::handlers::VersionQuery;

use axum::extract::{Multipart, Path, Query};
use axum::{Extension, Json};
use std::sync::Arc;

const FILE_FIELD: &str = "file";

pub async fn handle_upload(
    Path(name): Path<String>,
    Query(query): Query<VersionQuery>,
    Extension(pipeline): Extension<Arc<UploadPipeline>>,
    mut multipart: Multipart,
) -> HostResult<Json<MessageBody>> {
    let version = query
        .version
        .ok_or_else(|| HostError::BadRequest("Missing version query parameter".to_string()))?;

    let payload = read_file_field(&mut multipart).await?;
    tracing::info!(
        "Upload {}/{} ({} bytes, {:?})",
        name,
        version,
        payload.bytes.len(),
        payload.filename
    );

    pipeline.upload(&name, &version, payload).await?;
    Ok(Json(MessageBody::new(SUCCESS_MESSAGE)))
}

async fn read_file_field(multipart: &mut Multipart) -> HostResult<UploadPayload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| HostError::BadRequest(e.to_string()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| HostError::BadRequest(e.to_string()))?;

        return Ok(UploadPayload {
            filename,
            content_type,
            bytes,
        });
    }

    Err(HostError::BadRequest(format!(
        "Missing multipart field '{}'",
        FILE_FIELD
    )))
}
