use super::unpack::Unpacker;
use crate::error::{HostError, HostResult};
use crate::registry::{ARTIFACT_FILE, Registry, validate_segment, validate_upload_version};
use crate::validator::Validator;

use axum::body::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Temporary name of an uploaded archive inside its version directory.
pub const UPLOAD_ARCHIVE: &str = "upload.zip";

pub const DEFAULT_FAILURE_MESSAGE: &str = "Invalid handler application";

pub const SUCCESS_MESSAGE: &str = "Project uploaded and validated successfully";

/// One uploaded file, as received from the client.
#[derive(Debug, Clone)]
pub struct UploadPayload {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl UploadPayload {
    pub fn is_archive(&self) -> bool {
        let zip_type = self
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.eq_ignore_ascii_case("application/zip"));
        let zip_name = self
            .filename
            .as_deref()
            .is_some_and(|name| name.to_ascii_lowercase().ends_with(".zip"));
        zip_type || zip_name
    }
}

const CLAIM_ATTEMPTS: u32 = 5;

pub struct UploadPipeline {
    registry: Arc<Registry>,
    validator: Arc<Validator>,
    unpacker: Arc<dyn Unpacker>,
}

impl UploadPipeline {
    pub fn new(
        registry: Arc<Registry>,
        validator: Arc<Validator>,
        unpacker: Arc<dyn Unpacker>,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry,
            validator,
            unpacker,
        })
    }

    /// Stores and validates `payload` as `name`/`version`. Returns the committed directory.
    pub async fn upload(
        &self,
        name: &str,
        version: &str,
        payload: UploadPayload,
    ) -> HostResult<PathBuf> {
        validate_segment("project name", name)?;
        validate_upload_version(version)?;

        let project_dir = self.registry.project_dir(name);
        let version_dir = self.registry.version_dir(name, version);
        let created_project = claim(&project_dir, &version_dir).await?;

        match self.persist_and_validate(&version_dir, payload).await {
            Ok(()) => {
                tracing::info!("Committed {}/{}", name, version);
                Ok(version_dir)
            }
            Err(e) => {
                tracing::warn!("Upload of {}/{} rejected: {}", name, version, e);
                rollback(&project_dir, &version_dir, created_project).await;
                Err(e)
            }
        }
    }

    async fn persist_and_validate(&self, version_dir: &Path, payload: UploadPayload) -> HostResult<()> {
        let artifact = version_dir.join(ARTIFACT_FILE);

        if payload.is_archive() {
            let archive = version_dir.join(UPLOAD_ARCHIVE);
            tokio::fs::write(&archive, &payload.bytes).await?;

            let unpacked = self.unpacker.unpack(&archive, version_dir).await;
            if let Err(e) = tokio::fs::remove_file(&archive).await {
                tracing::warn!("Failed to remove {}: {}", archive.display(), e);
            }
            unpacked.map_err(|e| HostError::BadRequest(e.to_string()))?;
        } else {
            tokio::fs::write(&artifact, &payload.bytes).await?;
        }

        match self.validator.verdict(&artifact).await.into_error() {
            None => Ok(()),
            Some(e) => Err(with_default_message(e)),
        }
    }
}

/// Creates `version_dir` atomically: of two concurrent uploads, exactly one claims it.
/// Returns whether the project directory was created by this claim.
async fn claim(project_dir: &Path, version_dir: &Path) -> HostResult<bool> {
    let mut attempt = 1;
    loop {
        let created_project = match tokio::fs::create_dir(project_dir).await {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => false,
            Err(e) => return Err(e.into()),
        };

        match tokio::fs::create_dir(version_dir).await {
            Ok(()) => return Ok(created_project),
            // A concurrent rollback removed the empty project in between.
            Err(e) if e.kind() == ErrorKind::NotFound && attempt < CLAIM_ATTEMPTS => {
                tracing::debug!("Project {} vanished while claiming, retrying", project_dir.display());
                attempt += 1;
            }
            Err(e) => {
                if created_project {
                    let _ = tokio::fs::remove_dir(project_dir).await;
                }
                return Err(match e.kind() {
                    ErrorKind::AlreadyExists => HostError::Conflict("Project already exists".to_string()),
                    _ => e.into(),
                });
            }
        }
    }
}

async fn rollback(project_dir: &Path, version_dir: &Path, created_project: bool) {
    if let Err(e) = tokio::fs::remove_dir_all(version_dir).await {
        tracing::error!("Rollback of {} failed: {}", version_dir.display(), e);
    }

    // Non-recursive: a concurrent upload may already own a sibling version.
    if created_project {
        let _ = tokio::fs::remove_dir(project_dir).await;
    }
}

fn with_default_message(error: HostError) -> HostError {
    match error {
        HostError::ValidationFailure(m) if m.trim().is_empty() => {
            HostError::ValidationFailure(DEFAULT_FAILURE_MESSAGE.to_string())
        }
        HostError::ValidationError(m) if m.trim().is_empty() => {
            HostError::ValidationError(DEFAULT_FAILURE_MESSAGE.to_string())
        }
        HostError::UnitCrash(m) if m.trim().is_empty() => {
            HostError::UnitCrash(DEFAULT_FAILURE_MESSAGE.to_string())
        }
        other => other,
    }
}
