use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio::process::Command;

#[derive(Debug, thiserror::Error)]
pub enum UnpackError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive extraction failed ({status}): {stderr}")]
    Failed { status: String, stderr: String },
}

/// Extracts an archive into a directory.
#[async_trait]
pub trait Unpacker: Send + Sync {
    async fn unpack(&self, archive: &Path, dest: &Path) -> Result<(), UnpackError>;
}

/// Runs `unzip -o <archive>` inside the destination directory.
#[derive(Debug, Clone)]
pub struct UnzipCommand {
    program: String,
}

impl UnzipCommand {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_program(program: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            program: program.into(),
        })
    }
}

impl Default for UnzipCommand {
    fn default() -> Self {
        Self {
            program: "unzip".to_string(),
        }
    }
}

#[async_trait]
impl Unpacker for UnzipCommand {
    async fn unpack(&self, archive: &Path, dest: &Path) -> Result<(), UnpackError> {
        let output = Command::new(&self.program)
            .arg("-o")
            .arg("-q")
            .arg(archive)
            .current_dir(dest)
            .output()
            .await
            .map_err(|source| UnpackError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(UnpackError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        tracing::debug!("Unpacked {} into {}", archive.display(), dest.display());
        Ok(())
    }
}
