use crate::error::{HostError, HostResult};

use semver::{Version, VersionReq};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Canonical artifact file inside a version directory.
pub const ARTIFACT_FILE: &str = "handler.json";

/// Version alias resolved to the highest stored semantic version.
pub const LATEST: &str = "latest";

/// Version alias addressing every version of a project at once.
pub const ALL: &str = "all";

/// Which part of a project a deletion targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSelector {
    All,
    Version(String),
}

impl VersionSelector {
    pub fn parse(raw: &str) -> Self {
        if raw == ALL {
            VersionSelector::All
        } else {
            VersionSelector::Version(raw.to_string())
        }
    }
}

pub struct Registry {
    root: PathBuf,
}

impl Registry {
    /// Opens the registry rooted at `root`, creating the directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> HostResult<Arc<Self>> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        tracing::info!("Registry opened at {}", root.display());
        Ok(Arc::new(Self { root }))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn project_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn version_dir(&self, name: &str, version: &str) -> PathBuf {
        self.root.join(name).join(version)
    }

    pub fn artifact_path(&self, name: &str, version: &str) -> PathBuf {
        self.version_dir(name, version).join(ARTIFACT_FILE)
    }

    /// Immediate child directory names of `path`, sorted. Plain files are skipped.
    pub async fn list(path: &Path) -> HostResult<Vec<String>> {
        let mut entries = tokio::fs::read_dir(path).await?;
        let mut names = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }

        names.sort();
        Ok(names)
    }

    pub async fn list_projects(&self) -> HostResult<Vec<String>> {
        Self::list(&self.root).await
    }

    pub async fn list_versions(&self, name: &str) -> HostResult<Vec<String>> {
        validate_segment("project name", name)?;

        match Self::list(&self.project_dir(name)).await {
            Err(HostError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                Err(HostError::NotFound(format!("Project {} not found", name)))
            }
            other => other,
        }
    }

    /// Removes one version, or the whole project for [`VersionSelector::All`].
    /// Returns the removed directory.
    pub async fn delete(&self, name: &str, selector: &VersionSelector) -> HostResult<PathBuf> {
        validate_segment("project name", name)?;

        let target = match selector {
            VersionSelector::All => self.project_dir(name),
            VersionSelector::Version(version) => {
                validate_segment("version", version)?;
                self.version_dir(name, version)
            }
        };

        match tokio::fs::remove_dir_all(&target).await {
            Ok(()) => {
                tracing::info!("Deleted {}", target.display());
                Ok(target)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(HostError::NotFound("Project not found".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Highest stored version under the `*` requirement.
    pub async fn resolve_latest(&self, name: &str) -> HostResult<String> {
        let versions = match self.list_versions(name).await {
            Ok(versions) => versions,
            Err(HostError::NotFound(_)) => Vec::new(),
            Err(e) => return Err(e),
        };

        pick_latest(&versions).ok_or_else(|| HostError::NotFound("No versions found".to_string()))
    }

    /// Maps a requested version (possibly `latest`) to a concrete stored one.
    pub async fn resolve(&self, name: &str, version: &str) -> HostResult<String> {
        validate_segment("project name", name)?;

        if version == LATEST {
            return self.resolve_latest(name).await;
        }

        validate_segment("version", version)?;
        Ok(version.to_string())
    }
}

/// Picks the maximum version satisfying `*`. Pre-releases never satisfy `*`.
pub fn pick_latest(versions: &[String]) -> Option<String> {
    versions
        .iter()
        .filter_map(|raw| Version::parse(raw).ok().map(|parsed| (parsed, raw)))
        .filter(|(parsed, _)| VersionReq::STAR.matches(parsed))
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, raw)| raw.clone())
}

/// A name is accepted when it is one safe path segment.
pub fn validate_segment(kind: &str, value: &str) -> HostResult<()> {
    let valid = !value.is_empty()
        && !value.starts_with('.')
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '+'));

    if valid {
        Ok(())
    } else {
        Err(HostError::InvalidName(format!("Invalid {}: {:?}", kind, value)))
    }
}

/// Versions that can be uploaded: safe segments that are not an alias.
pub fn validate_upload_version(version: &str) -> HostResult<()> {
    validate_segment("version", version)?;

    if version == LATEST || version == ALL {
        return Err(HostError::InvalidName(format!(
            "Version {:?} is reserved",
            version
        )));
    }

    Ok(())
}
