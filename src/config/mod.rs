//! Host Configuration
//!
//! Loaded from environment variables via `envy`; every field maps to the upper-case
//! variable of the same name:
//!   - `MAIN_PORT`                  (default `3000`)
//!   - `BIND_HOST`                  (default `0.0.0.0`)
//!   - `APP_ROOT`                   (default `./app_data`)
//!   - `WORKERS_FILE`               (optional TOML file with `[[workers]]` tables)
//!   - `UPLOAD_LIMIT_BYTES`         (default 50 MiB)
//!   - `VALIDATE_TIMEOUT_SECS`      (default `5`)
//!   - `WORKER_SHUTDOWN_SECS`       (default `30`)
//!   - `WORKER_STOP_WAIT_SECS`      (default `35`, must exceed the shutdown bound)
//!   - `WORKER_START_TIMEOUT_SECS`  (optional, unbounded when unset)

use crate::supervisor::{SupervisorTimeouts, WorkerConfig};

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid environment: {0}")]
    Env(#[from] envy::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("cannot read workers file {path}: {source}")]
    WorkersRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse workers file {path}: {source}")]
    WorkersParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostConfig {
    #[serde(default = "default_main_port")]
    pub main_port: u16,

    #[serde(default = "default_bind_host")]
    pub bind_host: String,

    /// Registry root.
    #[serde(default = "default_app_root")]
    pub app_root: PathBuf,

    #[serde(default)]
    pub workers_file: Option<PathBuf>,

    #[serde(default = "default_upload_limit")]
    pub upload_limit_bytes: usize,

    #[serde(default = "default_validate_timeout")]
    pub validate_timeout_secs: u64,

    #[serde(default = "default_worker_shutdown")]
    pub worker_shutdown_secs: u64,

    #[serde(default = "default_worker_stop_wait")]
    pub worker_stop_wait_secs: u64,

    #[serde(default)]
    pub worker_start_timeout_secs: Option<u64>,
}

fn default_main_port() -> u16 {
    3000
}

fn default_bind_host() -> String {
    "0.0.0.0".to_string()
}

fn default_app_root() -> PathBuf {
    PathBuf::from("./app_data")
}

fn default_upload_limit() -> usize {
    50 * 1024 * 1024
}

fn default_validate_timeout() -> u64 {
    5
}

fn default_worker_shutdown() -> u64 {
    30
}

fn default_worker_stop_wait() -> u64 {
    35
}

#[derive(Debug, Deserialize)]
struct WorkersFile {
    #[serde(default)]
    workers: Vec<WorkerConfig>,
}

impl HostConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config: Self = envy::from_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_iter<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: Self = envy::from_iter(vars)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_stop_wait_secs <= self.worker_shutdown_secs {
            return Err(ConfigError::Invalid(format!(
                "WORKER_STOP_WAIT_SECS ({}) must be greater than WORKER_SHUTDOWN_SECS ({})",
                self.worker_stop_wait_secs, self.worker_shutdown_secs
            )));
        }
        if self.validate_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "VALIDATE_TIMEOUT_SECS must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.main_port)
    }

    pub fn validate_timeout(&self) -> Duration {
        Duration::from_secs(self.validate_timeout_secs)
    }

    pub fn supervisor_timeouts(&self) -> SupervisorTimeouts {
        SupervisorTimeouts {
            graceful_shutdown: Duration::from_secs(self.worker_shutdown_secs),
            stop_wait: Duration::from_secs(self.worker_stop_wait_secs),
            start: self.worker_start_timeout_secs.map(Duration::from_secs),
        }
    }

    /// Worker configs from `WORKERS_FILE`, or none when unset.
    pub fn load_workers(&self) -> Result<Vec<WorkerConfig>, ConfigError> {
        let Some(path) = &self.workers_file else {
            return Ok(Vec::new());
        };

        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::WorkersRead {
            path: path.clone(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        parse_workers(&raw, base).map_err(|source| ConfigError::WorkersParse {
            path: path.clone(),
            source,
        })
    }
}

/// Parses a workers file. Relative artifact paths are taken relative to `base`.
pub fn parse_workers(raw: &str, base: &Path) -> Result<Vec<WorkerConfig>, toml::de::Error> {
    let file: WorkersFile = toml::from_str(raw)?;

    Ok(file
        .workers
        .into_iter()
        .map(|mut worker| {
            if worker.artifact_path.is_relative() {
                worker.artifact_path = base.join(&worker.artifact_path);
            }
            worker
        })
        .collect())
}
