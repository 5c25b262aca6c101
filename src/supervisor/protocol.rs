//! Runner Messages
//!
//! Tagged with `type` in kebab-case; field names are camelCase.

use super::types::WorkerConfig;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartPayload {
    pub name: String,
    pub port: u16,
    pub artifact_path: PathBuf,
    pub health_check: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl From<&WorkerConfig> for StartPayload {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            name: config.name.clone(),
            port: config.port,
            artifact_path: config.artifact_path.clone(),
            health_check: config.health_check,
            prefix: config.prefix.clone(),
            env: config.env.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RunnerCommand {
    Start(StartPayload),
    Terminate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RunnerEvent {
    Started { message: String },
    Error { error: String },
    Shutdown { message: String },
    ShutdownError { error: String },
}
