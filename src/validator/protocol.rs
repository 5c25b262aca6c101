//! Validator Messages
//!
//! Tagged with `type` in kebab-case; field names are camelCase.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ValidatorCommand {
    Validate { module_path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ValidatorEvent {
    /// Contract satisfied.
    ValidationSuccess,
    /// Loaded, but the contract check failed.
    ValidationFailed { message: String },
    /// The load itself failed.
    ValidationError { error: String },
}
