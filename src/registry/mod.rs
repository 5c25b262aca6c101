//! Versioned Project Registry
//!
//! On-disk catalog of uploaded handler artifacts.
//!
//! ## Layout
//! `<root>/<project>/<version>/handler.json`, possibly beside other files extracted
//! from an uploaded archive. A version directory only exists once its artifact has
//! been validated, so listing the tree is listing the catalog.
//!
//! ## Core Concepts
//! - **Names**: projects and versions are single safe path segments.
//! - **`latest`**: resolved by semantic-version ordering over the stored versions;
//!   names that are not valid semver are ignored.
//! - **Deletion**: a single version, or the whole project with `all`.

pub mod handlers;
pub mod store;

pub use store::{
    ALL, ARTIFACT_FILE, LATEST, Registry, VersionSelector, pick_latest, validate_segment,
    validate_upload_version,
};
