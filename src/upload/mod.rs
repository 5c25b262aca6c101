//! Upload Pipeline
//!
//! Turns an uploaded payload into a committed registry version, or into nothing.
//!
//! ## Workflow
//! 1. **Claim**: the version directory is created atomically; an existing one is a conflict.
//! 2. **Persist**: a raw artifact is written as `handler.json`; an archive is written to a
//!    temporary file, extracted in place by the [`Unpacker`], and the temporary file removed.
//! 3. **Validate**: the [`Validator`](crate::validator::Validator) checks the artifact in an
//!    isolated unit.
//! 4. **Commit or roll back**: on any failure after the claim, the version directory is
//!    removed, plus the project directory if this upload created it and it is empty.
//!
//! ## Submodules
//! - **`pipeline`**: the steps above.
//! - **`unpack`**: archive extraction behind a trait, backed by the `unzip` tool.
//! - **`handlers`**: the multipart HTTP endpoint.

pub mod handlers;
pub mod pipeline;
pub mod unpack;

pub use pipeline::{UploadPayload, UploadPipeline};
pub use unpack::{UnpackError, Unpacker, UnzipCommand};
