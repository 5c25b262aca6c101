//! Artifact Validator
//!
//! Decides whether an uploaded artifact satisfies the handler contract, without ever
//! loading it inside the coordinator.
//!
//! ## Workflow
//! 1. A fresh isolated unit is spawned per validation, carrying only the `Loader`.
//! 2. The coordinator sends `validate{modulePath}` and arms a timeout (5 s by default).
//! 3. The unit loads the artifact and answers with exactly one verdict event.
//! 4. The coordinator terminates the unit unconditionally and reduces the outcome to a
//!    [`ValidationResult`].
//!
//! ## Submodules
//! - **`protocol`**: command and event messages exchanged with the unit.
//! - **`unit`**: the entry point running inside the unit.
//! - **`validator`**: the coordinator side and its [`Verdict`].

pub mod protocol;
pub mod unit;
pub mod validator;

pub use protocol::{ValidatorCommand, ValidatorEvent};
pub use validator::{DEFAULT_VALIDATE_TIMEOUT, ValidationResult, Validator, Verdict};
