//! Isolated Execution Units
//!
//! An isolated unit is an independently scheduled execution context that the
//! coordinator can only reach through messages and a hard-kill primitive.
//!
//! ## Model
//! - **Thread + runtime**: every unit owns a dedicated OS thread running its own
//!   current-thread tokio runtime, so a unit that hogs or blocks its executor cannot
//!   stall the coordinator or other units.
//! - **Channels**: the coordinator holds the sending half of a typed command channel
//!   and the receiving half of a typed signal channel. Nothing else crosses the boundary.
//! - **Kill switch**: `terminate` fires a oneshot that makes the unit drop its entry
//!   future and tear down its runtime, cancelling every task it spawned (listeners included).
//! - **Boundary reporting**: a unit always ends with exactly one `Exited` or `Crashed`
//!   signal, so a unit that dies silently is still observable.
//!
//! ## Submodules
//! - **`types`**: signals, exit kinds and errors.
//! - **`handle`**: `IsolatedUnit::spawn`, the coordinator-side `UnitHandle` and the
//!   unit-side `UnitContext`.

pub mod handle;
pub mod types;

pub use handle::{IsolatedUnit, UnitContext, UnitHandle};
pub use types::{UnitError, UnitExit, UnitSignal};
