//! Run-scoped state.
//!
//! This module provides:
//! - The run identity used to correlate events and logs
//! - A write-once output bag keyed by stage
//! - A strict, dependency-scoped view of prior outputs
//! - The `Run` record that ties them together

mod bags;
mod identity;
mod inputs;
mod run;

pub use bags::OutputBag;
pub use identity::RunIdentity;
pub use inputs::StageInputs;
pub use run::Run;
