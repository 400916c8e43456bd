//! Testing utilities for promptweaver pipelines.
//!
//! This module provides:
//! - A scripted completion backend with fault injection
//! - Canned stage outputs
//! - Assertions for delivered documents and event ordering
//!
//! Compiled for the crate's own tests and behind the `testing` feature.

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_dependencies_respected, assert_ends_with_directive, assert_no_directive,
    assert_single_top_heading,
};
pub use fixtures::{canned_response, fast_retry, CANNED_FINAL, QUANTUM_INSTRUCTION};
pub use mocks::ScriptedBackend;
