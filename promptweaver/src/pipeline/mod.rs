//! Pipeline building and execution.
//!
//! This module provides:
//! - Stage plans per mode, with validation
//! - The fixed-delay retry wrapper
//! - Final document cleanup and the deterministic fallback
//! - The orchestrator that ties them together

mod builder;
mod document;
mod fallback;
mod orchestrator;
mod retry;


pub use builder::{build, StagePlan, StagePlanBuilder};
pub use document::{
    finalize_document, first_heading, is_error_marker, simple_title, DocumentRejection,
    DIRECTIVE_LINE, ERROR_SENTINEL,
};
pub use fallback::{fallback_document, FALLBACK_SECTIONS};
#[cfg(feature = "openrouter")]
pub use orchestrator::run_pipeline;
pub use orchestrator::{Orchestrator, PipelineOutcome, RunReport, RunSettings};
pub use retry::{
    should_retry, with_retry, with_retry_notify, Attempted, RetryConfig, RetryDecision,
    RetryState, Retryable,
};
