//! Observability utilities.
//!
//! - Subscriber setup for the binary (`RUST_LOG`, pretty or JSON, stderr)
//! - The per-run tracing span
//! - A single wide summary event per finished run

mod logging;
mod summary;

pub use logging::{init_tracing, run_span, LogFormat, DEFAULT_FILTER};
pub use summary::{emit_run_summary, run_summary};
