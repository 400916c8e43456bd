//! # PromptWeaver
//!
//! Turns a short natural-language instruction into a structured,
//! execution-ready Markdown prompt by running it through a fixed sequence of
//! model-backed stages.
//!
//! - **Two modes**: `Lean` (analyze, draft, finalize) and `Full` (adds
//!   research, critique and validation)
//! - **Always a document**: backend failures degrade to a deterministic
//!   fallback instead of surfacing an error
//! - **Pluggable backend**: any [`backend::CompletionBackend`]; OpenRouter is
//!   built in behind the `openrouter` feature
//! - **Observable**: typed events through an injected
//!   [`events::EventSink`], plus `tracing` spans per run
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use promptweaver::prelude::*;
//!
//! let config = WeaverConfig::load_with_env(Path::new("promptweaver.toml"))?;
//! let outcome = run_pipeline(&config, "Explain quantum computing", config.mode()).await;
//! println!("{}", outcome.into_document()?);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod backend;
pub mod config;
pub mod context;
pub mod core;
pub mod corpus;
pub mod errors;
pub mod events;
pub mod observability;
pub mod output;
pub mod pipeline;
pub mod presets;
pub mod stages;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    #[cfg(feature = "openrouter")]
    pub use crate::backend::OpenRouterBackend;
    pub use crate::backend::{CompletionBackend, CompletionRequest};
    pub use crate::config::{set_mode, WeaverConfig};
    pub use crate::core::{Mode, StageOutput, StageStatus};
    pub use crate::corpus::{load_directory, ReferenceCorpus, ReferenceDocument, StaticCorpus};
    pub use crate::errors::{
        BackendError, ConfigError, FailureInfo, PipelineValidationError, WeaverError,
    };
    pub use crate::events::{
        CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, PipelineEvent,
    };
    pub use crate::output::OutputWriter;
    #[cfg(feature = "openrouter")]
    pub use crate::pipeline::run_pipeline;
    pub use crate::pipeline::{
        build, fallback_document, Orchestrator, PipelineOutcome, RetryConfig, RunReport,
        RunSettings, StagePlan,
    };
    pub use crate::stages::{Stage, StageName};
}
