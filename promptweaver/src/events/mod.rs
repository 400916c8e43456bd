//! Pipeline event emission.
//!
//! The orchestrator reports its progress as [`PipelineEvent`]s through an
//! injected [`EventSink`]. The default sink discards everything; the logging
//! sink forwards to `tracing`; the collecting sink records events for tests.

mod event;
mod sink;

pub use event::PipelineEvent;
pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
