//! Core domain model types for promptweaver.
//!
//! This module contains the fundamental types used throughout the crate:
//! - The operating mode selector
//! - Stage status enum
//! - The write-once stage output record

mod mode;
mod output;
mod status;

pub use mode::Mode;
pub use output::StageOutput;
pub use status::StageStatus;
