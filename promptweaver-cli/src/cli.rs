//! Command-line definitions.

use clap::{Parser, Subcommand};
use promptweaver::config::DEFAULT_CONFIG_FILE;
use promptweaver::core::Mode;
use promptweaver::observability::LogFormat;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "promptweaver",
    version,
    about = "Turn a short instruction into a structured, execution-ready prompt"
)]
pub struct Cli {
    /// Configuration file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Log line format on stderr (pretty or json).
    #[arg(long, global = true, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a prompt document and print it to stdout.
    Generate(GenerateArgs),
    /// Show or change the persisted operating mode.
    Mode {
        #[command(subcommand)]
        action: ModeAction,
    },
    /// List the built-in preset instructions.
    Presets,
}

#[derive(Debug, clap::Args)]
pub struct GenerateArgs {
    /// The instruction. Read from stdin when omitted.
    pub instruction: Option<String>,

    /// Use a built-in preset as the instruction.
    #[arg(long, conflicts_with = "instruction")]
    pub preset: Option<String>,

    /// Override the configured mode for this run (lean or full).
    #[arg(long)]
    pub mode: Option<Mode>,

    /// Do not write the document to the output directory.
    #[arg(long)]
    pub no_save: bool,

    /// Print per-stage attempts and timings to stderr.
    #[arg(long)]
    pub show_stages: bool,

    /// Omit the closing execution directive line.
    #[arg(long)]
    pub no_directive: bool,
}

#[derive(Debug, Subcommand)]
pub enum ModeAction {
    /// Print the current mode and the stages it runs.
    Show,
    /// Persist a new mode (lean or full).
    Set {
        /// The mode to store.
        mode: Mode,
    },
}
