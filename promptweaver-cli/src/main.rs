//! PromptWeaver command-line front-end.
//!
//! Prints the generated document to stdout; progress and diagnostics go to
//! stderr. See [`exit_codes`] for the process status contract.

mod cli;
mod exit_codes;
mod input;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command, GenerateArgs, ModeAction};
use promptweaver::config::{resolve_mode, set_mode, ModeSource, WeaverConfig};
use promptweaver::core::Mode;
use promptweaver::observability::{emit_run_summary, init_tracing};
use promptweaver::output::OutputWriter;
use promptweaver::pipeline::{build, run_pipeline, PipelineOutcome, RunReport};
use promptweaver::presets::PRESETS;
use std::path::Path;

#[tokio::main]
async fn main() {
    let code = match run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            exit_codes::FAILURE
        }
    };
    std::process::exit(code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();

    // A missing .env is fine; the environment may already be set.
    let _ = dotenv::dotenv();

    if let Err(err) = init_tracing(cli.log_format) {
        eprintln!("Warning: could not initialize logging: {err}");
    }

    match cli.command {
        Command::Generate(args) => cmd_generate(&cli.config, args).await,
        Command::Mode { action } => cmd_mode(&cli.config, action),
        Command::Presets => {
            cmd_presets();
            Ok(exit_codes::OK)
        }
    }
}

async fn cmd_generate(config_path: &Path, args: GenerateArgs) -> Result<i32> {
    let mut config = WeaverConfig::load_with_env(config_path)
        .with_context(|| format!("load {}", config_path.display()))?;
    if args.no_directive {
        config.append_directive = false;
    }
    let mode = args.mode.unwrap_or_else(|| config.mode());

    let instruction = match input::from_args(args.instruction, args.preset.as_deref())? {
        Some(instruction) => instruction,
        None => match input::read_stdin()? {
            Some(instruction) => instruction,
            None => {
                eprintln!("No input provided");
                return Ok(exit_codes::FAILURE);
            }
        },
    };

    tracing::info!(%mode, chars = instruction.len(), "Generating prompt");
    let outcome = run_pipeline(&config, &instruction, mode).await;
    emit_run_summary(&outcome);

    let document = match outcome {
        PipelineOutcome::ConfigurationError(err) => {
            eprintln!("Configuration error: {err}");
            eprintln!("Set OPENROUTER_API_KEY in the environment or a .env file.");
            return Ok(exit_codes::CONFIGURATION);
        }
        PipelineOutcome::Completed { document, report } => {
            if args.show_stages {
                print_report(&report);
            }
            document
        }
        PipelineOutcome::Degraded {
            document,
            failure,
            report,
        } => {
            if args.show_stages {
                print_report(&report);
            }
            eprintln!(
                "Warning: generation failed ({}); returning the fallback document",
                failure.message
            );
            document
        }
    };

    println!("{document}");

    if !args.no_save {
        match OutputWriter::new(&config.output_dir).save(&document, &instruction) {
            Ok(path) => eprintln!("Saved to {}", path.display()),
            Err(err) => tracing::warn!(error = %err, "Could not save the document"),
        }
    }
    Ok(exit_codes::OK)
}

fn cmd_mode(config_path: &Path, action: ModeAction) -> Result<i32> {
    if let ModeAction::Set { mode } = action {
        set_mode(config_path, mode)
            .with_context(|| format!("update {}", config_path.display()))?;
        eprintln!("Saved mode '{mode}' to {}", config_path.display());
    }

    let (mode, source) = resolve_mode(config_path, |key| std::env::var(key).ok())
        .with_context(|| format!("load {}", config_path.display()))?;
    if let ModeAction::Set { mode: saved } = action {
        if let Some(warning) = override_warning(saved, mode, source) {
            eprintln!("Warning: {warning}");
        }
    }
    println!("{}", describe_mode(mode, source)?);
    Ok(exit_codes::OK)
}

fn override_warning(saved: Mode, effective: Mode, source: ModeSource) -> Option<String> {
    (saved != effective && source == ModeSource::Environment).then(|| {
        format!(
            "the {source} selects '{effective}', so the saved mode '{saved}' has no effect \
             until it is unset (check your .env file)"
        )
    })
}

fn describe_mode(mode: Mode, source: ModeSource) -> Result<String> {
    let plan = build(mode).context("build stage plan")?;
    let stages: Vec<&str> = plan.names().iter().map(|s| s.as_str()).collect();
    Ok(format!(
        "Mode: {mode} (from {source})\nStages: {}",
        stages.join(" -> ")
    ))
}

fn cmd_presets() {
    for preset in &PRESETS {
        println!("{}\n    {}\n", preset.name, preset.instruction);
    }
}

fn print_report(report: &RunReport) {
    eprintln!("Run {} ({}), {:.0} ms", report.run_id, report.mode, report.duration_ms);
    for (name, status) in report.statuses() {
        let (name, status) = (name.as_str(), status.to_string());
        match report.stages.iter().find(|o| o.stage == name) {
            Some(output) => eprintln!(
                "  {name:<9} {status:<9} attempts={} {:.0} ms, {} chars",
                output.attempts,
                output.duration_ms,
                output.text.len()
            ),
            None => eprintln!("  {name:<9} {status}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_describe_mode() {
        assert_eq!(
            describe_mode(Mode::Lean, ModeSource::Default).unwrap(),
            "Mode: lean (from default)\nStages: analyze -> draft -> finalize"
        );
        let full = describe_mode(Mode::Full, ModeSource::Environment).unwrap();
        assert!(full.starts_with("Mode: full (from USE_LEAN_MODE environment variable)"));
        assert!(full.ends_with("draft -> critique -> validate -> finalize"));
    }

    #[test]
    fn test_override_warning() {
        let warning = override_warning(Mode::Full, Mode::Lean, ModeSource::Environment).unwrap();
        assert!(warning.contains("USE_LEAN_MODE"));
        assert!(warning.contains("'full'"));

        assert_eq!(override_warning(Mode::Full, Mode::Full, ModeSource::File), None);
        assert_eq!(override_warning(Mode::Lean, Mode::Lean, ModeSource::Environment), None);
    }
}
