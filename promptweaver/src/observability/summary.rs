//! One wide event per finished run.

use crate::pipeline::PipelineOutcome;
use serde_json::json;
use std::collections::BTreeMap;

/// Builds the summary payload for an outcome.
#[must_use]
pub fn run_summary(outcome: &PipelineOutcome) -> serde_json::Value {
    let status = if outcome.is_completed() {
        "completed"
    } else if outcome.is_degraded() {
        "degraded"
    } else {
        "configuration_error"
    };

    let Some(report) = outcome.report() else {
        return json!({ "status": status });
    };

    let mut stage_counts: BTreeMap<String, u32> = BTreeMap::new();
    for (_, s) in report.statuses() {
        *stage_counts.entry(s.to_string()).or_insert(0) += 1;
    }

    let stage_details: Vec<serde_json::Value> = report
        .stages
        .iter()
        .map(|output| {
            json!({
                "stage": output.stage,
                "attempts": output.attempts,
                "duration_ms": output.duration_ms,
                "output_chars": output.text.len(),
            })
        })
        .collect();

    let mut payload = json!({
        "pipeline_run_id": report.run_id.to_string(),
        "mode": report.mode,
        "status": status,
        "duration_ms": report.duration_ms,
        "stage_counts": stage_counts,
        "stage_details": stage_details,
    });
    if let Some(failure) = outcome.failure() {
        payload["failure"] = json!(failure);
    }
    payload
}

/// Logs the summary of `outcome` as a single structured line.
pub fn emit_run_summary(outcome: &PipelineOutcome) {
    let payload = run_summary(outcome);
    tracing::info!(event = "pipeline.wide", payload = %payload, "Run summary");
}
