use crate::error::OutputError;
use crate::runner::{RunOutcome, RunStatus, StageStatus};
use chrono::{Local, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Machine-readable record of one run, written next to the markdown
/// report so CI can read the outcome without parsing prose.
#[derive(Debug, Serialize, Deserialize)]
pub struct RunSummary {
    pub timestamp: String,
    pub run_id: String,
    pub pr: String,
    pub status: String,
    pub duration_sec: f64,
    pub exit_code: i32,
    pub stages: Vec<StageSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StageSummary {
    pub stage: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub attempts: u32,
    pub duration_sec: f64,
}

/// Write the rendered report and the run summary under a dated
/// directory (`reports/YYYY-MM-DD/`). A failed publish still leaves a
/// local copy of everything the run computed.
pub fn write_run_files(report_dir: &Path, outcome: &RunOutcome) -> Result<PathBuf, OutputError> {
    let dated = report_dir.join(Local::now().format("%Y-%m-%d").to_string());
    fs::create_dir_all(&dated).map_err(OutputError::CreateDir)?;

    if let Some(document) = &outcome.document {
        let md_path = dated.join(format!("{}.md", outcome.run_id));
        fs::write(&md_path, document.render()).map_err(OutputError::WriteReport)?;
    }

    let summary = build_summary(outcome);
    let json_path = dated.join(format!("{}.json", outcome.run_id));
    let json = serde_json::to_string_pretty(&summary)?;
    fs::write(&json_path, json).map_err(OutputError::WriteReport)?;

    Ok(dated)
}

fn build_summary(outcome: &RunOutcome) -> RunSummary {
    let stages = outcome
        .stages
        .iter()
        .map(|report| {
            let (status, reason) = match &report.status {
                StageStatus::Succeeded => ("succeeded".to_string(), None),
                StageStatus::Failed { reason, .. } => ("failed".to_string(), Some(reason.clone())),
                StageStatus::Skipped { cause } => ("skipped".to_string(), Some(cause.clone())),
            };
            StageSummary {
                stage: report.id.to_string(),
                status,
                reason,
                attempts: report.attempts,
                duration_sec: report.duration.as_secs_f64(),
            }
        })
        .collect();

    RunSummary {
        timestamp: Utc::now().to_rfc3339(),
        run_id: outcome.run_id.to_string(),
        pr: outcome.pr.to_string(),
        status: outcome.status.to_string(),
        duration_sec: outcome.total_duration.as_secs_f64(),
        exit_code: if outcome.status == RunStatus::Completed {
            0
        } else {
            1
        },
        stages,
    }
}
