use super::{relativize, Finding, Severity};
use crate::error::ParserError;
use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize)]
struct BanditReport {
    #[serde(default)]
    results: Vec<BanditRow>,
}

#[derive(Deserialize)]
struct BanditRow {
    filename: String,
    line_number: u32,
    issue_severity: String,
    issue_text: String,
    test_id: String,
}

/// Parse `bandit -f json` output into findings.
pub fn parse_bandit_findings(raw: &str, root: &Path) -> Result<Vec<Finding>, ParserError> {
    let report: BanditReport = serde_json::from_str(raw)?;

    Ok(report
        .results
        .into_iter()
        .map(|row| Finding {
            file: relativize(&row.filename, root),
            // Bandit reports UNDEFINED severity for some heuristics
            severity: row.issue_severity.parse().unwrap_or(Severity::Info),
            line: row.line_number,
            code: Some(row.test_id),
            message: row.issue_text,
        })
        .collect())
}
