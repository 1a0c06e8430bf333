use crate::github::PrRef;
use crate::parser::{at_or_above, sort_findings, Finding, Severity};
use crate::runner::{ArtifactStore, StageId, StageReport, StageStatus};
use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use uuid::Uuid;

const REVIEW_TITLE: &str = "Code Review & Linting";
const SECURITY_TITLE: &str = "Security Audit";
const TESTS_TITLE: &str = "Test Execution & Coverage";

/// Findings below this severity never appear in the security section.
const SECURITY_FLOOR: Severity = Severity::Medium;

const LOG_CAP: usize = 8_000;

/// Everything the assembler reads. All of it is terminal by the time
/// assembly runs; the function is pure and deterministic over it.
pub struct ReportInput<'a> {
    pub run_id: Uuid,
    pub pr: &'a PrRef,
    pub generated_at: DateTime<Utc>,
    pub stages: &'a BTreeMap<StageId, StageReport>,
    pub artifacts: &'a ArtifactStore,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SectionState {
    Populated,
    Unavailable { reason: String },
}

#[derive(Debug, Clone)]
pub struct Section {
    pub title: &'static str,
    pub state: SectionState,
    pub body: String,
}

/// The consolidated review document. Always carries exactly three
/// sections; a section whose stage did not succeed says why instead of
/// being dropped.
#[derive(Debug, Clone)]
pub struct ReportDocument {
    pub run_id: Uuid,
    pub pr: String,
    pub generated_at: DateTime<Utc>,
    /// Changed files in scope, absent when the run never fetched any.
    pub files_reviewed: Option<usize>,
    pub pipeline: Vec<StageReport>,
    pub sections: Vec<Section>,
}

pub fn assemble(input: &ReportInput<'_>) -> ReportDocument {
    let pipeline = StageId::ALL
        .iter()
        .take(6) // assembly and publish are not terminal yet
        .filter_map(|id| input.stages.get(id).cloned())
        .collect();

    ReportDocument {
        run_id: input.run_id,
        pr: input.pr.to_string(),
        generated_at: input.generated_at,
        files_reviewed: input.artifacts.files.as_ref().map(|f| f.len()),
        pipeline,
        sections: vec![
            review_section(input),
            security_section(input),
            tests_section(input),
        ],
    }
}

impl ReportDocument {
    pub fn render(&self) -> String {
        let mut md = String::new();
        md.push_str("# Automated PR Review\n\n");
        md.push_str(&format!("**PR:** {}\n", self.pr));
        if let Some(count) = self.files_reviewed {
            md.push_str(&format!("**Files reviewed:** {}\n", count));
        }
        md.push_str(&format!("**Run:** {}\n", self.run_id));
        md.push_str(&format!(
            "**Generated:** {}\n\n",
            self.generated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        ));

        md.push_str("## Pipeline\n\n");
        md.push_str("| Stage | Status | Attempts | Duration |\n");
        md.push_str("|-------|--------|----------|----------|\n");
        for row in &self.pipeline {
            md.push_str(&format!(
                "| {} | {} | {} | {:.1}s |\n",
                row.id,
                status_cell(&row.status),
                row.attempts,
                row.duration.as_secs_f64()
            ));
        }
        md.push('\n');

        for section in &self.sections {
            md.push_str(&format!("## {}\n\n", section.title));
            if let SectionState::Unavailable { reason } = &section.state {
                md.push_str(&format!("> Not available: {}\n\n", reason));
            }
            if !section.body.trim().is_empty() {
                md.push_str(section.body.trim());
                md.push_str("\n\n");
            }
        }

        // Content digest marker so the posted comment is identifiable
        let digest = Sha256::digest(md.as_bytes());
        let fingerprint = format!("{:x}", digest)[..12].to_string();
        md.push_str(&format!(
            "<!-- autorev:run:{} fp:{} -->\n",
            self.run_id, fingerprint
        ));
        md
    }
}

fn status_cell(status: &StageStatus) -> String {
    match status {
        StageStatus::Succeeded => "✅ succeeded".to_string(),
        StageStatus::Failed { reason, .. } => format!("❌ failed ({})", reason),
        StageStatus::Skipped { cause } => format!("⏭️ skipped ({})", cause),
    }
}

/// Uniform "why is this section empty" phrasing, keyed by the stage's
/// terminal state.
fn availability(report: Option<&StageReport>) -> Result<(), String> {
    match report.map(|r| &r.status) {
        Some(StageStatus::Succeeded) => Ok(()),
        Some(StageStatus::Failed { reason, .. }) => Err(format!("failed: {}", reason)),
        Some(StageStatus::Skipped { cause }) => Err(format!("skipped: {}", cause)),
        None => Err("not executed".to_string()),
    }
}

fn review_section(input: &ReportInput<'_>) -> Section {
    let state = match availability(input.stages.get(&StageId::AiReview)) {
        Ok(()) => SectionState::Populated,
        Err(reason) => SectionState::Unavailable { reason },
    };

    let mut body = String::new();
    if state == SectionState::Populated {
        match &input.artifacts.review {
            Some(note) if !note.is_empty() => body.push_str(note.text.trim()),
            _ => body.push_str("_The model returned an empty review._"),
        }
    }

    // Lint findings ride along in this section whatever the AI review
    // did; the two stages fail independently.
    body.push_str("\n\n### Lint Findings\n\n");
    match availability(input.stages.get(&StageId::StaticAnalysis)) {
        Ok(()) => {
            let mut findings = input.artifacts.lint_findings.clone().unwrap_or_default();
            sort_findings(&mut findings);
            if findings.is_empty() {
                body.push_str("No lint findings.\n");
            } else {
                body.push_str(&render_findings(&findings));
            }
        }
        Err(reason) => body.push_str(&format!("_Not available: {}_\n", reason)),
    }

    Section {
        title: REVIEW_TITLE,
        state,
        body,
    }
}

fn security_section(input: &ReportInput<'_>) -> Section {
    match availability(input.stages.get(&StageId::SecurityScan)) {
        Ok(()) => {
            let all = input.artifacts.security_findings.clone().unwrap_or_default();
            let mut findings = at_or_above(&all, SECURITY_FLOOR);
            sort_findings(&mut findings);
            let body = if findings.is_empty() {
                "No major security vulnerabilities found.\n".to_string()
            } else {
                render_findings(&findings)
            };
            Section {
                title: SECURITY_TITLE,
                state: SectionState::Populated,
                body,
            }
        }
        Err(reason) => Section {
            title: SECURITY_TITLE,
            state: SectionState::Unavailable { reason },
            body: String::new(),
        },
    }
}

fn tests_section(input: &ReportInput<'_>) -> Section {
    match availability(input.stages.get(&StageId::ExecuteTests)) {
        Ok(()) => {
            let mut body = String::new();
            if let Some(tests) = &input.artifacts.tests {
                body.push_str(&format!("**Generated test files:** {}\n", tests.len()));
            }
            match &input.artifacts.test_run {
                Some(run) => {
                    body.push_str(&format!(
                        "**Result:** {} passed, {} failed\n",
                        run.passed, run.failed
                    ));
                    // A coverage value is never fabricated
                    let coverage = match run.coverage {
                        Some(pct) => format!("{:.0}%", pct),
                        None => "not measured".to_string(),
                    };
                    body.push_str(&format!("**Coverage:** {}\n", coverage));
                    body.push_str(&format!(
                        "\n```text\n{}\n```\n",
                        clip_log(&run.log, LOG_CAP)
                    ));
                }
                None => body.push_str("No test run result recorded.\n"),
            }
            Section {
                title: TESTS_TITLE,
                state: SectionState::Populated,
                body,
            }
        }
        Err(reason) => Section {
            title: TESTS_TITLE,
            state: SectionState::Unavailable { reason },
            body: String::new(),
        },
    }
}

fn render_findings(findings: &[Finding]) -> String {
    let mut out = String::new();
    for finding in findings {
        let location = if finding.line > 0 {
            format!("`{}:{}`", finding.file.display(), finding.line)
        } else {
            format!("`{}`", finding.file.display())
        };
        let code = finding
            .code
            .as_deref()
            .map(|c| format!(" {}", c))
            .unwrap_or_default();
        out.push_str(&format!(
            "- **{}**{} {}: {}\n",
            finding.severity, code, location, finding.message
        ));
    }
    out
}

fn clip_log(log: &str, max: usize) -> String {
    let trimmed = log.trim();
    if trimmed.len() <= max {
        return trimmed.to_string();
    }
    let mut end = max;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\n... log truncated ...", &trimmed[..end])
}
