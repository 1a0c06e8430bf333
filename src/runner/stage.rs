use crate::error::RunnerError;
use std::time::Duration;

/// The fixed pipeline stages, in declaration order.
///
/// Declaration order is a valid topological order of the dependency
/// graph; `validate_stage_graph` enforces that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageId {
    FetchFiles,
    StaticAnalysis,
    SecurityScan,
    AiReview,
    GenerateTests,
    ExecuteTests,
    AssembleReport,
    PublishReport,
}

impl StageId {
    pub const ALL: [StageId; 8] = [
        StageId::FetchFiles,
        StageId::StaticAnalysis,
        StageId::SecurityScan,
        StageId::AiReview,
        StageId::GenerateTests,
        StageId::ExecuteTests,
        StageId::AssembleReport,
        StageId::PublishReport,
    ];

    /// Upstream stages this stage consumes. The graph is data so the
    /// execution plan can be printed and checked, not discovered from
    /// control flow.
    pub fn dependencies(self) -> &'static [StageId] {
        match self {
            StageId::FetchFiles => &[],
            StageId::StaticAnalysis => &[StageId::FetchFiles],
            StageId::SecurityScan => &[StageId::FetchFiles],
            StageId::AiReview => &[StageId::FetchFiles],
            StageId::GenerateTests => &[StageId::AiReview],
            StageId::ExecuteTests => &[StageId::GenerateTests],
            StageId::AssembleReport => &[
                StageId::StaticAnalysis,
                StageId::SecurityScan,
                StageId::AiReview,
                StageId::GenerateTests,
                StageId::ExecuteTests,
            ],
            StageId::PublishReport => &[StageId::AssembleReport],
        }
    }
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StageId::FetchFiles => "fetch_files",
            StageId::StaticAnalysis => "static_analysis",
            StageId::SecurityScan => "security_scan",
            StageId::AiReview => "ai_review",
            StageId::GenerateTests => "generate_tests",
            StageId::ExecuteTests => "execute_tests",
            StageId::AssembleReport => "assemble_report",
            StageId::PublishReport => "publish_report",
        };
        write!(f, "{}", name)
    }
}

/// Every dependency must be declared before its dependent, which both
/// proves the graph acyclic and keeps `ALL` a valid execution order.
pub fn validate_stage_graph() -> Result<(), RunnerError> {
    let position = |id: StageId| StageId::ALL.iter().position(|s| *s == id);
    for stage in StageId::ALL {
        let Some(own) = position(stage) else {
            return Err(RunnerError::Graph(format!("{} missing from stage list", stage)));
        };
        for dep in stage.dependencies() {
            match position(*dep) {
                Some(pos) if pos < own => {}
                _ => {
                    return Err(RunnerError::Graph(format!(
                        "{} depends on {} which does not precede it",
                        stage, dep
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Terminal state of one stage.
#[derive(Debug, Clone, PartialEq)]
pub enum StageStatus {
    Succeeded,
    Failed { reason: String, recoverable: bool },
    Skipped { cause: String },
}

impl StageStatus {
    pub fn is_succeeded(&self) -> bool {
        matches!(self, StageStatus::Succeeded)
    }
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageStatus::Succeeded => write!(f, "succeeded"),
            StageStatus::Failed { reason, .. } => write!(f, "failed: {}", reason),
            StageStatus::Skipped { cause } => write!(f, "skipped: {}", cause),
        }
    }
}

/// Bookkeeping for one terminal stage outcome.
#[derive(Debug, Clone)]
pub struct StageReport {
    pub id: StageId,
    pub status: StageStatus,
    pub attempts: u32,
    pub duration: Duration,
}

impl StageReport {
    pub fn skipped(id: StageId, cause: impl Into<String>) -> Self {
        StageReport {
            id,
            status: StageStatus::Skipped {
                cause: cause.into(),
            },
            attempts: 0,
            duration: Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_is_valid() {
        assert!(validate_stage_graph().is_ok());
    }

    #[test]
    fn test_analysis_stages_fan_out_from_fetch() {
        for id in [
            StageId::StaticAnalysis,
            StageId::SecurityScan,
            StageId::AiReview,
        ] {
            assert_eq!(id.dependencies(), &[StageId::FetchFiles]);
        }
    }

    #[test]
    fn test_generation_chains_behind_review() {
        assert_eq!(
            StageId::GenerateTests.dependencies(),
            &[StageId::AiReview]
        );
        assert_eq!(
            StageId::ExecuteTests.dependencies(),
            &[StageId::GenerateTests]
        );
    }

    #[test]
    fn test_stage_names_are_stable() {
        assert_eq!(StageId::FetchFiles.to_string(), "fetch_files");
        assert_eq!(StageId::PublishReport.to_string(), "publish_report");
    }

    #[test]
    fn test_skipped_report_has_no_attempts() {
        let report = StageReport::skipped(StageId::GenerateTests, "upstream stage unavailable");
        assert_eq!(report.attempts, 0);
        assert_eq!(report.duration, Duration::ZERO);
        assert_eq!(
            report.status.to_string(),
            "skipped: upstream stage unavailable"
        );
    }
}
