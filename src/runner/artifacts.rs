use super::stage::{StageId, StageReport};
use crate::github::{FileUnit, PrRef};
use crate::llm::{GeneratedTest, ReviewNote};
use crate::parser::Finding;
use crate::tools::TestRunResult;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// Per-run result bag. Each stage owns exactly one slot; only the
/// orchestrator writes, so no synchronization is needed.
#[derive(Default)]
pub struct ArtifactStore {
    pub files: Option<Arc<Vec<FileUnit>>>,
    pub lint_findings: Option<Vec<Finding>>,
    pub security_findings: Option<Vec<Finding>>,
    pub review: Option<ReviewNote>,
    pub tests: Option<Vec<GeneratedTest>>,
    pub test_run: Option<TestRunResult>,
}

/// State of one pipeline execution. Constructed per run and discarded
/// when the run ends; nothing survives the process.
pub struct RunContext {
    pub run_id: Uuid,
    pub pr: PrRef,
    pub artifacts: ArtifactStore,
    reports: BTreeMap<StageId, StageReport>,
}

impl RunContext {
    pub fn new(pr: PrRef) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            pr,
            artifacts: ArtifactStore::default(),
            reports: BTreeMap::new(),
        }
    }

    /// Record a terminal stage outcome. The first write for a stage key
    /// wins; a stage never transitions out of a terminal state.
    pub fn record(&mut self, report: StageReport) {
        if self.reports.contains_key(&report.id) {
            warn!("Ignoring duplicate terminal outcome for {}", report.id);
            return;
        }
        self.reports.insert(report.id, report);
    }

    pub fn report_for(&self, id: StageId) -> Option<&StageReport> {
        self.reports.get(&id)
    }

    pub fn reports(&self) -> &BTreeMap<StageId, StageReport> {
        &self.reports
    }

    /// Terminal outcomes in pipeline order. Stages the run never reached
    /// (abort before fan-out) are simply absent.
    pub fn into_reports(self) -> Vec<StageReport> {
        let mut reports = self.reports;
        StageId::ALL
            .iter()
            .filter_map(|id| reports.remove(id))
            .collect()
    }
}
