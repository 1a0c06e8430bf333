use super::artifacts::RunContext;
use super::executor::StageExecutor;
use super::stage::{validate_stage_graph, StageId, StageReport, StageStatus};
use crate::config::Config;
use crate::error::{RunnerError, StageError};
use crate::github::{PrRef, VcsHost};
use crate::llm::LlmService;
use crate::report::{assemble, ReportDocument, ReportInput};
use crate::tools::{Analyzer, TestRunner};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinError;
use tokio::time::{sleep, Instant};
use tracing::{info, warn};
use uuid::Uuid;

/// Everything the pipeline talks to, handed in at construction. No
/// process-wide singletons; swapping a backend means swapping a handle.
pub struct Collaborators {
    pub host: Arc<dyn VcsHost>,
    pub llm: Arc<dyn LlmService>,
    pub lint: Arc<dyn Analyzer>,
    pub security: Arc<dyn Analyzer>,
    pub tests: Arc<dyn TestRunner>,
}

/// Terminal state of the whole run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    Completed,
    /// Analysis finished but the report could not be posted. The
    /// document is still in the outcome; nothing computed is lost.
    PublishFailed { error: String },
    /// FetchFiles failed, so there was nothing to report on. The one
    /// case where no report document is produced.
    Aborted { error: String },
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::PublishFailed { error } => write!(f, "publish_failed: {}", error),
            RunStatus::Aborted { error } => write!(f, "aborted: {}", error),
        }
    }
}

#[derive(Debug)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub pr: PrRef,
    pub status: RunStatus,
    /// Terminal stage outcomes in pipeline order. Stages the run never
    /// reached are absent.
    pub stages: Vec<StageReport>,
    pub document: Option<ReportDocument>,
    pub total_duration: Duration,
}

impl RunOutcome {
    pub fn report_for(&self, id: StageId) -> Option<&StageReport> {
        self.stages.iter().find(|r| r.id == id)
    }
}

const UPSTREAM_UNAVAILABLE: &str = "upstream stage unavailable";
const CANCELLED: &str = "cancelled";

/// Drives the stage graph for one PR at a time: fetch, fan out the three
/// independent analysis stages, chain test generation behind the review,
/// then assemble and publish whatever reached a terminal state.
pub struct Orchestrator {
    config: Config,
    collaborators: Collaborators,
    semaphore: Arc<Semaphore>,
}

impl Orchestrator {
    pub fn new(config: Config, collaborators: Collaborators) -> Result<Self, RunnerError> {
        validate_stage_graph()?;
        let semaphore = Arc::new(Semaphore::new(config.concurrency));
        Ok(Self {
            config,
            collaborators,
            semaphore,
        })
    }

    pub async fn run(&self, pr: PrRef) -> Result<RunOutcome, RunnerError> {
        let start = Instant::now();
        let run_deadline = self
            .config
            .run_timeout_sec
            .map(|sec| start + Duration::from_secs(sec));
        let executor = StageExecutor::new(&self.config, run_deadline);
        let mut ctx = RunContext::new(pr.clone());
        info!("Run {} reviewing {}", ctx.run_id, pr);

        // FetchFiles is the sole hard prerequisite: without the changed
        // files there is nothing to report on.
        let (fetched, fetch_report) = executor
            .fetch_files(self.collaborators.host.as_ref(), &pr)
            .await;
        ctx.record(fetch_report);

        let files = match fetched {
            Ok(files) => Arc::new(files),
            Err(err) => {
                warn!("Run {} aborted: {}", ctx.run_id, err);
                return Ok(RunOutcome {
                    run_id: ctx.run_id,
                    pr,
                    status: RunStatus::Aborted {
                        error: err.to_string(),
                    },
                    stages: ctx.into_reports(),
                    document: None,
                    total_duration: start.elapsed(),
                });
            }
        };
        info!("Fetched {} changed files from {}", files.len(), pr);
        ctx.artifacts.files = Some(files.clone());

        // Fan out the three independent analysis stages. Each worker
        // writes only its own outcome slot; the semaphore bounds how many
        // collaborators we hit at once.
        let launch_delay = Duration::from_millis(self.config.launch_delay_ms);

        let lint_task = {
            let permit = self.semaphore.clone().acquire_owned().await?;
            let executor = executor.clone();
            let tool = self.collaborators.lint.clone();
            let files = files.clone();
            tokio::spawn(async move {
                let _permit = permit;
                executor
                    .analysis(StageId::StaticAnalysis, tool.as_ref(), &files)
                    .await
            })
        };

        if launch_delay > Duration::ZERO {
            sleep(launch_delay).await;
        }
        let security_task = {
            let permit = self.semaphore.clone().acquire_owned().await?;
            let executor = executor.clone();
            let tool = self.collaborators.security.clone();
            let files = files.clone();
            tokio::spawn(async move {
                let _permit = permit;
                executor
                    .analysis(StageId::SecurityScan, tool.as_ref(), &files)
                    .await
            })
        };

        if launch_delay > Duration::ZERO {
            sleep(launch_delay).await;
        }
        let review_task = {
            let permit = self.semaphore.clone().acquire_owned().await?;
            let executor = executor.clone();
            let llm = self.collaborators.llm.clone();
            let files = files.clone();
            tokio::spawn(async move {
                let _permit = permit;
                executor.review(llm.as_ref(), &files).await
            })
        };

        // The generation chain waits only on the review; the two
        // analyzers keep running alongside it.
        let (review_result, review_report) =
            join_stage(StageId::AiReview, review_task.await);
        ctx.record(review_report);
        if let Ok(note) = &review_result {
            ctx.artifacts.review = Some(note.clone());
        }

        // When the chain above ExecuteTests stops, the cause it stopped
        // for carries down: a cancellation stays cancelled.
        let mut chain_skip_cause = UPSTREAM_UNAVAILABLE;
        let tests = match &review_result {
            Err(_) => {
                ctx.record(StageReport::skipped(
                    StageId::GenerateTests,
                    UPSTREAM_UNAVAILABLE,
                ));
                None
            }
            Ok(_) if executor.cancelled() => {
                chain_skip_cause = CANCELLED;
                ctx.record(StageReport::skipped(StageId::GenerateTests, CANCELLED));
                None
            }
            Ok(note) => {
                let (result, report) = executor
                    .generate_tests(self.collaborators.llm.as_ref(), &files, note)
                    .await;
                ctx.record(report);
                match result {
                    Ok(tests) => {
                        ctx.artifacts.tests = Some(tests.clone());
                        Some(tests)
                    }
                    Err(_) => None,
                }
            }
        };

        match &tests {
            None => {
                ctx.record(StageReport::skipped(StageId::ExecuteTests, chain_skip_cause));
            }
            Some(_) if executor.cancelled() => {
                ctx.record(StageReport::skipped(StageId::ExecuteTests, CANCELLED));
            }
            Some(tests) => {
                let (result, report) = executor
                    .execute_tests(self.collaborators.tests.as_ref(), tests)
                    .await;
                ctx.record(report);
                if let Ok(run) = result {
                    info!(
                        "Generated tests: {} passed, {} failed",
                        run.passed, run.failed
                    );
                    ctx.artifacts.test_run = Some(run);
                }
            }
        }

        let (lint_joined, security_joined) =
            futures::future::join(lint_task, security_task).await;
        let (lint_result, lint_report) = join_stage(StageId::StaticAnalysis, lint_joined);
        ctx.record(lint_report);
        if let Ok(findings) = lint_result {
            ctx.artifacts.lint_findings = Some(findings);
        }

        let (security_result, security_report) =
            join_stage(StageId::SecurityScan, security_joined);
        ctx.record(security_report);
        if let Ok(findings) = security_result {
            ctx.artifacts.security_findings = Some(findings);
        }

        // Assembly runs once every upstream stage is terminal, however
        // many of them failed. It is pure and cannot fail.
        let assemble_start = Instant::now();
        let document = assemble(&ReportInput {
            run_id: ctx.run_id,
            pr: &pr,
            generated_at: Utc::now(),
            stages: ctx.reports(),
            artifacts: &ctx.artifacts,
        });
        ctx.record(StageReport {
            id: StageId::AssembleReport,
            status: StageStatus::Succeeded,
            attempts: 1,
            duration: assemble_start.elapsed(),
        });

        let body = document.render();
        let (published, publish_report) = executor
            .publish(self.collaborators.host.as_ref(), &pr, &body)
            .await;
        ctx.record(publish_report);

        let status = match published {
            Ok(()) => {
                info!("Run {} posted report to {}", ctx.run_id, pr);
                RunStatus::Completed
            }
            Err(err) => RunStatus::PublishFailed {
                error: err.to_string(),
            },
        };

        Ok(RunOutcome {
            run_id: ctx.run_id,
            pr,
            status,
            stages: ctx.into_reports(),
            document: Some(document),
            total_duration: start.elapsed(),
        })
    }
}

/// Fold a worker task's join result into a stage outcome. A panicked
/// task becomes a non-recoverable failure for that stage alone.
fn join_stage<T>(
    id: StageId,
    joined: Result<(Result<T, StageError>, StageReport), JoinError>,
) -> (Result<T, StageError>, StageReport) {
    match joined {
        Ok(pair) => pair,
        Err(err) => {
            warn!("Stage {} task panicked: {}", id, err);
            let stage_err = StageError::permanent(format!("stage task panicked: {}", err));
            let report = StageReport {
                id,
                status: StageStatus::Failed {
                    reason: stage_err.message.clone(),
                    recoverable: false,
                },
                attempts: 0,
                duration: Duration::ZERO,
            };
            (Err(stage_err), report)
        }
    }
}
