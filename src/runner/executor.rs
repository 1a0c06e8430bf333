use super::retry::run_with_retry;
use super::stage::{StageId, StageReport, StageStatus};
use crate::config::{Config, RetryConfig};
use crate::error::{FailureClass, StageError};
use crate::github::{FileUnit, PrRef, VcsHost};
use crate::llm::{check_self_contained, forbidden_modules, GeneratedTest, LlmService, ReviewNote};
use crate::parser::Finding;
use crate::tools::{Analyzer, TestRunResult, TestRunner};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Runs one stage at a time: makes the collaborator call under the
/// shared attempt policy and converts whatever happens into a terminal
/// `StageReport`. Stateless per call; all per-run state lives in the
/// orchestrator's `RunContext`.
#[derive(Clone)]
pub struct StageExecutor {
    retry: RetryConfig,
    attempt_timeout: Duration,
    stage_budget: Duration,
    run_deadline: Option<Instant>,
}

impl StageExecutor {
    pub fn new(config: &Config, run_deadline: Option<Instant>) -> Self {
        Self {
            retry: config.retry.clone(),
            attempt_timeout: Duration::from_secs(config.timeout_sec),
            stage_budget: Duration::from_secs(config.stage_budget_sec),
            run_deadline,
        }
    }

    /// Whether the overall run deadline has passed. Stages not yet
    /// started at that point are skipped as cancelled.
    pub fn cancelled(&self) -> bool {
        self.run_deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Stage deadline clamped to the run deadline, so a caller-level
    /// cancellation propagates into in-flight attempts.
    fn stage_deadline(&self, start: Instant) -> Instant {
        let own = start + self.stage_budget;
        match self.run_deadline {
            Some(run) => own.min(run),
            None => own,
        }
    }

    pub async fn fetch_files(
        &self,
        host: &dyn VcsHost,
        pr: &PrRef,
    ) -> (Result<Vec<FileUnit>, StageError>, StageReport) {
        let start = Instant::now();
        self.run_stage(StageId::FetchFiles, self.stage_deadline(start), start, || {
            async move { host.fetch_changed_files(pr).await.map_err(StageError::from) }
        })
        .await
    }

    pub async fn analysis(
        &self,
        id: StageId,
        tool: &dyn Analyzer,
        files: &[FileUnit],
    ) -> (Result<Vec<Finding>, StageError>, StageReport) {
        let start = Instant::now();
        self.run_stage(id, self.stage_deadline(start), start, || async move {
            tool.analyze(files).await.map_err(StageError::from)
        })
        .await
    }

    pub async fn review(
        &self,
        llm: &dyn LlmService,
        files: &[FileUnit],
    ) -> (Result<ReviewNote, StageError>, StageReport) {
        let start = Instant::now();
        self.run_stage(StageId::AiReview, self.stage_deadline(start), start, || {
            async move { llm.review(files).await.map_err(StageError::from) }
        })
        .await
    }

    /// One generation call per changed file, each validated for
    /// self-containment before it is accepted. A validation failure is
    /// malformed output: the policy regenerates exactly once, then the
    /// whole stage fails. A partial suite would silently shrink what the
    /// report claims to have tested.
    pub async fn generate_tests(
        &self,
        llm: &dyn LlmService,
        files: &[FileUnit],
        note: &ReviewNote,
    ) -> (Result<Vec<GeneratedTest>, StageError>, StageReport) {
        let start = Instant::now();
        let deadline = self.stage_deadline(start);
        let forbidden = forbidden_modules(files.iter().map(|f| f.path.as_path()));
        let forbidden = &forbidden;

        info!(
            "Stage {} starting ({} files)",
            StageId::GenerateTests,
            files.len()
        );
        let mut tests = Vec::with_capacity(files.len());
        let mut attempts = 0u32;

        for file in files {
            let (result, file_attempts) =
                run_with_retry(&self.retry, self.attempt_timeout, deadline, || async move {
                    let test = llm.generate_tests(file, note).await?;
                    check_self_contained(&test, forbidden).map_err(|why| StageError {
                        class: FailureClass::Malformed,
                        message: format!(
                            "generated test for {} is not self-contained: {}",
                            file.path.display(),
                            why
                        ),
                    })?;
                    Ok(test)
                })
                .await;

            attempts += file_attempts;
            match result {
                Ok(test) => tests.push(test),
                Err(err) => {
                    warn!(
                        "Stage {} gave up on {}: {}",
                        StageId::GenerateTests,
                        file.path.display(),
                        err
                    );
                    let report = StageReport {
                        id: StageId::GenerateTests,
                        status: StageStatus::Failed {
                            reason: err.message.clone(),
                            recoverable: err.class.recoverable(),
                        },
                        attempts,
                        duration: start.elapsed(),
                    };
                    return (Err(err), report);
                }
            }
        }

        let report = StageReport {
            id: StageId::GenerateTests,
            status: StageStatus::Succeeded,
            attempts,
            duration: start.elapsed(),
        };
        (Ok(tests), report)
    }

    pub async fn execute_tests(
        &self,
        runner: &dyn TestRunner,
        tests: &[GeneratedTest],
    ) -> (Result<TestRunResult, StageError>, StageReport) {
        let start = Instant::now();
        self.run_stage(
            StageId::ExecuteTests,
            self.stage_deadline(start),
            start,
            || async move { runner.execute(tests).await.map_err(StageError::from) },
        )
        .await
    }

    /// Publishing ignores the run deadline: the report is already
    /// computed, and failing to post must not discard it.
    pub async fn publish(
        &self,
        host: &dyn VcsHost,
        pr: &PrRef,
        body: &str,
    ) -> (Result<(), StageError>, StageReport) {
        let start = Instant::now();
        self.run_stage(StageId::PublishReport, start + self.stage_budget, start, || {
            async move { host.post_comment(pr, body).await.map_err(StageError::from) }
        })
        .await
    }

    async fn run_stage<T, F, Fut>(
        &self,
        id: StageId,
        deadline: Instant,
        start: Instant,
        call: F,
    ) -> (Result<T, StageError>, StageReport)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StageError>>,
    {
        info!("Stage {} starting", id);
        let (result, attempts) =
            run_with_retry(&self.retry, self.attempt_timeout, deadline, call).await;

        let status = match &result {
            Ok(_) => StageStatus::Succeeded,
            Err(err) => {
                warn!("Stage {} failed after {} attempts: {}", id, attempts, err);
                StageStatus::Failed {
                    reason: err.message.clone(),
                    recoverable: err.class.recoverable(),
                }
            }
        };
        let report = StageReport {
            id,
            status,
            attempts,
            duration: start.elapsed(),
        };
        (result, report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn config() -> Config {
        Config {
            timeout_sec: 5,
            stage_budget_sec: 60,
            retry: RetryConfig {
                max_attempts: 3,
                backoff_base_ms: 10,
                backoff_cap_ms: 50,
            },
            ..Config::default()
        }
    }

    fn unit(path: &str) -> FileUnit {
        FileUnit {
            path: PathBuf::from(path),
            content: "def add(a, b):\n    return a + b\n".to_string(),
            patch: None,
        }
    }

    /// LLM stub whose generated tests import project code for the first
    /// `bad_replies` calls, then come back clean.
    struct ScriptedLlm {
        bad_replies: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl LlmService for ScriptedLlm {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn review(&self, _files: &[FileUnit]) -> Result<ReviewNote, LlmError> {
            Ok(ReviewNote {
                text: "looks fine".to_string(),
            })
        }

        async fn generate_tests(
            &self,
            file: &FileUnit,
            _note: &ReviewNote,
        ) -> Result<GeneratedTest, LlmError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let source = if call < self.bad_replies {
                "import app\n\ndef test_add():\n    assert app.add(1, 2) == 3\n"
            } else {
                "def add(a, b):\n    return a + b\n\ndef test_add():\n    assert add(1, 2) == 3\n"
            };
            Ok(GeneratedTest {
                target: file.path.clone(),
                source: source.to_string(),
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_disallowed_import_regenerated_once_then_accepted() {
        let llm = ScriptedLlm {
            bad_replies: 1,
            calls: AtomicU32::new(0),
        };
        let executor = StageExecutor::new(&config(), None);
        let note = ReviewNote::default();
        let files = vec![unit("app.py")];

        let (result, report) = executor.generate_tests(&llm, &files, &note).await;

        let tests = result.unwrap();
        assert_eq!(tests.len(), 1);
        assert!(!tests[0].source.contains("import app"));
        assert_eq!(report.attempts, 2);
        assert!(report.status.is_succeeded());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disallowed_import_twice_fails_the_stage() {
        let llm = ScriptedLlm {
            bad_replies: 2,
            calls: AtomicU32::new(0),
        };
        let executor = StageExecutor::new(&config(), None);
        let note = ReviewNote::default();
        let files = vec![unit("app.py")];

        let (result, report) = executor.generate_tests(&llm, &files, &note).await;

        let err = result.unwrap_err();
        assert_eq!(err.class, FailureClass::Malformed);
        assert!(err.message.contains("not self-contained"));
        assert_eq!(report.attempts, 2);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 2);
        assert!(matches!(
            report.status,
            StageStatus::Failed {
                recoverable: false,
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_file_set_generates_nothing() {
        let llm = ScriptedLlm {
            bad_replies: 0,
            calls: AtomicU32::new(0),
        };
        let executor = StageExecutor::new(&config(), None);

        let (result, report) = executor
            .generate_tests(&llm, &[], &ReviewNote::default())
            .await;

        assert!(result.unwrap().is_empty());
        assert!(report.status.is_succeeded());
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_run_deadline_reports_cancelled() {
        let executor = StageExecutor::new(&config(), Some(Instant::now()));
        assert!(executor.cancelled());
    }
}
