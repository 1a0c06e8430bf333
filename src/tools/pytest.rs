use super::{run_tool, snip, TestRunResult, TestRunner};
use crate::config::PytestConfig;
use crate::error::TestRunError;
use crate::llm::GeneratedTest;
use crate::parser::parse_pytest_output;
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Runs the generated tests with pytest in a scratch directory.
///
/// Generated tests are self-contained, so the scratch directory holds
/// nothing but the test files themselves. Coverage (when enabled)
/// therefore measures the embedded code under test.
pub struct PytestRunner {
    binary: PathBuf,
    coverage: bool,
}

impl PytestRunner {
    pub fn new(config: &PytestConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            coverage: config.coverage,
        }
    }
}

#[async_trait]
impl TestRunner for PytestRunner {
    fn name(&self) -> &'static str {
        "pytest"
    }

    async fn execute(&self, tests: &[GeneratedTest]) -> Result<TestRunResult, TestRunError> {
        if tests.is_empty() {
            return Ok(TestRunResult {
                passed: 0,
                failed: 0,
                coverage: None,
                success: true,
                log: "no tests to run".to_string(),
            });
        }

        let dir = tempfile::Builder::new()
            .prefix("autorev-tests-")
            .tempdir()
            .map_err(TestRunError::Io)?;

        for (idx, test) in tests.iter().enumerate() {
            let name = test_file_name(&test.target, idx);
            std::fs::write(dir.path().join(&name), &test.source).map_err(TestRunError::Io)?;
            debug!("Wrote {} for {}", name, test.target.display());
        }

        let mut args: Vec<String> = Vec::new();
        if self.coverage {
            args.push("--cov=.".to_string());
        }
        args.push(".".to_string());

        let output = run_tool(&self.binary, &args, dir.path())
            .await
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => TestRunError::Environment(format!(
                    "{} not found on PATH",
                    self.binary.display()
                )),
                _ => TestRunError::Io(e),
            })?;

        let code = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        // 0: all passed, 1: some failed, 5: nothing collected.
        // Anything else means pytest itself did not run the suite.
        if code != 0 && code != 1 && code != 5 {
            return Err(TestRunError::Crashed {
                code,
                stderr: snip(&stderr, 400),
            });
        }

        let summary = parse_pytest_output(&stdout)?;
        let mut log = stdout;
        if !stderr.trim().is_empty() {
            log.push_str("\n--- stderr ---\n");
            log.push_str(&stderr);
        }

        Ok(TestRunResult {
            passed: summary.passed,
            failed: summary.failed,
            coverage: summary.coverage,
            success: code == 0 || code == 5,
            log,
        })
    }
}

/// Unique scratch name per generated test. The index guards against two
/// targets sharing a stem (a/util.py and b/util.py).
fn test_file_name(target: &Path, idx: usize) -> String {
    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "module".to_string());
    let clean: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("test_{}_{}.py", clean, idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scratch_names_are_unique_and_clean() {
        assert_eq!(test_file_name(Path::new("src/db.py"), 0), "test_db_0.py");
        assert_eq!(test_file_name(Path::new("a/util.py"), 1), "test_util_1.py");
        assert_eq!(
            test_file_name(Path::new("weird name.py"), 2),
            "test_weird_name_2.py"
        );
    }

    #[tokio::test]
    async fn test_empty_suite_short_circuits() {
        let runner = PytestRunner::new(&PytestConfig::default());
        let result = runner.execute(&[]).await.unwrap();
        assert!(result.success);
        assert_eq!(result.passed, 0);
        assert_eq!(result.failed, 0);
        assert!(result.coverage.is_none());
    }
}
