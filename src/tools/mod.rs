mod bandit;
mod mirror;
mod pytest;
mod ruff;

pub use bandit::BanditScanner;
pub use pytest::PytestRunner;
pub use ruff::RuffAnalyzer;

use crate::error::{TestRunError, ToolError};
use crate::github::FileUnit;
use crate::llm::GeneratedTest;
use crate::parser::Finding;
use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::Path;
use tokio::process::Command;

/// A code analysis tool run over the changed files.
#[async_trait]
pub trait Analyzer: Send + Sync {
    fn name(&self) -> &'static str;

    async fn analyze(&self, files: &[FileUnit]) -> Result<Vec<Finding>, ToolError>;
}

/// Executes the generated test suite and reports counts plus coverage.
#[async_trait]
pub trait TestRunner: Send + Sync {
    fn name(&self) -> &'static str;

    async fn execute(&self, tests: &[GeneratedTest]) -> Result<TestRunResult, TestRunError>;
}

/// Outcome of running the generated suite. A red suite is still a
/// successful run of the stage; only an inability to run is an error.
#[derive(Debug, Clone)]
pub struct TestRunResult {
    pub passed: u32,
    pub failed: u32,
    pub coverage: Option<f32>,
    pub success: bool,
    pub log: String,
}

/// Spawn a tool with captured output. Callers interpret exit codes.
pub(crate) async fn run_tool<I, S>(
    binary: &Path,
    args: I,
    cwd: &Path,
) -> std::io::Result<std::process::Output>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    // Use string for PATH lookup if not an absolute/relative path
    let binary_str = binary.to_string_lossy();
    let mut cmd = if binary_str.contains('/') || binary_str.contains('\\') {
        Command::new(binary)
    } else {
        Command::new(binary_str.as_ref())
    };
    cmd.args(args)
        .current_dir(cwd)
        .stdin(std::process::Stdio::null())
        // A timed-out attempt drops this future; the child must not
        // outlive it and keep running into the next attempt.
        .kill_on_drop(true);
    cmd.output().await
}

pub(crate) fn snip(s: &str, max: usize) -> String {
    let trimmed = s.trim();
    if trimmed.len() <= max {
        return trimmed.to_string();
    }
    let mut end = max;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &trimmed[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    // Real clock on purpose: the subprocess runs outside tokio's time.
    #[tokio::test]
    async fn test_timed_out_tool_does_not_keep_running() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("marker");
        let script = format!("sleep 1 && touch {}", marker.display());

        let result = tokio::time::timeout(
            Duration::from_millis(200),
            run_tool(Path::new("sh"), ["-c", script.as_str()], dir.path()),
        )
        .await;
        assert!(result.is_err(), "tool call should have timed out");

        // Were the child still alive it would create the marker at ~1s
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!marker.exists(), "subprocess survived the timeout");
    }
}
