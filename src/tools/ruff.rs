use super::{mirror, run_tool, snip, Analyzer};
use crate::config::RuffConfig;
use crate::error::ToolError;
use crate::github::FileUnit;
use crate::parser::{parse_ruff_findings, Finding};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

/// Lint pass over the changed files using ruff.
pub struct RuffAnalyzer {
    binary: PathBuf,
}

impl RuffAnalyzer {
    pub fn new(config: &RuffConfig) -> Self {
        Self {
            binary: config.binary.clone(),
        }
    }
}

#[async_trait]
impl Analyzer for RuffAnalyzer {
    fn name(&self) -> &'static str {
        "ruff"
    }

    async fn analyze(&self, files: &[FileUnit]) -> Result<Vec<Finding>, ToolError> {
        if files.is_empty() {
            return Ok(Vec::new());
        }

        let mirror = mirror::materialize(files)?;
        // --exit-zero: findings are data, only a broken invocation is an error
        let output = run_tool(
            &self.binary,
            ["check", "--output-format=json", "--exit-zero", "."],
            mirror.path(),
        )
        .await?;

        if !output.status.success() {
            return Err(ToolError::Crashed {
                tool: "ruff".to_string(),
                code: output.status.code().unwrap_or(-1),
                stderr: snip(&String::from_utf8_lossy(&output.stderr), 400),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let findings = parse_ruff_findings(&stdout, mirror.path())?;
        debug!("ruff reported {} findings", findings.len());
        Ok(findings)
    }
}
