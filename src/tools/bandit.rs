use super::{mirror, run_tool, snip, Analyzer};
use crate::config::BanditConfig;
use crate::error::ToolError;
use crate::github::FileUnit;
use crate::parser::{parse_bandit_findings, Finding};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

/// Security scan over the changed files using bandit.
pub struct BanditScanner {
    binary: PathBuf,
}

impl BanditScanner {
    pub fn new(config: &BanditConfig) -> Self {
        Self {
            binary: config.binary.clone(),
        }
    }
}

#[async_trait]
impl Analyzer for BanditScanner {
    fn name(&self) -> &'static str {
        "bandit"
    }

    async fn analyze(&self, files: &[FileUnit]) -> Result<Vec<Finding>, ToolError> {
        if files.is_empty() {
            return Ok(Vec::new());
        }

        let mirror = mirror::materialize(files)?;
        let output = run_tool(
            &self.binary,
            ["-r", "-f", "json", "-q", "."],
            mirror.path(),
        )
        .await?;

        // Bandit exits 1 when it finds issues; that is still a clean run
        let code = output.status.code().unwrap_or(-1);
        if code != 0 && code != 1 {
            return Err(ToolError::Crashed {
                tool: "bandit".to_string(),
                code,
                stderr: snip(&String::from_utf8_lossy(&output.stderr), 400),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let findings = parse_bandit_findings(&stdout, mirror.path())?;
        debug!("bandit reported {} findings", findings.len());
        Ok(findings)
    }
}
