use super::prompt;
use super::{GeneratedTest, LlmService, ReviewNote};
use crate::config::LlmConfig;
use crate::error::LlmError;
use crate::github::FileUnit;
use crate::parser::extract_code_block;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Adapter for the `gemini` CLI. Prompts go in on stdin, the reply
/// comes back on stdout.
pub struct GeminiCli {
    binary: PathBuf,
    model: String,
    prompt_file_bytes: usize,
}

impl GeminiCli {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            model: config.model.clone(),
            prompt_file_bytes: config.prompt_file_bytes,
        }
    }

    async fn run_prompt(&self, prompt: &str) -> Result<String, LlmError> {
        // Use string for PATH lookup if not an absolute/relative path
        let binary_str = self.binary.to_string_lossy();
        let mut cmd = if binary_str.contains('/') || binary_str.contains('\\') {
            Command::new(&self.binary)
        } else {
            Command::new(binary_str.as_ref())
        };

        cmd.arg("--model").arg(&self.model);
        cmd.stdin(std::process::Stdio::piped());
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());
        // If the caller's timeout drops us mid-call, take the CLI down too
        cmd.kill_on_drop(true);

        debug!(
            "Invoking {} with model {} ({} byte prompt)",
            binary_str,
            self.model,
            prompt.len()
        );

        let mut child = cmd.spawn().map_err(LlmError::Io)?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(prompt.as_bytes())
                .await
                .map_err(LlmError::Io)?;
            stdin.shutdown().await.map_err(LlmError::Io)?;
        }

        let output = child.wait_with_output().await.map_err(LlmError::Io)?;
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            return Err(classify_cli_failure(
                output.status.code().unwrap_or(-1),
                &stderr,
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[async_trait]
impl LlmService for GeminiCli {
    fn name(&self) -> &'static str {
        "gemini_cli"
    }

    async fn review(&self, files: &[FileUnit]) -> Result<ReviewNote, LlmError> {
        // Nothing to review is a normal outcome, not an error
        if files.is_empty() {
            return Ok(ReviewNote::default());
        }

        let prompt = prompt::review_prompt(files, self.prompt_file_bytes);
        let reply = self.run_prompt(&prompt).await?;
        let text = reply.trim();
        if text.is_empty() {
            return Err(LlmError::InvalidResponse("empty review reply".to_string()));
        }
        Ok(ReviewNote {
            text: text.to_string(),
        })
    }

    async fn generate_tests(
        &self,
        file: &FileUnit,
        note: &ReviewNote,
    ) -> Result<GeneratedTest, LlmError> {
        let prompt = prompt::test_prompt(file, note, self.prompt_file_bytes);
        let reply = self.run_prompt(&prompt).await?;
        let source = extract_code_block(&reply, "python").ok_or_else(|| {
            LlmError::InvalidResponse(format!(
                "no python code block in reply for {}",
                file.path.display()
            ))
        })?;
        Ok(GeneratedTest {
            target: file.path.clone(),
            source,
        })
    }
}

/// Map a non-zero CLI exit to the failure taxonomy by sniffing stderr.
/// Rate limiting markers win over quota wording since a retry is safe.
fn classify_cli_failure(code: i32, stderr: &str) -> LlmError {
    let lower = stderr.to_lowercase();
    if lower.contains("rate limit")
        || lower.contains("rate-limit")
        || lower.contains("429")
        || lower.contains("resource_exhausted")
    {
        LlmError::RateLimited
    } else if lower.contains("quota") {
        LlmError::QuotaExceeded
    } else {
        LlmError::NonZeroExit {
            code,
            stderr: clip(stderr, 2000),
        }
    }
}

fn clip(s: &str, max: usize) -> String {
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

    #[test]
    fn test_rate_limit_markers() {
        assert!(matches!(
            classify_cli_failure(1, "Error: 429 Too Many Requests"),
            LlmError::RateLimited
        ));
        assert!(matches!(
            classify_cli_failure(1, "status: RESOURCE_EXHAUSTED"),
            LlmError::RateLimited
        ));
        // Both markers present: retryable interpretation wins
        assert!(matches!(
            classify_cli_failure(1, "Quota exceeded, rate limit in effect"),
            LlmError::RateLimited
        ));
    }

    #[test]
    fn test_quota_marker() {
        assert!(matches!(
            classify_cli_failure(1, "Daily quota exhausted for project"),
            LlmError::QuotaExceeded
        ));
    }

    #[test]
    fn test_other_failures_keep_exit_code() {
        match classify_cli_failure(127, "gemini: command not found") {
            LlmError::NonZeroExit { code, stderr } => {
                assert_eq!(code, 127);
                assert!(stderr.contains("not found"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_clip_respects_char_boundaries() {
        let s = "é".repeat(3000);
        let clipped = clip(&s, 2000);
        assert!(clipped.len() <= 2005);
        assert!(clipped.ends_with("..."));
    }
}
