use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::defaults::*;

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Pull request URL reviewed when none is given on the command line.
    #[serde(default)]
    pub default_pr: Option<String>,

    /// Maximum number of analysis stages running at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,

    /// Per-attempt timeout for a single collaborator call.
    #[serde(default = "default_timeout_sec")]
    pub timeout_sec: u64,

    /// Wall-clock budget for one stage across all of its attempts.
    #[serde(default = "default_stage_budget_sec")]
    pub stage_budget_sec: u64,

    /// Optional deadline for the whole run. Stages not started when it
    /// passes are skipped as cancelled.
    #[serde(default)]
    pub run_timeout_sec: Option<u64>,

    #[serde(default = "default_launch_delay_ms")]
    pub launch_delay_ms: u64,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub github: GithubConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub files: FileFilter,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    #[serde(default = "default_backoff_cap_ms")]
    pub backoff_cap_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_cap_ms: default_backoff_cap_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct GithubConfig {
    /// REST API base URL. Point at a GitHub Enterprise host if needed.
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct LlmConfig {
    #[serde(default = "default_llm_binary")]
    pub binary: PathBuf,

    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Per-file content cap when building prompts. Larger files are
    /// truncated with a marker.
    #[serde(default = "default_prompt_file_bytes")]
    pub prompt_file_bytes: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            binary: default_llm_binary(),
            model: default_llm_model(),
            prompt_file_bytes: default_prompt_file_bytes(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
pub struct ToolsConfig {
    #[serde(default)]
    pub ruff: RuffConfig,

    #[serde(default)]
    pub bandit: BanditConfig,

    #[serde(default)]
    pub pytest: PytestConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct RuffConfig {
    #[serde(default = "default_ruff_binary")]
    pub binary: PathBuf,
}

impl Default for RuffConfig {
    fn default() -> Self {
        Self {
            binary: default_ruff_binary(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct BanditConfig {
    #[serde(default = "default_bandit_binary")]
    pub binary: PathBuf,
}

impl Default for BanditConfig {
    fn default() -> Self {
        Self {
            binary: default_bandit_binary(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct PytestConfig {
    #[serde(default = "default_pytest_binary")]
    pub binary: PathBuf,

    /// Measure coverage of the generated tests (requires pytest-cov).
    #[serde(default = "default_true")]
    pub coverage: bool,
}

impl Default for PytestConfig {
    fn default() -> Self {
        Self {
            binary: default_pytest_binary(),
            coverage: default_true(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct FileFilter {
    #[serde(default = "default_include")]
    pub include: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Default for FileFilter {
    fn default() -> Self {
        Self {
            include: default_include(),
            exclude: Vec::new(),
        }
    }
}
