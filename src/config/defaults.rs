use std::path::PathBuf;

pub fn default_version() -> u32 {
    1
}

pub fn default_concurrency() -> usize {
    3
}

pub fn default_report_dir() -> PathBuf {
    PathBuf::from("reports")
}

pub fn default_timeout_sec() -> u64 {
    120
}

pub fn default_stage_budget_sec() -> u64 {
    600
}

pub fn default_launch_delay_ms() -> u64 {
    250
}

pub fn default_max_attempts() -> u32 {
    3
}

pub fn default_backoff_base_ms() -> u64 {
    1000
}

pub fn default_backoff_cap_ms() -> u64 {
    30_000
}

pub fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

pub fn default_llm_binary() -> PathBuf {
    PathBuf::from("gemini")
}

pub fn default_llm_model() -> String {
    "gemini-2.5-pro".to_string()
}

pub fn default_prompt_file_bytes() -> usize {
    48_000
}

pub fn default_ruff_binary() -> PathBuf {
    PathBuf::from("ruff")
}

pub fn default_bandit_binary() -> PathBuf {
    PathBuf::from("bandit")
}

pub fn default_pytest_binary() -> PathBuf {
    PathBuf::from("pytest")
}

pub fn default_include() -> Vec<String> {
    vec!["**/*.py".to_string()]
}

pub fn default_true() -> bool {
    true
}
