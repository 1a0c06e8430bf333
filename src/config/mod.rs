mod defaults;
mod types;

pub use types::*;

use crate::error::ConfigError;
use defaults::*;
use std::path::Path;

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            default_pr: None,
            concurrency: default_concurrency(),
            report_dir: default_report_dir(),
            timeout_sec: default_timeout_sec(),
            stage_budget_sec: default_stage_budget_sec(),
            run_timeout_sec: None,
            launch_delay_ms: default_launch_delay_ms(),
            retry: RetryConfig::default(),
            github: GithubConfig::default(),
            llm: LlmConfig::default(),
            tools: ToolsConfig::default(),
            files: FileFilter::default(),
        }
    }
}

impl Config {
    /// Load config from a YAML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Validate the config
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be at least 1".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        if self.timeout_sec == 0 || self.stage_budget_sec == 0 {
            return Err(ConfigError::Invalid(
                "timeout_sec and stage_budget_sec must be non-zero".into(),
            ));
        }
        if self.files.include.is_empty() {
            return Err(ConfigError::Invalid(
                "files.include must list at least one pattern".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.files.include, vec!["**/*.py".to_string()]);
        assert!(config.tools.pytest.coverage);
    }

    #[test]
    fn partial_yaml_fills_in_defaults() {
        let yaml = r#"
default_pr: "https://github.com/octo/widgets/pull/7"
concurrency: 2
llm:
  model: "gemini-2.5-flash"
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            config.default_pr.as_deref(),
            Some("https://github.com/octo/widgets/pull/7")
        );
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.llm.model, "gemini-2.5-flash");
        assert_eq!(config.llm.binary, std::path::PathBuf::from("gemini"));
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn zero_concurrency_rejected() {
        let config = Config {
            concurrency: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
