use std::path::PathBuf;
use thiserror::Error;

/// How a collaborator failure should be treated by the retry policy.
///
/// `Transient` failures are retried with backoff, `Malformed` output gets
/// exactly one retry, `Permanent` failures abort the stage immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Transient,
    Malformed,
    Permanent,
}

impl FailureClass {
    /// Whether a terminal failure of this class is still considered
    /// recoverable in the stage record. Malformed output counts as
    /// non-recoverable once its single retry is spent.
    pub fn recoverable(self) -> bool {
        matches!(self, FailureClass::Transient)
    }
}

pub trait Classify {
    fn class(&self) -> FailureClass;
}

/// Uniform error the stage executor works with. Collaborator errors are
/// converted at the call boundary, carrying their class along.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct StageError {
    pub class: FailureClass,
    pub message: String,
}

impl StageError {
    pub fn transient(message: impl Into<String>) -> Self {
        StageError {
            class: FailureClass::Transient,
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        StageError {
            class: FailureClass::Permanent,
            message: message.into(),
        }
    }
}

impl<E: Classify + std::fmt::Display> From<E> for StageError {
    fn from(err: E) -> Self {
        StageError {
            class: err.class(),
            message: err.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Failed to build glob pattern '{pattern}': {source}")]
    GlobPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum GitHubError {
    #[error("Invalid pull request reference '{0}'")]
    InvalidRef(String),

    #[error("No GitHub token found (set GITHUB_TOKEN or GH_TOKEN)")]
    MissingToken,

    #[error("GitHub authentication rejected: {0}")]
    Auth(String),

    #[error("Not found on GitHub: {0}")]
    NotFound(String),

    #[error("GitHub API rate limit exhausted")]
    RateLimited,

    #[error("GitHub API returned {status} for {context}")]
    Api { status: u16, context: String },

    #[error("GitHub API returned server error {status}")]
    Server { status: u16 },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl Classify for GitHubError {
    fn class(&self) -> FailureClass {
        match self {
            GitHubError::RateLimited | GitHubError::Server { .. } | GitHubError::Http(_) => {
                FailureClass::Transient
            }
            GitHubError::InvalidRef(_)
            | GitHubError::MissingToken
            | GitHubError::Auth(_)
            | GitHubError::NotFound(_)
            | GitHubError::Api { .. } => FailureClass::Permanent,
        }
    }
}

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("LLM backend rate limited the request")]
    RateLimited,

    #[error("LLM quota exhausted")]
    QuotaExceeded,

    #[error("LLM response unusable: {0}")]
    InvalidResponse(String),

    #[error("LLM CLI failed with exit code {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Classify for LlmError {
    fn class(&self) -> FailureClass {
        match self {
            LlmError::RateLimited => FailureClass::Transient,
            LlmError::InvalidResponse(_) => FailureClass::Malformed,
            LlmError::QuotaExceeded | LlmError::NonZeroExit { .. } | LlmError::Io(_) => {
                FailureClass::Permanent
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("{tool} crashed with exit code {code}: {stderr}")]
    Crashed {
        tool: String,
        code: i32,
        stderr: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse tool output: {0}")]
    Parse(#[from] ParserError),
}

impl Classify for ToolError {
    fn class(&self) -> FailureClass {
        match self {
            ToolError::Parse(_) => FailureClass::Malformed,
            ToolError::Crashed { .. } | ToolError::Io(_) => FailureClass::Permanent,
        }
    }
}

#[derive(Error, Debug)]
pub enum TestRunError {
    #[error("Test environment unusable: {0}")]
    Environment(String),

    #[error("Test runner crashed with exit code {code}: {stderr}")]
    Crashed { code: i32, stderr: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse test output: {0}")]
    Parse(#[from] ParserError),
}

impl Classify for TestRunError {
    fn class(&self) -> FailureClass {
        match self {
            TestRunError::Parse(_) => FailureClass::Malformed,
            TestRunError::Environment(_) | TestRunError::Crashed { .. } | TestRunError::Io(_) => {
                FailureClass::Permanent
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to create output directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Failed to write report: {0}")]
    WriteReport(std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Invalid stage graph: {0}")]
    Graph(String),

    #[error("Worker pool closed: {0}")]
    Pool(#[from] tokio::sync::AcquireError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_is_the_only_recoverable_class() {
        assert!(FailureClass::Transient.recoverable());
        assert!(!FailureClass::Malformed.recoverable());
        assert!(!FailureClass::Permanent.recoverable());
    }

    #[test]
    fn github_errors_classify_by_kind() {
        assert_eq!(GitHubError::RateLimited.class(), FailureClass::Transient);
        assert_eq!(
            GitHubError::Server { status: 502 }.class(),
            FailureClass::Transient
        );
        assert_eq!(
            GitHubError::Auth("bad token".into()).class(),
            FailureClass::Permanent
        );
        assert_eq!(
            GitHubError::NotFound("octo/repo#9".into()).class(),
            FailureClass::Permanent
        );
    }

    #[test]
    fn llm_invalid_response_is_malformed() {
        assert_eq!(
            LlmError::InvalidResponse("empty".into()).class(),
            FailureClass::Malformed
        );
        assert_eq!(LlmError::RateLimited.class(), FailureClass::Transient);
        assert_eq!(LlmError::QuotaExceeded.class(), FailureClass::Permanent);
    }

    #[test]
    fn stage_error_carries_class_through_conversion() {
        let err: StageError = LlmError::RateLimited.into();
        assert_eq!(err.class, FailureClass::Transient);
        assert!(err.message.contains("rate limited"));

        let err: StageError = ToolError::Crashed {
            tool: "ruff".into(),
            code: 2,
            stderr: "boom".into(),
        }
        .into();
        assert_eq!(err.class, FailureClass::Permanent);
    }
}
