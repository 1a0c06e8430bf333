mod client;
mod files;

pub use client::{token_from_env, GitHubClient};
pub use files::FileSelector;

use crate::error::GitHubError;
use async_trait::async_trait;
use std::path::PathBuf;

/// Coordinates of one pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrRef {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

impl PrRef {
    /// Parse a browser URL like `https://github.com/octo/widgets/pull/42`.
    /// The host is not checked so Enterprise URLs work too.
    pub fn parse(raw: &str) -> Result<Self, GitHubError> {
        let url = reqwest::Url::parse(raw.trim())
            .map_err(|_| GitHubError::InvalidRef(raw.to_string()))?;

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|p| !p.is_empty()).collect())
            .unwrap_or_default();

        match segments.as_slice() {
            [owner, repo, "pull", number] => {
                let number: u64 = number
                    .parse()
                    .map_err(|_| GitHubError::InvalidRef(raw.to_string()))?;
                Ok(PrRef {
                    owner: (*owner).to_string(),
                    repo: (*repo).to_string(),
                    number,
                })
            }
            _ => Err(GitHubError::InvalidRef(raw.to_string())),
        }
    }
}

impl std::fmt::Display for PrRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.number)
    }
}

/// One changed file from the pull request, with its full head-revision
/// content and, when the API provides it, the diff hunks.
#[derive(Debug, Clone)]
pub struct FileUnit {
    pub path: PathBuf,
    pub content: String,
    pub patch: Option<String>,
}

/// The version-control host the pipeline talks to.
#[async_trait]
pub trait VcsHost: Send + Sync {
    fn name(&self) -> &'static str;

    /// Changed files of the PR that pass the configured file filter,
    /// with content at the PR head revision.
    async fn fetch_changed_files(&self, pr: &PrRef) -> Result<Vec<FileUnit>, GitHubError>;

    /// Publish the report as a PR comment.
    async fn post_comment(&self, pr: &PrRef, body: &str) -> Result<(), GitHubError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pull_url() {
        let pr = PrRef::parse("https://github.com/octo/widgets/pull/42").unwrap();
        assert_eq!(pr.owner, "octo");
        assert_eq!(pr.repo, "widgets");
        assert_eq!(pr.number, 42);
        assert_eq!(pr.to_string(), "octo/widgets#42");
    }

    #[test]
    fn test_parse_trailing_slash() {
        let pr = PrRef::parse("https://github.com/octo/widgets/pull/7/").unwrap();
        assert_eq!(pr.number, 7);
    }

    #[test]
    fn test_parse_enterprise_host() {
        let pr = PrRef::parse("https://github.example.com/team/svc/pull/3").unwrap();
        assert_eq!(pr.owner, "team");
    }

    #[test]
    fn test_reject_non_pull_urls() {
        assert!(PrRef::parse("https://github.com/octo/widgets").is_err());
        assert!(PrRef::parse("https://github.com/octo/widgets/issues/42").is_err());
        assert!(PrRef::parse("https://github.com/octo/widgets/pull/abc").is_err());
        assert!(PrRef::parse("not a url").is_err());
    }
}
