use super::{FileSelector, FileUnit, PrRef, VcsHost};
use crate::error::GitHubError;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::debug;

const USER_AGENT: &str = concat!("autorev/", env!("CARGO_PKG_VERSION"));
const PER_PAGE: usize = 100;

/// Read the API token from the environment. `GITHUB_TOKEN` is the
/// canonical variable, `GH_TOKEN` is accepted for gh CLI users.
pub fn token_from_env() -> Result<String, GitHubError> {
    std::env::var("GITHUB_TOKEN")
        .or_else(|_| std::env::var("GH_TOKEN"))
        .map_err(|_| GitHubError::MissingToken)
}

/// GitHub REST adapter for fetching PR files and publishing the report.
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
    selector: FileSelector,
}

#[derive(Deserialize)]
struct PullView {
    head: HeadView,
}

#[derive(Deserialize)]
struct HeadView {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct PrFileRow {
    filename: String,
    status: String,
    patch: Option<String>,
}

impl GitHubClient {
    pub fn new(api_url: String, token: String, selector: FileSelector) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
            selector,
        }
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.http
            .get(url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .bearer_auth(&self.token)
    }

    async fn check(
        &self,
        resp: reqwest::Response,
        context: &str,
    ) -> Result<reqwest::Response, GitHubError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let rate_limit_exhausted = resp
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            == Some("0");
        Err(classify_status(
            status.as_u16(),
            rate_limit_exhausted,
            context,
        ))
    }

    async fn head_sha(&self, pr: &PrRef) -> Result<String, GitHubError> {
        let url = format!(
            "{}/repos/{}/{}/pulls/{}",
            self.api_url, pr.owner, pr.repo, pr.number
        );
        let resp = self.get(&url).send().await?;
        let view: PullView = self.check(resp, &pr.to_string()).await?.json().await?;
        Ok(view.head.sha)
    }

    async fn changed_file_rows(&self, pr: &PrRef) -> Result<Vec<PrFileRow>, GitHubError> {
        let mut rows = Vec::new();
        let mut page = 1u32;
        loop {
            let url = format!(
                "{}/repos/{}/{}/pulls/{}/files?per_page={}&page={}",
                self.api_url, pr.owner, pr.repo, pr.number, PER_PAGE, page
            );
            let resp = self.get(&url).send().await?;
            let batch: Vec<PrFileRow> = self
                .check(resp, &format!("files of {}", pr))
                .await?
                .json()
                .await?;
            let last_page = batch.len() < PER_PAGE;
            rows.extend(batch);
            if last_page {
                break;
            }
            page += 1;
        }
        Ok(rows)
    }

    async fn file_content(
        &self,
        pr: &PrRef,
        path: &str,
        git_ref: &str,
    ) -> Result<String, GitHubError> {
        let url = format!(
            "{}/repos/{}/{}/contents/{}?ref={}",
            self.api_url, pr.owner, pr.repo, path, git_ref
        );
        let resp = self
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/vnd.github.raw+json")
            .send()
            .await?;
        let content = self
            .check(resp, &format!("{} at {}", path, git_ref))
            .await?
            .text()
            .await?;
        Ok(content)
    }
}

#[async_trait]
impl VcsHost for GitHubClient {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn fetch_changed_files(&self, pr: &PrRef) -> Result<Vec<FileUnit>, GitHubError> {
        let sha = self.head_sha(pr).await?;
        let rows = self.changed_file_rows(pr).await?;
        let total = rows.len();

        let mut units = Vec::new();
        for row in rows {
            if row.status == "removed" {
                debug!("Skipping {} (removed in this PR)", row.filename);
                continue;
            }
            let path = PathBuf::from(&row.filename);
            if !self.selector.selects(&path) {
                debug!("Skipping {} (outside file filter)", row.filename);
                continue;
            }
            let content = self.file_content(pr, &row.filename, &sha).await?;
            units.push(FileUnit {
                path,
                content,
                patch: row.patch,
            });
        }

        debug!(
            "Selected {} of {} changed files for {}",
            units.len(),
            total,
            pr
        );
        Ok(units)
    }

    async fn post_comment(&self, pr: &PrRef, body: &str) -> Result<(), GitHubError> {
        let url = format!(
            "{}/repos/{}/{}/issues/{}/comments",
            self.api_url, pr.owner, pr.repo, pr.number
        );
        let resp = self
            .http
            .post(&url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "body": body }))
            .send()
            .await?;
        self.check(resp, &format!("comment on {}", pr)).await?;
        debug!("Posted report comment on {}", pr);
        Ok(())
    }
}

fn classify_status(status: u16, rate_limit_exhausted: bool, context: &str) -> GitHubError {
    match status {
        401 => GitHubError::Auth(format!("401 for {}", context)),
        403 if rate_limit_exhausted => GitHubError::RateLimited,
        403 => GitHubError::Auth(format!("403 for {}", context)),
        404 => GitHubError::NotFound(context.to_string()),
        429 => GitHubError::RateLimited,
        s if s >= 500 => GitHubError::Server { status: s },
        s => GitHubError::Api {
            status: s,
            context: context.to_string(),
        },
    }
}
