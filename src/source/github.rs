use super::{CommitIter, CommitSource, SourceInfo};
use crate::error::{ChangegenError, Result};
use crate::model::RawCommit;
use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, AUTHORIZATION, LINK, USER_AGENT};
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::VecDeque;
use std::sync::OnceLock;

const API_BASE: &str = "https://api.github.com";
const PER_PAGE: usize = 100;

/// Normalizes `https://github.com/owner/repo`, `github.com/owner/repo` or
/// `owner/repo` (optionally with `.git`) to `owner/repo`.
pub fn parse_github_url(url: &str) -> Result<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"^(?:https?://)?(?:www\.)?(?:github\.com/)?([^/\s]+)/([^/\s]+?)(?:\.git)?/?$")
            .expect("valid regex")
    });
    let invalid = || {
        ChangegenError::Parse(
            "Invalid GitHub URL format. Use format: owner/repo or https://github.com/owner/repo"
                .to_string(),
        )
    };
    let caps = pattern.captures(url.trim()).ok_or_else(invalid)?;
    let owner = caps[1].to_lowercase();
    if owner == "github.com" || owner == "www.github.com" {
        return Err(invalid());
    }
    Ok(format!("{}/{}", &caps[1], &caps[2]))
}

#[derive(Debug, Deserialize)]
struct RepoResponse {
    full_name: String,
    default_branch: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    sha: String,
    commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    author: Option<Signature>,
    committer: Option<Signature>,
    message: String,
}

#[derive(Debug, Deserialize)]
struct Signature {
    date: DateTime<Utc>,
}

impl CommitResponse {
    fn into_raw(self) -> Result<RawCommit> {
        let date = self
            .commit
            .author
            .or(self.commit.committer)
            .map(|sig| sig.date.date_naive())
            .ok_or_else(|| ChangegenError::InvalidDate(format!("commit {} has no date", self.sha)))?;
        Ok(RawCommit::new(self.sha, date, &self.commit.message))
    }
}

pub struct GithubSource {
    http: Client,
    api_base: String,
    token: Option<String>,
    info: SourceInfo,
}

impl GithubSource {
    /// Looks the repository up and resolves the branch to read.
    pub fn connect(repo_ref: &str, token: Option<String>, branch: Option<&str>) -> Result<Self> {
        Self::connect_to(API_BASE, repo_ref, token, branch)
    }

    pub fn connect_to(api_base: &str, repo_ref: &str, token: Option<String>, branch: Option<&str>) -> Result<Self> {
        let full_name = parse_github_url(repo_ref)?;
        let http = Client::builder()
            .build()
            .map_err(|err| ChangegenError::Config(format!("failed to build HTTP client: {err}")))?;

        let mut source = Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
            info: SourceInfo {
                name: full_name.clone(),
                ..SourceInfo::default()
            },
        };

        let repo: RepoResponse = source
            .get(&format!("/repos/{full_name}"), &[])?
            .json()
            .map_err(|err| ChangegenError::Source(format!("invalid repository response: {err}")))?;

        source.info.name = repo.full_name;
        source.info.description = repo.description;
        source.info.branch = source.preferred_branch(branch, &repo.default_branch);
        source.info.total_commits = source.count_commits();
        Ok(source)
    }

    fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Response> {
        let mut request = self
            .http
            .get(format!("{}{path}", self.api_base))
            .header(USER_AGENT, concat!("changegen/", env!("CARGO_PKG_VERSION")))
            .header(ACCEPT, "application/vnd.github+json")
            .query(query);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = request.send()?;
        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::NOT_FOUND => Err(ChangegenError::NotFound(self.info.name.clone())),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ChangegenError::Unauthorized(format!(
                "GitHub responded with {} for {}",
                response.status(),
                self.info.name
            ))),
            status => {
                let body = response.text().unwrap_or_default();
                Err(ChangegenError::Source(format!("GitHub responded with {status}: {body}")))
            }
        }
    }

    fn branch_exists(&self, branch: &str) -> bool {
        self.get(&format!("/repos/{}/branches/{branch}", self.info.name), &[])
            .is_ok()
    }

    /// Requested branch if it exists, else `main`, else `master`, else the
    /// repository default.
    fn preferred_branch(&self, requested: Option<&str>, default_branch: &str) -> String {
        if let Some(branch) = requested {
            if self.branch_exists(branch) {
                return branch.to_string();
            }
            tracing::warn!(branch, "custom branch not found, falling back to default branch search");
        }
        ["main", "master"]
            .into_iter()
            .find(|b| self.branch_exists(b))
            .map(str::to_string)
            .unwrap_or_else(|| default_branch.to_string())
    }

    fn count_commits(&self) -> Option<usize> {
        let response = self
            .get(
                &format!("/repos/{}/commits", self.info.name),
                &[("sha", self.info.branch.clone()), ("per_page", "1".to_string())],
            )
            .map_err(|err| tracing::warn!(error = %err, "unable to count total commits"))
            .ok()?;
        match response.headers().get(LINK).and_then(|v| v.to_str().ok()) {
            Some(link) => last_page(link),
            None => response.json::<Vec<serde_json::Value>>().ok().map(|v| v.len()),
        }
    }

    fn fetch_page(&self, page: usize) -> Result<Vec<RawCommit>> {
        let commits: Vec<CommitResponse> = self
            .get(
                &format!("/repos/{}/commits", self.info.name),
                &[
                    ("sha", self.info.branch.clone()),
                    ("per_page", PER_PAGE.to_string()),
                    ("page", page.to_string()),
                ],
            )?
            .json()
            .map_err(|err| ChangegenError::Source(format!("invalid commits response: {err}")))?;
        commits.into_iter().map(CommitResponse::into_raw).collect()
    }
}

/// Page number of the `rel="last"` entry in a GitHub `Link` header.
fn last_page(link: &str) -> Option<usize> {
    link.split(',')
        .find(|part| part.contains("rel=\"last\""))
        .and_then(|part| {
            let url = part.split(';').next()?.trim().trim_matches(['<', '>']);
            url.split(['?', '&'])
                .find_map(|pair| pair.strip_prefix("page="))
                .and_then(|n| n.parse().ok())
        })
}

struct Pages<'a> {
    source: &'a GithubSource,
    page: usize,
    buffer: VecDeque<RawCommit>,
    done: bool,
}

impl Iterator for Pages<'_> {
    type Item = Result<RawCommit>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.done {
            match self.source.fetch_page(self.page) {
                Ok(commits) => {
                    self.done = commits.len() < PER_PAGE;
                    self.page += 1;
                    self.buffer.extend(commits);
                }
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}

impl CommitSource for GithubSource {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    fn commits(&self) -> Result<CommitIter<'_>> {
        Ok(Box::new(Pages {
            source: self,
            page: 1,
            buffer: VecDeque::new(),
            done: false,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_all_url_shapes() {
        for url in [
            "https://github.com/owner/repo",
            "http://www.github.com/owner/repo/",
            "github.com/owner/repo.git",
            "owner/repo",
        ] {
            assert_eq!(parse_github_url(url).unwrap(), "owner/repo", "{url}");
        }
    }

    #[test]
    fn rejects_malformed_urls() {
        assert!(parse_github_url("just-a-name").is_err());
        assert!(parse_github_url("https://github.com/owner").is_err());
    }

    #[test]
    fn reads_last_page_from_link_header() {
        let link = r#"<https://api.github.com/repositories/1/commits?sha=main&per_page=1&page=2>; rel="next", <https://api.github.com/repositories/1/commits?sha=main&per_page=1&page=348>; rel="last""#;
        assert_eq!(last_page(link), Some(348));
        assert_eq!(last_page(r#"<https://x/y?page=2>; rel="next""#), None);
    }

    #[test]
    fn commit_date_comes_from_author() {
        let raw = r#"{"sha":"abc","commit":{"author":{"date":"2024-06-02T23:30:00Z"},"committer":{"date":"2024-06-03T01:00:00Z"},"message":"Add login\n\nDetails"}}"#;
        let commit: CommitResponse = serde_json::from_str(raw).unwrap();
        let commit = commit.into_raw().unwrap();
        assert_eq!(commit.date.to_string(), "2024-06-02");
        assert_eq!(commit.title, "Add login");
    }

    #[test]
    fn unreachable_api_is_a_source_access_error() {
        let err = GithubSource::connect_to("http://127.0.0.1:9", "owner/repo", None, None)
            .err()
            .unwrap();
        assert!(err.is_source_access());
    }
}
