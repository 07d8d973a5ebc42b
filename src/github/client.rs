use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, ACCEPT, LINK};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::types::{ChangedFile, IssueComment, Page, PullRequest, Review};
use super::{GitHubError, PullRequestApi};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const USER_AGENT: &str = "review-stats";
const API_VERSION: &str = "2022-11-28";
const PER_PAGE: u32 = 100;

/// GitHub REST client authenticated with a static bearer token.
pub struct GitHubClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

#[derive(Deserialize)]
struct User {
    login: String,
}

#[derive(Deserialize)]
struct Repo {
    name: String,
    owner: User,
}

#[derive(Deserialize)]
struct Base {
    repo: Option<Repo>,
}

#[derive(Deserialize)]
struct PullResponse {
    number: u64,
    html_url: String,
    user: Option<User>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    base: Base,
}

#[derive(Deserialize)]
struct ActorResponse {
    user: Option<User>,
}

#[derive(Deserialize)]
struct FileResponse {
    filename: String,
    additions: i64,
}

impl GitHubClient {
    /// Build a client for `base_url` (e.g., https://api.github.com or a GitHub
    /// Enterprise `/api/v3` root).
    pub fn new(base_url: &str, token: &str) -> Result<Self, GitHubError> {
        let parsed =
            Url::parse(base_url).map_err(|_| GitHubError::InvalidBaseUrl(base_url.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(GitHubError::InvalidBaseUrl(base_url.to_string()));
        }

        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// GET one page of a list endpoint and decode it as a JSON array.
    async fn get_page<R: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        page: u32,
    ) -> Result<(Vec<R>, Option<u32>), GitHubError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .query(query)
            .query(&[("page", page), ("per_page", PER_PAGE)])
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GitHubError::Status {
                status: status.as_u16(),
                url,
                body,
            });
        }

        let next_page = parse_next_page(response.headers());
        let items = response.json::<Vec<R>>().await?;
        debug!(items = items.len(), ?next_page, "received page");
        Ok((items, next_page))
    }
}

#[async_trait]
impl PullRequestApi for GitHubClient {
    #[instrument(skip(self))]
    async fn list_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
    ) -> Result<Page<PullRequest>, GitHubError> {
        let path = format!("/repos/{owner}/{repo}/pulls");
        let query = [("state", "all"), ("sort", "updated"), ("direction", "desc")];
        let (pulls, next_page) = self.get_page::<PullResponse>(&path, &query, page).await?;

        let items = pulls
            .into_iter()
            .map(|pull| {
                // A deleted base repository leaves `base.repo` null; fall back to
                // the repository the listing came from.
                let (owner, repo) = match pull.base.repo {
                    Some(base) => (base.owner.login, base.name),
                    None => (owner.to_string(), repo.to_string()),
                };
                PullRequest {
                    number: pull.number,
                    author: pull.user.map(|u| u.login),
                    created_at: pull.created_at,
                    updated_at: pull.updated_at,
                    owner,
                    repo,
                    html_url: pull.html_url,
                }
            })
            .collect();
        Ok(Page::new(items, next_page))
    }

    #[instrument(skip(self, pr), fields(owner = %pr.owner, repo = %pr.repo, pr = pr.number))]
    async fn list_reviews(&self, pr: &PullRequest, page: u32) -> Result<Page<Review>, GitHubError> {
        let path = format!("/repos/{}/{}/pulls/{}/reviews", pr.owner, pr.repo, pr.number);
        let (reviews, next_page) = self.get_page::<ActorResponse>(&path, &[], page).await?;
        let items = reviews
            .into_iter()
            .map(|r| Review {
                author: r.user.map(|u| u.login),
            })
            .collect();
        Ok(Page::new(items, next_page))
    }

    #[instrument(skip(self, pr), fields(owner = %pr.owner, repo = %pr.repo, pr = pr.number))]
    async fn list_issue_comments(
        &self,
        pr: &PullRequest,
        page: u32,
    ) -> Result<Page<IssueComment>, GitHubError> {
        let path = format!("/repos/{}/{}/issues/{}/comments", pr.owner, pr.repo, pr.number);
        let (comments, next_page) = self.get_page::<ActorResponse>(&path, &[], page).await?;
        let items = comments
            .into_iter()
            .map(|c| IssueComment {
                author: c.user.map(|u| u.login),
            })
            .collect();
        Ok(Page::new(items, next_page))
    }

    #[instrument(skip(self, pr), fields(owner = %pr.owner, repo = %pr.repo, pr = pr.number))]
    async fn list_files(
        &self,
        pr: &PullRequest,
        page: u32,
    ) -> Result<Page<ChangedFile>, GitHubError> {
        let path = format!("/repos/{}/{}/pulls/{}/files", pr.owner, pr.repo, pr.number);
        let (files, next_page) = self.get_page::<FileResponse>(&path, &[], page).await?;
        let items = files
            .into_iter()
            .map(|f| ChangedFile {
                filename: f.filename,
                additions: f.additions,
            })
            .collect();
        Ok(Page::new(items, next_page))
    }
}

/// Extract the `page` query parameter of the `rel="next"` entry in a Link header.
fn parse_next_page(headers: &HeaderMap) -> Option<u32> {
    let link = headers.get(LINK)?.to_str().ok()?;
    let next = link
        .split(',')
        .map(str::trim)
        .find(|part| part.contains("rel=\"next\""))?;
    let start = next.find('<')? + 1;
    let end = next.find('>')?;
    let url = Url::parse(next.get(start..end)?).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "page")
        .and_then(|(_, value)| value.parse().ok())
}
