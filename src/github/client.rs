//! # GitHub API Client
//!
//! Thin, cache-aware client for the slice of the GitHub REST API this tool
//! consumes. All requests go through a [`Transport`] so tests can swap the
//! network out for canned responses, and all error mapping lives in one
//! place so callers can distinguish fatal conditions (bad token, exhausted
//! rate limit) from per-repository ones.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;

use crate::config::FetchLimits;
use crate::github::cache::{self, ResponseCache};
use crate::github::models::{
    GitHubCommit, GitHubCommitDetail, GitHubCommitStats, GitHubContributorStats, GitHubPull,
    GitHubPullDetail, GitHubRepo, GitHubReview,
};
use crate::types::{Commit, ContributorWeeks, PullRequest, PullStats, Repository};

/// Page size used for every list endpoint.
pub const PAGE_SIZE: usize = 100;

/// Pause between polls of the contributor statistics endpoint.
pub const STATS_RETRY_DELAY: Duration = Duration::from_millis(1500);

/// Error returned by GitHub API calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The token was rejected outright; nothing else can succeed
    #[error("GitHub rejected the token; check GITHUB_TOKEN or --token")]
    InvalidToken,
    #[error("organization '{0}' not found")]
    OrgNotFound(String),
    #[error("repository '{0}' not found")]
    RepoNotFound(String),
    /// The rate limit is exhausted; retrying before the reset is pointless
    #[error("GitHub API rate limit exhausted{}", rate_reset_hint(.reset))]
    RateLimited { reset: Option<DateTime<Utc>> },
    #[error("access forbidden: {0}")]
    Forbidden(String),
    #[error("GitHub API error: {status} {status_text}")]
    Http { status: u16, status_text: String },
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("failed to decode GitHub response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// True when no other request can succeed either, so retries and
    /// fallbacks are pointless.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ApiError::InvalidToken | ApiError::RateLimited { .. })
    }
}

fn rate_reset_hint(reset: &Option<DateTime<Utc>>) -> String {
    match reset {
        Some(at) => format!(", resets at {}", at.format("%H:%M:%S UTC")),
        None => String::new(),
    }
}

/// A decoded HTTP response with the headers this client cares about.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub status_text: String,
    pub body: String,
    /// Remaining requests from `x-ratelimit-remaining`, when present
    pub rate_remaining: Option<u64>,
    /// Reset time from `x-ratelimit-reset` as a unix timestamp
    pub rate_reset: Option<i64>,
}

/// The transport layer underneath [`GithubClient`].
///
/// Production code uses [`HttpTransport`]; tests substitute an in-memory
/// implementation with scripted responses.
pub trait Transport: Send + Sync {
    fn get<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<RawResponse, ApiError>>;
}

/// [`Transport`] over a real HTTP connection to the GitHub API.
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpTransport {
    /// Connects to the public GitHub API, optionally authenticated.
    pub fn new(token: Option<String>) -> Result<Self, ApiError> {
        Self::with_base_url("https://api.github.com", token)
    }

    /// Connects to an alternate API root, e.g. a GitHub Enterprise host.
    pub fn with_base_url(base_url: impl Into<String>, token: Option<String>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("orgstats/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            http,
            base_url,
            token,
        })
    }
}

impl Transport for HttpTransport {
    fn get<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<RawResponse, ApiError>> {
        Box::pin(async move {
            let url = format!("{}{}", self.base_url, path);
            let mut request = self
                .http
                .get(&url)
                .header("Accept", "application/vnd.github+json")
                .header("X-GitHub-Api-Version", "2022-11-28");
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }
            let response = request.send().await?;
            let status = response.status();
            let rate_remaining = header_number(response.headers(), "x-ratelimit-remaining");
            let rate_reset = header_number(response.headers(), "x-ratelimit-reset");
            let body = response.text().await?;
            Ok(RawResponse {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("unknown").to_string(),
                body,
                rate_remaining,
                rate_reset,
            })
        })
    }
}

fn header_number<T: std::str::FromStr>(headers: &reqwest::header::HeaderMap, name: &str) -> Option<T> {
    headers.get(name)?.to_str().ok()?.parse().ok()
}

/// Maps an error-status response to an [`ApiError`].
///
/// `not_found` supplies the context-specific 404 meaning, since a missing
/// organization and a missing repository read very differently to the user.
fn classify(response: &RawResponse, not_found: impl FnOnce() -> ApiError) -> Option<ApiError> {
    match response.status {
        401 => Some(ApiError::InvalidToken),
        404 => Some(not_found()),
        403 if response.rate_remaining == Some(0) => Some(ApiError::RateLimited {
            reset: response
                .rate_reset
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        }),
        403 => Some(ApiError::Forbidden(error_message(response))),
        status if status >= 400 => Some(ApiError::Http {
            status,
            status_text: response.status_text.clone(),
        }),
        _ => None,
    }
}

/// Pulls the `message` field out of a GitHub error body, falling back to
/// the status text.
fn error_message(response: &RawResponse) -> String {
    serde_json::from_str::<serde_json::Value>(&response.body)
        .ok()
        .and_then(|body| body.get("message")?.as_str().map(String::from))
        .unwrap_or_else(|| response.status_text.clone())
}

/// Async delay injected into the client so tests do not have to wait out
/// real statistics retries.
pub type DelayFn = Arc<dyn Fn(Duration) -> BoxFuture<'static, ()> + Send + Sync>;

/// Cache-aware GitHub API client.
///
/// Cheap to clone; clones share the transport and the response cache.
#[derive(Clone)]
pub struct GithubClient {
    transport: Arc<dyn Transport>,
    cache: ResponseCache,
    limits: FetchLimits,
    delay: DelayFn,
}

impl GithubClient {
    pub fn new(transport: Arc<dyn Transport>, cache: ResponseCache) -> Self {
        Self::with_limits(transport, cache, FetchLimits::default())
    }

    pub fn with_limits(
        transport: Arc<dyn Transport>,
        cache: ResponseCache,
        limits: FetchLimits,
    ) -> Self {
        Self {
            transport,
            cache,
            limits,
            delay: Arc::new(|wait| Box::pin(tokio::time::sleep(wait))),
        }
    }

    /// Replaces the pause used between statistics polls.
    pub fn with_delay(mut self, delay: DelayFn) -> Self {
        self.delay = delay;
        self
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn limits(&self) -> FetchLimits {
        self.limits
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        not_found: impl FnOnce() -> ApiError,
    ) -> Result<T, ApiError> {
        let response = self.transport.get(path).await?;
        if let Some(err) = classify(&response, not_found) {
            return Err(err);
        }
        Ok(serde_json::from_str(&response.body)?)
    }

    /// Fetches every repository of an organization, paging until GitHub
    /// returns a short page. The assembled list is cached whole.
    pub async fn org_repos(&self, org: &str) -> Result<Vec<Repository>, ApiError> {
        let key = cache::repos_key(org);
        if let Some(repos) = self.cache.get::<Vec<Repository>>(&key) {
            log::debug!("using cached repository list for {org}");
            return Ok(repos);
        }
        let mut repos = Vec::new();
        let mut page = 1;
        loop {
            let path =
                format!("/orgs/{org}/repos?per_page={PAGE_SIZE}&page={page}&type=all&sort=updated");
            let batch: Vec<GitHubRepo> = self
                .get_json(&path, || ApiError::OrgNotFound(org.to_string()))
                .await?;
            let fetched = batch.len();
            repos.extend(batch.into_iter().map(GitHubRepo::into_repository));
            if fetched < PAGE_SIZE {
                break;
            }
            page += 1;
        }
        log::info!("fetched {} repositories for {org}", repos.len());
        self.cache.store(&key, &repos);
        Ok(repos)
    }

    /// Lists commits on the repository's default branch, newest first,
    /// dropping commits that cannot be attributed to an account. The
    /// assembled list is cached under a branch- and day-specific key.
    ///
    /// Without a window start the listing pages until exhaustion; with one
    /// it is capped at a fixed number of pages so one hyperactive
    /// repository cannot eat the whole rate budget.
    pub async fn commits(
        &self,
        org: &str,
        repo: &Repository,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Commit>, ApiError> {
        let key = cache::commits_key(org, &repo.name, &repo.default_branch, since);
        if let Some(commits) = self.cache.get::<Vec<Commit>>(&key) {
            log::debug!("using cached commit list for {org}/{}", repo.name);
            return Ok(commits);
        }
        let cap = since.map(|_| self.limits.page_cap);
        let commits = self.commits_paged(org, repo, since, cap).await?;
        self.cache.store(&key, &commits);
        Ok(commits)
    }

    /// Same as [`commits`](Self::commits) with an explicit page cap.
    pub async fn commits_paged(
        &self,
        org: &str,
        repo: &Repository,
        since: Option<DateTime<Utc>>,
        page_cap: Option<usize>,
    ) -> Result<Vec<Commit>, ApiError> {
        let name = &repo.name;
        let mut base = format!(
            "/repos/{org}/{name}/commits?sha={}&per_page={PAGE_SIZE}",
            repo.default_branch
        );
        if let Some(since) = since {
            base.push_str(&format!(
                "&since={}",
                since.to_rfc3339_opts(SecondsFormat::Secs, true)
            ));
        }
        let mut commits = Vec::new();
        let mut page = 1;
        loop {
            if page_cap.is_some_and(|cap| page > cap) {
                break;
            }
            let path = format!("{base}&page={page}");
            let batch: Vec<GitHubCommit> = self
                .get_json(&path, || ApiError::RepoNotFound(format!("{org}/{name}")))
                .await?;
            let fetched = batch.len();
            commits.extend(batch.into_iter().filter_map(|commit| commit.into_commit(name)));
            if fetched < PAGE_SIZE {
                break;
            }
            page += 1;
        }
        Ok(commits)
    }

    /// Line counts for a single commit, or `None` when GitHub omits them.
    pub async fn commit_detail(
        &self,
        org: &str,
        repo: &str,
        sha: &str,
    ) -> Result<Option<GitHubCommitStats>, ApiError> {
        let path = format!("/repos/{org}/{repo}/commits/{sha}");
        let detail: GitHubCommitDetail = self
            .get_json(&path, || ApiError::RepoNotFound(format!("{org}/{repo}")))
            .await?;
        Ok(detail.stats)
    }

    /// One page of pull requests across all states, most recently updated
    /// first. Pages start at 1.
    pub async fn pulls_page(
        &self,
        org: &str,
        repo: &str,
        page: usize,
    ) -> Result<Vec<PullRequest>, ApiError> {
        let path = format!(
            "/repos/{org}/{repo}/pulls?state=all&sort=updated&direction=desc&per_page={PAGE_SIZE}&page={page}"
        );
        let batch: Vec<GitHubPull> = self
            .get_json(&path, || ApiError::RepoNotFound(format!("{org}/{repo}")))
            .await?;
        Ok(batch.into_iter().map(GitHubPull::into_pull).collect())
    }

    /// Line/commit counts for one pull request.
    pub async fn pull_detail(
        &self,
        org: &str,
        repo: &str,
        number: u64,
    ) -> Result<PullStats, ApiError> {
        let path = format!("/repos/{org}/{repo}/pulls/{number}");
        let detail: GitHubPullDetail = self
            .get_json(&path, || ApiError::RepoNotFound(format!("{org}/{repo}")))
            .await?;
        Ok(detail.into_stats())
    }

    /// Reviews submitted on one pull request.
    pub async fn pull_reviews(
        &self,
        org: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<GitHubReview>, ApiError> {
        let path = format!("/repos/{org}/{repo}/pulls/{number}/reviews?per_page={PAGE_SIZE}");
        self.get_json(&path, || ApiError::RepoNotFound(format!("{org}/{repo}")))
            .await
    }

    /// Per-author weekly statistics for a repository.
    ///
    /// GitHub computes these in the background and answers 202 until they
    /// are ready, so the call polls a few times with a short pause.
    /// `Ok(None)` means the statistics never materialized; `Ok(Some(vec![]))`
    /// is a definitive empty answer (GitHub sends 204 for bare
    /// repositories).
    pub async fn contributor_stats(
        &self,
        org: &str,
        repo: &str,
    ) -> Result<Option<Vec<ContributorWeeks>>, ApiError> {
        let key = cache::stats_key(org, repo);
        if let Some(stats) = self.cache.get::<Vec<ContributorWeeks>>(&key) {
            log::debug!("using cached contributor stats for {org}/{repo}");
            return Ok(Some(stats));
        }
        let path = format!("/repos/{org}/{repo}/stats/contributors");
        for attempt in 0..=self.limits.stats_retries {
            if attempt > 0 {
                (self.delay)(STATS_RETRY_DELAY).await;
            }
            let response = self.transport.get(&path).await?;
            match response.status {
                202 => continue,
                204 => return Ok(Some(Vec::new())),
                _ => {}
            }
            if let Some(err) =
                classify(&response, || ApiError::RepoNotFound(format!("{org}/{repo}")))
            {
                return Err(err);
            }
            let entries: Vec<GitHubContributorStats> = serde_json::from_str(&response.body)?;
            let stats: Vec<ContributorWeeks> = entries
                .into_iter()
                .filter_map(GitHubContributorStats::into_weeks)
                .collect();
            self.cache.store(&key, &stats);
            return Ok(Some(stats));
        }
        log::debug!("contributor stats for {org}/{repo} still pending after retries");
        Ok(None)
    }
}
