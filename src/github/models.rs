//! # GitHub Wire Models
//!
//! Deserialization targets for the subset of the GitHub REST v3 payloads
//! this tool consumes, plus conversions into the domain types. Field names
//! mirror the wire format so the structs stay `serde` transparent.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::types::{
    Commit, ContributorWeeks, PullRequest, PullStats, Repository, WeekStat,
};

/// A repository as returned by `GET /orgs/{org}/repos`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRepo {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub default_branch: Option<String>,
    #[serde(default)]
    pub fork: bool,
    pub description: Option<String>,
    pub language: Option<String>,
    #[serde(default)]
    pub stargazers_count: u32,
    pub pushed_at: Option<DateTime<Utc>>,
}

impl GitHubRepo {
    pub fn into_repository(self) -> Repository {
        Repository {
            id: self.id,
            name: self.name,
            full_name: self.full_name,
            default_branch: self.default_branch.unwrap_or_else(|| "main".to_string()),
            fork: self.fork,
            description: self.description,
            language: self.language,
            stargazers: self.stargazers_count,
            pushed_at: self.pushed_at,
        }
    }
}

/// The account attached to commits, pull requests and reviews.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubUser {
    pub login: String,
    #[serde(default)]
    pub avatar_url: String,
}

/// Git-level author data nested inside a commit object.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubCommitAuthor {
    pub date: Option<DateTime<Utc>>,
}

/// The `commit` object nested inside a listed commit.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubCommitMeta {
    #[serde(default)]
    pub message: String,
    pub author: Option<GitHubCommitAuthor>,
}

/// A commit as returned by `GET /repos/{owner}/{repo}/commits`.
///
/// `author` is the linked GitHub account and is null for commits whose
/// email matches no account; those commits cannot be attributed and are
/// dropped during conversion.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubCommit {
    pub sha: String,
    pub commit: GitHubCommitMeta,
    pub author: Option<GitHubUser>,
    #[serde(default)]
    pub html_url: String,
}

impl GitHubCommit {
    /// Converts into a domain commit, or `None` when the commit has no
    /// attributable account or no authored date.
    pub fn into_commit(self, repo: &str) -> Option<Commit> {
        let account = self.author?;
        let date = self.commit.author.and_then(|author| author.date)?;
        let message = self
            .commit
            .message
            .lines()
            .next()
            .unwrap_or_default()
            .to_string();
        Some(Commit {
            sha: self.sha,
            author: account.login,
            avatar_url: account.avatar_url,
            message,
            date,
            html_url: self.html_url,
            repo: repo.to_string(),
        })
    }
}

/// Line counts on a single commit, only present on the detail endpoint.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct GitHubCommitStats {
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    #[serde(default)]
    pub total: u64,
}

/// A commit as returned by `GET /repos/{owner}/{repo}/commits/{sha}`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubCommitDetail {
    pub stats: Option<GitHubCommitStats>,
}

/// A pull request as returned by `GET /repos/{owner}/{repo}/pulls`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubPull {
    pub number: u64,
    pub user: Option<GitHubUser>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub html_url: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
}

impl GitHubPull {
    /// Converts into a domain pull request. Deleted accounts show up as a
    /// null user and are attributed to "ghost", matching what the GitHub
    /// web UI displays.
    pub fn into_pull(self) -> PullRequest {
        let (author, avatar_url) = match self.user {
            Some(user) => (user.login, user.avatar_url),
            None => ("ghost".to_string(), String::new()),
        };
        PullRequest {
            number: self.number,
            author,
            avatar_url,
            title: self.title,
            html_url: self.html_url,
            state: self.state,
            created_at: self.created_at,
            updated_at: self.updated_at,
            closed_at: self.closed_at,
            merged_at: self.merged_at,
            stats: None,
        }
    }
}

/// Line/commit counts from `GET /repos/{owner}/{repo}/pulls/{number}`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct GitHubPullDetail {
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    #[serde(default)]
    pub commits: u64,
    #[serde(default)]
    pub changed_files: u64,
}

impl GitHubPullDetail {
    pub fn into_stats(self) -> PullStats {
        PullStats {
            additions: self.additions,
            deletions: self.deletions,
            commits: self.commits,
            changed_files: self.changed_files,
        }
    }
}

/// A review as returned by `GET /repos/{owner}/{repo}/pulls/{number}/reviews`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubReview {
    pub user: Option<GitHubUser>,
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub state: String,
}

/// One week inside a contributor-statistics entry.
///
/// The wire format uses single-letter keys: `w` is the unix timestamp of
/// the week's Sunday, `a`/`d`/`c` are additions, deletions and commits.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct GitHubWeek {
    pub w: i64,
    #[serde(default)]
    pub a: u64,
    #[serde(default)]
    pub d: u64,
    #[serde(default)]
    pub c: u64,
}

/// One author's entry from `GET /repos/{owner}/{repo}/stats/contributors`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubContributorStats {
    pub author: Option<GitHubUser>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub weeks: Vec<GitHubWeek>,
}

impl GitHubContributorStats {
    /// Converts into per-author weekly statistics, dropping idle weeks and
    /// entries with no attributable account.
    pub fn into_weeks(self) -> Option<ContributorWeeks> {
        let author = self.author?;
        let weeks = self
            .weeks
            .into_iter()
            .filter(|week| week.a > 0 || week.d > 0 || week.c > 0)
            .filter_map(|week| {
                Some(WeekStat {
                    week: DateTime::from_timestamp(week.w, 0)?,
                    additions: week.a,
                    deletions: week.d,
                    commits: week.c,
                })
            })
            .collect();
        Some(ContributorWeeks {
            login: author.login,
            avatar_url: author.avatar_url,
            total: self.total,
            weeks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_commit_conversion_keeps_first_message_line() {
        let commit: GitHubCommit = serde_json::from_value(json!({
            "sha": "abc123",
            "commit": {
                "message": "Fix the flux capacitor\n\nLonger body here.",
                "author": {"date": "2024-01-10T12:00:00Z"}
            },
            "author": {"login": "alice", "avatar_url": "https://example.com/alice.png"},
            "html_url": "https://github.com/acme/api/commit/abc123"
        }))
        .unwrap();

        let converted = commit.into_commit("api").unwrap();
        assert_eq!(converted.author, "alice");
        assert_eq!(converted.message, "Fix the flux capacitor");
        assert_eq!(converted.repo, "api");
    }

    #[test]
    fn test_unattributable_commits_are_dropped() {
        let commit: GitHubCommit = serde_json::from_value(json!({
            "sha": "abc123",
            "commit": {
                "message": "anonymous",
                "author": {"date": "2024-01-10T12:00:00Z"}
            },
            "author": null,
            "html_url": ""
        }))
        .unwrap();

        assert!(commit.into_commit("api").is_none());
    }

    #[test]
    fn test_pull_conversion_handles_deleted_accounts() {
        let pull: GitHubPull = serde_json::from_value(json!({
            "number": 7,
            "user": null,
            "title": "Orphaned change",
            "html_url": "https://github.com/acme/api/pull/7",
            "state": "closed",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-02T00:00:00Z",
            "closed_at": "2024-01-02T00:00:00Z",
            "merged_at": null
        }))
        .unwrap();

        let converted = pull.into_pull();
        assert_eq!(converted.author, "ghost");
        assert_eq!(converted.merged_at, None);
    }

    #[test]
    fn test_stats_conversion_drops_idle_weeks() {
        let stats: GitHubContributorStats = serde_json::from_value(json!({
            "author": {"login": "bob", "avatar_url": ""},
            "total": 3,
            "weeks": [
                {"w": 1704585600, "a": 0, "d": 0, "c": 0},
                {"w": 1705190400, "a": 10, "d": 2, "c": 3}
            ]
        }))
        .unwrap();

        let weeks = stats.into_weeks().unwrap();
        assert_eq!(weeks.login, "bob");
        assert_eq!(weeks.total, 3);
        assert_eq!(weeks.weeks.len(), 1);
        assert_eq!(weeks.weeks[0].additions, 10);
    }

    #[test]
    fn test_stats_without_author_are_dropped() {
        let stats: GitHubContributorStats = serde_json::from_value(json!({
            "author": null,
            "total": 1,
            "weeks": []
        }))
        .unwrap();

        assert!(stats.into_weeks().is_none());
    }

    #[test]
    fn test_repo_defaults() {
        let repo: GitHubRepo = serde_json::from_value(json!({
            "id": 1,
            "name": "api",
            "full_name": "acme/api",
            "default_branch": null,
            "description": null,
            "language": "Rust",
            "pushed_at": null
        }))
        .unwrap();

        let converted = repo.into_repository();
        assert_eq!(converted.default_branch, "main");
        assert!(!converted.fork);
        assert_eq!(converted.stargazers, 0);
    }
}
