//! # Common Types
//!
//! This module contains the common types used throughout the application for
//! representing repositories, contributor activity and aggregation results.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A repository belonging to the analyzed organization.
///
/// Immutable once fetched; refreshed only by re-fetching the organization's
/// repository list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    /// Numeric repository id
    pub id: u64,
    /// Short repository name (without the owner)
    pub name: String,
    /// "owner/name" form
    pub full_name: String,
    /// Branch commits are listed from
    pub default_branch: String,
    /// Whether the repository is a fork
    pub fork: bool,
    /// Repository description, if any
    pub description: Option<String>,
    /// Primary language, if detected
    pub language: Option<String>,
    /// Star count at fetch time
    pub stargazers: u32,
    /// Timestamp of the last push, if any
    pub pushed_at: Option<DateTime<Utc>>,
}

/// A single commit attributed to a contributor.
///
/// Commits without an identifiable author account are dropped before they
/// reach this type, so `author` is always a real login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    /// Full commit SHA
    pub sha: String,
    /// Author login
    pub author: String,
    /// Author avatar URL
    pub avatar_url: String,
    /// First line of the commit message
    pub message: String,
    /// Authored timestamp
    pub date: DateTime<Utc>,
    /// Web URL of the commit
    pub html_url: String,
    /// Name of the repository the commit belongs to
    pub repo: String,
}

/// Line/commit counts attached to a merged pull request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PullStats {
    pub additions: u64,
    pub deletions: u64,
    pub commits: u64,
    pub changed_files: u64,
}

/// A pull request authored by a contributor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    /// Author login
    pub author: String,
    /// Author avatar URL
    pub avatar_url: String,
    pub title: String,
    pub html_url: String,
    /// "open" or "closed"
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    /// Line/commit detail, fetched lazily for a bounded number of merged
    /// pull requests per repository
    pub stats: Option<PullStats>,
}

impl PullRequest {
    /// The date a pull request is filtered and bucketed by: merge date when
    /// merged, close date when closed unmerged, last update otherwise.
    pub fn effective_date(&self) -> DateTime<Utc> {
        self.merged_at.or(self.closed_at).unwrap_or(self.updated_at)
    }
}

/// A lightweight reference to a reviewed pull request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRef {
    pub number: u64,
    pub title: String,
    pub html_url: String,
}

/// Review activity of one login within one repository.
///
/// Always carries a count plus possibly-empty timestamp and reference lists;
/// records restored from older cache payloads may have timestamps missing,
/// in which case the count still stands on its own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    /// Total number of reviews submitted
    pub count: u64,
    /// Reviewer avatar URL
    pub avatar_url: String,
    /// Submission timestamp of each review
    pub submitted_at: Vec<DateTime<Utc>>,
    /// Distinct pull requests reviewed
    pub pulls: Vec<PullRef>,
}

/// One week of per-author commit statistics, either from the native
/// contributor-stats endpoint or derived from raw commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekStat {
    /// Sunday-aligned start of the week
    pub week: DateTime<Utc>,
    pub additions: u64,
    pub deletions: u64,
    pub commits: u64,
}

/// Per-author weekly commit statistics for one repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributorWeeks {
    pub login: String,
    pub avatar_url: String,
    /// Total commit count across all weeks
    pub total: u64,
    pub weeks: Vec<WeekStat>,
}

/// Repository-level totals distilled from contributor statistics.
///
/// Feeds the per-repository completion log only; the aggregation itself
/// works from the raw commits, pull requests and reviews.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RepoStatsSummary {
    /// Whether any statistics were found at all
    pub found: bool,
    pub commits: u64,
    pub additions: u64,
    pub deletions: u64,
}

/// Everything collected for a single repository.
#[derive(Debug, Clone, PartialEq)]
pub struct RepoActivity {
    /// Short repository name
    pub repo: String,
    pub commits: Vec<Commit>,
    pub pulls: Vec<PullRequest>,
    /// Review activity keyed by reviewer login
    pub reviews: HashMap<String, ReviewRecord>,
    pub summary: RepoStatsSummary,
}

impl RepoActivity {
    /// An activity record with no data, used when a repository fails to
    /// collect so the rest of the run can continue around it.
    pub fn empty(repo: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            commits: Vec::new(),
            pulls: Vec::new(),
            reviews: HashMap::new(),
            summary: RepoStatsSummary::default(),
        }
    }
}

/// One Sunday-aligned week of aggregated activity for a contributor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeekBucket {
    /// Sunday-aligned start of the week
    pub week: DateTime<Utc>,
    pub additions: u64,
    pub deletions: u64,
    pub commits: u64,
    pub pulls: u64,
    pub reviews: u64,
}

impl WeekBucket {
    /// A zeroed bucket for the given week start.
    pub fn empty(week: DateTime<Utc>) -> Self {
        Self {
            week,
            additions: 0,
            deletions: 0,
            commits: 0,
            pulls: 0,
            reviews: 0,
        }
    }
}

/// Aggregated activity of one contributor across all scanned repositories.
///
/// Unique per login within a result set. `net` always equals
/// `additions - deletions`; the weekly series is contiguous, zero-filled
/// and exactly as long as the requested window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributorStats {
    pub login: String,
    pub avatar_url: String,
    pub additions: u64,
    pub deletions: u64,
    /// `additions - deletions`, computed once when the record is emitted
    pub net: i64,
    pub commits: u64,
    pub pulls: u64,
    pub reviews: u64,
    /// Number of distinct repositories contributed to
    pub repos_contributed: usize,
    /// Fixed-length weekly activity series, oldest week first
    pub weekly: Vec<WeekBucket>,
    /// Most recent commits, newest first, at most 20
    pub recent_commits: Vec<Commit>,
    /// Most recent authored pull requests, newest first, at most 20
    pub recent_pulls: Vec<PullRequest>,
    /// Distinct reviewed pull requests, at most 20
    pub reviewed_pulls: Vec<PullRef>,
}

/// Per-repository lifecycle event emitted while a run is in progress.
#[derive(Debug, Clone)]
pub enum RepoEvent {
    /// Collection for a repository is starting
    Started {
        repo: String,
        index: usize,
        total: usize,
    },
    /// A repository finished collecting
    Completed {
        repo: String,
        index: usize,
        total: usize,
        /// Whether any contributor statistics were found
        has_stats: bool,
        has_pulls: bool,
        pr_count: usize,
        merged_pr_count: usize,
        total_commits: u64,
        total_additions: u64,
        total_deletions: u64,
    },
    /// A repository failed; the run continues without it
    Failed {
        repo: String,
        index: usize,
        total: usize,
        error: String,
    },
}

/// Update pushed to the driving layer while a run is in progress.
#[derive(Debug, Clone)]
pub enum RunUpdate {
    /// Overall completion percentage, 0-100
    Progress(u8),
    /// Aggregation over every repository processed so far
    Snapshot(Vec<ContributorStats>),
    /// Per-repository lifecycle event
    Repo(RepoEvent),
}
