//! # Dashboard State
//!
//! Mutable state of one dashboard session. The driving layer (the CLI
//! loop, or any richer frontend) owns a [`Dashboard`], feeds it updates
//! from the run channel, and renders from it between updates. It also
//! enforces the single-flight rule: a refresh that fires while a run is
//! in progress must not start a second one.

use chrono::{DateTime, Utc};

use crate::types::{ContributorStats, RepoEvent, RunUpdate};

/// State of the contributor dashboard across runs.
#[derive(Clone)]
pub struct Dashboard {
    pub organization: String,
    /// Latest contributor table, progressively replaced during a run
    pub stats: Vec<ContributorStats>,
    /// Overall progress of the running collection, 0-100
    pub progress: Option<u8>,
    /// Repository currently being collected
    pub current_repo: Option<String>,
    /// Repositories finished so far, success or failure
    pub repos_done: usize,
    /// Subset of `repos_done` that failed
    pub repos_failed: usize,
    pub repos_total: usize,
    pub is_running: bool,
    pub error_message: Option<String>,
    /// When the last run finished
    pub completed_at: Option<DateTime<Utc>>,
}

impl Dashboard {
    pub fn new(organization: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            ..Self::default()
        }
    }

    /// Marks the start of a run over `total` repositories.
    ///
    /// Returns false without touching anything when a run is already in
    /// progress; the caller must skip starting another one. The previous
    /// contributor table stays visible until the new run's snapshots
    /// replace it.
    pub fn begin_run(&mut self, total: usize) -> bool {
        if self.is_running {
            return false;
        }
        self.is_running = true;
        self.progress = Some(0);
        self.current_repo = None;
        self.repos_done = 0;
        self.repos_failed = 0;
        self.repos_total = total;
        self.error_message = None;
        true
    }

    /// Applies one update from a running collection.
    pub fn apply_update(&mut self, update: RunUpdate) {
        match update {
            RunUpdate::Progress(percent) => self.progress = Some(percent),
            RunUpdate::Snapshot(stats) => self.stats = stats,
            RunUpdate::Repo(RepoEvent::Started { repo, .. }) => {
                self.current_repo = Some(repo);
            }
            RunUpdate::Repo(RepoEvent::Completed { .. }) => {
                self.repos_done += 1;
                self.current_repo = None;
            }
            RunUpdate::Repo(RepoEvent::Failed { .. }) => {
                self.repos_done += 1;
                self.repos_failed += 1;
                self.current_repo = None;
            }
        }
    }

    /// Records a finished run and its final contributor table.
    pub fn finish_run(&mut self, stats: Vec<ContributorStats>) {
        self.stats = stats;
        self.is_running = false;
        self.progress = None;
        self.current_repo = None;
        self.completed_at = Some(Utc::now());
    }

    /// Records a run that died before producing a result.
    pub fn fail_run(&mut self, message: impl Into<String>) {
        self.error_message = Some(message.into());
        self.is_running = false;
        self.progress = None;
        self.current_repo = None;
    }

    /// One-line progress summary for display, when a run is in progress.
    pub fn format_progress(&self) -> Option<String> {
        if !self.is_running {
            return None;
        }
        let percent = self.progress.unwrap_or(0);
        let mut line = format!(
            "{percent}% - {}/{} repositories",
            self.repos_done, self.repos_total
        );
        if self.repos_failed > 0 {
            line.push_str(&format!(" ({} failed)", self.repos_failed));
        }
        if let Some(repo) = &self.current_repo {
            line.push_str(&format!(", fetching {repo}"));
        }
        Some(line)
    }
}

impl Default for Dashboard {
    fn default() -> Self {
        Self {
            organization: String::new(),
            stats: Vec::new(),
            progress: None,
            current_repo: None,
            repos_done: 0,
            repos_failed: 0,
            repos_total: 0,
            is_running: false,
            error_message: None,
            completed_at: None,
        }
    }
}
