//! # Run Orchestrator
//!
//! Walks the repository list strictly one at a time, degrades individual
//! failures to empty contributions, and pushes per-repository events,
//! overall progress and a fresh aggregation snapshot through a channel
//! after every repository. Sequential on purpose: the per-hour rate
//! budget is the scarce resource, not wall-clock time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::mpsc;

use crate::analysis::aggregate::aggregate_at;
use crate::analysis::collector::collect_repo;
use crate::github::client::{ApiError, GithubClient};
use crate::types::{ContributorStats, RepoActivity, RepoEvent, Repository, RunUpdate};

/// Cooperative stop flag, checked between repositories.
///
/// Cancellation never interrupts a repository mid-collection; the run
/// finishes the current repository and stops before the next one.
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drives a full collection run over an organization's repositories.
pub struct Orchestrator {
    client: GithubClient,
    org: String,
    window_days: Option<i64>,
    cancel: CancelFlag,
}

impl Orchestrator {
    pub fn new(client: GithubClient, org: impl Into<String>, window_days: Option<i64>) -> Self {
        Self {
            client,
            org: org.into(),
            window_days,
            cancel: CancelFlag::new(),
        }
    }

    /// Installs a shared stop flag.
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Processes every repository in order and returns the final
    /// aggregation.
    ///
    /// The reference time is captured once, so every snapshot of the run
    /// shares one cutoff and one week window. Only a rejected token aborts
    /// the run; any other failure turns its repository into an empty
    /// contribution and the walk continues. A dropped receiver on the
    /// update channel is not an error, the run just completes silently.
    pub async fn run(
        &self,
        repos: &[Repository],
        updates: Option<mpsc::Sender<RunUpdate>>,
    ) -> Result<Vec<ContributorStats>, ApiError> {
        let now = Utc::now();
        let since = self.window_days.map(|days| now - Duration::days(days));
        let total = repos.len();
        let mut activities: Vec<RepoActivity> = Vec::with_capacity(total);
        let mut snapshot = Vec::new();

        log::info!("starting run over {total} repositories in {}", self.org);
        for (index, repo) in repos.iter().enumerate() {
            if self.cancel.is_cancelled() {
                log::info!("run cancelled after {index} of {total} repositories");
                break;
            }
            send(
                &updates,
                RunUpdate::Repo(RepoEvent::Started {
                    repo: repo.name.clone(),
                    index,
                    total,
                }),
            )
            .await;

            match collect_repo(&self.client, &self.org, repo, since).await {
                Ok(activity) => {
                    let merged = activity
                        .pulls
                        .iter()
                        .filter(|pull| pull.merged_at.is_some())
                        .count();
                    send(
                        &updates,
                        RunUpdate::Repo(RepoEvent::Completed {
                            repo: repo.name.clone(),
                            index,
                            total,
                            has_stats: activity.summary.found,
                            has_pulls: !activity.pulls.is_empty(),
                            pr_count: activity.pulls.len(),
                            merged_pr_count: merged,
                            total_commits: activity.summary.commits,
                            total_additions: activity.summary.additions,
                            total_deletions: activity.summary.deletions,
                        }),
                    )
                    .await;
                    activities.push(activity);
                }
                Err(err @ ApiError::InvalidToken) => return Err(err),
                Err(err) => {
                    log::error!("{}/{} failed: {err}", self.org, repo.name);
                    send(
                        &updates,
                        RunUpdate::Repo(RepoEvent::Failed {
                            repo: repo.name.clone(),
                            index,
                            total,
                            error: err.to_string(),
                        }),
                    )
                    .await;
                    activities.push(RepoActivity::empty(&repo.name));
                }
            }

            let progress = (((index + 1) as f64 / total as f64) * 100.0).round() as u8;
            send(&updates, RunUpdate::Progress(progress)).await;
            snapshot = aggregate_at(&activities, self.window_days, now);
            send(&updates, RunUpdate::Snapshot(snapshot.clone())).await;
        }

        Ok(snapshot)
    }
}

async fn send(updates: &Option<mpsc::Sender<RunUpdate>>, update: RunUpdate) {
    if let Some(sender) = updates {
        let _ = sender.send(update).await;
    }
}
