//! # Cross-Repository Aggregator
//!
//! Folds per-repository activity into one record per contributor: running
//! totals, a fixed-length Sunday-aligned weekly series, and bounded
//! most-recent lists. Pure synchronous code; everything async stops at the
//! collector.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};

use crate::types::{Commit, ContributorStats, PullRef, PullRequest, RepoActivity, WeekBucket};
use crate::utils::{week_start_of, week_window, weeks_in_window};

/// Cap on the most-recent commit, pull and reviewed-pull lists.
const RECENT_ITEMS: usize = 20;

/// Aggregates per-repository activity as of now.
pub fn aggregate(activities: &[RepoActivity], window_days: Option<i64>) -> Vec<ContributorStats> {
    aggregate_at(activities, window_days, Utc::now())
}

/// Aggregates per-repository activity with an explicit "now".
///
/// One run captures its reference time once so every progressive snapshot
/// shares the same cutoff and week window.
pub fn aggregate_at(
    activities: &[RepoActivity],
    window_days: Option<i64>,
    now: DateTime<Utc>,
) -> Vec<ContributorStats> {
    let cutoff = window_days.map(|days| now - Duration::days(days));
    let mut builders: HashMap<String, StatsBuilder> = HashMap::new();

    for activity in activities {
        for commit in &activity.commits {
            // since-filtered listings can still leak entries across the
            // boundary, so the cutoff applies again here
            if cutoff.is_some_and(|cutoff| commit.date < cutoff) {
                continue;
            }
            let builder = builders.entry(commit.author.clone()).or_default();
            builder.note_avatar(&commit.avatar_url);
            builder.commits += 1;
            builder.repos.insert(activity.repo.clone());
            builder.bucket(commit.date).commits += 1;
            builder.recent_commits.push(commit.clone());
        }

        for pull in &activity.pulls {
            let builder = builders.entry(pull.author.clone()).or_default();
            builder.note_avatar(&pull.avatar_url);
            builder.pulls += 1;
            builder.repos.insert(activity.repo.clone());
            builder.recent_pulls.push(pull.clone());
            let week_date = pull.merged_at.unwrap_or(pull.created_at);
            builder.bucket(week_date).pulls += 1;
            if pull.merged_at.is_some() {
                if let Some(stats) = pull.stats {
                    builder.additions += stats.additions;
                    builder.deletions += stats.deletions;
                    let bucket = builder.bucket(week_date);
                    bucket.additions += stats.additions;
                    bucket.deletions += stats.deletions;
                }
            }
        }

        for (login, record) in &activity.reviews {
            let builder = builders.entry(login.clone()).or_default();
            builder.note_avatar(&record.avatar_url);
            builder.repos.insert(activity.repo.clone());
            if record.submitted_at.is_empty() {
                // older cache payloads carry only a count; totals keep it,
                // the weekly series cannot place it
                builder.reviews += record.count;
            } else {
                for submitted in &record.submitted_at {
                    if cutoff.is_some_and(|cutoff| *submitted < cutoff) {
                        continue;
                    }
                    builder.reviews += 1;
                    builder.bucket(*submitted).reviews += 1;
                }
            }
            for reference in &record.pulls {
                if !builder
                    .reviewed_pulls
                    .iter()
                    .any(|seen| seen.html_url == reference.html_url)
                {
                    builder.reviewed_pulls.push(reference.clone());
                }
            }
        }
    }

    let window = week_window(now, weeks_in_window(window_days));
    let mut result: Vec<ContributorStats> = builders
        .into_iter()
        .filter_map(|(login, builder)| builder.finish(login, &window))
        .collect();
    result.sort_by(|a, b| b.commits.cmp(&a.commits).then_with(|| a.login.cmp(&b.login)));
    result
}

/// Per-login accumulator, turned into a [`ContributorStats`] at the end.
#[derive(Default)]
struct StatsBuilder {
    avatar_url: String,
    additions: u64,
    deletions: u64,
    commits: u64,
    pulls: u64,
    reviews: u64,
    repos: HashSet<String>,
    weekly: HashMap<DateTime<Utc>, WeekBucket>,
    recent_commits: Vec<Commit>,
    recent_pulls: Vec<PullRequest>,
    reviewed_pulls: Vec<PullRef>,
}

impl StatsBuilder {
    fn note_avatar(&mut self, avatar: &str) {
        if self.avatar_url.is_empty() && !avatar.is_empty() {
            self.avatar_url = avatar.to_string();
        }
    }

    /// The week bucket a timestamp belongs to, renormalized to the week
    /// boundary so upstream alignment drift cannot split a week in two.
    fn bucket(&mut self, ts: DateTime<Utc>) -> &mut WeekBucket {
        let week = week_start_of(ts);
        self.weekly
            .entry(week)
            .or_insert_with(|| WeekBucket::empty(week))
    }

    fn is_empty(&self) -> bool {
        self.additions == 0
            && self.deletions == 0
            && self.commits == 0
            && self.pulls == 0
            && self.reviews == 0
    }

    fn finish(mut self, login: String, window: &[DateTime<Utc>]) -> Option<ContributorStats> {
        if self.is_empty() {
            return None;
        }
        self.recent_commits.sort_by(|a, b| b.date.cmp(&a.date));
        self.recent_commits.truncate(RECENT_ITEMS);
        self.recent_pulls.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        self.recent_pulls.truncate(RECENT_ITEMS);
        self.reviewed_pulls.truncate(RECENT_ITEMS);
        let weekly = window
            .iter()
            .map(|week| {
                self.weekly
                    .get(week)
                    .copied()
                    .unwrap_or_else(|| WeekBucket::empty(*week))
            })
            .collect();
        Some(ContributorStats {
            login,
            avatar_url: self.avatar_url,
            additions: self.additions,
            deletions: self.deletions,
            net: self.additions as i64 - self.deletions as i64,
            commits: self.commits,
            pulls: self.pulls,
            reviews: self.reviews,
            repos_contributed: self.repos.len(),
            weekly,
            recent_commits: self.recent_commits,
            recent_pulls: self.recent_pulls,
            reviewed_pulls: self.reviewed_pulls,
        })
    }
}
