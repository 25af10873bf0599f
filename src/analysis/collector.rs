//! # Repository Collector
//!
//! Gathers one repository's activity through the API client: contributor
//! statistics (with a raw-commit fallback when the native endpoint yields
//! nothing), windowed commits, pull requests with line-count enrichment,
//! and per-login review records. Sub-fetches run sequentially to stay
//! inside the rate budget.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};

use crate::github::cache;
use crate::github::client::{ApiError, GithubClient, PAGE_SIZE};
use crate::types::{
    ContributorWeeks, PullRef, PullRequest, RepoActivity, RepoStatsSummary, Repository,
    ReviewRecord, WeekStat,
};
use crate::utils::week_start_of;

/// Days of history scanned when deriving fallback statistics.
const FALLBACK_WINDOW_DAYS: i64 = 365;

/// Collects everything the aggregation needs from one repository.
///
/// Errors that doom the rest of the run (bad token, exhausted rate
/// budget) propagate; anything else is degraded locally. The caller
/// decides what a propagated error means for the remaining repositories.
pub async fn collect_repo(
    client: &GithubClient,
    org: &str,
    repo: &Repository,
    since: Option<DateTime<Utc>>,
) -> Result<RepoActivity, ApiError> {
    log::debug!("collecting {org}/{}", repo.name);
    let summary = match client.contributor_stats(org, &repo.name).await {
        Ok(Some(stats)) if !stats.is_empty() => summarize_stats(&stats),
        Ok(_) => {
            log::debug!(
                "{org}/{}: native statistics unavailable, deriving from commits",
                repo.name
            );
            let stats = derive_stats_fallback(client, org, repo).await?;
            summarize_stats(&stats)
        }
        Err(err) if err.is_fatal() => return Err(err),
        Err(err) => {
            log::warn!(
                "{org}/{}: statistics endpoint failed ({err}), deriving from commits",
                repo.name
            );
            let stats = derive_stats_fallback(client, org, repo).await?;
            summarize_stats(&stats)
        }
    };
    let commits = client.commits(org, repo, since).await?;
    let pulls = collect_pulls(client, org, &repo.name, since).await?;
    let reviews = collect_reviews(client, org, &repo.name, since, &pulls).await?;
    Ok(RepoActivity {
        repo: repo.name.clone(),
        commits,
        pulls,
        reviews,
        summary,
    })
}

/// Assembles the repository's pull requests, most recently updated first.
///
/// With a cutoff, a pull request is kept only when its effective date is
/// on or after it; once a non-empty page filters down to nothing the
/// listing stops, since later pages are only older. A bounded number of
/// merged pull requests then gets line counts attached.
pub async fn collect_pulls(
    client: &GithubClient,
    org: &str,
    repo: &str,
    cutoff: Option<DateTime<Utc>>,
) -> Result<Vec<PullRequest>, ApiError> {
    let key = cache::pulls_key(org, repo, cutoff);
    if let Some(pulls) = client.cache().get::<Vec<PullRequest>>(&key) {
        return Ok(pulls);
    }
    let limits = client.limits();
    let mut pulls = Vec::new();
    for page in 1..=limits.page_cap {
        let batch = client.pulls_page(org, repo, page).await?;
        let fetched = batch.len();
        let kept: Vec<PullRequest> = match cutoff {
            Some(cutoff) => batch
                .into_iter()
                .filter(|pull| pull.effective_date() >= cutoff)
                .collect(),
            None => batch,
        };
        let dropped_all = fetched > 0 && kept.is_empty();
        pulls.extend(kept);
        if fetched < PAGE_SIZE || dropped_all {
            break;
        }
    }
    enrich_pulls(client, org, repo, &mut pulls).await?;
    client.cache().store(&key, &pulls);
    Ok(pulls)
}

/// Attaches line counts to merged pull requests up to the configured
/// budget. Attempts count against the budget whether or not they succeed,
/// and a failed one just leaves the pull request unenriched.
async fn enrich_pulls(
    client: &GithubClient,
    org: &str,
    repo: &str,
    pulls: &mut [PullRequest],
) -> Result<(), ApiError> {
    let budget = client.limits().enrich_pulls;
    let mut attempts = 0;
    for pull in pulls.iter_mut() {
        if attempts >= budget {
            break;
        }
        if pull.merged_at.is_none() {
            continue;
        }
        attempts += 1;
        match client.pull_detail(org, repo, pull.number).await {
            Ok(stats) => pull.stats = Some(stats),
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => log::debug!("no line counts for {repo}#{}: {err}", pull.number),
        }
    }
    Ok(())
}

/// Folds review activity on the most recently updated pull requests into
/// per-login records. A failed review listing skips that pull request and
/// nothing else.
pub async fn collect_reviews(
    client: &GithubClient,
    org: &str,
    repo: &str,
    since: Option<DateTime<Utc>>,
    pulls: &[PullRequest],
) -> Result<HashMap<String, ReviewRecord>, ApiError> {
    let key = cache::reviews_key(org, repo, since);
    if let Some(reviews) = client.cache().get::<HashMap<String, ReviewRecord>>(&key) {
        return Ok(reviews);
    }
    let mut reviews: HashMap<String, ReviewRecord> = HashMap::new();
    for pull in pulls.iter().take(client.limits().review_pulls) {
        let listed = match client.pull_reviews(org, repo, pull.number).await {
            Ok(listed) => listed,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                log::warn!("skipping reviews on {repo}#{}: {err}", pull.number);
                continue;
            }
        };
        for review in listed {
            // unsubmitted (pending) reviews and deleted accounts are not
            // countable activity
            let (Some(user), Some(submitted)) = (review.user, review.submitted_at) else {
                continue;
            };
            let record = reviews.entry(user.login).or_default();
            if record.avatar_url.is_empty() {
                record.avatar_url = user.avatar_url;
            }
            record.count += 1;
            record.submitted_at.push(submitted);
            if !record.pulls.iter().any(|seen| seen.number == pull.number) {
                record.pulls.push(PullRef {
                    number: pull.number,
                    title: pull.title.clone(),
                    html_url: pull.html_url.clone(),
                });
            }
        }
    }
    client.cache().store(&key, &reviews);
    Ok(reviews)
}

/// Derives per-author weekly statistics from raw commits.
///
/// Scans a bounded slice of the last year's history, attaches line counts
/// to the first commits within the detail budget, and buckets everything
/// by author and Sunday-aligned week. A non-empty result lands under the
/// native statistics cache key so the next run skips the whole dance.
pub async fn derive_stats_fallback(
    client: &GithubClient,
    org: &str,
    repo: &Repository,
) -> Result<Vec<ContributorWeeks>, ApiError> {
    let limits = client.limits();
    let since = Utc::now() - Duration::days(FALLBACK_WINDOW_DAYS);
    let commits = client
        .commits_paged(org, repo, Some(since), Some(limits.fallback_pages))
        .await?;

    let mut authors: HashMap<String, (String, BTreeMap<DateTime<Utc>, WeekStat>)> = HashMap::new();
    for (index, commit) in commits.iter().enumerate() {
        let detail = if index < limits.fallback_details {
            match client.commit_detail(org, &repo.name, &commit.sha).await {
                Ok(detail) => detail,
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    log::debug!("no line counts for commit {}: {err}", commit.sha);
                    None
                }
            }
        } else {
            None
        };
        let week = week_start_of(commit.date);
        let slot = authors
            .entry(commit.author.clone())
            .or_insert_with(|| (commit.avatar_url.clone(), BTreeMap::new()));
        let stat = slot.1.entry(week).or_insert_with(|| WeekStat {
            week,
            additions: 0,
            deletions: 0,
            commits: 0,
        });
        stat.commits += 1;
        if let Some(detail) = detail {
            stat.additions += detail.additions;
            stat.deletions += detail.deletions;
        }
    }

    let mut stats: Vec<ContributorWeeks> = authors
        .into_iter()
        .map(|(login, (avatar_url, weeks))| {
            let weeks: Vec<WeekStat> = weeks.into_values().collect();
            let total = weeks.iter().map(|week| week.commits).sum();
            ContributorWeeks {
                login,
                avatar_url,
                total,
                weeks,
            }
        })
        .collect();
    stats.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.login.cmp(&b.login)));
    if !stats.is_empty() {
        client
            .cache()
            .store(&cache::stats_key(org, &repo.name), &stats);
    }
    Ok(stats)
}

/// Distills per-author statistics into the repository totals carried by
/// the completion log.
pub fn summarize_stats(stats: &[ContributorWeeks]) -> RepoStatsSummary {
    let mut summary = RepoStatsSummary {
        found: !stats.is_empty(),
        ..RepoStatsSummary::default()
    };
    for author in stats {
        summary.commits += author.total;
        for week in &author.weeks {
            summary.additions += week.additions;
            summary.deletions += week.deletions;
        }
    }
    summary
}
