/// Benchmark module for the contribution aggregation pipeline.
/// Measures cross-repository aggregation, week-window math, and cache access.
use chrono::{DateTime, Duration, TimeZone, Utc};
use criterion::{criterion_group, criterion_main, Criterion};
use orgstats::analysis::aggregate_at;
use orgstats::github::ResponseCache;
use orgstats::types::{Commit, ContributorStats, PullRequest, PullStats, RepoActivity};
use orgstats::utils::{week_start_of, week_window};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Fixed reference time so every run aggregates the same window.
fn reference_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
}

/// Build a synthetic organization worth of activity, spread over the last
/// year across a pool of 40 contributors.
///
/// # Arguments
/// * `repos` - Number of repositories
/// * `commits_per_repo` - Commits generated in each repository
fn setup_activities(repos: usize, commits_per_repo: usize) -> Vec<RepoActivity> {
    let now = reference_time();
    let mut rng = StdRng::seed_from_u64(42);
    let minutes_in_year = 365 * 24 * 60;

    (0..repos)
        .map(|r| {
            let repo = format!("repo-{}", r);
            let mut activity = RepoActivity::empty(&repo);

            activity.commits = (0..commits_per_repo)
                .map(|i| {
                    let author = format!("user{}", rng.gen_range(0..40));
                    let date = now - Duration::minutes(rng.gen_range(0..minutes_in_year));
                    Commit {
                        sha: format!("{}-{}", repo, i),
                        author: author.clone(),
                        avatar_url: format!("https://example.com/{}.png", author),
                        message: "synthetic change".to_string(),
                        date,
                        html_url: String::new(),
                        repo: repo.clone(),
                    }
                })
                .collect();

            activity.pulls = (0..commits_per_repo / 10)
                .map(|i| {
                    let author = format!("user{}", rng.gen_range(0..40));
                    let created = now - Duration::minutes(rng.gen_range(0..minutes_in_year));
                    let merged = rng.gen_bool(0.7);
                    PullRequest {
                        number: i as u64 + 1,
                        author: author.clone(),
                        avatar_url: String::new(),
                        title: format!("pull #{}", i),
                        html_url: format!("https://example.com/{}/pull/{}", repo, i),
                        state: if merged { "closed" } else { "open" }.to_string(),
                        created_at: created,
                        updated_at: created,
                        closed_at: merged.then_some(created + Duration::hours(20)),
                        merged_at: merged.then_some(created + Duration::hours(20)),
                        stats: merged.then(|| PullStats {
                            additions: rng.gen_range(0..500),
                            deletions: rng.gen_range(0..200),
                            commits: rng.gen_range(1..10),
                            changed_files: rng.gen_range(1..20),
                        }),
                    }
                })
                .collect();

            for _ in 0..3 {
                let login = format!("user{}", rng.gen_range(0..40));
                let submitted = now - Duration::minutes(rng.gen_range(0..minutes_in_year));
                let record = activity.reviews.entry(login).or_default();
                record.count += 1;
                record.submitted_at.push(submitted);
            }

            activity
        })
        .collect()
}

/// Benchmark the cross-repository aggregation at different organization
/// sizes and window lengths.
///
/// # Arguments
/// * `c` - Criterion benchmark configuration
fn bench_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregation");
    let now = reference_time();

    let small = setup_activities(5, 50);
    group.bench_function("aggregate_small_org_90_days", |b| {
        b.iter(|| aggregate_at(&small, Some(90), now));
    });

    let large = setup_activities(50, 200);
    group.bench_function("aggregate_large_org_90_days", |b| {
        b.iter(|| aggregate_at(&large, Some(90), now));
    });

    group.bench_function("aggregate_large_org_full_year", |b| {
        b.iter(|| aggregate_at(&large, None, now));
    });

    group.finish();
}

/// Benchmark the week arithmetic that every bucket assignment goes
/// through.
///
/// # Arguments
/// * `c` - Criterion benchmark configuration
fn bench_week_math(c: &mut Criterion) {
    let mut group = c.benchmark_group("week_math");
    let now = reference_time();

    group.bench_function("week_start_of", |b| {
        b.iter(|| week_start_of(now));
    });

    group.bench_function("week_window_52", |b| {
        b.iter(|| week_window(now, 52));
    });

    group.finish();
}

/// Benchmark response cache round trips with an aggregated result as the
/// payload.
///
/// # Arguments
/// * `c` - Criterion benchmark configuration
fn bench_caching(c: &mut Criterion) {
    let mut group = c.benchmark_group("caching");
    let now = reference_time();
    let cache = ResponseCache::in_memory();
    let activities = setup_activities(5, 50);
    let stats = aggregate_at(&activities, Some(90), now);
    cache.store("bench:stats", &stats);

    group.bench_function("cache_lookup", |b| {
        b.iter(|| cache.get::<Vec<ContributorStats>>("bench:stats"));
    });

    group.bench_function("cache_store", |b| {
        b.iter(|| cache.store("bench:stats", &stats));
    });

    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default();
    targets = bench_aggregation, bench_week_math, bench_caching
);
criterion_main!(benches);
