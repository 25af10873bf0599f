//! Contributor statistics for a GitHub organization, on the command line.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::LevelFilter;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;

use orgstats::analysis::{CancelFlag, Orchestrator};
use orgstats::app::Dashboard;
use orgstats::config::AppConfig;
use orgstats::github::{FileStore, GithubClient, HttpTransport, MemoryStore, ResponseCache};
use orgstats::types::{RepoEvent, Repository, RunUpdate};

#[derive(Parser)]
#[command(name = "orgstats")]
#[command(about = "Aggregate per-contributor activity across a GitHub organization")]
#[command(version)]
struct Cli {
    /// Organization to analyze (defaults to the saved configuration)
    #[arg(short, long)]
    org: Option<String>,

    /// Personal access token; unauthenticated requests get a tiny rate budget
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Restrict to activity from the last N days
    #[arg(short, long, value_name = "N")]
    days: Option<i64>,

    /// Only analyze these repositories (comma-separated names)
    #[arg(long, value_delimiter = ',', value_name = "NAMES")]
    repos: Vec<String>,

    /// Include forked repositories
    #[arg(long)]
    include_forks: bool,

    /// Refresh every N minutes, clearing the cache before each run
    #[arg(long, value_name = "MINUTES")]
    watch: Option<u64>,

    /// Print the result as JSON instead of a table
    #[arg(long)]
    json: bool,

    /// Keep responses in memory only, nothing on disk
    #[arg(long)]
    no_cache: bool,

    /// Directory for the on-disk response cache
    #[arg(long, value_name = "DIR")]
    cache_dir: Option<PathBuf>,

    /// Save organization, window and fork settings as defaults
    #[arg(long)]
    save_config: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_target(false)
        .format_timestamp(None)
        .init();

    let rt = Runtime::new().expect("failed to start the async runtime");
    if let Err(err) = rt.block_on(run(cli)) {
        eprintln!("error: {err:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::load().unwrap_or_else(|err| {
        log::warn!("ignoring saved config: {err}");
        AppConfig::default()
    });

    let org = cli
        .org
        .clone()
        .or_else(|| config.organization.clone())
        .context("no organization given; pass --org or save one with --save-config")?;
    let window_days = cli.days.or(config.window_days);
    let include_forks = cli.include_forks || config.include_forks;

    if cli.save_config {
        config.organization = Some(org.clone());
        config.window_days = window_days;
        config.include_forks = include_forks;
        config.save().context("failed to save configuration")?;
        log::info!("configuration saved");
    }
    if cli.token.is_none() {
        log::warn!("no token given; set GITHUB_TOKEN or pass --token for a usable rate budget");
    }

    let cache = build_cache(&cli);
    let transport = HttpTransport::new(cli.token.clone())?;
    let client = GithubClient::with_limits(Arc::new(transport), cache.clone(), config.limits);

    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            log::info!("stop requested; finishing the current repository");
            cancel.cancel();
        })
        .context("failed to install the interrupt handler")?;
    }

    let mut dashboard = Dashboard::new(&org);
    run_once(&client, &mut dashboard, &cli, &org, window_days, include_forks, &cancel).await?;

    if let Some(minutes) = cli.watch {
        let minutes = minutes.max(1);
        let every = Duration::from_secs(minutes * 60);
        while !cancel.is_cancelled() {
            log::info!("next refresh in {minutes} minutes");
            wait_or_cancel(every, &cancel).await;
            if cancel.is_cancelled() {
                break;
            }
            cache.clear();
            run_once(&client, &mut dashboard, &cli, &org, window_days, include_forks, &cancel)
                .await?;
        }
    }
    Ok(())
}

/// One full collection pass: repository list, sequential run, rendering.
async fn run_once(
    client: &GithubClient,
    dashboard: &mut Dashboard,
    cli: &Cli,
    org: &str,
    window_days: Option<i64>,
    include_forks: bool,
    cancel: &CancelFlag,
) -> Result<()> {
    let repos = client
        .org_repos(org)
        .await
        .with_context(|| format!("failed to list repositories for {org}"))?;
    let selected = select_repos(repos, &cli.repos, include_forks);
    if selected.is_empty() {
        bail!("no repositories matched the selection in {org}");
    }
    if !dashboard.begin_run(selected.len()) {
        log::warn!("a run is already in progress; skipping this refresh");
        return Ok(());
    }

    let orchestrator =
        Orchestrator::new(client.clone(), org, window_days).with_cancel(cancel.clone());
    let (tx, mut rx) = mpsc::channel(32);
    let run = orchestrator.run(&selected, Some(tx));
    let consume = async {
        while let Some(update) = rx.recv().await {
            dashboard.apply_update(update.clone());
            report_update(dashboard, &update, cli.json);
        }
    };
    let (result, ()) = tokio::join!(run, consume);

    match result {
        Ok(stats) => {
            dashboard.finish_run(stats);
            render(dashboard, cli.json)?;
            Ok(())
        }
        Err(err) => {
            dashboard.fail_run(err.to_string());
            Err(err).with_context(|| format!("run over {org} failed"))
        }
    }
}

/// Applies the name and fork filters to the fetched repository list.
fn select_repos(repos: Vec<Repository>, names: &[String], include_forks: bool) -> Vec<Repository> {
    repos
        .into_iter()
        .filter(|repo| include_forks || !repo.fork)
        .filter(|repo| {
            names.is_empty()
                || names
                    .iter()
                    .any(|name| name == &repo.name || name == &repo.full_name)
        })
        .collect()
}

fn build_cache(cli: &Cli) -> ResponseCache {
    if cli.no_cache {
        return ResponseCache::new(Box::new(MemoryStore::new()));
    }
    let dir = cli.cache_dir.clone().or_else(FileStore::default_dir);
    match dir {
        Some(dir) => match FileStore::open(&dir) {
            Ok(store) => ResponseCache::new(Box::new(store)),
            Err(err) => {
                log::warn!("falling back to the in-memory cache: {err}");
                ResponseCache::new(Box::new(MemoryStore::new()))
            }
        },
        None => {
            log::warn!("no cache directory available; using the in-memory cache");
            ResponseCache::new(Box::new(MemoryStore::new()))
        }
    }
}

/// Progress output during a run. Status goes to stderr so stdout stays
/// clean for the final table or JSON document.
fn report_update(dashboard: &Dashboard, update: &RunUpdate, json: bool) {
    if json {
        return;
    }
    match update {
        RunUpdate::Repo(RepoEvent::Started { repo, index, total }) => {
            eprintln!("[{}/{}] {repo} ...", index + 1, total);
        }
        RunUpdate::Repo(RepoEvent::Completed {
            repo,
            has_stats,
            pr_count,
            merged_pr_count,
            total_commits,
            total_additions,
            total_deletions,
            ..
        }) => {
            if *has_stats {
                eprintln!(
                    "    {repo}: {total_commits} commits (+{total_additions}/-{total_deletions}), {pr_count} PRs ({merged_pr_count} merged)"
                );
            } else {
                eprintln!("    {repo}: no statistics, {pr_count} PRs ({merged_pr_count} merged)");
            }
        }
        RunUpdate::Repo(RepoEvent::Failed { repo, error, .. }) => {
            eprintln!("    {repo}: failed: {error}");
        }
        RunUpdate::Progress(_) => {
            if let Some(line) = dashboard.format_progress() {
                eprintln!("{line}");
            }
        }
        RunUpdate::Snapshot(_) => {}
    }
}

fn render(dashboard: &Dashboard, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&dashboard.stats)?);
        return Ok(());
    }
    if dashboard.stats.is_empty() {
        println!("no contributor activity found in {}", dashboard.organization);
        return Ok(());
    }
    println!();
    println!(
        "{:<24} {:>8} {:>7} {:>8} {:>10} {:>10} {:>10} {:>6}",
        "CONTRIBUTOR", "COMMITS", "PRS", "REVIEWS", "ADDED", "DELETED", "NET", "REPOS"
    );
    for stats in &dashboard.stats {
        println!(
            "{:<24} {:>8} {:>7} {:>8} {:>10} {:>10} {:>10} {:>6}",
            stats.login,
            stats.commits,
            stats.pulls,
            stats.reviews,
            format!("+{}", stats.additions),
            format!("-{}", stats.deletions),
            stats.net,
            stats.repos_contributed
        );
    }
    Ok(())
}

/// Sleeps in short steps so a stop request does not have to wait out the
/// whole refresh interval.
async fn wait_or_cancel(duration: Duration, cancel: &CancelFlag) {
    let tick = Duration::from_secs(1);
    let mut remaining = duration;
    while !cancel.is_cancelled() && remaining > Duration::ZERO {
        let step = remaining.min(tick);
        tokio::time::sleep(step).await;
        remaining = remaining.saturating_sub(step);
    }
}
