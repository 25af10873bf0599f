//! # OrgStats
//!
//! A contributor statistics aggregator for GitHub organizations. It walks
//! every repository of an organization through the REST API and folds
//! commits, pull requests and reviews into one per-contributor, per-week
//! activity table, updating progressively as repositories complete.
//!
//! ## Features
//!
//! - Rate-limit-aware API client with typed error classification
//! - TTL response cache with in-memory and on-disk backends
//! - Per-repository collector with a raw-commit fallback when GitHub's
//!   contributor statistics are still computing
//! - Cross-repository aggregation into Sunday-aligned weekly buckets
//! - Sequential orchestration with progress, per-repository events and
//!   progressive result snapshots over a channel
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use orgstats::analysis::Orchestrator;
//! use orgstats::github::{GithubClient, HttpTransport, ResponseCache};
//!
//! # async fn example() -> Result<(), orgstats::github::ApiError> {
//! let transport = HttpTransport::new(Some("ghp_example".to_string()))?;
//! let client = GithubClient::new(Arc::new(transport), ResponseCache::in_memory());
//!
//! let repos = client.org_repos("rust-lang").await?;
//! let orchestrator = Orchestrator::new(client, "rust-lang", Some(90));
//! let stats = orchestrator.run(&repos, None).await?;
//!
//! for contributor in stats.iter().take(10) {
//!     println!("{}: {} commits", contributor.login, contributor.commits);
//! }
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod app;
pub mod config;
pub mod github;
pub mod types;
pub mod utils;

#[cfg(test)]
pub mod test_utils;

pub use analysis::{aggregate, CancelFlag, Orchestrator};
pub use app::Dashboard;
pub use config::{AppConfig, FetchLimits};
pub use github::{ApiError, GithubClient, HttpTransport, ResponseCache};
pub use types::{ContributorStats, RepoActivity, RepoEvent, Repository, RunUpdate};
