//! # Analysis Pipeline
//!
//! The collection and aggregation pipeline: a per-repository collector, a
//! cross-repository aggregator, and the orchestrator that walks the
//! repository list sequentially while streaming progress.

pub mod aggregate;
pub mod collector;
pub mod orchestrator;

pub use aggregate::{aggregate, aggregate_at};
pub use collector::{collect_pulls, collect_repo, collect_reviews, derive_stats_fallback};
pub use orchestrator::{CancelFlag, Orchestrator};
