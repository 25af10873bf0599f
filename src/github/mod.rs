//! # GitHub Access Layer
//!
//! Everything that talks to (or stands in for) the GitHub REST API: the
//! transport and client, the wire models, and the response cache.

pub mod cache;
pub mod client;
pub mod models;

pub use cache::{CacheEntry, FileStore, MemoryStore, ResponseCache, Store, StoreError};
pub use client::{
    ApiError, DelayFn, GithubClient, HttpTransport, RawResponse, Transport, PAGE_SIZE,
    STATS_RETRY_DELAY,
};
