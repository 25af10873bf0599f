//! Shared fixtures for unit tests: a scripted [`Transport`] and builders
//! for domain values and wire-format JSON bodies.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use futures::future::BoxFuture;
use serde_json::{json, Value};

use crate::github::client::{ApiError, RawResponse, Transport};
use crate::types::{Commit, PullRequest, PullStats, Repository};

/// One scripted route. Responses are served in order; once the script runs
/// out the final response repeats, which keeps pagination loops simple.
struct Route {
    pattern: String,
    responses: Vec<RawResponse>,
    cursor: AtomicUsize,
}

impl Route {
    fn next(&self) -> RawResponse {
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        self.responses[index.min(self.responses.len() - 1)].clone()
    }
}

/// In-memory [`Transport`] answering from scripted routes.
///
/// A request matches the first route whose pattern is a substring of the
/// path, so register more specific patterns (like `"/reviews"`) before
/// broader ones (like `"/pulls"`). Unmatched requests get a 404. Every
/// requested path is recorded and can be inspected through [`calls`].
///
/// [`calls`]: MockTransport::calls
pub struct MockTransport {
    routes: Vec<Route>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Adds a route answering every matching request with one JSON body.
    pub fn route(self, pattern: &str, status: u16, body: Value) -> Self {
        self.route_raw(pattern, response(status, body))
    }

    /// Adds a route that works through `script` one response per request,
    /// then repeats the last entry.
    pub fn route_sequence(mut self, pattern: &str, script: Vec<(u16, Value)>) -> Self {
        assert!(!script.is_empty(), "a route needs at least one response");
        self.routes.push(Route {
            pattern: pattern.to_string(),
            responses: script
                .into_iter()
                .map(|(status, body)| response(status, body))
                .collect(),
            cursor: AtomicUsize::new(0),
        });
        self
    }

    /// Adds a route answering with a fully specified raw response.
    pub fn route_raw(mut self, pattern: &str, raw: RawResponse) -> Self {
        self.routes.push(Route {
            pattern: pattern.to_string(),
            responses: vec![raw],
            cursor: AtomicUsize::new(0),
        });
        self
    }

    /// Handle on the list of requested paths.
    pub fn calls(&self) -> Arc<Mutex<Vec<String>>> {
        self.calls.clone()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn get<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<RawResponse, ApiError>> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(path.to_string());
        }
        let answer = self
            .routes
            .iter()
            .find(|route| path.contains(&route.pattern))
            .map(Route::next)
            .unwrap_or_else(|| response(404, json!({"message": "Not Found"})));
        Box::pin(async move { Ok(answer) })
    }
}

fn response(status: u16, body: Value) -> RawResponse {
    RawResponse {
        status,
        status_text: status_text(status).to_string(),
        body: body.to_string(),
        rate_remaining: Some(5000),
        rate_reset: None,
    }
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        202 => "Accepted",
        204 => "No Content",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        _ => "Error",
    }
}

/// Timestamp shorthand for fixtures.
pub fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
}

pub fn make_repository(name: &str) -> Repository {
    Repository {
        id: 1,
        name: name.to_string(),
        full_name: format!("acme/{name}"),
        default_branch: "main".to_string(),
        fork: false,
        description: None,
        language: Some("Rust".to_string()),
        stargazers: 0,
        pushed_at: None,
    }
}

pub fn make_commit(author: &str, repo: &str, date: DateTime<Utc>) -> Commit {
    Commit {
        sha: format!("{author}-{}", date.timestamp()),
        author: author.to_string(),
        avatar_url: format!("https://example.com/{author}.png"),
        message: "change".to_string(),
        date,
        html_url: String::new(),
        repo: repo.to_string(),
    }
}

pub fn make_pull(author: &str, number: u64, created: DateTime<Utc>) -> PullRequest {
    PullRequest {
        number,
        author: author.to_string(),
        avatar_url: format!("https://example.com/{author}.png"),
        title: format!("pull #{number}"),
        html_url: format!("https://example.com/pull/{number}"),
        state: "open".to_string(),
        created_at: created,
        updated_at: created,
        closed_at: None,
        merged_at: None,
        stats: None,
    }
}

pub fn make_merged_pull(
    author: &str,
    number: u64,
    merged: DateTime<Utc>,
    additions: u64,
    deletions: u64,
) -> PullRequest {
    let mut pull = make_pull(author, number, merged - chrono::Duration::days(1));
    pull.state = "closed".to_string();
    pull.updated_at = merged;
    pull.closed_at = Some(merged);
    pull.merged_at = Some(merged);
    pull.stats = Some(PullStats {
        additions,
        deletions,
        commits: 1,
        changed_files: 1,
    });
    pull
}

/// Wire-format repository body for [`MockTransport`] routes.
pub fn repo_json(id: u64, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "full_name": format!("acme/{name}"),
        "default_branch": "main",
        "fork": false,
        "description": null,
        "language": "Rust",
        "stargazers_count": 0,
        "pushed_at": null
    })
}

/// Wire-format commit body for [`MockTransport`] routes.
pub fn commit_json(sha: &str, author: &str, date: &str) -> Value {
    json!({
        "sha": sha,
        "commit": {
            "message": format!("commit {sha}"),
            "author": {"date": date}
        },
        "author": {
            "login": author,
            "avatar_url": format!("https://example.com/{author}.png")
        },
        "html_url": format!("https://example.com/commit/{sha}")
    })
}

/// Wire-format pull request body for [`MockTransport`] routes.
pub fn pull_json(number: u64, author: &str, created: &str, merged: Option<&str>) -> Value {
    json!({
        "number": number,
        "user": {
            "login": author,
            "avatar_url": format!("https://example.com/{author}.png")
        },
        "title": format!("pull #{number}"),
        "html_url": format!("https://example.com/pull/{number}"),
        "state": if merged.is_some() { "closed" } else { "open" },
        "created_at": created,
        "updated_at": merged.unwrap_or(created),
        "closed_at": merged,
        "merged_at": merged
    })
}

/// Wire-format review body for [`MockTransport`] routes.
pub fn review_json(author: &str, submitted: &str) -> Value {
    json!({
        "user": {
            "login": author,
            "avatar_url": format!("https://example.com/{author}.png")
        },
        "submitted_at": submitted,
        "state": "APPROVED"
    })
}

/// Wire-format contributor statistics body for [`MockTransport`] routes.
pub fn stats_json(author: &str, week: i64, additions: u64, deletions: u64, commits: u64) -> Value {
    json!([{
        "author": {
            "login": author,
            "avatar_url": format!("https://example.com/{author}.png")
        },
        "total": commits,
        "weeks": [{"w": week, "a": additions, "d": deletions, "c": commits}]
    }])
}
