//! User table data source: the single bulk read the record store is populated from.
//!
//! The store only sees the [`UserSource`] trait. [`HttpUserSource`] talks to the
//! remote endpoint; [`MockSource`] serves scripted replies for tests and demos.

#![forbid(unsafe_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use usertable_core::UserRecord;

mod http;

pub use http::HttpUserSource;

pub const DEFAULT_ENDPOINT: &str = "https://dummyjson.com/users";
/// Known size of the backing dataset; one request covers all of it.
pub const DEFAULT_FETCH_LIMIT: usize = 100;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Bulk batch parameters sent to the endpoint (`?skip=..&limit=..`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FetchRequest {
    pub skip: usize,
    pub limit: usize,
}

impl Default for FetchRequest {
    fn default() -> Self { Self { skip: 0, limit: DEFAULT_FETCH_LIMIT } }
}

/// Payload returned by the endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UsersPage {
    pub users: Vec<UserRecord>,
    pub total: usize,
    pub skip: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FetchErrorKind {
    Network,
    Server,
    Unknown,
}

/// Classified failure of a bulk read. None of these are retried automatically.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum FetchError {
    /// Transport-level failure reaching the endpoint.
    #[error("network: {0}")]
    Network(String),
    /// Non-success HTTP status.
    #[error("server: HTTP status {status}")]
    Server { status: u16 },
    /// Anything else, including malformed payloads.
    #[error("unknown: {0}")]
    Unknown(String),
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::Network(_) => FetchErrorKind::Network,
            FetchError::Server { .. } => FetchErrorKind::Server,
            FetchError::Unknown(_) => FetchErrorKind::Unknown,
        }
    }

    /// Message suitable for showing next to a retry button.
    pub fn user_message(&self) -> &'static str {
        match self {
            FetchError::Network(_) => "Network error. Check your internet connection.",
            FetchError::Server { .. } | FetchError::Unknown(_) => "Failed to load data. Please try again later.",
        }
    }
}

/// External collaborator that serves the full record collection.
#[async_trait::async_trait]
pub trait UserSource: Send + Sync {
    async fn fetch_users(&self, req: FetchRequest) -> Result<UsersPage, FetchError>;
}

/// Where and how much to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    pub base_url: String,
    pub skip: usize,
    pub limit: usize,
    pub timeout: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self { base_url: DEFAULT_ENDPOINT.to_string(), skip: 0, limit: DEFAULT_FETCH_LIMIT, timeout: DEFAULT_TIMEOUT }
    }
}

impl SourceConfig {
    /// Defaults overridden by `USERTABLE_ENDPOINT`, `USERTABLE_FETCH_SKIP`,
    /// `USERTABLE_FETCH_LIMIT` and `USERTABLE_TIMEOUT_SECS`. Unparseable values and a zero
    /// timeout are ignored.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(url) = std::env::var("USERTABLE_ENDPOINT") {
            if !url.trim().is_empty() { cfg.base_url = url.trim().to_string(); }
        }
        if let Some(skip) = std::env::var("USERTABLE_FETCH_SKIP").ok().and_then(|s| s.parse::<usize>().ok()) {
            cfg.skip = skip;
        }
        if let Some(limit) = std::env::var("USERTABLE_FETCH_LIMIT").ok().and_then(|s| s.parse::<usize>().ok()) {
            cfg.limit = limit;
        }
        let timeout = std::env::var("USERTABLE_TIMEOUT_SECS").ok().and_then(|s| s.parse::<u64>().ok());
        if let Some(secs) = timeout.filter(|s| *s > 0) {
            cfg.timeout = Duration::from_secs(secs);
        }
        cfg
    }

    pub fn request(&self) -> FetchRequest { FetchRequest { skip: self.skip, limit: self.limit } }
}

// ----------------- Mock implementation -----------------

/// One scripted reply, optionally delayed.
#[derive(Debug, Clone)]
pub struct MockReply {
    pub delay: Duration,
    pub result: Result<UsersPage, FetchError>,
}

/// In-memory source: serves queued replies first, then the fallback collection.
pub struct MockSource {
    script: Mutex<VecDeque<MockReply>>,
    fallback: Result<Vec<UserRecord>, FetchError>,
    calls: AtomicUsize,
}

impl MockSource {
    pub fn new(records: Vec<UserRecord>) -> Self {
        Self { script: Mutex::new(VecDeque::new()), fallback: Ok(records), calls: AtomicUsize::new(0) }
    }

    pub fn failing(err: FetchError) -> Self {
        Self { script: Mutex::new(VecDeque::new()), fallback: Err(err), calls: AtomicUsize::new(0) }
    }

    pub fn push(&self, reply: MockReply) { self.script().push_back(reply); }

    pub fn push_ok(&self, records: Vec<UserRecord>) {
        self.push(MockReply { delay: Duration::ZERO, result: Ok(page_of(records)) });
    }

    pub fn push_err(&self, err: FetchError) {
        self.push(MockReply { delay: Duration::ZERO, result: Err(err) });
    }

    /// Number of `fetch_users` calls served so far.
    pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }

    fn script(&self) -> MutexGuard<'_, VecDeque<MockReply>> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Wrap a full collection the way the endpoint reports a single bulk batch.
pub fn page_of(users: Vec<UserRecord>) -> UsersPage {
    let total = users.len();
    UsersPage { limit: total, users, total, skip: 0 }
}

#[async_trait::async_trait]
impl UserSource for MockSource {
    async fn fetch_users(&self, req: FetchRequest) -> Result<UsersPage, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.script().pop_front();
        match scripted {
            Some(reply) => {
                if !reply.delay.is_zero() {
                    tokio::time::sleep(reply.delay).await;
                }
                reply.result
            }
            None => {
                let all = self.fallback.clone()?;
                let total = all.len();
                let users: Vec<UserRecord> = all.into_iter().skip(req.skip).take(req.limit).collect();
                Ok(UsersPage { users, total, skip: req.skip, limit: req.limit })
            }
        }
    }
}
