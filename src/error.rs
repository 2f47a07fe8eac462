//! Error taxonomy for the match-context pipeline.
//!
//! Per-call upstream failures never escape the collector: they become absent
//! bundle sections. Everything that does reach a caller is one of the typed
//! variants below.

use std::time::Duration;

use thiserror::Error;

/// Errors produced by the upstream provider client.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Network failures, 5xx responses and rate-limit rejections. Retryable.
    #[error("transient upstream error: {0}")]
    Transient(String),

    /// 4xx responses other than rate limiting. Not retryable.
    #[error("permanent upstream error (status {status}): {message}")]
    Permanent { status: u16, message: String },

    /// The endpoint's circuit breaker refused the call.
    #[error("circuit open for {endpoint}, retry in {retry_in_secs}s")]
    CircuitOpen { endpoint: String, retry_in_secs: u64 },
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Errors from the distributed lock manager.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("failed to acquire lock for '{0}' after retries")]
    Unavailable(String),

    #[error("lock backend error: {0}")]
    Backend(String),
}

/// Errors from the context store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("context serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

/// Agent-level errors surfaced to callers of `get_match_context`.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The provider cannot resolve the fixture. Fatal to the request.
    #[error("fixture {0} not found upstream")]
    FixtureNotFound(i64),

    /// Another worker holds the per-fixture lock. Retryable by the client.
    #[error("analysis already in progress for fixture {0}")]
    Busy(i64),

    /// The collection exceeded its wall-clock budget. Retryable.
    #[error("data collection exceeded the {0:?} budget")]
    Timeout(Duration),

    /// The mandatory fixture lookup was short-circuited by the breaker.
    #[error("upstream provider unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The persistence layer refused a write.
    #[error("context store failure: {0}")]
    Store(#[from] StoreError),
}
