mod redis;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

pub use self::redis::RedisRateLimiter;

/// A requests-per-minute definition of a rate limiter.
pub trait RateLimiter: Send + Sync {
    /// Determine if the rate limit has been exceeded for a specific resource.
    ///
    /// # Arguments
    ///
    /// * `key` - A unique key for the resource being rate limited. In the
    ///   context of a web request, this should encapsulate the request path and
    ///   method, as well as the actor making the request.
    /// * `max_req_per_min` - The maximum number of requests allowed in a given
    ///   minute.
    ///
    /// # Returns
    ///
    /// In the typical case, an [Ok] result containing a result describing the
    /// requestor's rate limit state is returned. An [Err] is returned if the
    /// rate limiter encounters an error while trying to determine if the
    /// request should be rate limited.
    fn is_limited(&self, key: &str, max_req_per_min: u64) -> anyhow::Result<RateLimitResult>;

    /// Record an operation against a key, failing if the key is over its
    /// limit.
    fn record_operation(&self, key: &str, max_req_per_min: u64) -> Result<(), RateLimitError> {
        match self.is_limited(key, max_req_per_min)? {
            RateLimitResult::NotLimited => Ok(()),
            RateLimitResult::LimitedUntil(until) => Err(RateLimitError::Limited(until)),
        }
    }
}

/// A rate limiter for deployments without Redis. Nothing is ever limited.
pub struct NoopRateLimiter;

impl RateLimiter for NoopRateLimiter {
    fn is_limited(&self, _key: &str, _max_req_per_min: u64) -> anyhow::Result<RateLimitResult> {
        Ok(RateLimitResult::NotLimited)
    }
}

#[derive(Debug)]
pub enum RateLimitResult {
    /// The rate limit has not been exceeded.
    NotLimited,
    /// The rate limit has been exceeded. Requests will be accepted again at the
    /// contained timestamp.
    LimitedUntil(DateTime<Utc>),
}

#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("rate limited until {0}")]
    Limited(DateTime<Utc>),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Serialize)]
pub struct RateLimitResponse {
    pub message: Option<String>,
}

impl From<RateLimitResult> for RateLimitResponse {
    fn from(result: RateLimitResult) -> Self {
        match result {
            RateLimitResult::LimitedUntil(_time) => Self {
                message: Some("Too many attempts. Please try again later.".to_string()),
            },
            RateLimitResult::NotLimited => Self { message: None },
        }
    }
}

impl IntoResponse for RateLimitResult {
    fn into_response(self) -> Response {
        if let Self::LimitedUntil(_time) = self {
            (
                StatusCode::TOO_MANY_REQUESTS,
                Json(RateLimitResponse::from(self)),
            )
                .into_response()
        } else {
            // A `RateLimitResult` will typically only be converted to a
            // response in a failure scenario, but if a non-limited result is
            // converted, we just respond with a simple success status code.
            StatusCode::OK.into_response()
        }
    }
}


#[cfg(test)]
mod test {
    use super::{test_utils::CountingRateLimiter, *};

    #[test]
    fn noop_never_limits() {
        let limiter = NoopRateLimiter;

        for _ in 0..100 {
            limiter
                .record_operation("key", 1)
                .expect("noop limiter should never limit");
        }
    }

    #[test]
    fn record_operation_reports_limit() {
        let limiter = CountingRateLimiter::default();

        limiter.record_operation("key", 2).expect("first");
        limiter.record_operation("key", 2).expect("second");

        match limiter.record_operation("key", 2) {
            Err(RateLimitError::Limited(_)) => (),
            other => panic!("Expected limited result, got {:?}", other),
        }

        limiter
            .record_operation("other-key", 2)
            .expect("keys are limited independently");
    }
}
