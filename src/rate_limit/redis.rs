use chrono::{Duration, DurationRound, Utc};
use redis::Commands;
use tracing::debug;

use super::{RateLimitResult, RateLimiter};

/// A rate limiter that uses Redis as a backing store.
pub struct RedisRateLimiter {
    client: redis::Client,
}

impl RedisRateLimiter {
    /// Create a new rate limiter.
    ///
    /// # Arguments
    ///
    /// * `connection_uri` - The connection string used to connect to Redis.
    pub fn new(connection_uri: &str) -> anyhow::Result<Self> {
        Ok(Self {
            client: redis::Client::open(connection_uri)?,
        })
    }
}

impl RateLimiter for RedisRateLimiter {
    fn is_limited(&self, key: &str, max_req_per_min: u64) -> anyhow::Result<RateLimitResult> {
        // Fixed window counter per minute:
        // https://redis.com/redis-best-practices/basic-rate-limiting/
        let mut conn = self.client.get_connection()?;

        // The minute of the hour is enough for the key because each key
        // expires long before the same minute comes around again.
        let now = Utc::now();
        let current_minute = now.format("%M").to_string();

        let cache_key = format!("{}:{}", key, current_minute);

        let hits: Option<u64> = conn.get(&cache_key)?;
        if let Some(hit_count) = hits {
            if hit_count >= max_req_per_min {
                let limit_expiration =
                    (now + Duration::minutes(1)).duration_trunc(Duration::minutes(1))?;

                debug!(%cache_key, hit_count, "Rate limit exceeded.");

                return Ok(RateLimitResult::LimitedUntil(limit_expiration));
            }
        }

        redis::pipe()
            .atomic()
            .cmd("INCR")
            .arg(&cache_key)
            .ignore()
            .cmd("EXPIRE")
            .arg(&cache_key)
            .arg(59)
            .ignore()
            .query::<()>(&mut conn)?;

        Ok(RateLimitResult::NotLimited)
    }
}
