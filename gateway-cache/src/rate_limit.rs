use chrono::Utc;
use uuid::Uuid;

use crate::client::CacheClient;
use crate::error::CacheError;

/// Sliding-window limit check result.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitOutcome {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Unix seconds at which the oldest counted request falls out of the
    /// window — what the caller echoes as `X-RateLimit-Reset`.
    pub reset_at: i64,
}

/// Sliding window over a Redis sorted set keyed `rate_limit:{subject}:{pattern}`.
/// Each check: purge entries older than `now - window`, count what's left,
/// and — if under the limit — insert `now` and (re)set the key's TTL to
/// the window so an idle key self-expires.
pub struct SlidingWindowLimiter {
    cache: CacheClient,
}

impl SlidingWindowLimiter {
    pub fn new(cache: CacheClient) -> Self {
        Self { cache }
    }

    pub async fn check(
        &self,
        subject: &str,
        pattern: &str,
        limit: u32,
        window_seconds: i64,
    ) -> Result<RateLimitOutcome, CacheError> {
        let key = format!("rate_limit:{subject}:{pattern}");
        let now = Utc::now().timestamp();
        let window_start = now - window_seconds;

        self.cache
            .zremrangebyscore(&key, f64::NEG_INFINITY, window_start as f64)
            .await?;
        let count = self.cache.zcard(&key).await?;

        let reset_at = now + window_seconds;
        if count as u32 >= limit {
            return Ok(RateLimitOutcome {
                allowed: false,
                limit,
                remaining: 0,
                reset_at,
            });
        }

        // Member must be unique per request even within the same second,
        // or concurrent requests would collapse into one sorted-set entry.
        let member = format!("{now}:{}", Uuid::new_v4());
        self.cache.zadd(&key, &member, now as f64).await?;
        self.cache.expire(&key, window_seconds).await?;

        Ok(RateLimitOutcome {
            allowed: true,
            limit,
            remaining: limit.saturating_sub(count as u32 + 1),
            reset_at,
        })
    }
}

#[cfg(test)]
mod tests {
    // Exercised against a real Redis in `gateway-api`'s integration tests;
    // the windowing arithmetic itself is covered there since it depends on
    // server-side time semantics (`ZREMRANGEBYSCORE` bounds).
}
