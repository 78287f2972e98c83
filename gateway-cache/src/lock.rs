use std::time::Duration;

use rand::Rng;
use uuid::Uuid;

use crate::client::CacheClient;
use crate::error::CacheError;

/// Hard ceiling on any lease, independent of what the caller asks for —
/// bounds worst-case wedging if a holder crashes mid-critical-section.
pub const MAX_TTL: Duration = Duration::from_secs(30);

const BACKOFF_BASE: Duration = Duration::from_millis(100);
const BACKOFF_CAP: Duration = Duration::from_secs(1);

/// A named, owner-fenced exclusive lock with a mandatory TTL, backed by
/// Redis `SET ... NX EX` for acquisition and a `GET`-then-`DEL` Lua script
/// for release — release and extend only ever touch the key if its value
/// still matches this instance's owner token, so a lagging holder can
/// never tear down a successor's lease.
pub struct DistributedLock {
    cache: CacheClient,
    key: String,
    owner_token: String,
}

impl DistributedLock {
    pub fn new(cache: CacheClient, resource: &str) -> Self {
        Self {
            cache,
            key: format!("lock:{resource}"),
            owner_token: Uuid::new_v4().to_string(),
        }
    }

    fn clamp_ttl(ttl: Duration) -> Duration {
        ttl.min(MAX_TTL)
    }

    /// One-shot acquire: a single `SET NX EX`, no retry.
    pub async fn try_acquire(&self, ttl: Duration) -> Result<bool, CacheError> {
        self.cache
            .set_if_absent(&self.key, &self.owner_token, Self::clamp_ttl(ttl).as_secs().max(1))
            .await
    }

    /// Retries with exponential backoff (base 0.1s, doubling, cap 1s) until
    /// either the lock is acquired or `retry_budget` has elapsed.
    pub async fn acquire_blocking(&self, ttl: Duration, retry_budget: Duration) -> Result<bool, CacheError> {
        let deadline = tokio::time::Instant::now() + retry_budget;
        let mut backoff = BACKOFF_BASE;
        loop {
            if self.try_acquire(ttl).await? {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            tokio::time::sleep(backoff.min(remaining)).await;
            backoff = (backoff * 2).min(BACKOFF_CAP);
        }
    }

    /// Acquires in either blocking or non-blocking mode; on timeout in
    /// blocking mode, fails with `LockAcquisition` rather than returning
    /// `false`.
    pub async fn acquire(
        &self,
        ttl: Duration,
        blocking: bool,
        retry_budget: Option<Duration>,
    ) -> Result<bool, CacheError> {
        if blocking {
            let acquired = self
                .acquire_blocking(ttl, retry_budget.unwrap_or(Duration::from_secs(5)))
                .await?;
            if !acquired {
                return Err(CacheError::LockAcquisition {
                    resource: self.key.clone(),
                });
            }
            Ok(true)
        } else {
            self.try_acquire(ttl).await
        }
    }

    /// Idempotent: returns `false` (not an error) if this instance no
    /// longer (or never did) hold the lease.
    pub async fn release(&self) -> Result<bool, CacheError> {
        self.cache.delete_if_match(&self.key, &self.owner_token).await
    }

    pub async fn extend(&self, additional_ttl: Duration) -> Result<bool, CacheError> {
        self.cache
            .expire_if_match(&self.key, &self.owner_token, Self::clamp_ttl(additional_ttl).as_secs().max(1))
            .await
    }

    pub fn resource_key(&self) -> &str {
        &self.key
    }
}

/// RAII handle returned on successful acquisition. `release` must be
/// called explicitly (it's async, so `Drop` can't do it); an un-released
/// guard simply self-heals when its lease expires, and `Drop` logs a
/// warning so a forgotten release is visible in the logs.
pub struct LockGuard {
    lock: DistributedLock,
    released: bool,
}

impl LockGuard {
    pub async fn acquire(
        cache: CacheClient,
        resource: &str,
        ttl: Duration,
        blocking: bool,
        retry_budget: Option<Duration>,
    ) -> Result<Option<Self>, CacheError> {
        let lock = DistributedLock::new(cache, resource);
        let acquired = if blocking {
            match lock.acquire(ttl, true, retry_budget).await {
                Ok(acquired) => acquired,
                Err(CacheError::LockAcquisition { .. }) => false,
                Err(other) => return Err(other),
            }
        } else {
            lock.try_acquire(ttl).await?
        };
        Ok(acquired.then_some(Self { lock, released: false }))
    }

    pub async fn release(mut self) -> Result<bool, CacheError> {
        self.released = true;
        self.lock.release().await
    }

    pub async fn extend(&self, additional_ttl: Duration) -> Result<bool, CacheError> {
        self.lock.extend(additional_ttl).await
    }

    pub fn resource_key(&self) -> &str {
        self.lock.resource_key()
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if !self.released {
            log::warn!(
                "lock '{}' dropped without explicit release; relying on TTL expiry",
                self.lock.resource_key()
            );
        }
    }
}

/// Jittered delay used by callers (worker retry loops) that are not
/// themselves lock backoff but want the same shape — exposed so
/// `gateway-worker` doesn't hand-roll a second backoff helper.
pub fn jittered_backoff(base: Duration, attempt: u32, cap: Duration) -> Duration {
    let exp = base.saturating_mul(2u32.saturating_pow(attempt.min(20)));
    let capped = exp.min(cap);
    let jitter_ms = rand::thread_rng().gen_range(0..=(capped.as_millis() as u64 / 4).max(1));
    capped + Duration::from_millis(jitter_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jittered_backoff_never_exceeds_cap_plus_quarter() {
        let cap = Duration::from_secs(600);
        for attempt in 0..10 {
            let d = jittered_backoff(Duration::from_secs(1), attempt, cap);
            assert!(d <= cap + cap / 4);
        }
    }
}
