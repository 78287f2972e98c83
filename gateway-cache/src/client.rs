use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};

use crate::error::CacheError;

/// Thin wrapper over a Redis connection manager exposing exactly the
/// primitives the gateway needs: atomic set-if-absent with TTL, an
/// owner-checked delete (via a Lua script, since Redis has no native
/// compare-and-delete), and the sorted-set operations the sliding-window
/// rate limiter builds on. Constructed once in `AppState` and cloned
/// freely — `ConnectionManager` is itself a cheap `Arc`-backed handle.
#[derive(Clone)]
pub struct CacheClient {
    conn: ConnectionManager,
}

/// `GET` the key, and if its value equals the given token, `DEL` it.
/// Runs server-side so the check-then-delete is atomic against any other
/// client racing on the same key.
const DELETE_IF_MATCH_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

/// Like the delete script, but sets a new TTL instead of deleting —
/// backs `DistributedLock::extend`.
const EXPIRE_IF_MATCH_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("EXPIRE", KEYS[1], ARGV[2])
else
    return 0
end
"#;

impl CacheClient {
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    /// `SET key value NX EX seconds`. Returns `true` iff this call created
    /// the key (i.e. it was absent).
    pub async fn set_if_absent(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        let created: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await?;
        Ok(created.is_some())
    }

    /// Unconditional `SET key value EX seconds`, used to overwrite an
    /// idempotency record from PROCESSING to COMPLETED.
    pub async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, value, ttl_seconds).await?;
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }

    /// Deletes `key` only if its current value equals `expected_value`.
    pub async fn delete_if_match(&self, key: &str, expected_value: &str) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        let deleted: i64 = Script::new(DELETE_IF_MATCH_SCRIPT)
            .key(key)
            .arg(expected_value)
            .invoke_async(&mut conn)
            .await?;
        Ok(deleted == 1)
    }

    /// Resets `key`'s TTL only if its current value equals `expected_value`.
    pub async fn expire_if_match(
        &self,
        key: &str,
        expected_value: &str,
        ttl_seconds: u64,
    ) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        let extended: i64 = Script::new(EXPIRE_IF_MATCH_SCRIPT)
            .key(key)
            .arg(expected_value)
            .arg(ttl_seconds)
            .invoke_async(&mut conn)
            .await?;
        Ok(extended == 1)
    }

    /// Sliding-window primitive: trims entries older than `min_score`,
    /// counts what remains, inserts `member` at `score`, and (re)sets the
    /// key's expiry — all steps used by `SlidingWindowLimiter::check`.
    pub async fn zremrangebyscore(&self, key: &str, min: f64, max: f64) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = conn.zrembyscore(key, min, max).await?;
        Ok(())
    }

    pub async fn zcard(&self, key: &str) -> Result<i64, CacheError> {
        let mut conn = self.conn.clone();
        let count: i64 = conn.zcard(key).await?;
        Ok(count)
    }

    pub async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = conn.zadd(key, member, score).await?;
        Ok(())
    }

    pub async fn expire(&self, key: &str, ttl_seconds: i64) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = conn.expire(key, ttl_seconds).await?;
        Ok(())
    }
}
