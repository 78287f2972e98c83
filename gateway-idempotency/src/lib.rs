//! Request-key deduplication: guarantees at most one handler invocation
//! per client-supplied `Idempotency-Key` within a 24h window, by racing
//! callers to plant a short-lived PROCESSING sentinel in `gateway-cache`
//! and replacing it with a long-lived COMPLETED record once the handler
//! finishes.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use gateway_cache::CacheClient;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const PROCESSING_TTL_SECONDS: u64 = 60;
pub const COMPLETED_TTL_SECONDS: u64 = 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum IdempotencyError {
    #[error(transparent)]
    Cache(#[from] gateway_cache::CacheError),

    #[error("stored idempotency record was not valid JSON: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status")]
enum StoredRecord {
    #[serde(rename = "PROCESSING")]
    Processing { created_at: DateTime<Utc> },
    #[serde(rename = "COMPLETED")]
    Completed {
        status_code: u16,
        body: String,
        headers: HashMap<String, String>,
        resource_id: Option<String>,
        created_at: DateTime<Utc>,
    },
}

/// What `check_existing` finds, surfaced to the middleware.
#[derive(Debug, Clone)]
pub enum ExistingRecord {
    Processing,
    Completed(CompletedResponse),
}

#[derive(Debug, Clone)]
pub struct CompletedResponse {
    pub status_code: u16,
    pub body: String,
    pub headers: HashMap<String, String>,
    pub resource_id: Option<String>,
}

pub struct IdempotencyService {
    cache: CacheClient,
    completed_ttl_seconds: u64,
}

fn key_for(idempotency_key: &str) -> String {
    format!("idempotency:{idempotency_key}")
}

impl IdempotencyService {
    pub fn new(cache: CacheClient) -> Self {
        Self {
            cache,
            completed_ttl_seconds: COMPLETED_TTL_SECONDS,
        }
    }

    pub fn with_completed_ttl(mut self, ttl_seconds: u64) -> Self {
        self.completed_ttl_seconds = ttl_seconds;
        self
    }

    /// Plants the PROCESSING sentinel if absent. Returns `true` iff this
    /// call is the first to see the key — i.e. the caller should proceed
    /// to run the handler.
    pub async fn acquire_lock(&self, idempotency_key: &str) -> Result<bool, IdempotencyError> {
        let record = StoredRecord::Processing { created_at: Utc::now() };
        let value = serde_json::to_string(&record).expect("StoredRecord always serializes");
        Ok(self
            .cache
            .set_if_absent(&key_for(idempotency_key), &value, PROCESSING_TTL_SECONDS)
            .await?)
    }

    /// Reads the current record, if any. `None` means the key was never
    /// seen (or its PROCESSING sentinel already expired with no retry
    /// landing in the window) — the caller should treat this like a lost
    /// race and let the new request proceed.
    pub async fn check_existing(&self, idempotency_key: &str) -> Result<Option<ExistingRecord>, IdempotencyError> {
        let Some(raw) = self.cache.get(&key_for(idempotency_key)).await? else {
            return Ok(None);
        };
        let record: StoredRecord =
            serde_json::from_str(&raw).map_err(|e| IdempotencyError::Malformed(e.to_string()))?;
        Ok(Some(match record {
            StoredRecord::Processing { .. } => ExistingRecord::Processing,
            StoredRecord::Completed {
                status_code,
                body,
                headers,
                resource_id,
                ..
            } => ExistingRecord::Completed(CompletedResponse {
                status_code,
                body,
                headers,
                resource_id,
            }),
        }))
    }

    /// Overwrites the record with a COMPLETED envelope, TTL 24h. Called
    /// only when the handler's response status is < 400.
    pub async fn save_response(
        &self,
        idempotency_key: &str,
        body: &str,
        status_code: u16,
        headers: HashMap<String, String>,
        resource_id: Option<String>,
    ) -> Result<(), IdempotencyError> {
        let record = StoredRecord::Completed {
            status_code,
            body: body.to_string(),
            headers,
            resource_id,
            created_at: Utc::now(),
        };
        let value = serde_json::to_string(&record).expect("StoredRecord always serializes");
        self.cache
            .set(&key_for(idempotency_key), &value, self.completed_ttl_seconds)
            .await?;
        Ok(())
    }

    /// Deletes the record so the client may retry. Called on non-success
    /// responses and on panics/exceptions unwinding through the handler.
    pub async fn release_lock(&self, idempotency_key: &str) -> Result<(), IdempotencyError> {
        self.cache.delete(&key_for(idempotency_key)).await?;
        Ok(())
    }
}
