use gateway_common::GatewayError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(#[from] redis::RedisError),

    #[error("could not acquire lock on {resource} within the retry budget")]
    LockAcquisition { resource: String },

    #[error("value stored under key was not valid JSON: {0}")]
    Malformed(String),
}

impl From<CacheError> for GatewayError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::LockAcquisition { resource } => GatewayError::LockUnavailable { resource },
            other => GatewayError::Cache(other.to_string()),
        }
    }
}
