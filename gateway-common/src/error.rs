use thiserror::Error;

/// Cross-cutting error kind shared by every service crate. Each crate's own
/// boundary error (`DbError`, `CacheError`, `LockError`, ...) converts into
/// this one via `#[from]`, and `gateway-api` maps it to an HTTP response.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("insufficient balance")]
    InsufficientBalance,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("idempotency key reused with a different request")]
    IdempotencyKeyConflict,

    #[error("request already being processed")]
    RequestInFlight,

    #[error("could not acquire lock on {resource}")]
    LockUnavailable { resource: String },

    #[error("upstream bank unavailable")]
    BankUnavailable,

    #[error("database error: {0}")]
    Database(String),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn internal(err: impl std::fmt::Display) -> Self {
        GatewayError::Internal(err.to_string())
    }
}
