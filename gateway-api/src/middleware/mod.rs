pub mod idempotency;
pub mod rate_limit;
pub mod request_id;

pub use idempotency::IdempotencyMiddleware;
pub use rate_limit::RateLimitMiddleware;
pub use request_id::RequestIdMiddleware;
