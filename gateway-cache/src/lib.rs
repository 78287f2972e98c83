pub mod client;
pub mod error;
pub mod lock;
pub mod rate_limit;

pub use client::CacheClient;
pub use error::CacheError;
pub use lock::{DistributedLock, LockGuard};
pub use rate_limit::{RateLimitOutcome, SlidingWindowLimiter};
