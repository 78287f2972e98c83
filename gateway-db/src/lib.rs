pub mod error;
pub mod pool;
pub mod postgres;
pub mod repository;

pub use error::DbError;
pub use pool::connect;
pub use repository::{AccountRepository, FailedTaskRepository, TransactionRepository, UserRepository, WebhookRepository};
