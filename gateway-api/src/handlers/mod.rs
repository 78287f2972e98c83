pub mod auth;
pub mod deposits;
pub mod users;
pub mod webhooks;
pub mod withdrawals;
