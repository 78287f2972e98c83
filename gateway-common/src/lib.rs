pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod money;
pub mod signature;

pub use error::GatewayError;
