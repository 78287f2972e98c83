//! HMAC signature verification for inbound bank callbacks and retried
//! outbound delivery of transaction event notifications.

pub mod delivery;
pub mod error;
pub mod inbound;
pub mod payload;

pub use delivery::{DeliveryOutcome, WebhookDeliveryService};
pub use error::WebhookError;
pub use payload::{BankCallbackPayload, TransactionEventPayload};
