use gateway_common::GatewayError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("callback timestamp outside the allowed skew window")]
    StaleTimestamp,

    #[error("delivery not found")]
    DeliveryNotFound,

    #[error(transparent)]
    Db(#[from] gateway_db::DbError),

    #[error(transparent)]
    Queue(#[from] gateway_queue::QueueError),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl From<WebhookError> for GatewayError {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::InvalidSignature => GatewayError::Unauthorized,
            WebhookError::StaleTimestamp => GatewayError::InvalidInput("stale webhook timestamp".into()),
            WebhookError::DeliveryNotFound => GatewayError::NotFound("webhook delivery not found".into()),
            WebhookError::Db(e) => e.into(),
            WebhookError::Queue(e) => e.into(),
            WebhookError::Http(e) => GatewayError::Internal(e.to_string()),
        }
    }
}
