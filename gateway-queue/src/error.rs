use gateway_common::GatewayError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("job not found")]
    NotFound,

    #[error("job already replayed")]
    AlreadyReplayed,

    #[error(transparent)]
    Db(#[from] gateway_db::DbError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl From<QueueError> for GatewayError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::NotFound => GatewayError::NotFound("job not found".into()),
            QueueError::AlreadyReplayed => GatewayError::Conflict("job already replayed".into()),
            QueueError::Db(e) => e.into(),
            QueueError::Sqlx(e) => GatewayError::Database(e.to_string()),
        }
    }
}
