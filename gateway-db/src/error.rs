use gateway_common::GatewayError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("row not found")]
    NotFound,

    #[error("unique constraint violated: {0}")]
    Conflict(String),

    #[error("insufficient balance")]
    InsufficientBalance,

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl From<DbError> for GatewayError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound => GatewayError::NotFound("resource not found".into()),
            DbError::Conflict(msg) => GatewayError::Conflict(msg),
            DbError::InsufficientBalance => GatewayError::InsufficientBalance,
            DbError::Sqlx(e) => GatewayError::Database(e.to_string()),
        }
    }
}

/// Maps a Postgres unique-violation into `DbError::Conflict`, passing
/// everything else through unchanged.
pub fn map_sqlx(err: sqlx::Error, conflict_msg: &str) -> DbError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            return DbError::Conflict(conflict_msg.to_string());
        }
    }
    DbError::Sqlx(err)
}
