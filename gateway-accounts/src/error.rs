use gateway_common::GatewayError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("account not found")]
    AccountNotFound,

    #[error("insufficient balance")]
    InsufficientBalance,

    #[error("amount must be positive")]
    InvalidAmount,

    #[error("unsupported currency: {0}")]
    UnsupportedCurrency(String),

    #[error("could not acquire account lock, retry")]
    ConcurrentUpdate,

    #[error(transparent)]
    Db(#[from] gateway_db::DbError),

    #[error(transparent)]
    Cache(#[from] gateway_cache::CacheError),
}

impl From<AccountError> for GatewayError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::AccountNotFound => GatewayError::NotFound("account not found".into()),
            AccountError::InsufficientBalance => GatewayError::InsufficientBalance,
            AccountError::InvalidAmount => GatewayError::InvalidInput("amount must be positive".into()),
            AccountError::UnsupportedCurrency(currency) => {
                GatewayError::InvalidInput(format!("unsupported currency: {currency}"))
            }
            AccountError::ConcurrentUpdate => GatewayError::LockUnavailable { resource: "account".into() },
            AccountError::Db(e) => e.into(),
            AccountError::Cache(e) => e.into(),
        }
    }
}
