use gateway_common::GatewayError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BankError {
    #[error("circuit breaker open for {direction}")]
    CircuitOpen { direction: &'static str },

    #[error("bank call failed: {0}")]
    Transport(String),
}

impl From<BankError> for GatewayError {
    fn from(err: BankError) -> Self {
        match err {
            BankError::CircuitOpen { .. } => GatewayError::BankUnavailable,
            BankError::Transport(msg) => GatewayError::Internal(msg),
        }
    }
}
