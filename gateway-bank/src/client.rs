use async_trait::async_trait;
pub use gateway_common::domain::BankResponseStatus;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::circuit_breaker::CircuitBreaker;
use crate::error::BankError;

#[derive(Debug, Clone)]
pub struct BankResponse {
    pub status: BankResponseStatus,
    pub transaction_id: Option<String>,
    pub message: Option<String>,
    pub error_code: Option<String>,
}

impl BankResponse {
    fn circuit_open() -> Self {
        Self {
            status: BankResponseStatus::Unavailable,
            transaction_id: None,
            message: Some("circuit breaker open".to_string()),
            error_code: Some("CIRCUIT_BREAKER_OPEN".to_string()),
        }
    }
}

/// The external bank, at its interface — its own implementation is out of
/// scope here, only the contract this gateway calls against. One method
/// per money-movement direction.
#[async_trait]
pub trait BankClient: Send + Sync {
    async fn process_deposit(&self, account_id: Uuid, amount: Decimal) -> BankResponse;
    async fn process_withdrawal(&self, account_id: Uuid, amount: Decimal) -> BankResponse;
}

/// Wraps any `BankClient` with a circuit breaker: when the breaker is
/// open, the call is short-circuited into a synthesized
/// `UNAVAILABLE` / `CIRCUIT_BREAKER_OPEN` response rather than reaching
/// the inner client at all. Only `TIMEOUT`/`UNAVAILABLE` responses (and
/// transport errors, which this trait's infallible signature precludes)
/// count as failures; business failures never trip the breaker.
pub struct CircuitBreakingBankClient<B: BankClient> {
    inner: B,
    breaker: CircuitBreaker,
    direction: &'static str,
}

impl<B: BankClient> CircuitBreakingBankClient<B> {
    pub fn new(inner: B, breaker: CircuitBreaker, direction: &'static str) -> Self {
        Self { inner, breaker, direction }
    }

    fn record(&self, response: &BankResponse) {
        if response.status.is_transient() {
            self.breaker.record_failure();
        } else {
            self.breaker.record_success();
        }
    }

    pub fn breaker_error(&self) -> BankError {
        BankError::CircuitOpen { direction: self.direction }
    }
}

#[async_trait]
impl<B: BankClient> BankClient for CircuitBreakingBankClient<B> {
    async fn process_deposit(&self, account_id: uuid::Uuid, amount: Decimal) -> BankResponse {
        if !self.breaker.can_execute() {
            return BankResponse::circuit_open();
        }
        let response = self.inner.process_deposit(account_id, amount).await;
        self.record(&response);
        response
    }

    async fn process_withdrawal(&self, account_id: uuid::Uuid, amount: Decimal) -> BankResponse {
        if !self.breaker.can_execute() {
            return BankResponse::circuit_open();
        }
        let response = self.inner.process_withdrawal(account_id, amount).await;
        self.record(&response);
        response
    }
}
