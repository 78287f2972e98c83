use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::client::{BankClient, BankResponse};
use gateway_common::domain::BankResponseStatus;

/// In-process stand-in for the external bank: a random processing delay,
/// a configurable success rate, and on failure a weighted choice between
/// `UNAVAILABLE`, `TIMEOUT`, and `INSUFFICIENT_FUNDS`.
pub struct SimulatedBank {
    min_delay: Duration,
    max_delay: Duration,
    success_rate: f64,
}

impl SimulatedBank {
    pub fn new(min_delay: Duration, max_delay: Duration, success_rate: f64) -> Self {
        Self {
            min_delay,
            max_delay,
            success_rate: success_rate.clamp(0.0, 1.0),
        }
    }

    async fn simulate_delay(&self) {
        let millis = if self.max_delay > self.min_delay {
            rand::thread_rng().gen_range(self.min_delay.as_millis()..=self.max_delay.as_millis())
        } else {
            self.min_delay.as_millis()
        };
        tokio::time::sleep(Duration::from_millis(millis as u64)).await;
    }

    fn roll_outcome(&self, reference_prefix: &str) -> BankResponse {
        let mut rng = rand::thread_rng();
        if rng.gen_bool(self.success_rate) {
            return BankResponse {
                status: BankResponseStatus::Success,
                transaction_id: Some(format!("{reference_prefix}-{}", Uuid::new_v4())),
                message: Some("processed".to_string()),
                error_code: None,
            };
        }
        let roll: f64 = rng.gen();
        let (status, error_code, message) = if roll < 0.4 {
            (BankResponseStatus::Unavailable, "BANK_UNAVAILABLE", "bank temporarily unavailable")
        } else if roll < 0.7 {
            (BankResponseStatus::Timeout, "BANK_TIMEOUT", "bank call timed out")
        } else {
            (BankResponseStatus::InsufficientFunds, "INSUFFICIENT_FUNDS", "insufficient funds at bank")
        };
        BankResponse {
            status,
            transaction_id: None,
            message: Some(message.to_string()),
            error_code: Some(error_code.to_string()),
        }
    }
}

#[async_trait]
impl BankClient for SimulatedBank {
    async fn process_deposit(&self, _account_id: Uuid, _amount: Decimal) -> BankResponse {
        self.simulate_delay().await;
        self.roll_outcome("BANK-DEP")
    }

    async fn process_withdrawal(&self, _account_id: Uuid, _amount: Decimal) -> BankResponse {
        self.simulate_delay().await;
        self.roll_outcome("BANK-WD")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn always_succeeds_at_success_rate_one() {
        let bank = SimulatedBank::new(Duration::ZERO, Duration::ZERO, 1.0);
        let response = bank.process_deposit(Uuid::new_v4(), Decimal::new(100, 0)).await;
        assert_eq!(response.status, BankResponseStatus::Success);
        assert!(response.transaction_id.is_some());
    }

    #[tokio::test]
    async fn always_fails_at_success_rate_zero() {
        let bank = SimulatedBank::new(Duration::ZERO, Duration::ZERO, 0.0);
        let response = bank.process_withdrawal(Uuid::new_v4(), Decimal::new(100, 0)).await;
        assert_ne!(response.status, BankResponseStatus::Success);
        assert!(response.error_code.is_some());
    }
}
