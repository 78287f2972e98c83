use std::sync::Arc;
use std::time::Duration;

use gateway_cache::{CacheClient, DistributedLock};
use gateway_common::domain::{Transaction, TransactionType};
use gateway_common::money;
use gateway_db::{AccountRepository, DbError, TransactionRepository};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::AccountError;

/// Validates the request body's global invariants (`amount > 0`,
/// `currency == "USD"`) here so a malformed request surfaces as
/// `ApiError::BadRequest` rather than tripping the database's `CHECK
/// (amount > 0)` constraint and surfacing as a 500.
fn validate_amount_and_currency(amount: Decimal, currency: &str) -> Result<(), AccountError> {
    if !money::is_positive(amount) {
        return Err(AccountError::InvalidAmount);
    }
    if currency != "USD" {
        return Err(AccountError::UnsupportedCurrency(currency.to_string()));
    }
    Ok(())
}

/// Per-account lock lease used while completing a transaction — short
/// enough that a crashed worker self-heals quickly.
const ACCOUNT_LOCK_TTL: Duration = Duration::from_secs(10);

/// Implements the deposit/withdrawal lifecycle: creating pending rows,
/// completing them under the combined distributed-lock + row-lock
/// serialization, and the failure/review terminal transitions. Deposit
/// and withdrawal share this one service — they differ only in the sign
/// of the balance delta and which creation path checks balance, not in a
/// class hierarchy.
pub struct AccountService {
    accounts: Arc<dyn AccountRepository>,
    transactions: Arc<dyn TransactionRepository>,
    cache: CacheClient,
}

impl AccountService {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        transactions: Arc<dyn TransactionRepository>,
        cache: CacheClient,
    ) -> Self {
        Self { accounts, transactions, cache }
    }

    fn account_lock(&self, account_id: Uuid) -> DistributedLock {
        DistributedLock::new(self.cache.clone(), &format!("account:{account_id}"))
    }

    pub async fn create_pending_deposit(
        &self,
        account_id: Uuid,
        amount: Decimal,
        currency: &str,
        idempotency_key: Option<&str>,
    ) -> Result<Transaction, AccountError> {
        validate_amount_and_currency(amount, currency)?;
        self.accounts
            .find_by_id(account_id)
            .await?
            .ok_or(AccountError::AccountNotFound)?;
        Ok(self
            .transactions
            .create_pending(account_id, TransactionType::Deposit, money::normalize(amount), currency, idempotency_key)
            .await?)
    }

    /// No debit happens here — balance is checked under `FOR UPDATE` and
    /// the row survives; the worker rechecks balance under lock again at
    /// completion time.
    pub async fn create_pending_withdrawal(
        &self,
        account_id: Uuid,
        amount: Decimal,
        currency: &str,
        idempotency_key: Option<&str>,
    ) -> Result<Transaction, AccountError> {
        validate_amount_and_currency(amount, currency)?;
        match self
            .transactions
            .create_pending_withdrawal_checked(account_id, money::normalize(amount), currency, idempotency_key)
            .await
        {
            Ok(transaction) => Ok(transaction),
            Err(DbError::InsufficientBalance) => Err(AccountError::InsufficientBalance),
            Err(other) => Err(other.into()),
        }
    }

    pub async fn complete_deposit(
        &self,
        transaction: &Transaction,
        bank_transaction_id: &str,
        bank_response: &str,
    ) -> Result<(), AccountError> {
        self.complete_with_delta(transaction, transaction.amount, bank_transaction_id, bank_response)
            .await
    }

    /// If the post-lock row lock finds the balance can no longer cover
    /// the amount, that's a bug surface, not a retry — the transaction
    /// goes to `PENDING_REVIEW` instead of silently failing.
    /// `complete_with_balance_change` implements that branch for any sign
    /// of delta, so withdrawal reuses the same call as deposit.
    pub async fn complete_withdrawal(
        &self,
        transaction: &Transaction,
        bank_transaction_id: &str,
        bank_response: &str,
    ) -> Result<(), AccountError> {
        self.complete_with_delta(transaction, -transaction.amount, bank_transaction_id, bank_response)
            .await
    }

    async fn complete_with_delta(
        &self,
        transaction: &Transaction,
        delta: Decimal,
        bank_transaction_id: &str,
        bank_response: &str,
    ) -> Result<(), AccountError> {
        let lock = self.account_lock(transaction.account_id);
        let acquired = lock.try_acquire(ACCOUNT_LOCK_TTL).await?;
        if !acquired {
            return Err(AccountError::ConcurrentUpdate);
        }

        let result = self
            .transactions
            .complete_with_balance_change(transaction.id, delta, bank_transaction_id, bank_response)
            .await;

        if let Err(err) = lock.release().await {
            log::warn!("failed to release account lock for {}: {err}", transaction.account_id);
        }

        result.map_err(Into::into)
    }

    pub async fn fail_transaction(&self, id: Uuid, error_code: &str, error_message: &str) -> Result<(), AccountError> {
        self.transactions.mark_failed(id, error_code, error_message).await?;
        Ok(())
    }

    pub async fn mark_for_review(&self, id: Uuid, reason: &str) -> Result<(), AccountError> {
        self.transactions.mark_pending_review(id, reason).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn rejects_non_positive_amount() {
        let err = validate_amount_and_currency(Decimal::ZERO, "USD").unwrap_err();
        assert!(matches!(err, AccountError::InvalidAmount));
        let err = validate_amount_and_currency(Decimal::from_str("-5.00").unwrap(), "USD").unwrap_err();
        assert!(matches!(err, AccountError::InvalidAmount));
    }

    #[test]
    fn rejects_unsupported_currency() {
        let err = validate_amount_and_currency(Decimal::from_str("10.00").unwrap(), "EUR").unwrap_err();
        assert!(matches!(err, AccountError::UnsupportedCurrency(c) if c == "EUR"));
    }

    #[test]
    fn accepts_positive_usd_amount() {
        assert!(validate_amount_and_currency(Decimal::from_str("0.01").unwrap(), "USD").is_ok());
    }
}
