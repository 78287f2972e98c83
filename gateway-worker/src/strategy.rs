//! Deposit and withdrawal processing share one job skeleton
//! (`TransactionProcessor`) and differ only in which bank method to call
//! and which completion/failure callback to invoke. Modeled as a trait
//! (`DepositStrategy`/`WithdrawalStrategy`) with two zero-sized
//! implementing types rather than a class hierarchy, since Rust has no
//! inheritance to translate one into.

use async_trait::async_trait;
use gateway_accounts::{AccountError, AccountService};
use gateway_bank::{BankClient, BankResponse};
use gateway_common::domain::{Transaction, TransactionType};
use rust_decimal::Decimal;
use uuid::Uuid;

#[async_trait]
pub trait TransactionStrategy: Send + Sync {
    fn type_name(&self) -> &'static str;

    async fn call_bank(&self, bank: &dyn BankClient, account_id: Uuid, amount: Decimal) -> BankResponse;

    async fn complete(
        &self,
        accounts: &AccountService,
        transaction: &Transaction,
        bank_transaction_id: &str,
        bank_response: &str,
    ) -> Result<(), AccountError>;

    async fn fail(
        &self,
        accounts: &AccountService,
        transaction: &Transaction,
        error_code: &str,
        error_message: &str,
    ) -> Result<(), AccountError>;
}

pub struct DepositStrategy;
pub struct WithdrawalStrategy;

#[async_trait]
impl TransactionStrategy for DepositStrategy {
    fn type_name(&self) -> &'static str {
        "deposit"
    }

    async fn call_bank(&self, bank: &dyn BankClient, account_id: Uuid, amount: Decimal) -> BankResponse {
        bank.process_deposit(account_id, amount).await
    }

    async fn complete(
        &self,
        accounts: &AccountService,
        transaction: &Transaction,
        bank_transaction_id: &str,
        bank_response: &str,
    ) -> Result<(), AccountError> {
        accounts.complete_deposit(transaction, bank_transaction_id, bank_response).await
    }

    async fn fail(
        &self,
        accounts: &AccountService,
        transaction: &Transaction,
        error_code: &str,
        error_message: &str,
    ) -> Result<(), AccountError> {
        accounts.fail_transaction(transaction.id, error_code, error_message).await
    }
}

#[async_trait]
impl TransactionStrategy for WithdrawalStrategy {
    fn type_name(&self) -> &'static str {
        "withdrawal"
    }

    async fn call_bank(&self, bank: &dyn BankClient, account_id: Uuid, amount: Decimal) -> BankResponse {
        bank.process_withdrawal(account_id, amount).await
    }

    async fn complete(
        &self,
        accounts: &AccountService,
        transaction: &Transaction,
        bank_transaction_id: &str,
        bank_response: &str,
    ) -> Result<(), AccountError> {
        accounts.complete_withdrawal(transaction, bank_transaction_id, bank_response).await
    }

    async fn fail(
        &self,
        accounts: &AccountService,
        transaction: &Transaction,
        error_code: &str,
        error_message: &str,
    ) -> Result<(), AccountError> {
        accounts.fail_transaction(transaction.id, error_code, error_message).await
    }
}

pub fn strategy_for(transaction_type: TransactionType) -> &'static dyn TransactionStrategy {
    match transaction_type {
        TransactionType::Deposit => &DepositStrategy,
        TransactionType::Withdrawal => &WithdrawalStrategy,
    }
}
