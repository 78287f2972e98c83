//! Drives one queued transaction job through the bank call to a terminal
//! state, handling retries, the PENDING_REVIEW fallback, and DLQ
//! hand-off on retry exhaustion.

use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use gateway_accounts::AccountService;
use gateway_bank::{BankClient, BankResponseStatus};
use gateway_cache::lock::jittered_backoff;
use gateway_common::domain::{Job, QueueName};
use gateway_db::{AccountRepository, TransactionRepository, UserRepository};
use gateway_queue::{DeadLetterService, PgJobQueue};
use gateway_webhook::WebhookDeliveryService;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::strategy::strategy_for;

const RETRY_BACKOFF_BASE: Duration = Duration::from_secs(1);
const RETRY_BACKOFF_CAP: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionJobPayload {
    pub transaction_id: Uuid,
    pub account_id: Uuid,
    pub user_id: Uuid,
}

pub struct TransactionProcessor {
    transactions: Arc<dyn TransactionRepository>,
    accounts_repo: Arc<dyn AccountRepository>,
    users: Arc<dyn UserRepository>,
    accounts: AccountService,
    deposit_bank: Arc<dyn BankClient>,
    withdrawal_bank: Arc<dyn BankClient>,
    queue: PgJobQueue,
    dlq: DeadLetterService,
    webhooks: WebhookDeliveryService,
    webhook_max_attempts: i32,
    max_retries: i32,
}

impl TransactionProcessor {
    /// `deposit_bank`/`withdrawal_bank` are two distinct
    /// `CircuitBreakingBankClient` instances — one breaker per direction,
    /// so a run of failures on withdrawals doesn't trip deposits too.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        transactions: Arc<dyn TransactionRepository>,
        accounts_repo: Arc<dyn AccountRepository>,
        users: Arc<dyn UserRepository>,
        accounts: AccountService,
        deposit_bank: Arc<dyn BankClient>,
        withdrawal_bank: Arc<dyn BankClient>,
        queue: PgJobQueue,
        dlq: DeadLetterService,
        webhooks: WebhookDeliveryService,
        webhook_max_attempts: i32,
        max_retries: i32,
    ) -> Self {
        Self {
            transactions,
            accounts_repo,
            users,
            accounts,
            deposit_bank,
            withdrawal_bank,
            queue,
            dlq,
            webhooks,
            webhook_max_attempts,
            max_retries,
        }
    }

    fn bank_for(&self, transaction_type: gateway_common::domain::TransactionType) -> &dyn BankClient {
        match transaction_type {
            gateway_common::domain::TransactionType::Deposit => self.deposit_bank.as_ref(),
            gateway_common::domain::TransactionType::Withdrawal => self.withdrawal_bank.as_ref(),
        }
    }

    /// Runs the full per-job algorithm and leaves the job row in a
    /// terminal (`DONE`) or rescheduled (`QUEUED`, future `available_at`)
    /// state — never leaves it `RUNNING` on return.
    pub async fn process(&self, job: &Job) {
        let payload: TransactionJobPayload = match serde_json::from_value(job.payload.clone()) {
            Ok(p) => p,
            Err(err) => {
                log::error!("job {} has malformed payload, sending to DLQ: {err}", job.id);
                self.send_to_dlq(job, "MalformedPayload", &err.to_string(), "0").await;
                return;
            }
        };

        match self.try_process(job, &payload).await {
            Ok(()) => {
                if let Err(err) = self.queue.complete(job.id).await {
                    log::error!("failed to mark job {} complete: {err}", job.id);
                }
            }
            Err(JobOutcome::Retry) => self.schedule_retry(job).await,
        }
    }

    async fn try_process(&self, job: &Job, payload: &TransactionJobPayload) -> Result<(), JobOutcome> {
        let Some(transaction) = self.load_transaction(payload.transaction_id).await? else {
            log::warn!("transaction {} not found, dropping job {}", payload.transaction_id, job.id);
            return Ok(());
        };

        // Duplicate delivery of an already-terminal transaction is
        // idempotent: re-entering the state machine observes a terminal
        // status and does nothing further.
        if transaction.status.is_terminal() {
            return Ok(());
        }

        if let Err(err) = self.transactions.mark_processing(transaction.id, job.id).await {
            log::error!("failed to mark transaction {} PROCESSING: {err}", transaction.id);
            return Err(JobOutcome::Retry);
        }

        let strategy = strategy_for(transaction.transaction_type);
        let bank = self.bank_for(transaction.transaction_type);
        let bank_response = strategy.call_bank(bank, payload.account_id, transaction.amount).await;

        log::info!(
            "bank response for {} {}: {:?}",
            strategy.type_name(),
            transaction.id,
            bank_response.status
        );

        match bank_response.status {
            BankResponseStatus::Success => {
                let bank_transaction_id = bank_response.transaction_id.unwrap_or_default();
                let bank_message = bank_response.message.unwrap_or_default();
                if let Err(err) = strategy.complete(&self.accounts, &transaction, &bank_transaction_id, &bank_message).await {
                    log::error!("failed to complete {} {}: {err}", strategy.type_name(), transaction.id);
                    return Err(JobOutcome::Retry);
                }
                self.emit_webhook(payload.transaction_id, payload.user_id).await;
                Ok(())
            }
            BankResponseStatus::Timeout | BankResponseStatus::Unavailable => {
                log::warn!("{} {} hit a transient bank error: {:?}", strategy.type_name(), transaction.id, bank_response.error_code);
                Err(JobOutcome::Retry)
            }
            BankResponseStatus::Failed | BankResponseStatus::InsufficientFunds => {
                let error_code = bank_response.error_code.unwrap_or_else(|| "BANK_ERROR".to_string());
                let error_message = bank_response.message.unwrap_or_else(|| "Bank processing failed".to_string());
                if let Err(err) = strategy.fail(&self.accounts, &transaction, &error_code, &error_message).await {
                    log::error!("failed to mark {} {} FAILED: {err}", strategy.type_name(), transaction.id);
                    return Err(JobOutcome::Retry);
                }
                self.emit_webhook(payload.transaction_id, payload.user_id).await;
                Ok(())
            }
        }
    }

    async fn load_transaction(
        &self,
        id: Uuid,
    ) -> Result<Option<gateway_common::domain::Transaction>, JobOutcome> {
        self.transactions.find_by_id(id).await.map_err(|err| {
            log::error!("failed to load transaction {id}: {err}");
            JobOutcome::Retry
        })
    }

    async fn schedule_retry(&self, job: &Job) {
        if job.attempts >= self.max_retries {
            log::error!("transaction job {} exhausted retries, marking for review", job.id);
            if let Ok(payload) = serde_json::from_value::<TransactionJobPayload>(job.payload.clone()) {
                if let Err(err) = self
                    .transactions
                    .mark_pending_review(payload.transaction_id, "Max retries exceeded calling the bank")
                    .await
                {
                    log::error!("failed to mark transaction {} for review: {err}", payload.transaction_id);
                }
                self.emit_webhook(payload.transaction_id, payload.user_id).await;
            }
            self.send_to_dlq(job, "BankTransientError", "max retries exceeded calling the bank", &format!("{}/{}", job.attempts, self.max_retries)).await;
            return;
        }

        let delay = jittered_backoff(RETRY_BACKOFF_BASE, job.attempts as u32, RETRY_BACKOFF_CAP);
        let chrono_delay = ChronoDuration::milliseconds(delay.as_millis() as i64);
        if let Err(err) = self.queue.retry_later(job.id, chrono_delay).await {
            log::error!("failed to reschedule job {}: {err}", job.id);
        }
    }

    async fn send_to_dlq(&self, job: &Job, exception_type: &str, exception_message: &str, retry_count: &str) {
        if let Err(err) = self.dlq.record_failure(job, exception_type, exception_message, None, retry_count).await {
            log::error!("failed to move job {} to DLQ: {err}", job.id);
        }
    }

    /// On every terminal transition, if the owning user has a webhook URL
    /// configured, queue a delivery.
    async fn emit_webhook(&self, transaction_id: Uuid, user_id: Uuid) {
        let transaction = match self.transactions.find_by_id(transaction_id).await {
            Ok(Some(t)) => t,
            Ok(None) => return,
            Err(err) => {
                log::error!("failed to reload transaction {transaction_id} for webhook emission: {err}");
                return;
            }
        };
        if !transaction.status.is_terminal() {
            return;
        }

        let user = match self.users.find_by_id(user_id).await {
            Ok(Some(u)) => u,
            Ok(None) => return,
            Err(err) => {
                log::error!("failed to load user {user_id} for webhook emission: {err}");
                return;
            }
        };
        let Some(webhook_url) = user.webhook_url else {
            return;
        };

        let account = match self.accounts_repo.find_by_id(transaction.account_id).await {
            Ok(Some(a)) => a,
            Ok(None) => return,
            Err(err) => {
                log::error!("failed to load account {} for webhook emission: {err}", transaction.account_id);
                return;
            }
        };

        if let Err(err) = self
            .webhooks
            .enqueue_for_transaction(&transaction, &account, &webhook_url, self.webhook_max_attempts)
            .await
        {
            log::error!("failed to enqueue webhook for transaction {transaction_id}: {err}");
        }
    }
}

enum JobOutcome {
    Retry,
}

pub const TRANSACTION_QUEUE: QueueName = QueueName::Transactions;
