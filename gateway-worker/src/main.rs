//! Background worker binary: polls the `transactions` and `webhooks`
//! queues and runs a periodic reaper, one `tokio::spawn`ed loop per
//! concern, each claiming at most one job at a time (`prefetch = 1`) via
//! `gateway_queue::PgJobQueue::claim_next`. Config is a `clap::Parser`
//! over env-first fields, with `env_logger` initialized at the top of
//! `main`, same as the other binaries in this workspace.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Duration as ChronoDuration;
use clap::Parser;
use gateway_accounts::AccountService;
use gateway_bank::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakingBankClient, SimulatedBank};
use gateway_cache::CacheClient;
use gateway_common::config::AppConfig;
use gateway_common::domain::QueueName;
use gateway_db::postgres::{PgAccountRepository, PgFailedTaskRepository, PgTransactionRepository, PgUserRepository, PgWebhookRepository};
use gateway_queue::{DeadLetterService, PgJobQueue};
use gateway_webhook::WebhookDeliveryService;
use uuid::Uuid;

mod processor;
mod strategy;
mod webhook_consumer;

use processor::{TransactionProcessor, TRANSACTION_QUEUE};
use webhook_consumer::WebhookConsumer;

/// A worker crashed mid-job leaves its row `RUNNING`; the reaper requeues
/// anything stuck past this long.
const STUCK_JOB_THRESHOLD: ChronoDuration = ChronoDuration::minutes(5);
const POLL_IDLE_DELAY: Duration = Duration::from_millis(500);
const REAPER_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    gateway_common::logging::init();
    let config = AppConfig::parse();
    let worker_id = format!("worker-{}", Uuid::new_v4());
    log::info!("starting gateway-worker {worker_id} (env={})", config.app_env);

    let pool = gateway_db::connect(&config.database_url).await?;
    let cache = CacheClient::connect(&config.redis_url).await?;

    let users: Arc<dyn gateway_db::UserRepository> = Arc::new(PgUserRepository::new(pool.clone()));
    let accounts_repo: Arc<dyn gateway_db::AccountRepository> = Arc::new(PgAccountRepository::new(pool.clone()));
    let transactions: Arc<dyn gateway_db::TransactionRepository> = Arc::new(PgTransactionRepository::new(pool.clone()));
    let webhooks_repo: Arc<dyn gateway_db::WebhookRepository> = Arc::new(PgWebhookRepository::new(pool.clone()));
    let failed_tasks: Arc<dyn gateway_db::FailedTaskRepository> = Arc::new(PgFailedTaskRepository::new(pool.clone()));

    let queue = PgJobQueue::new(pool.clone());
    let dlq = DeadLetterService::new(queue.clone(), failed_tasks);

    let account_service = AccountService::new(accounts_repo.clone(), transactions.clone(), cache.clone());

    let bank_simulator = Arc::new(SimulatedBank::new(
        Duration::from_millis(config.bank_simulator_min_delay_ms),
        Duration::from_millis(config.bank_simulator_max_delay_ms),
        config.bank_simulator_success_rate,
    ));
    let breaker_config = CircuitBreakerConfig {
        failure_threshold: config.circuit_breaker_failure_threshold,
        timeout: Duration::from_secs(config.circuit_breaker_timeout_seconds),
        success_threshold: config.circuit_breaker_success_threshold,
    };
    let deposit_bank = Arc::new(CircuitBreakingBankClient::new(
        SimulatedBankHandle(bank_simulator.clone()),
        CircuitBreaker::new(breaker_config),
        "deposit",
    ));
    let withdrawal_bank = Arc::new(CircuitBreakingBankClient::new(
        SimulatedBankHandle(bank_simulator),
        CircuitBreaker::new(breaker_config),
        "withdrawal",
    ));

    let webhook_delivery = WebhookDeliveryService::new(webhooks_repo, queue.clone());

    let processor = Arc::new(TransactionProcessor::new(
        transactions,
        accounts_repo,
        users,
        account_service,
        deposit_bank,
        withdrawal_bank,
        queue.clone(),
        dlq.clone(),
        webhook_delivery.clone(),
        config.webhook_max_attempts as i32,
        config.worker_max_retries as i32,
    ));

    let webhook_consumer = Arc::new(WebhookConsumer::new(webhook_delivery, queue.clone(), dlq));

    let transaction_loop = tokio::spawn(poll_loop(
        queue.clone(),
        TRANSACTION_QUEUE,
        format!("{worker_id}-tx"),
        move |job| {
            let processor = processor.clone();
            async move { processor.process(&job).await }
        },
    ));

    let webhook_loop = tokio::spawn(poll_loop(
        queue.clone(),
        QueueName::Webhooks,
        format!("{worker_id}-wh"),
        move |job| {
            let consumer = webhook_consumer.clone();
            async move { consumer.process(&job).await }
        },
    ));

    let reaper_loop = tokio::spawn(reaper_loop(queue));

    log::info!("gateway-worker {worker_id} polling transactions and webhooks queues");

    tokio::select! {
        res = transaction_loop => res?,
        res = webhook_loop => res?,
        res = reaper_loop => res?,
    }

    Ok(())
}

/// Claims and processes jobs from `queue_name` one at a time, sleeping
/// `POLL_IDLE_DELAY` whenever the queue is empty rather than busy-looping.
async fn poll_loop<F, Fut>(queue: PgJobQueue, queue_name: QueueName, worker_tag: String, handler: F)
where
    F: Fn(gateway_common::domain::Job) -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    loop {
        match queue.claim_next(queue_name, &worker_tag).await {
            Ok(Some(job)) => handler(job).await,
            Ok(None) => tokio::time::sleep(POLL_IDLE_DELAY).await,
            Err(err) => {
                log::error!("{worker_tag}: failed to claim next job on {:?}: {err}", queue_name);
                tokio::time::sleep(POLL_IDLE_DELAY).await;
            }
        }
    }
}

/// Periodic maintenance: requeues jobs stuck `RUNNING` past a crashed
/// worker's lease, then trims terminal rows past `DLQ_TTL`/`DLQ_MAX_LENGTH`.
async fn reaper_loop(queue: PgJobQueue) {
    loop {
        match queue.reap_stuck(STUCK_JOB_THRESHOLD).await {
            Ok(0) => {}
            Ok(n) => log::warn!("reaper requeued {n} stuck job(s)"),
            Err(err) => log::error!("reaper failed to reap stuck jobs: {err}"),
        }
        if let Err(err) = queue.reap_expired().await {
            log::error!("reaper failed to expire old jobs: {err}");
        }
        tokio::time::sleep(REAPER_INTERVAL).await;
    }
}

/// Adapts `Arc<SimulatedBank>` to `BankClient` by value so each direction's
/// `CircuitBreakingBankClient` owns a cheap handle to the one shared
/// simulator instance.
#[derive(Clone)]
struct SimulatedBankHandle(Arc<SimulatedBank>);

#[async_trait::async_trait]
impl gateway_bank::BankClient for SimulatedBankHandle {
    async fn process_deposit(&self, account_id: Uuid, amount: rust_decimal::Decimal) -> gateway_bank::BankResponse {
        self.0.process_deposit(account_id, amount).await
    }

    async fn process_withdrawal(&self, account_id: Uuid, amount: rust_decimal::Decimal) -> gateway_bank::BankResponse {
        self.0.process_withdrawal(account_id, amount).await
    }
}
