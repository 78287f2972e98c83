use std::sync::Arc;

use gateway_accounts::AccountService;
use gateway_cache::{CacheClient, SlidingWindowLimiter};
use gateway_common::config::AppConfig;
use gateway_db::postgres::{PgAccountRepository, PgTransactionRepository, PgUserRepository, PgWebhookRepository};
use gateway_db::{AccountRepository, TransactionRepository, UserRepository, WebhookRepository};
use gateway_idempotency::IdempotencyService;
use gateway_queue::PgJobQueue;
use gateway_webhook::WebhookDeliveryService;

/// Everything a handler needs, built once in `main` and shared through
/// `web::Data` — no global mutable singletons or module-level statics.
pub struct AppState {
    pub config: AppConfig,
    pub users: Arc<dyn UserRepository>,
    pub accounts: Arc<dyn AccountRepository>,
    pub transactions: Arc<dyn TransactionRepository>,
    pub webhooks: Arc<dyn WebhookRepository>,
    pub account_service: AccountService,
    pub queue: PgJobQueue,
    pub webhook_delivery: WebhookDeliveryService,
    pub idempotency: IdempotencyService,
    pub rate_limiter: SlidingWindowLimiter,
    pub cache: CacheClient,
}

impl AppState {
    /// Builds every handler dependency from a resolved `AppConfig`: one DB
    /// pool, one cache connection, repositories over both, and the
    /// services layered on top — mirrors `gateway-worker`'s `main` wiring
    /// minus the bank client and queue consumers, which only the worker
    /// binary needs.
    pub async fn build(config: AppConfig) -> anyhow::Result<Self> {
        let pool = gateway_db::connect(&config.database_url).await?;
        let cache = CacheClient::connect(&config.redis_url).await?;

        let users: Arc<dyn UserRepository> = Arc::new(PgUserRepository::new(pool.clone()));
        let accounts: Arc<dyn AccountRepository> = Arc::new(PgAccountRepository::new(pool.clone()));
        let transactions: Arc<dyn TransactionRepository> = Arc::new(PgTransactionRepository::new(pool.clone()));
        let webhooks: Arc<dyn WebhookRepository> = Arc::new(PgWebhookRepository::new(pool.clone()));

        let queue = PgJobQueue::new(pool.clone());
        let account_service = AccountService::new(accounts.clone(), transactions.clone(), cache.clone());
        let webhook_delivery = WebhookDeliveryService::new(webhooks.clone(), queue.clone());
        let idempotency = IdempotencyService::new(cache.clone());
        let rate_limiter = SlidingWindowLimiter::new(cache.clone());

        Ok(Self {
            config,
            users,
            accounts,
            transactions,
            webhooks,
            account_service,
            queue,
            webhook_delivery,
            idempotency,
            rate_limiter,
            cache,
        })
    }
}
