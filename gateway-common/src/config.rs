use clap::Parser;

/// Process configuration: a `clap::Parser` struct whose fields also read
/// from the environment, so the same binary works unconfigured in dev and
/// env-driven in a container.
#[derive(Debug, Clone, Parser)]
pub struct AppConfig {
    #[arg(long, env = "APP_ENV", default_value = "development")]
    pub app_env: String,

    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    #[arg(long, env = "REDIS_URL", default_value = "redis://127.0.0.1:6379")]
    pub redis_url: String,

    #[arg(long, env = "JWT_SECRET_KEY")]
    pub jwt_secret_key: String,

    #[arg(long, env = "JWT_ACCESS_TOKEN_EXPIRE_MINUTES", default_value_t = 30)]
    pub jwt_access_token_expire_minutes: i64,

    #[arg(long, env = "BANK_WEBHOOK_SECRET")]
    pub bank_webhook_secret: String,

    #[arg(long, env = "SERVER_HOST", default_value = "0.0.0.0")]
    pub server_host: String,

    #[arg(long, env = "SERVER_PORT", default_value_t = 8000)]
    pub server_port: u16,

    #[arg(long, env = "RATE_LIMIT_ENABLED", default_value_t = true)]
    pub rate_limit_enabled: bool,

    #[arg(long, env = "RATE_LIMIT_PER_USER_BALANCE", default_value_t = 10)]
    pub rate_limit_per_user_balance: u32,

    #[arg(long, env = "RATE_LIMIT_PER_USER_TRANSACTIONS", default_value_t = 20)]
    pub rate_limit_per_user_transactions: u32,

    #[arg(long, env = "RATE_LIMIT_GLOBAL", default_value_t = 1000)]
    pub rate_limit_global: u32,

    #[arg(long, env = "IDEMPOTENCY_KEY_TTL_HOURS", default_value_t = 24)]
    pub idempotency_key_ttl_hours: u64,

    #[arg(long, env = "BANK_SIMULATOR_MIN_DELAY_MS", default_value_t = 2000)]
    pub bank_simulator_min_delay_ms: u64,

    #[arg(long, env = "BANK_SIMULATOR_MAX_DELAY_MS", default_value_t = 10000)]
    pub bank_simulator_max_delay_ms: u64,

    #[arg(long, env = "BANK_SIMULATOR_SUCCESS_RATE", default_value_t = 0.9)]
    pub bank_simulator_success_rate: f64,

    #[arg(long, env = "CIRCUIT_BREAKER_FAILURE_THRESHOLD", default_value_t = 5)]
    pub circuit_breaker_failure_threshold: u32,

    #[arg(long, env = "CIRCUIT_BREAKER_TIMEOUT_SECONDS", default_value_t = 30)]
    pub circuit_breaker_timeout_seconds: u64,

    #[arg(long, env = "CIRCUIT_BREAKER_SUCCESS_THRESHOLD", default_value_t = 2)]
    pub circuit_breaker_success_threshold: u32,

    #[arg(long, env = "WORKER_MAX_RETRIES", default_value_t = 3)]
    pub worker_max_retries: u32,

    #[arg(long, env = "WEBHOOK_MAX_ATTEMPTS", default_value_t = 5)]
    pub webhook_max_attempts: u32,

    #[arg(long, env = "CORS_ORIGINS", default_value = "*")]
    pub cors_origins: String,
}

impl AppConfig {
    pub fn is_development(&self) -> bool {
        self.app_env == "development"
    }
}
