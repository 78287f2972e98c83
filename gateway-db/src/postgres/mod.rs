mod accounts;
mod failed_tasks;
mod transactions;
mod users;
mod webhooks;

pub use accounts::{apply_balance_delta, lock_account_for_update, PgAccountRepository};
pub use failed_tasks::PgFailedTaskRepository;
pub use transactions::PgTransactionRepository;
pub use users::PgUserRepository;
pub use webhooks::PgWebhookRepository;
