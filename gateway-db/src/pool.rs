use sqlx::postgres::{PgPoolOptions, PgSslMode};
use sqlx::PgPool;

pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let opts: sqlx::postgres::PgConnectOptions = database_url.parse()?;
    let opts = opts.ssl_mode(PgSslMode::Prefer);
    PgPoolOptions::new()
        .max_connections(20)
        .connect_with(opts)
        .await
}
