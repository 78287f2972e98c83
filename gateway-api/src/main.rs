//! HTTP ingress binary: auth, account/transaction reads and writes, and
//! the inbound bank webhook, fronted by the idempotency, rate-limit, and
//! request-id middleware. Config is `clap::Parser` over env-first fields,
//! logging is `env_logger`, same as the other binaries in this workspace.

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use clap::Parser;
use gateway_api::middleware::{IdempotencyMiddleware, RateLimitMiddleware, RequestIdMiddleware};
use gateway_api::state::AppState;
use gateway_common::config::AppConfig;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    gateway_common::logging::init();
    let config = AppConfig::parse();
    log::info!("starting gateway-api (env={})", config.app_env);

    let host = config.server_host.clone();
    let port = config.server_port;
    let cors_origins = config.cors_origins.clone();

    let state = web::Data::new(AppState::build(config).await?);

    log::info!("gateway-api listening on {host}:{port}");

    HttpServer::new(move || {
        // Actix applies the last-registered `wrap` outermost, so this
        // reads inside-out: Idempotency sits tightest around the handlers
        // (it must capture their exact response), RateLimit and CORS sit
        // around that, and RequestId is the outermost layer so every
        // response — including ones the inner layers short-circuit — gets
        // an `X-Request-ID`.
        App::new()
            .app_data(state.clone())
            .wrap(IdempotencyMiddleware)
            .wrap(RateLimitMiddleware)
            .wrap(build_cors(&cors_origins))
            .wrap(RequestIdMiddleware)
            .configure(gateway_api::configure)
    })
    .bind((host, port))?
    .run()
    .await?;

    Ok(())
}

/// `*` (the default) permits any origin; anything else is parsed as a
/// comma-separated allowlist.
fn build_cors(origins: &str) -> Cors {
    if origins.trim() == "*" {
        return Cors::permissive();
    }
    origins
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .fold(Cors::default().allowed_methods(vec!["GET", "POST"]), |cors, origin| {
            cors.allowed_origin(origin)
        })
}
