pub mod auth;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod state;

use actix_web::web;

/// Mounts every route under `/api/v1`. Shared here between the real
/// binary and integration tests so both exercise the exact same route
/// table.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(
                web::scope("/auth")
                    .route("/register", web::post().to(handlers::auth::register))
                    .route("/login", web::post().to(handlers::auth::login)),
            )
            .service(
                web::scope("/users/me")
                    .route("", web::get().to(handlers::users::me))
                    .route("/balance", web::get().to(handlers::users::balance))
                    .route("/transactions", web::get().to(handlers::users::transactions)),
            )
            .service(
                web::scope("/deposits")
                    .route("", web::post().to(handlers::deposits::create_deposit))
                    .route("", web::get().to(handlers::deposits::list_deposits))
                    .route("/{id}", web::get().to(handlers::deposits::get_deposit)),
            )
            .service(
                web::scope("/withdrawals")
                    .route("", web::post().to(handlers::withdrawals::create_withdrawal))
                    .route("", web::get().to(handlers::withdrawals::list_withdrawals))
                    .route("/{id}", web::get().to(handlers::withdrawals::get_withdrawal)),
            )
            .service(
                web::scope("/webhooks")
                    .route("/bank-callback", web::post().to(handlers::webhooks::bank_callback))
                    .route("/deliveries", web::get().to(handlers::webhooks::list_deliveries))
                    .route("/deliveries/{id}", web::get().to(handlers::webhooks::get_delivery)),
            ),
    )
    .route("/health", web::get().to(health));
}

async fn health() -> actix_web::HttpResponse {
    actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}
