//! Request deduplication for `POST /api/v1/deposits` and
//! `POST /api/v1/withdrawals`. Bodies are buffered in full here (small
//! JSON envelopes) so the exact response — status, headers, and text —
//! can be cached and replayed verbatim on a retried request.

use std::collections::HashMap;
use std::future::{ready, Ready};
use std::rc::Rc;

use actix_web::body::{to_bytes, BoxBody, MessageBody};
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::{StatusCode};
use actix_web::{web, Error, HttpResponse};
use futures_util::future::LocalBoxFuture;
use gateway_common::domain::headers;
use serde_json::json;

use crate::state::AppState;

const IDEMPOTENT_PATHS: &[&str] = &["/api/v1/deposits", "/api/v1/withdrawals"];

fn is_idempotent_route(method: &str, path: &str) -> bool {
    method == "POST" && IDEMPOTENT_PATHS.contains(&path)
}

pub struct IdempotencyMiddleware;

impl<S, B> Transform<S, ServiceRequest> for IdempotencyMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
    B::Error: std::fmt::Debug,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = IdempotencyService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(IdempotencyService { service: Rc::new(service) }))
    }
}

pub struct IdempotencyService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for IdempotencyService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
    B::Error: std::fmt::Debug,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        if !is_idempotent_route(req.method().as_str(), req.path()) {
            return Box::pin(async move {
                let res = service.call(req).await?;
                Ok(res.map_body(|_, body| BoxBody::new(body)))
            });
        }

        let state = req
            .app_data::<web::Data<AppState>>()
            .expect("AppState is always registered")
            .clone();

        let idempotency_key = req
            .headers()
            .get(headers::IDEMPOTENCY)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        Box::pin(async move {
            let Some(idempotency_key) = idempotency_key else {
                let body = json!({
                    "error": "Bad Request",
                    "message": format!("Missing required header: {}", headers::IDEMPOTENCY),
                    "details": "Idempotency-Key header is required for this operation",
                });
                let response = HttpResponse::BadRequest().json(body);
                return Ok(req.into_response(response));
            };

            let acquired = state.idempotency.acquire_lock(&idempotency_key).await.map_err(actix_web::error::ErrorInternalServerError)?;

            if !acquired {
                return match state.idempotency.check_existing(&idempotency_key).await.map_err(actix_web::error::ErrorInternalServerError)? {
                    Some(gateway_idempotency::ExistingRecord::Completed(cached)) => {
                        let status = StatusCode::from_u16(cached.status_code).unwrap_or(StatusCode::OK);
                        let mut builder = HttpResponse::build(status);
                        for (name, value) in &cached.headers {
                            builder.insert_header((name.as_str(), value.as_str()));
                        }
                        builder.insert_header((headers::IDEMPOTENCY, idempotency_key.as_str()));
                        let response = builder.content_type("application/json").body(cached.body);
                        Ok(req.into_response(response))
                    }
                    Some(gateway_idempotency::ExistingRecord::Processing) => {
                        let body = json!({
                            "error": "conflict",
                            "message": "A request with this idempotency key is already being processed",
                            "idempotency_key": idempotency_key,
                        });
                        let response = HttpResponse::Conflict()
                            .insert_header(("Retry-After", "5"))
                            .insert_header((headers::IDEMPOTENCY, idempotency_key.as_str()))
                            .json(body);
                        Ok(req.into_response(response))
                    }
                    None => run_and_record(service, req, state, idempotency_key).await,
                };
            }

            run_and_record(service, req, state, idempotency_key).await
        })
    }
}

async fn run_and_record<S, B>(
    service: Rc<S>,
    req: ServiceRequest,
    state: web::Data<AppState>,
    idempotency_key: String,
) -> Result<ServiceResponse<BoxBody>, Error>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody + 'static,
    B::Error: std::fmt::Debug,
{
    let result = service.call(req).await;

    let res = match result {
        Ok(res) => res,
        Err(err) => {
            if let Err(release_err) = state.idempotency.release_lock(&idempotency_key).await {
                log::warn!("failed to release idempotency lock for {idempotency_key}: {release_err}");
            }
            return Err(err);
        }
    };

    let (http_req, response) = res.into_parts();
    let status = response.status();
    let mut header_map = HashMap::new();
    for (name, value) in response.headers() {
        if let Ok(value) = value.to_str() {
            header_map.insert(name.as_str().to_string(), value.to_string());
        }
    }

    let body_bytes = to_bytes(response.into_body()).await.unwrap_or_default();
    let body_text = String::from_utf8_lossy(&body_bytes).to_string();

    if status.as_u16() < 400 {
        let resource_id = serde_json::from_str::<serde_json::Value>(&body_text)
            .ok()
            .and_then(|v| v.get("id").and_then(|id| id.as_str()).map(|s| s.to_string()));

        if let Err(err) = state
            .idempotency
            .save_response(&idempotency_key, &body_text, status.as_u16(), header_map.clone(), resource_id)
            .await
        {
            log::error!("failed to save idempotency response for {idempotency_key}: {err}");
        }
    } else if let Err(err) = state.idempotency.release_lock(&idempotency_key).await {
        log::warn!("failed to release idempotency lock for {idempotency_key}: {err}");
    }

    let mut builder = HttpResponse::build(status);
    for (name, value) in &header_map {
        builder.insert_header((name.as_str(), value.as_str()));
    }
    let rebuilt = builder.body(body_bytes);
    Ok(ServiceResponse::new(http_req, rebuilt))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_post_to_known_paths_is_idempotent() {
        assert!(is_idempotent_route("POST", "/api/v1/deposits"));
        assert!(is_idempotent_route("POST", "/api/v1/withdrawals"));
        assert!(!is_idempotent_route("GET", "/api/v1/deposits"));
        assert!(!is_idempotent_route("POST", "/api/v1/users/me"));
    }
}
