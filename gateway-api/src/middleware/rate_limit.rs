//! Sliding-window rate limiting for a small set of hot, cheap-to-abuse
//! reads. Deposit/withdrawal endpoints are deliberately excluded —
//! idempotency already bounds their repeat cost.

use std::future::{ready, Ready};
use std::rc::Rc;

use actix_web::body::{EitherBody, MessageBody};
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::{web, Error, HttpResponse};
use futures_util::future::LocalBoxFuture;
use gateway_common::domain::headers;
use serde_json::json;

use crate::auth::decode_access_token;
use crate::state::AppState;

struct RateLimitRule {
    method: &'static str,
    /// Path prefix this rule applies to. Matching is prefix-based — not
    /// substring containment — so `/api/v1/users/me/balance-export`
    /// never collides with the `/api/v1/users/me/balance` rule.
    path_prefix: &'static str,
    window_seconds: i64,
    limit: fn(&gateway_common::config::AppConfig) -> u32,
}

const RULES: &[RateLimitRule] = &[
    RateLimitRule {
        method: "GET",
        path_prefix: "/api/v1/users/me/balance",
        window_seconds: 60,
        limit: |c| c.rate_limit_per_user_balance,
    },
    RateLimitRule {
        method: "GET",
        path_prefix: "/api/v1/users/me/transactions",
        window_seconds: 60,
        limit: |c| c.rate_limit_per_user_transactions,
    },
];

fn matching_rule(method: &str, path: &str) -> Option<&'static RateLimitRule> {
    RULES
        .iter()
        .find(|rule| rule.method == method && (path == rule.path_prefix || path.starts_with(rule.path_prefix)))
}

fn subject_for(req: &ServiceRequest, state: &AppState) -> String {
    if let Some(header) = req.headers().get(actix_web::http::header::AUTHORIZATION) {
        if let Some(token) = header.to_str().ok().and_then(|v| v.strip_prefix("Bearer ")) {
            if let Some(claims) = decode_access_token(token, &state.config.jwt_secret_key) {
                return format!("user:{}", claims.sub);
            }
        }
    }
    let ip = req
        .connection_info()
        .realip_remote_addr()
        .unwrap_or("unknown")
        .to_string();
    format!("ip:{ip}")
}

pub struct RateLimitMiddleware;

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimitService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitService { service: Rc::new(service) }))
    }
}

pub struct RateLimitService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RateLimitService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        let state = req.app_data::<web::Data<AppState>>().cloned();
        let Some(state) = state else {
            return Box::pin(async move { Ok(service.call(req).await?.map_into_left_body()) });
        };
        if !state.config.rate_limit_enabled {
            return Box::pin(async move { Ok(service.call(req).await?.map_into_left_body()) });
        }

        let Some(rule) = matching_rule(req.method().as_str(), req.path()) else {
            return Box::pin(async move { Ok(service.call(req).await?.map_into_left_body()) });
        };

        let subject = subject_for(&req, &state);
        let limit = (rule.limit)(&state.config);
        let window = rule.window_seconds;
        let pattern = rule.path_prefix;

        Box::pin(async move {
            let outcome = state.rate_limiter.check(&subject, pattern, limit, window).await;

            let outcome = match outcome {
                Ok(outcome) => outcome,
                Err(err) => {
                    log::error!("rate limiter backend error, failing open: {err}");
                    return Ok(service.call(req).await?.map_into_left_body());
                }
            };

            if !outcome.allowed {
                let body = json!({
                    "error": "rate_limit_exceeded",
                    "message": format!("Rate limit exceeded: {limit} requests per {window} seconds"),
                    "retry_after": window,
                    "limit": outcome.limit,
                    "window_seconds": window,
                });
                let mut response = HttpResponse::TooManyRequests().json(body);
                stamp_headers(response.headers_mut(), &outcome);
                return Ok(req.into_response(response).map_into_right_body());
            }

            let mut res = service.call(req).await?;
            stamp_headers(res.headers_mut(), &outcome);
            Ok(res.map_into_left_body())
        })
    }
}

fn stamp_headers(header_map: &mut actix_web::http::header::HeaderMap, outcome: &gateway_cache::RateLimitOutcome) {
    let entries: [(&str, String); 3] = [
        (headers::RATE_LIMIT_LIMIT, outcome.limit.to_string()),
        (headers::RATE_LIMIT_REMAINING, outcome.remaining.to_string()),
        (headers::RATE_LIMIT_RESET, outcome.reset_at.to_string()),
    ];
    for (name, value) in entries {
        if let (Ok(name), Ok(value)) = (HeaderName::try_from(name), HeaderValue::from_str(&value)) {
            header_map.insert(name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_balance_path_matches() {
        let rule = matching_rule("GET", "/api/v1/users/me/balance").unwrap();
        assert_eq!(rule.path_prefix, "/api/v1/users/me/balance");
    }

    #[test]
    fn unrelated_suffix_still_prefix_matches() {
        assert!(matching_rule("GET", "/api/v1/users/me/balance/history").is_some());
    }

    #[test]
    fn deposits_path_has_no_rule() {
        assert!(matching_rule("POST", "/api/v1/deposits").is_none());
    }

    #[test]
    fn wrong_method_does_not_match() {
        assert!(matching_rule("POST", "/api/v1/users/me/balance").is_none());
    }
}
