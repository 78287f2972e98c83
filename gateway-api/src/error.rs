use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use gateway_common::GatewayError;
use serde::Serialize;
use thiserror::Error;

/// HTTP-layer error, one variant per status code the handlers return.
/// Bodies mirror the original FastAPI app's `HTTPException(detail=...)`
/// shape (`{"detail": "..."}`) rather than inventing a new envelope —
/// idempotency/rate-limit middleware build their own distinct bodies
/// directly, since the originals don't follow this shape either.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),
}

#[derive(Serialize)]
struct DetailBody<'a> {
    detail: &'a str,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let detail = self.to_string();
        let mut builder = HttpResponse::build(self.status_code());
        if matches!(self, ApiError::Unauthorized(_)) {
            builder.insert_header(("WWW-Authenticate", "Bearer"));
        }
        builder.json(DetailBody { detail: &detail })
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::NotFound(msg) => ApiError::NotFound(msg),
            GatewayError::Conflict(msg) => ApiError::Conflict(msg),
            GatewayError::InsufficientBalance => ApiError::BadRequest("insufficient balance".into()),
            GatewayError::InvalidInput(msg) => ApiError::BadRequest(msg),
            GatewayError::Unauthorized => ApiError::Unauthorized("could not validate credentials".into()),
            GatewayError::Forbidden => ApiError::Forbidden("not authorized".into()),
            GatewayError::RateLimited { retry_after_secs } => {
                ApiError::BadRequest(format!("rate limited, retry after {retry_after_secs}s"))
            }
            GatewayError::IdempotencyKeyConflict => ApiError::Conflict("idempotency key conflict".into()),
            GatewayError::RequestInFlight => ApiError::Conflict("request already being processed".into()),
            GatewayError::LockUnavailable { resource } => {
                ApiError::Conflict(format!("could not acquire lock on {resource}, retry"))
            }
            GatewayError::BankUnavailable => ApiError::Internal("upstream bank unavailable".into()),
            GatewayError::Database(msg) => ApiError::Internal(msg),
            GatewayError::Cache(msg) => ApiError::Internal(msg),
            GatewayError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<gateway_db::DbError> for ApiError {
    fn from(err: gateway_db::DbError) -> Self {
        GatewayError::from(err).into()
    }
}

impl From<gateway_accounts::AccountError> for ApiError {
    fn from(err: gateway_accounts::AccountError) -> Self {
        GatewayError::from(err).into()
    }
}

impl From<gateway_queue::QueueError> for ApiError {
    fn from(err: gateway_queue::QueueError) -> Self {
        GatewayError::from(err).into()
    }
}

impl From<gateway_webhook::WebhookError> for ApiError {
    fn from(err: gateway_webhook::WebhookError) -> Self {
        GatewayError::from(err).into()
    }
}

impl From<gateway_cache::CacheError> for ApiError {
    fn from(err: gateway_cache::CacheError) -> Self {
        GatewayError::from(err).into()
    }
}

impl From<gateway_idempotency::IdempotencyError> for ApiError {
    fn from(err: gateway_idempotency::IdempotencyError) -> Self {
        match err {
            gateway_idempotency::IdempotencyError::Cache(e) => e.into(),
            gateway_idempotency::IdempotencyError::Malformed(msg) => ApiError::Internal(msg),
        }
    }
}
