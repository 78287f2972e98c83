//! Auth guard extractors: missing or invalid bearer token is 401, an
//! inactive user is 403, a user with no account is 404.

use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use gateway_common::domain::{Account, User};
use uuid::Uuid;

use crate::auth::decode_access_token;
use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated caller, resolved from `Authorization: Bearer <jwt>`.
pub struct AuthUser(pub User);

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = std::pin::Pin<Box<dyn std::future::Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            let state = req
                .app_data::<web::Data<AppState>>()
                .expect("AppState is always registered")
                .clone();

            let token = bearer_token(&req).ok_or_else(|| {
                ApiError::Unauthorized("could not validate credentials".into())
            })?;

            let claims = decode_access_token(&token, &state.config.jwt_secret_key)
                .ok_or_else(|| ApiError::Unauthorized("could not validate credentials".into()))?;

            let user_id: Uuid = claims
                .sub
                .parse()
                .map_err(|_| ApiError::Unauthorized("could not validate credentials".into()))?;

            let user = state
                .users
                .find_by_id(user_id)
                .await
                .map_err(ApiError::from)?
                .ok_or_else(|| ApiError::Unauthorized("could not validate credentials".into()))?;

            if !user.is_active {
                return Err(ApiError::Forbidden("inactive user".into()).into());
            }

            Ok(AuthUser(user))
        })
    }
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    let header = req.headers().get(actix_web::http::header::AUTHORIZATION)?;
    let value = header.to_str().ok()?;
    value.strip_prefix("Bearer ").map(|s| s.to_string())
}

/// The caller's single account, loaded after `AuthUser`. Requires the
/// caller to already be authenticated in the same handler's signature.
pub struct CurrentAccount(pub Account);

impl FromRequest for CurrentAccount {
    type Error = actix_web::Error;
    type Future = std::pin::Pin<Box<dyn std::future::Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        let user_fut = AuthUser::from_request(&req, payload);
        Box::pin(async move {
            let AuthUser(user) = user_fut.await?;
            let state = req
                .app_data::<web::Data<AppState>>()
                .expect("AppState is always registered")
                .clone();
            let account = state
                .accounts
                .find_by_user_id(user.id)
                .await
                .map_err(ApiError::from)?
                .ok_or_else(|| ApiError::NotFound("account not found".into()))?;
            Ok(CurrentAccount(account))
        })
    }
}
