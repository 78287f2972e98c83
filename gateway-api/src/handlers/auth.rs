//! Registration issues a token immediately (no separate activation step)
//! and always provisions the caller's single USD account in the same
//! request.

use actix_web::{web, HttpResponse};

use crate::auth::{create_access_token, hash_password, verify_password};
use crate::dto::{TokenResponse, UserCreate, UserLogin, UserResponse};
use crate::error::ApiError;
use crate::state::AppState;

pub async fn register(state: web::Data<AppState>, body: web::Json<UserCreate>) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();

    if state.users.find_by_email(&body.email).await?.is_some() {
        return Err(ApiError::BadRequest(format!("User with email {} already exists", body.email)));
    }

    let hashed = hash_password(&body.password).map_err(|e| ApiError::Internal(e.to_string()))?;
    let user = state.users.create(&body.email, &body.full_name, &hashed).await?;

    if let Some(webhook_url) = body.webhook_url.as_deref() {
        state.users.set_webhook_url(user.id, Some(webhook_url)).await?;
    }

    state.accounts.create_for_user(user.id, "USD").await?;

    let token = create_access_token(user.id, &state.config.jwt_secret_key, state.config.jwt_access_token_expire_minutes);

    Ok(HttpResponse::Created().json(TokenResponse {
        access_token: token,
        token_type: gateway_common::domain::TOKEN_TYPE_BEARER.to_string(),
        user: UserResponse::from(&user),
    }))
}

pub async fn login(state: web::Data<AppState>, body: web::Json<UserLogin>) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();

    let user = state
        .users
        .find_by_email(&body.email)
        .await?
        .filter(|u| u.is_active)
        .filter(|u| verify_password(&body.password, &u.hashed_password));

    let Some(user) = user else {
        return Err(ApiError::Unauthorized("Incorrect email or password".into()));
    };

    let token = create_access_token(user.id, &state.config.jwt_secret_key, state.config.jwt_access_token_expire_minutes);

    Ok(HttpResponse::Ok().json(TokenResponse {
        access_token: token,
        token_type: gateway_common::domain::TOKEN_TYPE_BEARER.to_string(),
        user: UserResponse::from(&user),
    }))
}
