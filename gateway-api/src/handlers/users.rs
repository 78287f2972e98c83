//! The three self-service reads. `/me/balance` and `/me/transactions`
//! are the two endpoints the rate-limit middleware rations.

use actix_web::{web, HttpResponse};
use chrono::Utc;

use crate::dto::{BalanceResponse, CurrentUserResponse, ListQuery, TransactionResponse, MAX_LIST_LIMIT};
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

pub async fn me(user: AuthUser) -> HttpResponse {
    let AuthUser(user) = user;
    HttpResponse::Ok().json(CurrentUserResponse {
        id: user.id,
        email: user.email,
        full_name: user.full_name,
        is_active: user.is_active,
        created_at: user.created_at,
    })
}

pub async fn balance(state: web::Data<AppState>, user: AuthUser) -> Result<HttpResponse, ApiError> {
    let AuthUser(user) = user;
    let account = state
        .accounts
        .find_by_user_id(user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("account not found for user".to_string()))?;

    Ok(HttpResponse::Ok().json(BalanceResponse {
        balance: account.balance,
        currency: account.currency,
        account_id: account.id,
        as_of: Utc::now(),
    }))
}

pub async fn transactions(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, ApiError> {
    let AuthUser(user) = user;
    let query = query.into_inner();

    let Some(account) = state.accounts.find_by_user_id(user.id).await? else {
        return Ok(HttpResponse::Ok().json(Vec::<TransactionResponse>::new()));
    };

    let items = state
        .transactions
        .list_for_account(account.id, None, query.skip, query.limit.min(MAX_LIST_LIMIT))
        .await?;

    Ok(HttpResponse::Ok().json(items.iter().map(TransactionResponse::from).collect::<Vec<_>>()))
}
