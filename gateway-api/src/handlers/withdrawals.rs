//! Mirrors deposits, but creation itself checks balance
//! (`AccountService::create_pending_withdrawal` only checks it — no debit
//! happens at PENDING).

use actix_web::{web, HttpRequest, HttpResponse};
use gateway_common::domain::{headers, QueueName, TransactionType};
use serde_json::json;
use uuid::Uuid;

use crate::dto::{ListQuery, TransactionAcceptedResponse, TransactionCreate, TransactionResponse, MAX_LIST_LIMIT};
use crate::error::ApiError;
use crate::extractors::{AuthUser, CurrentAccount};
use crate::handlers::deposits::load_owned_transaction;
use crate::state::AppState;

const JOB_NAME: &str = gateway_queue::TRANSACTION_JOB_NAME;

pub async fn create_withdrawal(
    state: web::Data<AppState>,
    req: HttpRequest,
    account: CurrentAccount,
    user: AuthUser,
    body: web::Json<TransactionCreate>,
) -> Result<HttpResponse, ApiError> {
    let CurrentAccount(account) = account;
    let AuthUser(user) = user;
    let body = body.into_inner();
    let idempotency_key = req.headers().get(headers::IDEMPOTENCY).and_then(|v| v.to_str().ok());

    let transaction = state
        .account_service
        .create_pending_withdrawal(account.id, body.amount, &body.currency, idempotency_key)
        .await
        .map_err(|err| match err {
            gateway_accounts::AccountError::InsufficientBalance => {
                log::warn!("withdrawal_insufficient_balance user_id={} requested_amount={}", user.id, body.amount);
                ApiError::BadRequest("insufficient balance".to_string())
            }
            other => ApiError::from(other),
        })?;

    state
        .queue
        .enqueue(
            QueueName::Transactions,
            JOB_NAME,
            json!({
                "transaction_id": transaction.id,
                "account_id": account.id,
                "user_id": user.id,
            }),
            3,
        )
        .await?;

    Ok(HttpResponse::Accepted().json(TransactionAcceptedResponse {
        transaction: TransactionResponse::from(&transaction),
        message: "Withdrawal request accepted and is being processed".to_string(),
    }))
}

pub async fn get_withdrawal(
    state: web::Data<AppState>,
    account: CurrentAccount,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let transaction = load_owned_transaction(&state, &account.0, path.into_inner(), "withdrawal").await?;
    Ok(HttpResponse::Ok().json(TransactionResponse::from(&transaction)))
}

pub async fn list_withdrawals(
    state: web::Data<AppState>,
    account: CurrentAccount,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, ApiError> {
    let query = query.into_inner();
    let transactions = state
        .transactions
        .list_for_account(account.0.id, Some(TransactionType::Withdrawal), query.skip, query.limit.min(MAX_LIST_LIMIT))
        .await?;
    Ok(HttpResponse::Ok().json(transactions.iter().map(TransactionResponse::from).collect::<Vec<_>>()))
}
