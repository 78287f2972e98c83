//! Accepts a deposit request, persists it PENDING, and hands it to the
//! worker queue.

use actix_web::{web, HttpRequest, HttpResponse};
use gateway_common::domain::{headers, QueueName, TransactionType};
use serde_json::json;
use uuid::Uuid;

use crate::dto::{ListQuery, TransactionAcceptedResponse, TransactionCreate, TransactionResponse, MAX_LIST_LIMIT};
use crate::error::ApiError;
use crate::extractors::{AuthUser, CurrentAccount};
use crate::state::AppState;

const JOB_NAME: &str = gateway_queue::TRANSACTION_JOB_NAME;

pub async fn create_deposit(
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
        .create_pending_deposit(account.id, body.amount, &body.currency, idempotency_key)
        .await?;

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
        message: "Deposit request accepted and is being processed".to_string(),
    }))
}

pub async fn get_deposit(
    state: web::Data<AppState>,
    account: CurrentAccount,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let transaction = load_owned_transaction(&state, &account.0, path.into_inner(), "deposit").await?;
    Ok(HttpResponse::Ok().json(TransactionResponse::from(&transaction)))
}

pub async fn list_deposits(
    state: web::Data<AppState>,
    account: CurrentAccount,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, ApiError> {
    let query = query.into_inner();
    let transactions = state
        .transactions
        .list_for_account(account.0.id, Some(TransactionType::Deposit), query.skip, query.limit.min(MAX_LIST_LIMIT))
        .await?;
    Ok(HttpResponse::Ok().json(transactions.iter().map(TransactionResponse::from).collect::<Vec<_>>()))
}

pub(crate) async fn load_owned_transaction(
    state: &AppState,
    account: &gateway_common::domain::Account,
    transaction_id: Uuid,
    type_name: &str,
) -> Result<gateway_common::domain::Transaction, ApiError> {
    let transaction = state
        .transactions
        .find_by_id(transaction_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("{} not found", capitalize(type_name))))?;

    if transaction.account_id != account.id {
        log::warn!(
            "unauthorized_transaction_access_attempt transaction_id={} account_id={} owner_account_id={}",
            transaction_id,
            account.id,
            transaction.account_id
        );
        return Err(ApiError::Forbidden(format!("Not authorized to access this {type_name}")));
    }

    Ok(transaction)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
