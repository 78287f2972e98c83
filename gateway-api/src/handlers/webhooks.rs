//! The inbound bank callback and the delivery-history reads. The
//! callback is the one route where the raw request bytes must survive
//! untouched until after signature verification, hence `web::Bytes`
//! instead of `web::Json`.

use actix_web::{web, HttpRequest, HttpResponse};
use gateway_common::domain::{headers, TransactionType};
use gateway_webhook::inbound::verify_callback;
use gateway_webhook::payload::BankCallbackPayload;
use uuid::Uuid;

use crate::dto::{WebhookDeliveryListResponse, WebhookDeliveryResponse, WebhookResponse};
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

pub async fn bank_callback(state: web::Data<AppState>, req: HttpRequest, body: web::Bytes) -> Result<HttpResponse, ApiError> {
    let signature = req
        .headers()
        .get(headers::WEBHOOK_SIGNATURE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("missing webhook signature".to_string()))?;

    let raw_body = std::str::from_utf8(&body).map_err(|_| ApiError::BadRequest("request body is not valid UTF-8".to_string()))?;

    let payload: BankCallbackPayload =
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(format!("invalid webhook payload: {e}")))?;

    verify_callback(state.config.bank_webhook_secret.as_bytes(), raw_body, signature, payload.timestamp).map_err(|err| {
        log::warn!("webhook_rejected transaction_id={}: {err}", payload.transaction_id);
        ApiError::from(err)
    })?;

    let transaction = state
        .transactions
        .find_by_id(payload.transaction_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Transaction {} not found", payload.transaction_id)))?;

    let bank_transaction_id = payload.bank_transaction_id.clone().unwrap_or_else(|| "UNKNOWN".to_string());
    let message = payload.message.clone().unwrap_or_default();
    let error_code = payload.error_code.clone().unwrap_or_else(|| "BANK_ERROR".to_string());
    let error_message = payload.message.clone().unwrap_or_else(|| "Bank processing failed".to_string());

    let is_success = matches!(payload.status, gateway_common::domain::BankResponseStatus::Success);

    match transaction.transaction_type {
        TransactionType::Deposit => {
            if is_success {
                state.account_service.complete_deposit(&transaction, &bank_transaction_id, &message).await?;
            } else {
                state.account_service.fail_transaction(transaction.id, &error_code, &error_message).await?;
            }
        }
        TransactionType::Withdrawal => {
            if is_success {
                state.account_service.complete_withdrawal(&transaction, &bank_transaction_id, &message).await?;
            } else {
                state.account_service.fail_transaction(transaction.id, &error_code, &error_message).await?;
            }
        }
    }

    emit_outbound_webhook(&state, transaction.id).await;

    Ok(HttpResponse::Ok().json(WebhookResponse {
        received: true,
        message: "Webhook received and processed successfully".to_string(),
    }))
}

pub async fn list_deliveries(
    state: web::Data<AppState>,
    _user: AuthUser,
    query: web::Query<DeliveryQuery>,
) -> Result<HttpResponse, ApiError> {
    let deliveries = match query.transaction_id {
        Some(transaction_id) => state.webhooks.list_for_transaction(transaction_id).await?,
        None => state.webhooks.list_all(0, 200).await?,
    };

    Ok(HttpResponse::Ok().json(WebhookDeliveryListResponse {
        total: deliveries.len(),
        deliveries: deliveries.iter().map(WebhookDeliveryResponse::from).collect(),
    }))
}

/// Mirrors `gateway-worker`'s `TransactionProcessor::emit_webhook` for the
/// inbound-callback completion path: same "load transaction, check
/// terminal, load owning user's webhook URL" sequence, so a transaction
/// completed via this path notifies the user exactly as one completed by
/// the worker would.
async fn emit_outbound_webhook(state: &AppState, transaction_id: Uuid) {
    let transaction = match state.transactions.find_by_id(transaction_id).await {
        Ok(Some(t)) => t,
        Ok(None) => return,
        Err(err) => {
            log::error!("failed to reload transaction {transaction_id} for webhook emission: {err}");
            return;
        }
    };
    if !transaction.status.is_terminal() {
        return;
    }

    let account = match state.accounts.find_by_id(transaction.account_id).await {
        Ok(Some(a)) => a,
        Ok(None) => return,
        Err(err) => {
            log::error!("failed to load account {} for webhook emission: {err}", transaction.account_id);
            return;
        }
    };

    let user = match state.users.find_by_id(account.user_id).await {
        Ok(Some(u)) => u,
        Ok(None) => return,
        Err(err) => {
            log::error!("failed to load user {} for webhook emission: {err}", account.user_id);
            return;
        }
    };
    let Some(webhook_url) = user.webhook_url else {
        return;
    };

    if let Err(err) = state
        .webhook_delivery
        .enqueue_for_transaction(&transaction, &account, &webhook_url, state.config.webhook_max_attempts as i32)
        .await
    {
        log::error!("failed to enqueue webhook for transaction {transaction_id}: {err}");
    }
}

#[derive(serde::Deserialize)]
pub struct DeliveryQuery {
    pub transaction_id: Option<Uuid>,
}

pub async fn get_delivery(state: web::Data<AppState>, _user: AuthUser, path: web::Path<Uuid>) -> Result<HttpResponse, ApiError> {
    let delivery = state
        .webhooks
        .find_by_id(path.into_inner())
        .await?
        .ok_or_else(|| ApiError::NotFound("webhook delivery not found".to_string()))?;

    Ok(HttpResponse::Ok().json(WebhookDeliveryResponse::from(&delivery)))
}
