use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::payments::{capture_writes, TRANSACTION_KIND_PAYMENT};
use crate::error::ApiError;
use crate::gateway::verify_webhook_signature;
use crate::models::{ProcessedWebhook, Transaction};
use crate::schema::{processed_webhooks, transactions};
use crate::state::AppState;

pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
}

#[derive(Debug, Deserialize)]
pub struct WebhookBody {
    pub event_id: String,
    pub event: String,
    pub payload: WebhookPayload,
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub received: bool,
}

/// Gateway webhook endpoint. Verifies the HMAC over the raw body before
/// parsing, and uses the processed_webhooks ledger so redelivered events
/// are acknowledged without being applied twice.
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("missing webhook signature".to_string()))?;

    if !verify_webhook_signature(&state.config.gateway_webhook_secret, &body, signature) {
        return Err(ApiError::Unauthorized(
            "webhook signature verification failed".to_string(),
        ));
    }

    let webhook: WebhookBody = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("malformed webhook body: {e}")))?;

    let mut conn = state.conn().await?;

    if webhook.event != "payment.captured" {
        warn!("Ignoring unhandled webhook event {:?}", webhook.event);
        return Ok(Json(WebhookResponse { received: true }));
    }

    let transaction = transactions::table
        .filter(transactions::gateway_order_id.eq(&webhook.payload.gateway_order_id))
        .filter(transactions::kind.eq(TRANSACTION_KIND_PAYMENT))
        .first::<Transaction>(&mut conn)
        .await
        .optional()?
        .ok_or_else(|| ApiError::NotFound("transaction not found".to_string()))?;

    let event_id = webhook.event_id.clone();
    let payment_id = webhook.payload.gateway_payment_id.clone();
    let already_processed = conn
        .transaction::<bool, anyhow::Error, _>(|conn| {
            Box::pin(async move {
                let inserted = diesel::insert_into(processed_webhooks::table)
                    .values(&ProcessedWebhook {
                        event_key: event_id,
                        received_at: Some(chrono::Utc::now()),
                    })
                    .on_conflict_do_nothing()
                    .execute(conn)
                    .await?;
                if inserted == 0 {
                    return Ok(true);
                }
                capture_writes(conn, &transaction, &payment_id).await?;
                Ok(false)
            })
        })
        .await?;

    if already_processed {
        info!("Webhook event {} already processed", webhook.event_id);
    } else {
        info!(
            "Processed payment webhook for order {}",
            webhook.payload.gateway_order_id
        );
    }

    Ok(Json(WebhookResponse { received: true }))
}
