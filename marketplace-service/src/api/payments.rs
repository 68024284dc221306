use axum::extract::State;
use axum::Json;
use bigdecimal::BigDecimal;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared::{
    BookingStatus, PaymentCapturedEvent, PaymentStatus, TransactionStatus, EVENT_PAYMENT_CAPTURED,
};

use crate::auth::Customer;
use crate::error::ApiError;
use crate::gateway::verify_payment_signature;
use crate::models::{Booking, NewOutboxEvent, NewTransaction, Transaction, User};
use crate::schema::{bookings, invoices, outbox_events, transactions, users};
use crate::state::AppState;

pub const TRANSACTION_KIND_PAYMENT: &str = "payment";

#[derive(Debug, Deserialize)]
pub struct CreatePaymentOrderRequest {
    pub booking_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct CreatePaymentOrderResponse {
    pub transaction_id: Uuid,
    pub gateway_order_id: String,
    pub amount: BigDecimal,
    pub currency: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyPaymentResponse {
    pub transaction: Transaction,
}

pub async fn create_order(
    State(state): State<AppState>,
    Customer(auth): Customer,
    Json(request): Json<CreatePaymentOrderRequest>,
) -> Result<Json<CreatePaymentOrderResponse>, ApiError> {
    let mut conn = state.conn().await?;

    let booking = bookings::table
        .filter(bookings::id.eq(request.booking_id))
        .first::<Booking>(&mut conn)
        .await
        .optional()?
        .ok_or_else(|| ApiError::NotFound("booking not found".to_string()))?;
    if booking.customer_id != auth.id {
        return Err(ApiError::Forbidden(
            "booking belongs to another customer".to_string(),
        ));
    }
    if booking.status == BookingStatus::Cancelled.as_str() {
        return Err(ApiError::BadRequest(
            "cancelled bookings cannot be paid".to_string(),
        ));
    }
    if booking.payment_status != PaymentStatus::Unpaid.as_str() {
        return Err(ApiError::BadRequest(
            "booking is already paid".to_string(),
        ));
    }

    let amount_minor = (&booking.total_amount * BigDecimal::from(100))
        .to_i64()
        .ok_or_else(|| {
            ApiError::Internal(anyhow::anyhow!(
                "booking total {} not representable in minor units",
                booking.total_amount
            ))
        })?;

    let receipt = booking.id.to_string();
    let order = state
        .gateway
        .create_order(amount_minor, &state.config.currency, &receipt)
        .await
        .map_err(ApiError::Internal)?;

    let new_transaction = NewTransaction {
        id: Uuid::new_v4(),
        kind: TRANSACTION_KIND_PAYMENT.to_string(),
        booking_id: Some(booking.id),
        provider_id: None,
        gateway_order_id: Some(order.id.clone()),
        gateway_payment_id: None,
        amount: booking.total_amount.clone(),
        currency: state.config.currency.clone(),
        status: TransactionStatus::Created.as_str().to_string(),
    };
    diesel::insert_into(transactions::table)
        .values(&new_transaction)
        .execute(&mut conn)
        .await?;

    Ok(Json(CreatePaymentOrderResponse {
        transaction_id: new_transaction.id,
        gateway_order_id: order.id,
        amount: booking.total_amount,
        currency: state.config.currency.clone(),
    }))
}

/// The writes shared by the verify endpoint and the gateway webhook. The
/// caller is responsible for wrapping this in a transaction. Already
/// captured transactions are left untouched, which makes both paths safe
/// to replay.
pub async fn capture_writes(
    conn: &mut AsyncPgConnection,
    transaction: &Transaction,
    gateway_payment_id: &str,
) -> anyhow::Result<()> {
    if transaction.status == TransactionStatus::Captured.as_str() {
        return Ok(());
    }

    diesel::update(transactions::table.filter(transactions::id.eq(transaction.id)))
        .set((
            transactions::status.eq(TransactionStatus::Captured.as_str()),
            transactions::gateway_payment_id.eq(Some(gateway_payment_id.to_string())),
            transactions::updated_at.eq(Some(Utc::now())),
        ))
        .execute(conn)
        .await?;

    let booking_id = transaction
        .booking_id
        .ok_or_else(|| anyhow::anyhow!("payment transaction {} has no booking", transaction.id))?;
    let booking = bookings::table
        .filter(bookings::id.eq(booking_id))
        .first::<Booking>(conn)
        .await?;

    diesel::update(bookings::table.filter(bookings::id.eq(booking_id)))
        .set((
            bookings::payment_status.eq(PaymentStatus::Paid.as_str()),
            bookings::updated_at.eq(Some(Utc::now())),
        ))
        .execute(conn)
        .await?;

    // Payment details are the one append an invoice allows after issuance.
    if let Some(invoice_id) = booking.invoice_id {
        diesel::update(invoices::table.filter(invoices::id.eq(invoice_id)))
            .set((
                invoices::payment_status.eq(PaymentStatus::Paid.as_str()),
                invoices::payment_reference.eq(Some(gateway_payment_id.to_string())),
            ))
            .execute(conn)
            .await?;
    }

    let customer = users::table
        .filter(users::id.eq(booking.customer_id))
        .first::<User>(conn)
        .await?;
    let event = PaymentCapturedEvent {
        booking_id,
        transaction_id: transaction.id,
        gateway_payment_id: gateway_payment_id.to_string(),
        amount: transaction.amount.clone(),
        customer_email: customer.email,
    };
    diesel::insert_into(outbox_events::table)
        .values(&NewOutboxEvent {
            id: Uuid::new_v4(),
            aggregate_id: booking_id,
            event_type: EVENT_PAYMENT_CAPTURED.to_string(),
            event_data: serde_json::to_value(&event)?,
        })
        .execute(conn)
        .await?;

    Ok(())
}

fn should_mark_failed(status: &str) -> bool {
    status == TransactionStatus::Created.as_str()
}

pub async fn verify(
    State(state): State<AppState>,
    Customer(auth): Customer,
    Json(request): Json<VerifyPaymentRequest>,
) -> Result<Json<VerifyPaymentResponse>, ApiError> {
    let mut conn = state.conn().await?;

    let transaction = transactions::table
        .filter(transactions::gateway_order_id.eq(&request.gateway_order_id))
        .filter(transactions::kind.eq(TRANSACTION_KIND_PAYMENT))
        .first::<Transaction>(&mut conn)
        .await
        .optional()?
        .ok_or_else(|| ApiError::NotFound("transaction not found".to_string()))?;

    let booking_id = transaction
        .booking_id
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("payment without booking")))?;
    let booking = bookings::table
        .filter(bookings::id.eq(booking_id))
        .first::<Booking>(&mut conn)
        .await?;
    if booking.customer_id != auth.id {
        return Err(ApiError::Forbidden(
            "transaction belongs to another customer".to_string(),
        ));
    }

    let valid = verify_payment_signature(
        &state.config.gateway_key_secret,
        &request.gateway_order_id,
        &request.gateway_payment_id,
        &request.signature,
    );
    if !valid {
        // Only a still-pending transaction is marked failed; a replay with a
        // bad signature must not rewrite an already captured one.
        if should_mark_failed(&transaction.status) {
            diesel::update(transactions::table.filter(transactions::id.eq(transaction.id)))
                .set((
                    transactions::status.eq(TransactionStatus::Failed.as_str()),
                    transactions::updated_at.eq(Some(Utc::now())),
                ))
                .execute(&mut conn)
                .await?;
        }
        return Err(ApiError::BadRequest(
            "payment signature verification failed".to_string(),
        ));
    }

    let transaction_txn = transaction.clone();
    let payment_id = request.gateway_payment_id.clone();
    conn.transaction::<_, anyhow::Error, _>(|conn| {
        Box::pin(async move { capture_writes(conn, &transaction_txn, &payment_id).await })
    })
    .await?;

    let transaction = transactions::table
        .filter(transactions::id.eq(transaction.id))
        .first::<Transaction>(&mut conn)
        .await?;
    Ok(Json(VerifyPaymentResponse { transaction }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pending_transactions_are_failed_on_bad_signature() {
        assert!(should_mark_failed(TransactionStatus::Created.as_str()));
        assert!(!should_mark_failed(TransactionStatus::Captured.as_str()));
        assert!(!should_mark_failed(TransactionStatus::Failed.as_str()));
        assert!(!should_mark_failed(TransactionStatus::Refunded.as_str()));
    }
}
