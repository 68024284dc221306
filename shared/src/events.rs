use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const EVENT_BOOKING_COMPLETED: &str = "BookingCompleted";
pub const EVENT_BOOKING_CANCELLED: &str = "BookingCancelled";
pub const EVENT_PAYMENT_CAPTURED: &str = "PaymentCaptured";
pub const EVENT_PAYOUT_PROCESSED: &str = "PayoutProcessed";

pub const TOPIC_BOOKING_EVENTS: &str = "booking-events";
pub const TOPIC_PAYMENT_EVENTS: &str = "payment-events";
pub const TOPIC_PAYOUT_EVENTS: &str = "payout-events";
pub const TOPIC_DOMAIN_EVENTS: &str = "domain-events";

/// Kafka topic an outbox event type is routed to.
pub fn topic_for(event_type: &str) -> &'static str {
    match event_type {
        EVENT_BOOKING_COMPLETED | EVENT_BOOKING_CANCELLED => TOPIC_BOOKING_EVENTS,
        EVENT_PAYMENT_CAPTURED => TOPIC_PAYMENT_EVENTS,
        EVENT_PAYOUT_PROCESSED => TOPIC_PAYOUT_EVENTS,
        _ => TOPIC_DOMAIN_EVENTS,
    }
}

/// Wire form of an outbox event as published to Kafka. Consumers dispatch on
/// `event_type` and deserialize `data` into the matching payload struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_type: String,
    pub aggregate_id: Uuid,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingCompletedEvent {
    pub booking_id: Uuid,
    pub customer_id: Uuid,
    pub provider_id: Uuid,
    pub invoice_id: Uuid,
    pub invoice_number: String,
    pub total_amount: BigDecimal,
    pub commission_amount: BigDecimal,
    pub net_amount: BigDecimal,
    pub customer_email: String,
    pub customer_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingCancelledEvent {
    pub booking_id: Uuid,
    pub customer_id: Uuid,
    pub customer_email: String,
    pub cancelled_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentCapturedEvent {
    pub booking_id: Uuid,
    pub transaction_id: Uuid,
    pub gateway_payment_id: String,
    pub amount: BigDecimal,
    pub customer_email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutProcessedEvent {
    pub provider_id: Uuid,
    pub transaction_id: Uuid,
    pub amount: BigDecimal,
    pub earnings_settled: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_known_event_types() {
        assert_eq!(topic_for(EVENT_BOOKING_COMPLETED), TOPIC_BOOKING_EVENTS);
        assert_eq!(topic_for(EVENT_PAYMENT_CAPTURED), TOPIC_PAYMENT_EVENTS);
        assert_eq!(topic_for(EVENT_PAYOUT_PROCESSED), TOPIC_PAYOUT_EVENTS);
    }

    #[test]
    fn unknown_events_fall_back_to_domain_topic() {
        assert_eq!(topic_for("SomethingElse"), TOPIC_DOMAIN_EVENTS);
    }
}
