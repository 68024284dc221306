use anyhow::Result;
use futures::StreamExt;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::Message;
use tracing::{error, info, warn};

use shared::{
    BookingCancelledEvent, BookingCompletedEvent, EventEnvelope, PaymentCapturedEvent,
    EVENT_BOOKING_CANCELLED, EVENT_BOOKING_COMPLETED, EVENT_PAYMENT_CAPTURED,
};

use crate::mailer::MailerClient;

/// Consumes booking and payment events and sends the matching customer
/// emails. Email delivery is best-effort: a failed send is logged and the
/// event is still committed, never retried into the booking flow.
pub struct NotificationHandler {
    mailer: MailerClient,
}

impl NotificationHandler {
    pub fn new(mailer: MailerClient) -> Self {
        Self { mailer }
    }

    pub async fn run(&self, consumer: StreamConsumer) {
        let mut message_stream = consumer.stream();

        while let Some(message) = message_stream.next().await {
            match message {
                Ok(m) => {
                    if let Some(payload) = m.payload_view::<str>() {
                        match payload {
                            Ok(json_str) => {
                                if let Ok(envelope) =
                                    serde_json::from_str::<EventEnvelope>(json_str)
                                {
                                    if let Err(e) = self.handle_event(envelope).await {
                                        error!("Error sending notification: {}", e);
                                    }
                                }
                            }
                            Err(e) => error!("Error parsing event payload: {}", e),
                        }
                    }
                    if let Err(e) =
                        consumer.commit_message(&m, rdkafka::consumer::CommitMode::Async)
                    {
                        error!("Error committing message: {}", e);
                    }
                }
                Err(e) => error!("Error receiving message: {}", e),
            }
        }
    }

    async fn handle_event(&self, envelope: EventEnvelope) -> Result<()> {
        match envelope.event_type.as_str() {
            EVENT_BOOKING_COMPLETED => {
                let event: BookingCompletedEvent = serde_json::from_value(envelope.data)?;
                let subject = format!("Your booking is complete: invoice {}", event.invoice_number);
                let html = format!(
                    "<p>Hi {},</p><p>Your booking {} has been completed. \
                     Invoice {} for a total of {} has been issued.</p>",
                    event.customer_name, event.booking_id, event.invoice_number, event.total_amount
                );
                self.mailer
                    .send(&event.customer_email, &subject, &html)
                    .await?;
                info!("Sent completion email for booking {}", event.booking_id);
            }
            EVENT_BOOKING_CANCELLED => {
                let event: BookingCancelledEvent = serde_json::from_value(envelope.data)?;
                let html = format!(
                    "<p>Your booking {} has been cancelled by {}.</p>",
                    event.booking_id, event.cancelled_by
                );
                self.mailer
                    .send(&event.customer_email, "Booking cancelled", &html)
                    .await?;
                info!("Sent cancellation email for booking {}", event.booking_id);
            }
            EVENT_PAYMENT_CAPTURED => {
                let event: PaymentCapturedEvent = serde_json::from_value(envelope.data)?;
                let html = format!(
                    "<p>We received your payment of {} for booking {} (reference {}).</p>",
                    event.amount, event.booking_id, event.gateway_payment_id
                );
                self.mailer
                    .send(&event.customer_email, "Payment received", &html)
                    .await?;
                info!("Sent payment receipt for booking {}", event.booking_id);
            }
            other => warn!("No notification configured for event type {:?}", other),
        }

        Ok(())
    }
}
