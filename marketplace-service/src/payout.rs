use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use bigdecimal::BigDecimal;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};
use tokio::time;
use tracing::{error, info};
use uuid::Uuid;

use shared::{
    EarningStatus, PayoutProcessedEvent, TransactionStatus, EVENT_PAYOUT_PROCESSED,
};

use crate::models::{NewOutboxEvent, NewTransaction, ProviderEarning};
use crate::schema::{outbox_events, provider_earnings, transactions};
use crate::state::DbPool;

pub const TRANSACTION_KIND_PAYOUT: &str = "payout";

#[derive(Debug, Clone, serde::Serialize)]
pub struct PayoutSummary {
    pub providers_paid: usize,
    pub total_amount: BigDecimal,
}

/// Periodic payout batch. Settles accumulated provider earnings on a fixed
/// interval, one provider at a time; the admin payout endpoint shares
/// `run_payout_cycle`.
pub struct PayoutProcessor {
    pool: DbPool,
    interval_secs: u64,
    currency: String,
}

impl PayoutProcessor {
    pub fn new(pool: DbPool, interval_secs: u64, currency: String) -> Self {
        Self {
            pool,
            interval_secs,
            currency,
        }
    }

    pub async fn run(&self) {
        let mut interval = time::interval(Duration::from_secs(self.interval_secs));

        loop {
            interval.tick().await;

            match run_payout_cycle(&self.pool, &self.currency).await {
                Ok(summary) => {
                    if summary.providers_paid > 0 {
                        info!(
                            "Payout cycle settled {} for {} providers",
                            summary.total_amount, summary.providers_paid
                        );
                    }
                }
                Err(e) => error!("Error running payout cycle: {}", e),
            }
        }
    }
}

pub async fn run_payout_cycle(pool: &DbPool, currency: &str) -> Result<PayoutSummary> {
    let mut conn = pool.get().await?;

    let earned = provider_earnings::table
        .filter(provider_earnings::status.eq(EarningStatus::Earned.as_str()))
        .order(provider_earnings::created_at.asc())
        .load::<ProviderEarning>(&mut conn)
        .await?;

    let by_provider = group_by_provider(earned);

    let mut summary = PayoutSummary {
        providers_paid: 0,
        total_amount: BigDecimal::from(0),
    };

    for (provider_id, earnings) in by_provider {
        let earning_ids: Vec<Uuid> = earnings.iter().map(|e| e.id).collect();
        let payout_currency = currency.to_string();

        // The status filter on the settle makes concurrent cycles safe: the
        // loser settles nothing and pays nothing. The payout amount comes
        // from the rows actually settled here, not the earlier read.
        let paid = conn
            .transaction::<Option<BigDecimal>, anyhow::Error, _>(|conn| {
                Box::pin(async move {
                    let settled: Vec<ProviderEarning> = diesel::update(
                        provider_earnings::table
                            .filter(provider_earnings::id.eq_any(earning_ids))
                            .filter(
                                provider_earnings::status.eq(EarningStatus::Earned.as_str()),
                            ),
                    )
                    .set((
                        provider_earnings::status.eq(EarningStatus::Settled.as_str()),
                        provider_earnings::settled_at.eq(Some(Utc::now())),
                    ))
                    .get_results::<ProviderEarning>(conn)
                    .await?;
                    if settled.is_empty() {
                        return Ok(None);
                    }
                    let amount: BigDecimal = settled.iter().map(|e| e.amount.clone()).sum();

                    let transaction_id = Uuid::new_v4();
                    let payout = NewTransaction {
                        id: transaction_id,
                        kind: TRANSACTION_KIND_PAYOUT.to_string(),
                        booking_id: None,
                        provider_id: Some(provider_id),
                        gateway_order_id: None,
                        gateway_payment_id: None,
                        amount: amount.clone(),
                        currency: payout_currency,
                        status: TransactionStatus::Captured.as_str().to_string(),
                    };
                    diesel::insert_into(transactions::table)
                        .values(&payout)
                        .execute(conn)
                        .await?;

                    let event = PayoutProcessedEvent {
                        provider_id,
                        transaction_id,
                        amount: amount.clone(),
                        earnings_settled: settled.len(),
                    };
                    let outbox_event = NewOutboxEvent {
                        id: Uuid::new_v4(),
                        aggregate_id: provider_id,
                        event_type: EVENT_PAYOUT_PROCESSED.to_string(),
                        event_data: serde_json::to_value(&event)?,
                    };
                    diesel::insert_into(outbox_events::table)
                        .values(&outbox_event)
                        .execute(conn)
                        .await?;

                    Ok(Some(amount))
                })
            })
            .await?;

        if let Some(amount) = paid {
            summary.providers_paid += 1;
            summary.total_amount += amount;
        }
    }

    Ok(summary)
}

fn group_by_provider(earned: Vec<ProviderEarning>) -> HashMap<Uuid, Vec<ProviderEarning>> {
    let mut by_provider: HashMap<Uuid, Vec<ProviderEarning>> = HashMap::new();
    for earning in earned {
        by_provider.entry(earning.provider_id).or_default().push(earning);
    }
    by_provider
}

#[cfg(test)]
mod tests {
    use super::*;

    fn earning(provider_id: Uuid, amount: i32) -> ProviderEarning {
        ProviderEarning {
            id: Uuid::new_v4(),
            provider_id,
            booking_id: Uuid::new_v4(),
            invoice_id: Uuid::new_v4(),
            amount: BigDecimal::from(amount),
            status: EarningStatus::Earned.as_str().to_string(),
            created_at: None,
            settled_at: None,
        }
    }

    #[test]
    fn earnings_are_batched_per_provider() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let grouped = group_by_provider(vec![
            earning(a, 100),
            earning(b, 40),
            earning(a, 60),
        ]);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[&a].len(), 2);
        let total_a: BigDecimal = grouped[&a].iter().map(|e| e.amount.clone()).sum();
        assert_eq!(total_a, BigDecimal::from(160));
        assert_eq!(grouped[&b].len(), 1);
    }

    #[test]
    fn no_earnings_means_no_batches() {
        assert!(group_by_provider(Vec::new()).is_empty());
    }
}
