use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Serialize;
use uuid::Uuid;

use crate::api::auth::UserResponse;
use crate::auth::Admin;
use crate::error::ApiError;
use crate::models::{Provider, ProviderEarning, Transaction, User};
use crate::payout::{run_payout_cycle, PayoutSummary};
use crate::schema::{provider_earnings, providers, transactions, users};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ProviderView {
    pub provider: Provider,
    pub user: UserResponse,
}

pub async fn list_providers(
    State(state): State<AppState>,
    _admin: Admin,
) -> Result<Json<Vec<ProviderView>>, ApiError> {
    let mut conn = state.conn().await?;

    let rows = providers::table
        .inner_join(users::table.on(users::id.eq(providers::user_id)))
        .order(providers::created_at.desc())
        .load::<(Provider, User)>(&mut conn)
        .await?;

    Ok(Json(
        rows.into_iter()
            .map(|(provider, user)| ProviderView {
                provider,
                user: user.into(),
            })
            .collect(),
    ))
}

pub async fn approve_provider(
    State(state): State<AppState>,
    _admin: Admin,
    Path(id): Path<Uuid>,
) -> Result<Json<Provider>, ApiError> {
    let mut conn = state.conn().await?;

    let updated = diesel::update(providers::table.filter(providers::id.eq(id)))
        .set((
            providers::approved.eq(true),
            providers::updated_at.eq(Some(Utc::now())),
        ))
        .execute(&mut conn)
        .await?;
    if updated == 0 {
        return Err(ApiError::NotFound("provider not found".to_string()));
    }

    let provider = providers::table
        .filter(providers::id.eq(id))
        .first::<Provider>(&mut conn)
        .await?;
    Ok(Json(provider))
}

pub async fn list_users(
    State(state): State<AppState>,
    _admin: Admin,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let mut conn = state.conn().await?;
    let rows = users::table
        .order(users::created_at.desc())
        .load::<User>(&mut conn)
        .await?;
    Ok(Json(rows.into_iter().map(UserResponse::from).collect()))
}

pub async fn list_transactions(
    State(state): State<AppState>,
    _admin: Admin,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    let mut conn = state.conn().await?;
    let rows = transactions::table
        .order(transactions::created_at.desc())
        .load::<Transaction>(&mut conn)
        .await?;
    Ok(Json(rows))
}

pub async fn list_earnings(
    State(state): State<AppState>,
    _admin: Admin,
) -> Result<Json<Vec<ProviderEarning>>, ApiError> {
    let mut conn = state.conn().await?;
    let rows = provider_earnings::table
        .order(provider_earnings::created_at.desc())
        .load::<ProviderEarning>(&mut conn)
        .await?;
    Ok(Json(rows))
}

/// Manual trigger for the payout batch, sharing the scheduled job's code path.
pub async fn run_payouts(
    State(state): State<AppState>,
    _admin: Admin,
) -> Result<Json<PayoutSummary>, ApiError> {
    let summary = run_payout_cycle(&state.pool, &state.config.currency)
        .await
        .map_err(ApiError::Internal)?;
    Ok(Json(summary))
}
