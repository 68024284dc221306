use axum::extract::{Path, State};
use axum::Json;
use bigdecimal::BigDecimal;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use uuid::Uuid;

use shared::{CommissionBasis, PerformanceTier};

use crate::auth::Admin;
use crate::error::ApiError;
use crate::models::{CommissionRule, NewCommissionRule};
use crate::schema::commission_rules;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateCommissionRuleRequest {
    pub name: String,
    pub basis: String,
    pub value: BigDecimal,
    pub performance_tier: Option<String>,
    pub provider_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCommissionRuleRequest {
    pub value: Option<BigDecimal>,
    pub active: Option<bool>,
}

pub async fn list(
    State(state): State<AppState>,
    _admin: Admin,
) -> Result<Json<Vec<CommissionRule>>, ApiError> {
    let mut conn = state.conn().await?;
    let rules = commission_rules::table
        .order(commission_rules::created_at.desc())
        .load::<CommissionRule>(&mut conn)
        .await?;
    Ok(Json(rules))
}

pub async fn create(
    State(state): State<AppState>,
    _admin: Admin,
    Json(request): Json<CreateCommissionRuleRequest>,
) -> Result<Json<CommissionRule>, ApiError> {
    let basis = CommissionBasis::parse(&request.basis).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "unknown basis {:?}, expected percentage or fixed",
            request.basis
        ))
    })?;
    if request.value <= BigDecimal::from(0) {
        return Err(ApiError::BadRequest(
            "commission value must be positive".to_string(),
        ));
    }
    if basis == CommissionBasis::Percentage && request.value > BigDecimal::from(100) {
        return Err(ApiError::BadRequest(
            "commission percentage cannot exceed 100".to_string(),
        ));
    }
    let performance_tier = match request.performance_tier.as_deref() {
        Some(raw) => Some(
            PerformanceTier::parse(raw)
                .ok_or_else(|| ApiError::BadRequest(format!("unknown tier {:?}", raw)))?
                .as_str()
                .to_string(),
        ),
        None => None,
    };
    if performance_tier.is_some() && request.provider_id.is_some() {
        return Err(ApiError::BadRequest(
            "a rule can be scoped to a tier or a provider, not both".to_string(),
        ));
    }

    let new_rule = NewCommissionRule {
        id: Uuid::new_v4(),
        name: request.name,
        basis: basis.as_str().to_string(),
        value: request.value,
        performance_tier,
        provider_id: request.provider_id,
        active: true,
    };

    let mut conn = state.conn().await?;
    diesel::insert_into(commission_rules::table)
        .values(&new_rule)
        .execute(&mut conn)
        .await?;

    let rule = commission_rules::table
        .filter(commission_rules::id.eq(new_rule.id))
        .first::<CommissionRule>(&mut conn)
        .await?;
    Ok(Json(rule))
}

pub async fn update(
    State(state): State<AppState>,
    _admin: Admin,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateCommissionRuleRequest>,
) -> Result<Json<CommissionRule>, ApiError> {
    let mut conn = state.conn().await?;

    let existing = commission_rules::table
        .filter(commission_rules::id.eq(id))
        .first::<CommissionRule>(&mut conn)
        .await
        .optional()?
        .ok_or_else(|| ApiError::NotFound("commission rule not found".to_string()))?;

    let value = request.value.unwrap_or(existing.value);
    if value <= BigDecimal::from(0) {
        return Err(ApiError::BadRequest(
            "commission value must be positive".to_string(),
        ));
    }

    diesel::update(commission_rules::table.filter(commission_rules::id.eq(id)))
        .set((
            commission_rules::value.eq(value),
            commission_rules::active.eq(request.active.unwrap_or(existing.active)),
        ))
        .execute(&mut conn)
        .await?;

    let rule = commission_rules::table
        .filter(commission_rules::id.eq(id))
        .first::<CommissionRule>(&mut conn)
        .await?;
    Ok(Json(rule))
}

pub async fn deactivate(
    State(state): State<AppState>,
    _admin: Admin,
    Path(id): Path<Uuid>,
) -> Result<Json<CommissionRule>, ApiError> {
    let mut conn = state.conn().await?;

    let updated = diesel::update(commission_rules::table.filter(commission_rules::id.eq(id)))
        .set(commission_rules::active.eq(false))
        .execute(&mut conn)
        .await?;
    if updated == 0 {
        return Err(ApiError::NotFound("commission rule not found".to_string()));
    }

    let rule = commission_rules::table
        .filter(commission_rules::id.eq(id))
        .first::<CommissionRule>(&mut conn)
        .await?;
    Ok(Json(rule))
}
