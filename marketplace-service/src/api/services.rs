use axum::extract::{Path, State};
use axum::Json;
use bigdecimal::BigDecimal;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::Admin;
use crate::error::ApiError;
use crate::models::{NewService, Service};
use crate::schema::services;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateServiceRequest {
    pub name: String,
    pub description: String,
    pub category: String,
    pub base_price: BigDecimal,
}

#[derive(Debug, Deserialize)]
pub struct UpdateServiceRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub base_price: Option<BigDecimal>,
    pub active: Option<bool>,
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Service>>, ApiError> {
    let mut conn = state.conn().await?;
    let items = services::table
        .filter(services::active.eq(true))
        .order(services::name.asc())
        .load::<Service>(&mut conn)
        .await?;
    Ok(Json(items))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Service>, ApiError> {
    let mut conn = state.conn().await?;
    let service = services::table
        .filter(services::id.eq(id))
        .first::<Service>(&mut conn)
        .await
        .optional()?
        .ok_or_else(|| ApiError::NotFound("service not found".to_string()))?;
    Ok(Json(service))
}

pub async fn create(
    State(state): State<AppState>,
    _admin: Admin,
    Json(request): Json<CreateServiceRequest>,
) -> Result<Json<Service>, ApiError> {
    if request.base_price < BigDecimal::from(0) {
        return Err(ApiError::BadRequest("base price cannot be negative".to_string()));
    }

    let new_service = NewService {
        id: Uuid::new_v4(),
        name: request.name,
        description: request.description,
        category: request.category,
        base_price: request.base_price,
        active: true,
    };

    let mut conn = state.conn().await?;
    diesel::insert_into(services::table)
        .values(&new_service)
        .execute(&mut conn)
        .await?;

    let service = services::table
        .filter(services::id.eq(new_service.id))
        .first::<Service>(&mut conn)
        .await?;
    Ok(Json(service))
}

pub async fn update(
    State(state): State<AppState>,
    _admin: Admin,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateServiceRequest>,
) -> Result<Json<Service>, ApiError> {
    let mut conn = state.conn().await?;

    let existing = services::table
        .filter(services::id.eq(id))
        .first::<Service>(&mut conn)
        .await
        .optional()?
        .ok_or_else(|| ApiError::NotFound("service not found".to_string()))?;

    let base_price = request.base_price.unwrap_or(existing.base_price);
    if base_price < BigDecimal::from(0) {
        return Err(ApiError::BadRequest("base price cannot be negative".to_string()));
    }

    diesel::update(services::table.filter(services::id.eq(id)))
        .set((
            services::name.eq(request.name.unwrap_or(existing.name)),
            services::description.eq(request.description.unwrap_or(existing.description)),
            services::category.eq(request.category.unwrap_or(existing.category)),
            services::base_price.eq(base_price),
            services::active.eq(request.active.unwrap_or(existing.active)),
        ))
        .execute(&mut conn)
        .await?;

    let service = services::table
        .filter(services::id.eq(id))
        .first::<Service>(&mut conn)
        .await?;
    Ok(Json(service))
}

pub async fn deactivate(
    State(state): State<AppState>,
    _admin: Admin,
    Path(id): Path<Uuid>,
) -> Result<Json<Service>, ApiError> {
    let mut conn = state.conn().await?;

    let updated = diesel::update(services::table.filter(services::id.eq(id)))
        .set(services::active.eq(false))
        .execute(&mut conn)
        .await?;
    if updated == 0 {
        return Err(ApiError::NotFound("service not found".to_string()));
    }

    let service = services::table
        .filter(services::id.eq(id))
        .first::<Service>(&mut conn)
        .await?;
    Ok(Json(service))
}
