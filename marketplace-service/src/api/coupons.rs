use axum::extract::{Path, State};
use axum::Json;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared::{normalize_code, validate_coupon, DiscountType};

use crate::api::bookings::coupon_context;
use crate::auth::{Admin, Customer};
use crate::error::ApiError;
use crate::models::{Coupon, NewCoupon};
use crate::schema::coupons;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateCouponRequest {
    pub code: String,
    pub discount_type: String,
    pub value: BigDecimal,
    pub min_booking_amount: Option<BigDecimal>,
    pub usage_limit: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub first_booking_only: bool,
    pub assigned_user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCouponRequest {
    pub value: Option<BigDecimal>,
    pub min_booking_amount: Option<BigDecimal>,
    pub usage_limit: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct PreviewCouponRequest {
    pub code: String,
    pub subtotal: BigDecimal,
}

#[derive(Debug, Serialize)]
pub struct PreviewCouponResponse {
    pub code: String,
    pub discount: BigDecimal,
    pub payable: BigDecimal,
}

pub async fn list(
    State(state): State<AppState>,
    _admin: Admin,
) -> Result<Json<Vec<Coupon>>, ApiError> {
    let mut conn = state.conn().await?;
    let items = coupons::table
        .order(coupons::created_at.desc())
        .load::<Coupon>(&mut conn)
        .await?;
    Ok(Json(items))
}

pub async fn create(
    State(state): State<AppState>,
    _admin: Admin,
    Json(request): Json<CreateCouponRequest>,
) -> Result<Json<Coupon>, ApiError> {
    let discount_type = DiscountType::parse(&request.discount_type).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "unknown discount type {:?}, expected flat or percentage",
            request.discount_type
        ))
    })?;
    if request.value <= BigDecimal::from(0) {
        return Err(ApiError::BadRequest(
            "discount value must be positive".to_string(),
        ));
    }
    if discount_type == DiscountType::Percentage && request.value > BigDecimal::from(100) {
        return Err(ApiError::BadRequest(
            "percentage discount cannot exceed 100".to_string(),
        ));
    }

    let new_coupon = NewCoupon {
        id: Uuid::new_v4(),
        code: normalize_code(&request.code),
        discount_type: discount_type.as_str().to_string(),
        value: request.value,
        min_booking_amount: request.min_booking_amount,
        usage_limit: request.usage_limit,
        expires_at: request.expires_at,
        first_booking_only: request.first_booking_only,
        assigned_user_id: request.assigned_user_id,
        active: true,
    };

    let mut conn = state.conn().await?;
    diesel::insert_into(coupons::table)
        .values(&new_coupon)
        .execute(&mut conn)
        .await
        .map_err(|e| match e {
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            ) => ApiError::Conflict("coupon code already exists".to_string()),
            other => other.into(),
        })?;

    let coupon = coupons::table
        .filter(coupons::id.eq(new_coupon.id))
        .first::<Coupon>(&mut conn)
        .await?;
    Ok(Json(coupon))
}

pub async fn update(
    State(state): State<AppState>,
    _admin: Admin,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateCouponRequest>,
) -> Result<Json<Coupon>, ApiError> {
    let mut conn = state.conn().await?;

    let existing = coupons::table
        .filter(coupons::id.eq(id))
        .first::<Coupon>(&mut conn)
        .await
        .optional()?
        .ok_or_else(|| ApiError::NotFound("coupon not found".to_string()))?;

    diesel::update(coupons::table.filter(coupons::id.eq(id)))
        .set((
            coupons::value.eq(request.value.unwrap_or(existing.value)),
            coupons::min_booking_amount
                .eq(request.min_booking_amount.or(existing.min_booking_amount)),
            coupons::usage_limit.eq(request.usage_limit.or(existing.usage_limit)),
            coupons::expires_at.eq(request.expires_at.or(existing.expires_at)),
            coupons::active.eq(request.active.unwrap_or(existing.active)),
        ))
        .execute(&mut conn)
        .await?;

    let coupon = coupons::table
        .filter(coupons::id.eq(id))
        .first::<Coupon>(&mut conn)
        .await?;
    Ok(Json(coupon))
}

pub async fn deactivate(
    State(state): State<AppState>,
    _admin: Admin,
    Path(id): Path<Uuid>,
) -> Result<Json<Coupon>, ApiError> {
    let mut conn = state.conn().await?;

    let updated = diesel::update(coupons::table.filter(coupons::id.eq(id)))
        .set(coupons::active.eq(false))
        .execute(&mut conn)
        .await?;
    if updated == 0 {
        return Err(ApiError::NotFound("coupon not found".to_string()));
    }

    let coupon = coupons::table
        .filter(coupons::id.eq(id))
        .first::<Coupon>(&mut conn)
        .await?;
    Ok(Json(coupon))
}

/// Validate a code for the calling customer without reserving a use.
pub async fn preview(
    State(state): State<AppState>,
    Customer(auth): Customer,
    Json(request): Json<PreviewCouponRequest>,
) -> Result<Json<PreviewCouponResponse>, ApiError> {
    let mut conn = state.conn().await?;

    let coupon = coupons::table
        .filter(coupons::code.eq(normalize_code(&request.code)))
        .first::<Coupon>(&mut conn)
        .await
        .optional()?
        .ok_or_else(|| ApiError::NotFound("coupon not found".to_string()))?;

    let discount_type = DiscountType::parse(&coupon.discount_type).ok_or_else(|| {
        ApiError::Internal(anyhow::anyhow!(
            "coupon {} has unknown discount type",
            coupon.id
        ))
    })?;
    let spec = shared::CouponSpec {
        id: coupon.id,
        code: coupon.code.clone(),
        discount_type,
        value: coupon.value.clone(),
        min_booking_amount: coupon.min_booking_amount.clone(),
        usage_limit: coupon.usage_limit,
        expires_at: coupon.expires_at,
        first_booking_only: coupon.first_booking_only,
        assigned_user_id: coupon.assigned_user_id,
        active: coupon.active,
    };
    let ctx = coupon_context(&mut conn, coupon.id, auth.id, request.subtotal.clone()).await?;
    let discount =
        validate_coupon(&spec, &ctx).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    Ok(Json(PreviewCouponResponse {
        code: coupon.code,
        payable: &request.subtotal - &discount,
        discount,
    }))
}
