use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::money::round_money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Flat,
    Percentage,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Flat => "flat",
            DiscountType::Percentage => "percentage",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "flat" => Some(DiscountType::Flat),
            "percentage" => Some(DiscountType::Percentage),
            _ => None,
        }
    }
}

/// Canonical form of a coupon code. Codes are stored and looked up in this
/// form, so client input casing never affects matching.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// A coupon as loaded from storage, reduced to the fields validation needs.
#[derive(Debug, Clone)]
pub struct CouponSpec {
    pub id: Uuid,
    pub code: String,
    pub discount_type: DiscountType,
    pub value: BigDecimal,
    pub min_booking_amount: Option<BigDecimal>,
    pub usage_limit: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
    pub first_booking_only: bool,
    pub assigned_user_id: Option<Uuid>,
    pub active: bool,
}

/// Everything about the requesting user the validation rules look at.
#[derive(Debug, Clone)]
pub struct CouponContext {
    pub user_id: Uuid,
    pub subtotal: BigDecimal,
    pub now: DateTime<Utc>,
    pub times_used_total: i64,
    pub used_by_user: bool,
    pub user_prior_bookings: i64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CouponError {
    #[error("coupon is not active")]
    Inactive,
    #[error("coupon has expired")]
    Expired,
    #[error("booking amount is below the coupon minimum")]
    MinimumNotMet,
    #[error("coupon usage limit reached")]
    UsageLimitReached,
    #[error("coupon already used by this user")]
    AlreadyUsed,
    #[error("coupon is valid for first bookings only")]
    FirstBookingOnly,
    #[error("coupon is assigned to a different user")]
    NotAssignedToUser,
}

/// Validate a coupon against the requesting user and subtotal, returning the
/// discount to apply. The discount never exceeds the subtotal, so the total
/// payable is clamped at zero.
pub fn validate_coupon(
    coupon: &CouponSpec,
    ctx: &CouponContext,
) -> Result<BigDecimal, CouponError> {
    if !coupon.active {
        return Err(CouponError::Inactive);
    }
    if let Some(expires_at) = coupon.expires_at {
        if ctx.now > expires_at {
            return Err(CouponError::Expired);
        }
    }
    if let Some(assigned) = coupon.assigned_user_id {
        if assigned != ctx.user_id {
            return Err(CouponError::NotAssignedToUser);
        }
    }
    if coupon.first_booking_only && ctx.user_prior_bookings > 0 {
        return Err(CouponError::FirstBookingOnly);
    }
    if let Some(min) = &coupon.min_booking_amount {
        if &ctx.subtotal < min {
            return Err(CouponError::MinimumNotMet);
        }
    }
    if let Some(limit) = coupon.usage_limit {
        if ctx.times_used_total >= i64::from(limit) {
            return Err(CouponError::UsageLimitReached);
        }
    }
    if ctx.used_by_user {
        return Err(CouponError::AlreadyUsed);
    }

    let discount = match coupon.discount_type {
        DiscountType::Flat => coupon.value.clone(),
        DiscountType::Percentage => &ctx.subtotal * &coupon.value / BigDecimal::from(100),
    };
    let discount = if discount > ctx.subtotal {
        ctx.subtotal.clone()
    } else {
        discount
    };
    Ok(round_money(discount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::str::FromStr;

    fn coupon() -> CouponSpec {
        CouponSpec {
            id: Uuid::new_v4(),
            code: "WELCOME50".to_string(),
            discount_type: DiscountType::Flat,
            value: BigDecimal::from(50),
            min_booking_amount: None,
            usage_limit: None,
            expires_at: None,
            first_booking_only: false,
            assigned_user_id: None,
            active: true,
        }
    }

    fn ctx(subtotal: i32) -> CouponContext {
        CouponContext {
            user_id: Uuid::new_v4(),
            subtotal: BigDecimal::from(subtotal),
            now: Utc::now(),
            times_used_total: 0,
            used_by_user: false,
            user_prior_bookings: 0,
        }
    }

    #[test]
    fn flat_discount_applies() {
        let discount = validate_coupon(&coupon(), &ctx(200)).unwrap();
        assert_eq!(discount, BigDecimal::from_str("50.00").unwrap());
    }

    #[test]
    fn percentage_discount_applies() {
        let mut c = coupon();
        c.discount_type = DiscountType::Percentage;
        c.value = BigDecimal::from(25);
        let discount = validate_coupon(&c, &ctx(200)).unwrap();
        assert_eq!(discount, BigDecimal::from_str("50.00").unwrap());
    }

    #[test]
    fn flat_discount_clamped_at_subtotal() {
        let discount = validate_coupon(&coupon(), &ctx(30)).unwrap();
        assert_eq!(discount, BigDecimal::from_str("30.00").unwrap());
    }

    #[test]
    fn expired_coupon_rejected() {
        let mut c = coupon();
        c.expires_at = Some(Utc::now() - Duration::days(1));
        assert_eq!(validate_coupon(&c, &ctx(200)), Err(CouponError::Expired));
    }

    #[test]
    fn minimum_booking_amount_enforced() {
        let mut c = coupon();
        c.min_booking_amount = Some(BigDecimal::from(500));
        assert_eq!(
            validate_coupon(&c, &ctx(200)),
            Err(CouponError::MinimumNotMet)
        );
        assert!(validate_coupon(&c, &ctx(500)).is_ok());
    }

    #[test]
    fn single_use_per_user() {
        let c = coupon();
        let mut context = ctx(200);
        context.used_by_user = true;
        assert_eq!(
            validate_coupon(&c, &context),
            Err(CouponError::AlreadyUsed)
        );
    }

    #[test]
    fn global_usage_limit_enforced() {
        let mut c = coupon();
        c.usage_limit = Some(1);
        let mut context = ctx(200);
        context.times_used_total = 1;
        assert_eq!(
            validate_coupon(&c, &context),
            Err(CouponError::UsageLimitReached)
        );
    }

    #[test]
    fn first_booking_only_rejects_repeat_customers() {
        let mut c = coupon();
        c.first_booking_only = true;
        let mut context = ctx(200);
        context.user_prior_bookings = 3;
        assert_eq!(
            validate_coupon(&c, &context),
            Err(CouponError::FirstBookingOnly)
        );
        context.user_prior_bookings = 0;
        assert!(validate_coupon(&c, &context).is_ok());
    }

    #[test]
    fn assigned_coupon_checks_user() {
        let mut c = coupon();
        let owner = Uuid::new_v4();
        c.assigned_user_id = Some(owner);
        let mut context = ctx(200);
        assert_eq!(
            validate_coupon(&c, &context),
            Err(CouponError::NotAssignedToUser)
        );
        context.user_id = owner;
        assert!(validate_coupon(&c, &context).is_ok());
    }

    #[test]
    fn code_normalization_is_case_insensitive() {
        assert_eq!(normalize_code("save10"), "SAVE10");
        assert_eq!(normalize_code("  Welcome50 "), "WELCOME50");
        assert_eq!(normalize_code("SAVE10"), "SAVE10");
    }

    #[test]
    fn inactive_coupon_rejected() {
        let mut c = coupon();
        c.active = false;
        assert_eq!(validate_coupon(&c, &ctx(200)), Err(CouponError::Inactive));
    }
}
