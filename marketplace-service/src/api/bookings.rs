use axum::extract::{Path, State};
use axum::Json;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared::{
    next_invoice_number, normalize_code, resolve_commission, validate_coupon, BookingCancelledEvent,
    BookingCompletedEvent, BookingStatus, CommissionBasis, CommissionRuleSpec, CouponContext,
    CouponSpec, DiscountType, EarningStatus, PaymentStatus, PerformanceTier, Role,
    EVENT_BOOKING_CANCELLED, EVENT_BOOKING_COMPLETED,
};

use crate::auth::{AuthUser, Customer, ProviderUser};
use crate::error::ApiError;
use crate::models::{
    Booking, BookingItem, CommissionRule, Coupon, Invoice, NewBooking, NewBookingItem,
    NewCouponRedemption, NewInvoice, NewOutboxEvent, NewProviderEarning, Provider, Service, User,
};
use crate::schema::{
    booking_items, bookings, commission_rules, coupon_redemptions, coupons, invoices,
    outbox_events, provider_earnings, providers, services, test_attempts, users,
};
use crate::state::{AppState, DbConn};

#[derive(Debug, Deserialize)]
pub struct BookingItemRequest {
    pub service_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub items: Vec<BookingItemRequest>,
    pub scheduled_for: DateTime<Utc>,
    pub address: String,
    pub coupon_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BookingDetail {
    pub booking: Booking,
    pub items: Vec<BookingItem>,
}

#[derive(Debug, Serialize)]
pub struct CompleteBookingResponse {
    pub booking: Booking,
    pub invoice: Invoice,
}

async fn load_booking(conn: &mut DbConn<'_>, id: Uuid) -> Result<Booking, ApiError> {
    bookings::table
        .filter(bookings::id.eq(id))
        .first::<Booking>(conn)
        .await
        .optional()?
        .ok_or_else(|| ApiError::NotFound("booking not found".to_string()))
}

async fn load_items(conn: &mut DbConn<'_>, booking_id: Uuid) -> Result<Vec<BookingItem>, ApiError> {
    Ok(booking_items::table
        .filter(booking_items::booking_id.eq(booking_id))
        .load::<BookingItem>(conn)
        .await?)
}

async fn provider_for_user(conn: &mut DbConn<'_>, user_id: Uuid) -> Result<Provider, ApiError> {
    providers::table
        .filter(providers::user_id.eq(user_id))
        .first::<Provider>(conn)
        .await
        .optional()?
        .ok_or_else(|| ApiError::NotFound("provider profile not found".to_string()))
}

fn coupon_to_spec(coupon: &Coupon) -> Result<CouponSpec, ApiError> {
    let discount_type = DiscountType::parse(&coupon.discount_type).ok_or_else(|| {
        ApiError::Internal(anyhow::anyhow!(
            "coupon {} has unknown discount type {:?}",
            coupon.id,
            coupon.discount_type
        ))
    })?;
    Ok(CouponSpec {
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
    })
}

/// Build the validation context for a coupon from current usage records.
pub async fn coupon_context(
    conn: &mut DbConn<'_>,
    coupon_id: Uuid,
    user_id: Uuid,
    subtotal: BigDecimal,
) -> Result<CouponContext, ApiError> {
    let times_used_total = coupon_redemptions::table
        .filter(coupon_redemptions::coupon_id.eq(coupon_id))
        .count()
        .get_result::<i64>(conn)
        .await?;
    let used_by_user = coupon_redemptions::table
        .filter(coupon_redemptions::coupon_id.eq(coupon_id))
        .filter(coupon_redemptions::user_id.eq(user_id))
        .count()
        .get_result::<i64>(conn)
        .await?
        > 0;
    let user_prior_bookings = bookings::table
        .filter(bookings::customer_id.eq(user_id))
        .filter(bookings::status.ne(BookingStatus::Cancelled.as_str()))
        .count()
        .get_result::<i64>(conn)
        .await?;

    Ok(CouponContext {
        user_id,
        subtotal,
        now: Utc::now(),
        times_used_total,
        used_by_user,
        user_prior_bookings,
    })
}

pub async fn create(
    State(state): State<AppState>,
    Customer(auth): Customer,
    Json(request): Json<CreateBookingRequest>,
) -> Result<Json<BookingDetail>, ApiError> {
    if request.items.is_empty() {
        return Err(ApiError::BadRequest("booking has no items".to_string()));
    }
    if request.items.iter().any(|item| item.quantity < 1) {
        return Err(ApiError::BadRequest(
            "item quantity must be at least 1".to_string(),
        ));
    }

    let mut conn = state.conn().await?;

    let service_ids: Vec<Uuid> = request.items.iter().map(|i| i.service_id).collect();
    let catalog = services::table
        .filter(services::id.eq_any(service_ids.clone()))
        .filter(services::active.eq(true))
        .load::<Service>(&mut conn)
        .await?;
    let mut subtotal = BigDecimal::from(0);
    let mut new_items = Vec::with_capacity(request.items.len());
    let booking_id = Uuid::new_v4();
    for item in &request.items {
        let service = catalog
            .iter()
            .find(|s| s.id == item.service_id)
            .ok_or_else(|| {
                ApiError::BadRequest("booking references unknown or inactive services".to_string())
            })?;
        subtotal += &service.base_price * BigDecimal::from(item.quantity);
        new_items.push(NewBookingItem {
            id: Uuid::new_v4(),
            booking_id,
            service_id: service.id,
            quantity: item.quantity,
            unit_price: service.base_price.clone(),
            discount: BigDecimal::from(0),
        });
    }

    let (coupon_id, discount_amount) = match &request.coupon_code {
        Some(code) => {
            let coupon = coupons::table
                .filter(coupons::code.eq(normalize_code(code)))
                .first::<Coupon>(&mut conn)
                .await
                .optional()?
                .ok_or_else(|| ApiError::NotFound("coupon not found".to_string()))?;
            let spec = coupon_to_spec(&coupon)?;
            let ctx = coupon_context(&mut conn, coupon.id, auth.id, subtotal.clone()).await?;
            let discount = validate_coupon(&spec, &ctx)
                .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            (Some(coupon.id), discount)
        }
        None => (None, BigDecimal::from(0)),
    };

    let total_amount = &subtotal - &discount_amount;
    let new_booking = NewBooking {
        id: booking_id,
        customer_id: auth.id,
        scheduled_for: request.scheduled_for,
        address: request.address,
        status: BookingStatus::Pending.as_str().to_string(),
        payment_status: PaymentStatus::Unpaid.as_str().to_string(),
        coupon_id,
        subtotal,
        discount_amount,
        total_amount,
    };

    let customer_id = auth.id;
    conn.transaction::<_, anyhow::Error, _>(|conn| {
        Box::pin(async move {
            diesel::insert_into(bookings::table)
                .values(&new_booking)
                .execute(conn)
                .await?;
            diesel::insert_into(booking_items::table)
                .values(&new_items)
                .execute(conn)
                .await?;
            if let Some(coupon_id) = coupon_id {
                diesel::insert_into(coupon_redemptions::table)
                    .values(&NewCouponRedemption {
                        id: Uuid::new_v4(),
                        coupon_id,
                        user_id: customer_id,
                        booking_id,
                    })
                    .execute(conn)
                    .await?;
            }
            Ok(())
        })
    })
    .await
    .map_err(map_redemption_conflict)?;

    let booking = load_booking(&mut conn, booking_id).await?;
    let items = load_items(&mut conn, booking_id).await?;
    Ok(Json(BookingDetail { booking, items }))
}

/// Recover an `ApiError` raised inside a transaction closure; anything else
/// is an internal error.
fn unwrap_api_error(e: anyhow::Error) -> ApiError {
    match e.downcast::<ApiError>() {
        Ok(api) => api,
        Err(other) => ApiError::Internal(other),
    }
}

/// The unique (coupon_id, user_id) index is what actually enforces single
/// use per user when two bookings race past validation.
fn map_redemption_conflict(e: anyhow::Error) -> ApiError {
    if let Some(diesel::result::Error::DatabaseError(
        diesel::result::DatabaseErrorKind::UniqueViolation,
        _,
    )) = e.downcast_ref::<diesel::result::Error>()
    {
        return ApiError::Conflict("coupon already used by this user".to_string());
    }
    ApiError::Internal(e)
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<Booking>>, ApiError> {
    let mut conn = state.conn().await?;

    let items = match auth.role {
        Role::Customer => {
            bookings::table
                .filter(bookings::customer_id.eq(auth.id))
                .order(bookings::created_at.desc())
                .load::<Booking>(&mut conn)
                .await?
        }
        Role::Provider => {
            let provider = provider_for_user(&mut conn, auth.id).await?;
            // Assigned bookings plus the open pool of pending ones.
            bookings::table
                .filter(
                    bookings::provider_id
                        .eq(provider.id)
                        .or(bookings::provider_id
                            .is_null()
                            .and(bookings::status.eq(BookingStatus::Pending.as_str()))),
                )
                .order(bookings::created_at.desc())
                .load::<Booking>(&mut conn)
                .await?
        }
        Role::Admin => {
            bookings::table
                .order(bookings::created_at.desc())
                .load::<Booking>(&mut conn)
                .await?
        }
    };
    Ok(Json(items))
}

pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingDetail>, ApiError> {
    let mut conn = state.conn().await?;
    let booking = load_booking(&mut conn, id).await?;

    let allowed = match auth.role {
        Role::Admin => true,
        Role::Customer => booking.customer_id == auth.id,
        Role::Provider => {
            let provider = provider_for_user(&mut conn, auth.id).await?;
            booking.provider_id == Some(provider.id)
                || (booking.provider_id.is_none()
                    && booking.status == BookingStatus::Pending.as_str())
        }
    };
    if !allowed {
        return Err(ApiError::Forbidden(
            "not a participant of this booking".to_string(),
        ));
    }

    let items = load_items(&mut conn, id).await?;
    Ok(Json(BookingDetail { booking, items }))
}

pub async fn accept(
    State(state): State<AppState>,
    ProviderUser(auth): ProviderUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, ApiError> {
    let mut conn = state.conn().await?;

    let provider = provider_for_user(&mut conn, auth.id).await?;
    if !provider.approved {
        return Err(ApiError::Forbidden(
            "provider is not approved yet".to_string(),
        ));
    }

    let booking = load_booking(&mut conn, id).await?;
    let status = BookingStatus::parse(&booking.status)
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("bad status {:?}", booking.status)))?;
    if !status.can_transition(BookingStatus::Accepted) {
        return Err(ApiError::BadRequest(format!(
            "booking cannot be accepted from status {:?}",
            booking.status
        )));
    }
    if booking.provider_id.is_some() {
        return Err(ApiError::Conflict(
            "booking is already assigned to a provider".to_string(),
        ));
    }

    // Qualification gate: a passed test attempt in every category on the booking.
    let items = load_items(&mut conn, id).await?;
    let service_ids: Vec<Uuid> = items.iter().map(|i| i.service_id).collect();
    let mut categories: Vec<String> = services::table
        .filter(services::id.eq_any(service_ids))
        .select(services::category)
        .load::<String>(&mut conn)
        .await?;
    categories.sort();
    categories.dedup();

    let passed: Vec<String> = test_attempts::table
        .filter(test_attempts::provider_id.eq(provider.id))
        .filter(test_attempts::passed.eq(true))
        .select(test_attempts::category)
        .distinct()
        .load::<String>(&mut conn)
        .await?;
    if let Some(missing) = categories.iter().find(|c| !passed.contains(c)) {
        return Err(ApiError::Forbidden(format!(
            "qualification test not passed for category {:?}",
            missing
        )));
    }

    let updated = diesel::update(
        bookings::table
            .filter(bookings::id.eq(id))
            .filter(bookings::status.eq(BookingStatus::Pending.as_str()))
            .filter(bookings::provider_id.is_null()),
    )
    .set((
        bookings::status.eq(BookingStatus::Accepted.as_str()),
        bookings::provider_id.eq(Some(provider.id)),
        bookings::updated_at.eq(Some(Utc::now())),
    ))
    .execute(&mut conn)
    .await?;
    if updated == 0 {
        // Another provider got there first.
        return Err(ApiError::Conflict(
            "booking is no longer available".to_string(),
        ));
    }

    let booking = load_booking(&mut conn, id).await?;
    Ok(Json(booking))
}

pub async fn complete(
    State(state): State<AppState>,
    ProviderUser(auth): ProviderUser,
    Path(id): Path<Uuid>,
) -> Result<Json<CompleteBookingResponse>, ApiError> {
    let mut conn = state.conn().await?;

    let provider = provider_for_user(&mut conn, auth.id).await?;
    let booking = load_booking(&mut conn, id).await?;

    if booking.provider_id != Some(provider.id) {
        return Err(ApiError::Forbidden(
            "booking belongs to another provider".to_string(),
        ));
    }
    let status = BookingStatus::parse(&booking.status)
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("bad status {:?}", booking.status)))?;
    if !status.can_transition(BookingStatus::Completed) {
        return Err(ApiError::BadRequest(format!(
            "booking cannot be completed from status {:?}",
            booking.status
        )));
    }

    // Invoice, status flip, stat updates, earning, and the completion event
    // land in one transaction; the email goes out later via the outbox.
    let booking_txn = booking.clone();
    let provider_txn = provider.clone();
    let invoice = conn
        .transaction::<Invoice, anyhow::Error, _>(|conn| {
            Box::pin(async move {
                // The guarded flip is the double-completion lock: a second
                // transaction racing past the handler check finds 0 rows here.
                let flipped = diesel::update(
                    bookings::table
                        .filter(bookings::id.eq(booking_txn.id))
                        .filter(bookings::status.eq(BookingStatus::Accepted.as_str())),
                )
                .set((
                    bookings::status.eq(BookingStatus::Completed.as_str()),
                    bookings::updated_at.eq(Some(Utc::now())),
                ))
                .execute(conn)
                .await?;
                if flipped == 0 {
                    return Err(ApiError::BadRequest(
                        "booking cannot be completed from its current status".to_string(),
                    )
                    .into());
                }

                let rules = commission_rules::table
                    .filter(commission_rules::active.eq(true))
                    .load::<CommissionRule>(conn)
                    .await?;
                let specs: Vec<CommissionRuleSpec> = rules
                    .iter()
                    .filter_map(|rule| {
                        Some(CommissionRuleSpec {
                            id: rule.id,
                            basis: CommissionBasis::parse(&rule.basis)?,
                            value: rule.value.clone(),
                            provider_id: rule.provider_id,
                            performance_tier: rule
                                .performance_tier
                                .as_deref()
                                .and_then(PerformanceTier::parse),
                        })
                    })
                    .collect();
                let tier = PerformanceTier::parse(&provider_txn.performance_tier)
                    .unwrap_or(PerformanceTier::Standard);
                let resolved = resolve_commission(&specs, provider_txn.id, tier);
                let commission_amount = resolved.amount(&booking_txn.total_amount);
                let net_amount = &booking_txn.total_amount - &commission_amount;

                let latest = invoices::table
                    .order(invoices::issued_at.desc())
                    .select(invoices::invoice_number)
                    .first::<String>(conn)
                    .await
                    .optional()?;
                let invoice_number =
                    next_invoice_number(Utc::now().date_naive(), latest.as_deref());

                let new_invoice = NewInvoice {
                    id: Uuid::new_v4(),
                    invoice_number: invoice_number.clone(),
                    booking_id: booking_txn.id,
                    provider_id: provider_txn.id,
                    total_amount: booking_txn.total_amount.clone(),
                    commission_basis: resolved.basis.as_str().to_string(),
                    commission_value: resolved.value.clone(),
                    commission_amount: commission_amount.clone(),
                    net_amount: net_amount.clone(),
                    payment_status: booking_txn.payment_status.clone(),
                };
                diesel::insert_into(invoices::table)
                    .values(&new_invoice)
                    .execute(conn)
                    .await?;

                diesel::update(bookings::table.filter(bookings::id.eq(booking_txn.id)))
                    .set(bookings::invoice_id.eq(Some(new_invoice.id)))
                    .execute(conn)
                    .await?;

                diesel::update(providers::table.filter(providers::id.eq(provider_txn.id)))
                    .set((
                        providers::completed_bookings.eq(providers::completed_bookings + 1),
                        providers::total_earnings
                            .eq(providers::total_earnings + net_amount.clone()),
                        providers::updated_at.eq(Some(Utc::now())),
                    ))
                    .execute(conn)
                    .await?;

                diesel::update(users::table.filter(users::id.eq(booking_txn.customer_id)))
                    .set((
                        users::total_bookings.eq(users::total_bookings + 1),
                        users::total_spent
                            .eq(users::total_spent + booking_txn.total_amount.clone()),
                        users::updated_at.eq(Some(Utc::now())),
                    ))
                    .execute(conn)
                    .await?;

                diesel::insert_into(provider_earnings::table)
                    .values(&NewProviderEarning {
                        id: Uuid::new_v4(),
                        provider_id: provider_txn.id,
                        booking_id: booking_txn.id,
                        invoice_id: new_invoice.id,
                        amount: net_amount.clone(),
                        status: EarningStatus::Earned.as_str().to_string(),
                    })
                    .execute(conn)
                    .await?;

                let customer = users::table
                    .filter(users::id.eq(booking_txn.customer_id))
                    .first::<User>(conn)
                    .await?;
                let event = BookingCompletedEvent {
                    booking_id: booking_txn.id,
                    customer_id: customer.id,
                    provider_id: provider_txn.id,
                    invoice_id: new_invoice.id,
                    invoice_number,
                    total_amount: booking_txn.total_amount.clone(),
                    commission_amount,
                    net_amount,
                    customer_email: customer.email,
                    customer_name: customer.name,
                };
                diesel::insert_into(outbox_events::table)
                    .values(&NewOutboxEvent {
                        id: Uuid::new_v4(),
                        aggregate_id: booking_txn.id,
                        event_type: EVENT_BOOKING_COMPLETED.to_string(),
                        event_data: serde_json::to_value(&event)?,
                    })
                    .execute(conn)
                    .await?;

                let invoice = invoices::table
                    .filter(invoices::id.eq(new_invoice.id))
                    .first::<Invoice>(conn)
                    .await?;
                Ok(invoice)
            })
        })
        .await
        .map_err(unwrap_api_error)?;

    let booking = load_booking(&mut conn, id).await?;
    Ok(Json(CompleteBookingResponse { booking, invoice }))
}

pub async fn cancel(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, ApiError> {
    let mut conn = state.conn().await?;
    let booking = load_booking(&mut conn, id).await?;

    let cancelled_by = match auth.role {
        Role::Admin => "admin",
        Role::Customer if booking.customer_id == auth.id => "customer",
        _ => {
            return Err(ApiError::Forbidden(
                "only the customer or an admin can cancel a booking".to_string(),
            ))
        }
    };

    let status = BookingStatus::parse(&booking.status)
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("bad status {:?}", booking.status)))?;
    if !status.can_transition(BookingStatus::Cancelled) {
        return Err(ApiError::BadRequest(format!(
            "booking cannot be cancelled from status {:?}",
            booking.status
        )));
    }

    let booking_txn = booking.clone();
    let cancelled_by = cancelled_by.to_string();
    conn.transaction::<_, anyhow::Error, _>(|conn| {
        Box::pin(async move {
            diesel::update(bookings::table.filter(bookings::id.eq(booking_txn.id)))
                .set((
                    bookings::status.eq(BookingStatus::Cancelled.as_str()),
                    bookings::updated_at.eq(Some(Utc::now())),
                ))
                .execute(conn)
                .await?;

            // A cancelled booking releases its coupon redemption.
            if booking_txn.coupon_id.is_some() {
                diesel::delete(
                    coupon_redemptions::table
                        .filter(coupon_redemptions::booking_id.eq(booking_txn.id)),
                )
                .execute(conn)
                .await?;
            }

            let customer = users::table
                .filter(users::id.eq(booking_txn.customer_id))
                .first::<User>(conn)
                .await?;
            let event = BookingCancelledEvent {
                booking_id: booking_txn.id,
                customer_id: customer.id,
                customer_email: customer.email,
                cancelled_by,
            };
            diesel::insert_into(outbox_events::table)
                .values(&NewOutboxEvent {
                    id: Uuid::new_v4(),
                    aggregate_id: booking_txn.id,
                    event_type: EVENT_BOOKING_CANCELLED.to_string(),
                    event_data: serde_json::to_value(&event)?,
                })
                .execute(conn)
                .await?;
            Ok(())
        })
    })
    .await?;

    let booking = load_booking(&mut conn, id).await?;
    Ok(Json(booking))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_survive_the_transaction_boundary() {
        let inner = ApiError::BadRequest(
            "booking cannot be completed from its current status".to_string(),
        );
        let mapped = unwrap_api_error(anyhow::Error::from(inner));
        assert!(matches!(mapped, ApiError::BadRequest(_)));

        let mapped = unwrap_api_error(anyhow::anyhow!("connection reset"));
        assert!(matches!(mapped, ApiError::Internal(_)));
    }

    #[test]
    fn unique_violation_maps_to_conflict() {
        let db_err = diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            Box::new("duplicate key".to_string()),
        );
        let mapped = map_redemption_conflict(anyhow::Error::from(db_err));
        assert!(matches!(mapped, ApiError::Conflict(_)));

        let mapped = map_redemption_conflict(anyhow::anyhow!("connection reset"));
        assert!(matches!(mapped, ApiError::Internal(_)));
    }
}
