use axum::extract::State;
use axum::Json;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use uuid::Uuid;

use shared::{BookingStatus, Role};

use crate::auth::{AuthUser, Customer};
use crate::error::ApiError;
use crate::models::{Booking, Feedback, NewFeedback};
use crate::schema::{bookings, feedback, providers};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateFeedbackRequest {
    pub booking_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    Customer(auth): Customer,
    Json(request): Json<CreateFeedbackRequest>,
) -> Result<Json<Feedback>, ApiError> {
    if !(1..=5).contains(&request.rating) {
        return Err(ApiError::BadRequest(
            "rating must be between 1 and 5".to_string(),
        ));
    }

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
    if booking.status != BookingStatus::Completed.as_str() {
        return Err(ApiError::BadRequest(
            "feedback is only accepted for completed bookings".to_string(),
        ));
    }
    let provider_id = booking
        .provider_id
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("completed booking without provider")))?;

    let new_feedback = NewFeedback {
        id: Uuid::new_v4(),
        booking_id: booking.id,
        customer_id: auth.id,
        provider_id,
        rating: request.rating,
        comment: request.comment,
    };
    diesel::insert_into(feedback::table)
        .values(&new_feedback)
        .execute(&mut conn)
        .await
        .map_err(|e| match e {
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            ) => ApiError::Conflict("feedback already submitted for this booking".to_string()),
            other => other.into(),
        })?;

    let row = feedback::table
        .filter(feedback::id.eq(new_feedback.id))
        .first::<Feedback>(&mut conn)
        .await?;
    Ok(Json(row))
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<Feedback>>, ApiError> {
    let mut conn = state.conn().await?;

    let items = match auth.role {
        Role::Customer => {
            feedback::table
                .filter(feedback::customer_id.eq(auth.id))
                .order(feedback::created_at.desc())
                .load::<Feedback>(&mut conn)
                .await?
        }
        Role::Provider => {
            let provider_id = providers::table
                .filter(providers::user_id.eq(auth.id))
                .select(providers::id)
                .first::<Uuid>(&mut conn)
                .await
                .optional()?
                .ok_or_else(|| ApiError::NotFound("provider profile not found".to_string()))?;
            feedback::table
                .filter(feedback::provider_id.eq(provider_id))
                .order(feedback::created_at.desc())
                .load::<Feedback>(&mut conn)
                .await?
        }
        Role::Admin => {
            feedback::table
                .order(feedback::created_at.desc())
                .load::<Feedback>(&mut conn)
                .await?
        }
    };
    Ok(Json(items))
}
