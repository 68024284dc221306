use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use uuid::Uuid;

use shared::{ComplaintStatus, Role};

use crate::auth::{Admin, AuthUser, Customer};
use crate::error::ApiError;
use crate::models::{Booking, Complaint, NewComplaint};
use crate::schema::{bookings, complaints};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateComplaintRequest {
    pub booking_id: Uuid,
    pub subject: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct ResolveComplaintRequest {
    pub resolution: String,
}

pub async fn create(
    State(state): State<AppState>,
    Customer(auth): Customer,
    Json(request): Json<CreateComplaintRequest>,
) -> Result<Json<Complaint>, ApiError> {
    if request.subject.trim().is_empty() {
        return Err(ApiError::BadRequest("subject is required".to_string()));
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

    let new_complaint = NewComplaint {
        id: Uuid::new_v4(),
        booking_id: booking.id,
        customer_id: auth.id,
        subject: request.subject,
        description: request.description,
        status: ComplaintStatus::Open.as_str().to_string(),
    };
    diesel::insert_into(complaints::table)
        .values(&new_complaint)
        .execute(&mut conn)
        .await?;

    let row = complaints::table
        .filter(complaints::id.eq(new_complaint.id))
        .first::<Complaint>(&mut conn)
        .await?;
    Ok(Json(row))
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<Complaint>>, ApiError> {
    let mut conn = state.conn().await?;

    let items = match auth.role {
        Role::Customer => {
            complaints::table
                .filter(complaints::customer_id.eq(auth.id))
                .order(complaints::created_at.desc())
                .load::<Complaint>(&mut conn)
                .await?
        }
        Role::Admin => {
            complaints::table
                .order(complaints::created_at.desc())
                .load::<Complaint>(&mut conn)
                .await?
        }
        Role::Provider => {
            return Err(ApiError::Forbidden(
                "complaints are between customers and the platform".to_string(),
            ))
        }
    };
    Ok(Json(items))
}

async fn close_complaint(
    state: &AppState,
    id: Uuid,
    status: ComplaintStatus,
    resolution: Option<String>,
) -> Result<Complaint, ApiError> {
    let mut conn = state.conn().await?;

    let existing = complaints::table
        .filter(complaints::id.eq(id))
        .first::<Complaint>(&mut conn)
        .await
        .optional()?
        .ok_or_else(|| ApiError::NotFound("complaint not found".to_string()))?;
    if existing.status != ComplaintStatus::Open.as_str() {
        return Err(ApiError::BadRequest(
            "complaint is already closed".to_string(),
        ));
    }

    diesel::update(complaints::table.filter(complaints::id.eq(id)))
        .set((
            complaints::status.eq(status.as_str()),
            complaints::resolution.eq(resolution),
            complaints::resolved_at.eq(Some(Utc::now())),
        ))
        .execute(&mut conn)
        .await?;

    let row = complaints::table
        .filter(complaints::id.eq(id))
        .first::<Complaint>(&mut conn)
        .await?;
    Ok(row)
}

pub async fn resolve(
    State(state): State<AppState>,
    _admin: Admin,
    Path(id): Path<Uuid>,
    Json(request): Json<ResolveComplaintRequest>,
) -> Result<Json<Complaint>, ApiError> {
    let complaint = close_complaint(
        &state,
        id,
        ComplaintStatus::Resolved,
        Some(request.resolution),
    )
    .await?;
    Ok(Json(complaint))
}

pub async fn dismiss(
    State(state): State<AppState>,
    _admin: Admin,
    Path(id): Path<Uuid>,
) -> Result<Json<Complaint>, ApiError> {
    let complaint = close_complaint(&state, id, ComplaintStatus::Dismissed, None).await?;
    Ok(Json(complaint))
}
