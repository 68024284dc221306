use axum::extract::State;
use axum::Json;
use bcrypt::{hash, verify, DEFAULT_COST};
use bigdecimal::BigDecimal;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared::{PerformanceTier, Role};

use crate::auth::{issue_token, AuthUser};
use crate::error::ApiError;
use crate::models::{NewProvider, NewUser, Provider, User};
use crate::schema::{providers, users};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub phone: Option<String>,
    pub total_bookings: i32,
    pub total_spent: BigDecimal,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            phone: user.phone,
            total_bookings: user.total_bookings,
            total_spent: user.total_spent,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: UserResponse,
    pub provider: Option<Provider>,
}

pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let role = match request.role.as_deref() {
        None | Some("customer") => Role::Customer,
        Some("provider") => Role::Provider,
        Some(other) => {
            return Err(ApiError::BadRequest(format!(
                "cannot register with role {:?}",
                other
            )))
        }
    };
    if request.password.len() < 8 {
        return Err(ApiError::BadRequest(
            "password must be at least 8 characters".to_string(),
        ));
    }
    if !request.email.contains('@') {
        return Err(ApiError::BadRequest("invalid email address".to_string()));
    }

    let password_hash = hash(&request.password, DEFAULT_COST)
        .map_err(|e| ApiError::Internal(e.into()))?;

    let new_user = NewUser {
        id: Uuid::new_v4(),
        name: request.name,
        email: request.email.to_lowercase(),
        password_hash,
        role: role.as_str().to_string(),
        phone: request.phone,
        total_bookings: 0,
        total_spent: BigDecimal::from(0),
    };

    let mut conn = state.conn().await?;
    diesel::insert_into(users::table)
        .values(&new_user)
        .execute(&mut conn)
        .await
        .map_err(|e| match e {
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            ) => ApiError::Conflict("email is already registered".to_string()),
            other => other.into(),
        })?;

    if role == Role::Provider {
        let new_provider = NewProvider {
            id: Uuid::new_v4(),
            user_id: new_user.id,
            performance_tier: PerformanceTier::Standard.as_str().to_string(),
            approved: false,
            completed_bookings: 0,
            total_earnings: BigDecimal::from(0),
        };
        diesel::insert_into(providers::table)
            .values(&new_provider)
            .execute(&mut conn)
            .await?;
    }

    let token = issue_token(
        new_user.id,
        role,
        &state.config.jwt_secret,
        state.config.token_ttl_hours,
    )?;

    let user = users::table
        .filter(users::id.eq(new_user.id))
        .first::<User>(&mut conn)
        .await?;

    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let mut conn = state.conn().await?;

    let user = users::table
        .filter(users::email.eq(request.email.to_lowercase()))
        .first::<User>(&mut conn)
        .await
        .optional()?
        .ok_or_else(|| ApiError::Unauthorized("invalid credentials".to_string()))?;

    let valid = verify(&request.password, &user.password_hash)
        .map_err(|e| ApiError::Internal(e.into()))?;
    if !valid {
        return Err(ApiError::Unauthorized("invalid credentials".to_string()));
    }

    let role = Role::parse(&user.role)
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("unknown role {:?}", user.role)))?;
    let token = issue_token(
        user.id,
        role,
        &state.config.jwt_secret,
        state.config.token_ttl_hours,
    )?;

    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

pub async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<MeResponse>, ApiError> {
    let mut conn = state.conn().await?;

    let user = users::table
        .filter(users::id.eq(auth.id))
        .first::<User>(&mut conn)
        .await
        .optional()?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;

    let provider = providers::table
        .filter(providers::user_id.eq(auth.id))
        .first::<Provider>(&mut conn)
        .await
        .optional()?;

    Ok(Json(MeResponse {
        user: user.into(),
        provider,
    }))
}
