use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared::Role;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: String,
    pub exp: usize,
}

pub fn issue_token(
    user_id: Uuid,
    role: Role,
    secret: &str,
    ttl_hours: i64,
) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        role: role.as_str().to_string(),
        exp: (Utc::now() + Duration::hours(ttl_hours)).timestamp() as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

pub fn decode_token(token: &str, secret: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::Unauthorized("invalid or expired token".to_string()))
}

/// Authenticated principal of any role.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = decode_token(token, &state.config.jwt_secret)?;
        let role = Role::parse(&claims.role)
            .ok_or_else(|| ApiError::Unauthorized("unknown role in token".to_string()))?;
        Ok(AuthUser {
            id: claims.sub,
            role,
        })
    }
}

macro_rules! role_extractor {
    ($name:ident, $role:expr, $message:expr) => {
        #[derive(Debug, Clone, Copy)]
        pub struct $name(pub AuthUser);

        #[async_trait]
        impl FromRequestParts<AppState> for $name {
            type Rejection = ApiError;

            async fn from_request_parts(
                parts: &mut Parts,
                state: &AppState,
            ) -> Result<Self, Self::Rejection> {
                let user = AuthUser::from_request_parts(parts, state).await?;
                if user.role != $role {
                    return Err(ApiError::Forbidden($message.to_string()));
                }
                Ok($name(user))
            }
        }
    };
}

role_extractor!(Customer, Role::Customer, "customer access required");
role_extractor!(ProviderUser, Role::Provider, "provider access required");
role_extractor!(Admin, Role::Admin, "admin access required");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip() {
        let user_id = Uuid::new_v4();
        let token = issue_token(user_id, Role::Provider, "test-secret", 24).unwrap();
        let claims = decode_token(&token, "test-secret").unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, "provider");
    }

    #[test]
    fn wrong_secret_rejected() {
        let token = issue_token(Uuid::new_v4(), Role::Customer, "secret-a", 24).unwrap();
        assert!(decode_token(&token, "secret-b").is_err());
    }

    #[test]
    fn garbage_token_rejected() {
        assert!(decode_token("not-a-token", "secret").is_err());
    }
}
