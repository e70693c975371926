use crate::{
    db::models::Role,
    error::{AppError, Result},
};
use axum::http::HeaderMap;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: i64, // user ID
    pub username: String,
    pub role: Role,
    pub exp: usize, // expiration time
}

impl Claims {
    pub fn new(user_id: i64, username: String, role: Role, expiration_hours: i64) -> Self {
        let exp =
            (chrono::Utc::now() + chrono::Duration::hours(expiration_hours)).timestamp() as usize;

        Self {
            sub: user_id,
            username,
            role,
            exp,
        }
    }
}

#[derive(Clone)]
pub struct JwtManager {
    secret: String,
    ttl_hours: i64,
}

impl JwtManager {
    pub fn new(secret: String, ttl_hours: i64) -> Self {
        Self { secret, ttl_hours }
    }

    pub fn create_token(&self, user_id: i64, username: String, role: Role) -> Result<String> {
        let claims = Claims::new(user_id, username, role, self.ttl_hours);

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AppError::Auth(format!("Failed to create token: {}", e)))
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| AppError::Auth(format!("Invalid token: {}", e)))
    }
}

/// Verified caller identity attached to a request
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

impl AuthUser {
    pub fn from_header(jwt_manager: &JwtManager, auth_header: &str) -> Result<Self> {
        // Bearer token format
        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AppError::Unauthorized)?;

        let claims = jwt_manager.verify_token(token)?;

        Ok(AuthUser {
            user_id: claims.sub,
            username: claims.username,
            role: claims.role,
        })
    }

    pub fn from_headers(jwt_manager: &JwtManager, headers: &HeaderMap) -> Result<Self> {
        let auth_header = headers
            .get("authorization")
            .and_then(|h| h.to_str().ok())
            .ok_or(AppError::Unauthorized)?;
        Self::from_header(jwt_manager, auth_header)
    }

    pub fn require_role(&self, allowed: &[Role]) -> Result<()> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    pub fn require_admin(&self) -> Result<()> {
        self.require_role(&[Role::Admin])
    }
}
