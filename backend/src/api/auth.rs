use crate::{
    api::extract::ApiJson,
    audit,
    auth::{
        password::{hash_password, validate_password, verify_password},
        AuthUser, JwtManager,
    },
    db::{
        models::{Role, User},
        DbPool,
    },
    error::{AppError, Result},
    league::LeagueManager,
};
use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub role: Role,
    /// Venues a delegate answers for
    #[serde(default)]
    pub venue_ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
        }
    }
}

pub struct AppState {
    pub pool: DbPool,
    pub jwt_manager: Arc<JwtManager>,
    pub league: Arc<LeagueManager>,
    pub bcrypt_cost: u32,
}

impl AppState {
    /// Verified caller from the `Authorization: Bearer` header
    pub fn caller(&self, headers: &HeaderMap) -> Result<AuthUser> {
        AuthUser::from_headers(&self.jwt_manager, headers)
    }
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(login))
        .route("/users", post(create_user))
}

/// Dummy hash for timing-safe comparison when user is not found.
/// Generated once so that bcrypt::verify takes similar time as a real check.
const DUMMY_HASH: &str = "$2b$12$LJ3m4ys3Lg2VBe.LBsDMzuCdNhJFUJShHTzu/hNRccWFEMOAb.Kze";

async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE LOWER(username) = LOWER(?)")
        .bind(&req.username)
        .fetch_optional(&state.pool)
        .await?;

    // Timing-safe: always perform bcrypt::verify even when user not found
    let user = match user {
        Some(u) if verify_password(&req.password, &u.password_hash)? => u,
        Some(_) => {
            audit::log_auth_event(&req.username, "login_failed", false);
            return Err(AppError::Auth("Invalid username or password".to_string()));
        }
        None => {
            let _ = bcrypt::verify(req.password.as_bytes(), DUMMY_HASH);
            audit::log_auth_event(&req.username, "login_failed", false);
            return Err(AppError::Auth("Invalid username or password".to_string()));
        }
    };

    audit::log_auth_event(&user.username, "login", true);

    let token = state
        .jwt_manager
        .create_token(user.id, user.username.clone(), user.role)?;

    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> Result<Json<UserResponse>> {
    let caller = state.caller(&headers)?;
    caller.require_admin()?;

    if req.username.trim().is_empty() {
        return Err(AppError::Validation("Username is required".to_string()));
    }
    validate_password(&req.password).map_err(AppError::Validation)?;
    if !req.venue_ids.is_empty() && req.role != Role::Delegate {
        return Err(AppError::Validation(
            "Only delegates can be linked to venues".to_string(),
        ));
    }

    let existing: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM users WHERE LOWER(username) = LOWER(?)")
            .bind(&req.username)
            .fetch_optional(&state.pool)
            .await?;
    if existing.is_some() {
        return Err(AppError::Conflict("Username already exists".to_string()));
    }

    let password_hash = hash_password(&req.password, state.bcrypt_cost)?;

    let mut tx = state.pool.begin().await?;
    let user_id = sqlx::query(
        "INSERT INTO users (username, password_hash, role, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(req.username.trim())
    .bind(&password_hash)
    .bind(req.role)
    .bind(Utc::now().to_rfc3339())
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    for venue_id in &req.venue_ids {
        sqlx::query("INSERT OR IGNORE INTO delegate_venues (user_id, venue_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(venue_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(_) => {
                    AppError::NotFound(format!("Venue {} not found", venue_id))
                }
                e => AppError::Database(e),
            })?;
    }
    tx.commit().await?;

    audit::log_auth_event(req.username.trim(), "user_created", true);

    Ok(Json(UserResponse {
        id: user_id,
        username: req.username.trim().to_string(),
        role: req.role,
    }))
}

/// Creates the bootstrap administrator unless a user with that name exists.
pub async fn ensure_admin(pool: &DbPool, username: &str, password: &str, cost: u32) -> Result<()> {
    let existing: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE LOWER(username) = LOWER(?)")
        .bind(username)
        .fetch_optional(pool)
        .await?;
    if existing.is_some() {
        return Ok(());
    }

    let password_hash = hash_password(password, cost)?;
    sqlx::query("INSERT INTO users (username, password_hash, role, created_at) VALUES (?, ?, 'admin', ?)")
        .bind(username)
        .bind(&password_hash)
        .bind(Utc::now().to_rfc3339())
        .execute(pool)
        .await?;

    tracing::info!("Seeded administrator account '{}'", username);
    Ok(())
}
