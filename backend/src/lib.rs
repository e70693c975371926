//! League Server Library
//!
//! Exposes the league engine and HTTP surface for integration testing.

pub mod api;
pub mod audit;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod league;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Creates the application router with all endpoints
pub fn create_app(state: Arc<api::AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(|| async { "League Server" }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api/auth", api::auth_router().with_state(state.clone()))
        .nest(
            "/api/tournaments",
            api::tournaments_router().with_state(state.clone()),
        )
        .nest("/api/levels", api::levels_router().with_state(state.clone()))
        .nest("/api/venues", api::venues_router().with_state(state.clone()))
        .nest("/api/teams", api::teams_router().with_state(state.clone()))
        .nest(
            "/api/matches",
            api::matches_router().with_state(state.clone()),
        )
        .nest("/api/sets", api::sets_router().with_state(state.clone()))
        .nest("/api/standings", api::standings_router().with_state(state))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Test helper to create an in-memory database and run migrations
pub async fn create_test_db() -> db::DbPool {
    let pool = db::create_memory_pool()
        .await
        .expect("Failed to create in-memory database");

    db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

/// Test helper to create a fully configured test app.
///
/// The database is seeded with the administrator `admin` / `Admin12345`.
pub async fn create_test_app() -> (Router, db::DbPool) {
    let pool = create_test_db().await;
    let bcrypt_cost = 4;

    api::auth::ensure_admin(&pool, "admin", "Admin12345", bcrypt_cost)
        .await
        .expect("Failed to seed administrator");

    let state = Arc::new(api::AppState {
        pool: pool.clone(),
        jwt_manager: Arc::new(auth::JwtManager::new("test_secret_key".to_string(), 1)),
        league: Arc::new(league::LeagueManager::new(pool.clone())),
        bcrypt_cost,
    });

    (create_app(state), pool)
}
